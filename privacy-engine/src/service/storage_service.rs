// src/service/storage_service.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{Client, Config};
use chrono::Utc;
use uuid::Uuid;

use crate::error::{PrivacyError, PrivacyResult};

/// ストレージプロバイダーの種類
#[derive(Debug, Clone, PartialEq)]
pub enum StorageProvider {
    MinIO,
    R2,
}

impl StorageProvider {
    /// 環境変数からプロバイダーを判定
    pub fn from_env() -> Self {
        match std::env::var("STORAGE_PROVIDER")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "r2" | "cloudflare" | "cloudflare-r2" => Self::R2,
            "minio" => Self::MinIO,
            _ => match std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string())
                .to_lowercase()
                .as_str()
            {
                "production" | "staging" => Self::R2,
                _ => Self::MinIO,
            },
        }
    }
}

/// Blob store for export artifacts. Locations are opaque keys; nothing here
/// may assume a local filesystem.
#[async_trait]
pub trait ArtifactStorage: Send + Sync {
    /// Store a finished artifact, returning its location key
    async fn put(&self, data: Vec<u8>, content_type: &str) -> PrivacyResult<String>;

    /// Fetch an artifact; `NotFound` once it no longer exists
    async fn get(&self, location: &str) -> PrivacyResult<Vec<u8>>;

    async fn delete(&self, location: &str) -> PrivacyResult<()>;

    async fn exists(&self, location: &str) -> PrivacyResult<bool>;
}

/// S3互換ストレージの実装
pub struct S3ArtifactStorage {
    client: Client,
    bucket: String,
}

impl S3ArtifactStorage {
    pub async fn new(config: ArtifactStoreConfig) -> PrivacyResult<Self> {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "artifact_storage",
        );

        let mut s3_config_builder = Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials);

        // プロバイダー固有の設定
        match config.provider {
            StorageProvider::MinIO => {
                // MinIOはpath styleを強制
                s3_config_builder = s3_config_builder.force_path_style(true);
            }
            StorageProvider::R2 => {
                // R2はvirtual-hosted styleをサポート（デフォルト）
            }
        }

        let s3_config = s3_config_builder.build();
        let client = Client::from_conf(s3_config);

        Ok(Self {
            client,
            bucket: config.bucket,
        })
    }

    /// エクスポート成果物用のストレージキーを生成
    fn generate_export_key() -> String {
        format!("exports/{}/{}", Utc::now().format("%Y/%m"), Uuid::new_v4())
    }

    /// 期限付きダウンロードURLを生成
    pub async fn generate_download_url(
        &self,
        location: &str,
        expires_in_seconds: u64,
    ) -> PrivacyResult<String> {
        let expires_in = std::time::Duration::from_secs(expires_in_seconds);
        let presigning_config = PresigningConfig::expires_in(expires_in).map_err(|e| {
            PrivacyError::ExternalService(format!("Failed to create presigning config: {}", e))
        })?;

        let presigned_request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(location)
            .presigned(presigning_config)
            .await
            .map_err(|e| {
                PrivacyError::ExternalService(format!("Failed to generate presigned URL: {}", e))
            })?;

        Ok(presigned_request.uri().to_string())
    }
}

#[async_trait]
impl ArtifactStorage for S3ArtifactStorage {
    async fn put(&self, data: Vec<u8>, content_type: &str) -> PrivacyResult<String> {
        let key = Self::generate_export_key();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                PrivacyError::ExternalService(format!("Failed to upload artifact: {}", e))
            })?;

        Ok(key)
    }

    async fn get(&self, location: &str) -> PrivacyResult<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(location)
            .send()
            .await
            .map_err(|e| PrivacyError::NotFound(format!("Artifact not found: {}", e)))?;

        let data = response.body.collect().await.map_err(|e| {
            PrivacyError::ExternalService(format!("Failed to read artifact data: {}", e))
        })?;

        Ok(data.to_vec())
    }

    async fn delete(&self, location: &str) -> PrivacyResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(location)
            .send()
            .await
            .map_err(|e| {
                PrivacyError::ExternalService(format!("Failed to delete artifact: {}", e))
            })?;

        Ok(())
    }

    async fn exists(&self, location: &str) -> PrivacyResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(location)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                // オブジェクトが存在しない場合は false を返す
                if e.to_string().contains("NoSuchKey") || e.to_string().contains("404") {
                    Ok(false)
                } else {
                    Err(PrivacyError::ExternalService(format!(
                        "Failed to check artifact existence: {}",
                        e
                    )))
                }
            }
        }
    }
}

/// In-memory artifact store for tests and local development
#[derive(Debug, Default)]
pub struct InMemoryArtifactStorage {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryArtifactStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().expect("storage lock poisoned").len()
    }
}

#[async_trait]
impl ArtifactStorage for InMemoryArtifactStorage {
    async fn put(&self, data: Vec<u8>, _content_type: &str) -> PrivacyResult<String> {
        let key = format!("exports/{}/{}", Utc::now().format("%Y/%m"), Uuid::new_v4());
        self.objects
            .lock()
            .expect("storage lock poisoned")
            .insert(key.clone(), data);
        Ok(key)
    }

    async fn get(&self, location: &str) -> PrivacyResult<Vec<u8>> {
        self.objects
            .lock()
            .expect("storage lock poisoned")
            .get(location)
            .cloned()
            .ok_or_else(|| PrivacyError::NotFound(format!("Artifact not found: {}", location)))
    }

    async fn delete(&self, location: &str) -> PrivacyResult<()> {
        self.objects
            .lock()
            .expect("storage lock poisoned")
            .remove(location);
        Ok(())
    }

    async fn exists(&self, location: &str) -> PrivacyResult<bool> {
        Ok(self
            .objects
            .lock()
            .expect("storage lock poisoned")
            .contains_key(location))
    }
}

/// ストレージ設定
#[derive(Clone)]
pub struct ArtifactStoreConfig {
    pub provider: StorageProvider,
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
}

impl ArtifactStoreConfig {
    /// 環境変数から設定を読み込み
    pub fn from_env() -> PrivacyResult<Self> {
        let provider = StorageProvider::from_env();
        tracing::info!("Artifact storage provider: {:?}", provider);

        let require = |name: &str| {
            std::env::var(name)
                .map_err(|_| PrivacyError::Configuration(format!("{} not set", name)))
        };

        Ok(Self {
            provider,
            endpoint: require("STORAGE_ENDPOINT")?,
            bucket: require("STORAGE_BUCKET")?,
            region: require("STORAGE_REGION")?,
            access_key: require("STORAGE_ACCESS_KEY")?,
            secret_key: require("STORAGE_SECRET_KEY")?,
        })
    }
}

/// ストレージサービスのファクトリ関数
pub async fn create_artifact_storage(
    config: ArtifactStoreConfig,
) -> PrivacyResult<Arc<dyn ArtifactStorage>> {
    // MinIOもR2もS3互換なので同じ実装を使用
    let storage = S3ArtifactStorage::new(config).await?;
    Ok(Arc::new(storage))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_put_get_delete() {
        let storage = InMemoryArtifactStorage::new();
        let location = storage
            .put(b"{\"hello\":true}".to_vec(), "application/json")
            .await
            .unwrap();
        assert!(location.starts_with("exports/"));
        assert!(storage.exists(&location).await.unwrap());

        let data = storage.get(&location).await.unwrap();
        assert_eq!(data, b"{\"hello\":true}");

        storage.delete(&location).await.unwrap();
        assert!(!storage.exists(&location).await.unwrap());
        assert!(matches!(
            storage.get(&location).await,
            Err(PrivacyError::NotFound(_))
        ));
    }
}
