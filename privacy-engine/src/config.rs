// src/config.rs

use std::env;

use crate::error::{PrivacyError, PrivacyResult};
use crate::service::encryption_service::EncryptionKey;

#[derive(Clone)]
pub struct PrivacyConfig {
    pub environment: String,
    /// Symmetric key for field-level encryption. Injected here instead of
    /// being read ad hoc from the process environment so the engine can be
    /// tested with multiple keys.
    pub encryption_key: EncryptionKey,
    /// Bounded capacity of the export worker queue.
    pub export_queue_capacity: usize,
}

impl std::fmt::Debug for PrivacyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 鍵はログに出さない
        f.debug_struct("PrivacyConfig")
            .field("environment", &self.environment)
            .field("encryption_key", &"<redacted>")
            .field("export_queue_capacity", &self.export_queue_capacity)
            .finish()
    }
}

impl PrivacyConfig {
    pub fn from_env() -> PrivacyResult<Self> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        // Missing or malformed key is fatal at startup; never degrade to
        // plaintext silently.
        let key_hex = env::var("ENCRYPTION_KEY").map_err(|_| {
            PrivacyError::Configuration("ENCRYPTION_KEY must be set".to_string())
        })?;
        let encryption_key = EncryptionKey::from_hex(&key_hex)?;

        let export_queue_capacity = env::var("EXPORT_QUEUE_CAPACITY")
            .unwrap_or_else(|_| "64".to_string())
            .parse()
            .map_err(|_| {
                PrivacyError::Configuration("Invalid EXPORT_QUEUE_CAPACITY value".to_string())
            })?;

        Ok(Self {
            environment,
            encryption_key,
            export_queue_capacity,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    #[allow(dead_code)]
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// テスト用の設定を作成
    pub fn for_testing() -> Self {
        Self {
            environment: "test".to_string(),
            // 64 hex chars = 32 bytes
            encryption_key: EncryptionKey::from_hex(
                "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f",
            )
            .expect("test key is valid"),
            export_queue_capacity: 8,
        }
    }
}
