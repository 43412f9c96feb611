// src/service/export_service.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::consent_model::ConsentRecord;
use crate::domain::export_request_model::{ExportRequest, ExportState, ExportStatus};
use crate::domain::privacy_log_model::{PrivacyAction, PrivacyLogBuilder};
use crate::domain::retention_policy_model::LogCategory;
use crate::domain::user_model::{Conversation, Document, FinancialRecord, Reminder};
use crate::error::{PrivacyError, PrivacyResult};
use crate::repository::consent_repository::ConsentRepository;
use crate::repository::export_request_repository::ExportRequestRepository;
use crate::repository::privacy_log_repository::PrivacyLogRepository;
use crate::repository::user_repository::UserRepository;
use crate::service::encryption_service::EncryptionService;
use crate::service::notification_service::{NotificationTemplate, Notifier};
use crate::service::storage_service::ArtifactStorage;
use crate::utils::clock::Clock;

/// Everything handed to the data subject. Encrypted fields are decrypted so
/// the bundle is readable by its owner.
#[derive(Debug, Serialize)]
pub struct ExportBundle {
    pub generated_at: DateTime<Utc>,
    pub user: UserProfileExport,
    pub financial_records: Vec<FinancialRecord>,
    pub documents: Vec<Document>,
    pub conversations: Vec<Conversation>,
    pub reminders: Vec<Reminder>,
    pub consent_history: Vec<ConsentRecord>,
    pub prior_exports: Vec<PriorExportSummary>,
}

#[derive(Debug, Serialize)]
pub struct UserProfileExport {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub tax_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Metadata of earlier portability requests, included in new bundles
#[derive(Debug, Serialize)]
pub struct PriorExportSummary {
    pub id: Uuid,
    pub state: ExportState,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub artifact_expires_at: Option<DateTime<Utc>>,
}

/// Point-in-time view of one export request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportStatusReport {
    pub request_id: Uuid,
    pub user_id: Uuid,
    pub status: ExportStatus,
    pub artifact_size: Option<u64>,
    pub artifact_expires_at: Option<DateTime<Utc>>,
    pub error_detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Asynchronous data-portability pipeline. Requests are persisted first and
/// handed to a worker over a bounded channel; the persisted PENDING record
/// stays the source of truth, so a lost queue message only delays
/// processing.
pub struct ExportService {
    user_repo: Arc<dyn UserRepository>,
    export_repo: Arc<dyn ExportRequestRepository>,
    consent_repo: Arc<dyn ConsentRepository>,
    log_repo: Arc<dyn PrivacyLogRepository>,
    storage: Arc<dyn ArtifactStorage>,
    encryption: Arc<EncryptionService>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    queue: mpsc::Sender<Uuid>,
}

/// Consumes queued request ids and drives processing. Spawn with
/// `tokio::spawn(worker.run())`.
pub struct ExportWorker {
    service: Arc<ExportService>,
    receiver: mpsc::Receiver<Uuid>,
}

impl ExportWorker {
    pub async fn run(mut self) {
        while let Some(request_id) = self.receiver.recv().await {
            if let Err(e) = self.service.process_export(request_id).await {
                // 失敗は記録済み (ERROR 状態)。リトライは外部トリガーで行う
                error!(request_id = %request_id, error = %e, "export processing failed");
            }
        }
    }
}

impl ExportService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        export_repo: Arc<dyn ExportRequestRepository>,
        consent_repo: Arc<dyn ConsentRepository>,
        log_repo: Arc<dyn PrivacyLogRepository>,
        storage: Arc<dyn ArtifactStorage>,
        encryption: Arc<EncryptionService>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        queue_capacity: usize,
    ) -> (Arc<Self>, ExportWorker) {
        let (tx, rx) = mpsc::channel(queue_capacity);
        let service = Arc::new(Self {
            user_repo,
            export_repo,
            consent_repo,
            log_repo,
            storage,
            encryption,
            notifier,
            clock,
            queue: tx,
        });
        let worker = ExportWorker {
            service: Arc::clone(&service),
            receiver: rx,
        };
        (service, worker)
    }

    /// Create a new export request and enqueue it for the worker
    pub async fn request_export(&self, user_id: Uuid) -> PrivacyResult<ExportRequest> {
        let now = self.clock.now();

        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| PrivacyError::NotFound(format!("User {} not found", user_id)))?;

        let request = self
            .export_repo
            .insert(ExportRequest::new(user_id, now))
            .await?;

        let entry = PrivacyLogBuilder::new(LogCategory::Export, PrivacyAction::ExportRequested)
            .user_id(user_id)
            .details(json!({ "request_id": request.id }))
            .build(now);
        self.log_repo.insert(entry).await?;

        // キュー投入はベストエフォート。PENDING レコードが真実であり、
        // 取りこぼしても手動/保守トリガーで処理できる
        if let Err(e) = self.queue.send(request.id).await {
            warn!(request_id = %request.id, error = %e, "export queue handoff failed");
        }

        info!(user_id = %user_id, request_id = %request.id, "export requested");
        Ok(request)
    }

    /// Drive one request through the pipeline. Idempotent: anything that is
    /// no longer PENDING is returned as-is.
    pub async fn process_export(&self, request_id: Uuid) -> PrivacyResult<ExportRequest> {
        let mut request = self
            .export_repo
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| {
                PrivacyError::NotFound(format!("Export request {} not found", request_id))
            })?;

        if request.state != ExportState::Pending {
            return Ok(request);
        }

        request.mark_processing();
        if !self
            .export_repo
            .update_guarded(&request, ExportState::Pending)
            .await?
        {
            // 別のワーカーが先に取得した
            return Ok(self
                .export_repo
                .find_by_id(request_id)
                .await?
                .unwrap_or(request));
        }

        match self.build_and_store_bundle(&request).await {
            Ok((location, size)) => {
                let now = self.clock.now();
                request.mark_completed(&location, size, now);
                if !self
                    .export_repo
                    .update_guarded(&request, ExportState::Processing)
                    .await?
                {
                    // 状態が並行で変わっていたら成果物を参照させない
                    let _ = self.storage.delete(&location).await;
                    return Err(PrivacyError::ExternalService(
                        "Export request changed state during processing".to_string(),
                    ));
                }

                let entry =
                    PrivacyLogBuilder::new(LogCategory::Export, PrivacyAction::ExportCompleted)
                        .user_id(request.user_id)
                        .details(json!({
                            "request_id": request.id,
                            "artifact_size": size,
                            "artifact_expires_at": request.artifact_expires_at,
                        }))
                        .build(now);
                self.log_repo.insert(entry).await?;

                if let Err(e) = self
                    .notifier
                    .notify(
                        request.user_id,
                        NotificationTemplate::ExportReady,
                        json!({
                            "request_id": request.id,
                            "expires_at": request.artifact_expires_at,
                        }),
                    )
                    .await
                {
                    warn!(user_id = %request.user_id, error = %e, "export-ready notification failed");
                }

                info!(
                    user_id = %request.user_id,
                    request_id = %request.id,
                    size,
                    "export completed"
                );
                Ok(request)
            }
            Err(e) => {
                request.mark_error(e.to_string());
                self.export_repo
                    .update_guarded(&request, ExportState::Processing)
                    .await?;

                let entry =
                    PrivacyLogBuilder::new(LogCategory::Export, PrivacyAction::ExportFailed)
                        .user_id(request.user_id)
                        .details(json!({ "request_id": request.id, "error": e.to_string() }))
                        .build(self.clock.now());
                self.log_repo.insert(entry).await?;

                warn!(
                    user_id = %request.user_id,
                    request_id = %request.id,
                    error = %e,
                    "export failed"
                );
                Err(e)
            }
        }
    }

    /// Pure read. A completed record past expiry is reported as EXPIRED
    /// without touching the stored state.
    pub async fn status(&self, request_id: Uuid) -> PrivacyResult<ExportStatusReport> {
        let request = self
            .export_repo
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| {
                PrivacyError::NotFound(format!("Export request {} not found", request_id))
            })?;

        Ok(ExportStatusReport {
            request_id: request.id,
            user_id: request.user_id,
            status: request.status_at(self.clock.now()),
            artifact_size: request.artifact_size,
            artifact_expires_at: request.artifact_expires_at,
            error_detail: request.error_detail,
            created_at: request.created_at,
            completed_at: request.completed_at,
        })
    }

    /// Serve the artifact while it is valid; expired artifacts are gone
    pub async fn download(&self, request_id: Uuid) -> PrivacyResult<Vec<u8>> {
        let now = self.clock.now();
        let request = self
            .export_repo
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| {
                PrivacyError::NotFound(format!("Export request {} not found", request_id))
            })?;

        if request.status_at(now) != ExportStatus::Completed {
            return Err(PrivacyError::NotFound(
                "Export artifact is not available".to_string(),
            ));
        }
        let location = request.artifact_location.as_deref().ok_or_else(|| {
            PrivacyError::NotFound("Export artifact is not available".to_string())
        })?;

        let data = self.storage.get(location).await?;

        let entry = PrivacyLogBuilder::new(LogCategory::Export, PrivacyAction::ExportDownloaded)
            .user_id(request.user_id)
            .details(json!({ "request_id": request.id }))
            .build(now);
        self.log_repo.insert(entry).await?;

        Ok(data)
    }

    /// Gather, decrypt, serialize and store one bundle
    async fn build_and_store_bundle(
        &self,
        request: &ExportRequest,
    ) -> PrivacyResult<(String, u64)> {
        let user_id = request.user_id;

        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| PrivacyError::NotFound(format!("User {} not found", user_id)))?;
        let owned = self.user_repo.load_owned_data(user_id).await?;
        let consent_history = self.consent_repo.find_by_user(user_id).await?;
        let prior_exports: Vec<PriorExportSummary> = self
            .export_repo
            .find_by_user(user_id)
            .await?
            .into_iter()
            .filter(|prior| prior.id != request.id)
            .map(|prior| PriorExportSummary {
                id: prior.id,
                state: prior.state,
                created_at: prior.created_at,
                completed_at: prior.completed_at,
                artifact_expires_at: prior.artifact_expires_at,
            })
            .collect();

        // 本人に読める形で渡すため、保存時に暗号化された属性を復号する
        let email = self
            .encryption
            .decrypt(Some(&user.email))?
            .unwrap_or_default();
        let tax_id = self.encryption.decrypt(user.tax_id.as_deref())?;

        let bundle = ExportBundle {
            generated_at: self.clock.now(),
            user: UserProfileExport {
                id: user.id,
                email,
                display_name: user.display_name,
                tax_id,
                created_at: user.created_at,
                updated_at: user.updated_at,
            },
            financial_records: owned.financial_records,
            documents: owned.documents,
            conversations: owned.conversations,
            reminders: owned.reminders,
            consent_history,
            prior_exports,
        };

        let data = serde_json::to_vec_pretty(&bundle).map_err(|e| {
            PrivacyError::ExternalService(format!("Failed to serialize export bundle: {}", e))
        })?;
        let size = data.len() as u64;
        let location = self.storage.put(data, "application/json").await?;

        Ok((location, size))
    }
}
