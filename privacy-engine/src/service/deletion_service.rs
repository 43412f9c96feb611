// src/service/deletion_service.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::deletion_request_model::{
    DeletionRequest, DeletionState, GRACE_PERIOD_DAYS,
};
use crate::domain::privacy_log_model::{PrivacyAction, PrivacyLogBuilder};
use crate::domain::retention_policy_model::LogCategory;
use crate::error::{PrivacyError, PrivacyResult};
use crate::repository::deletion_request_repository::DeletionRequestRepository;
use crate::repository::privacy_log_repository::PrivacyLogRepository;
use crate::repository::user_repository::{DeletedRowsSummary, UserRepository};
use crate::repository::StorageError;
use crate::service::notification_service::{NotificationTemplate, Notifier};
use crate::utils::clock::Clock;
use crate::utils::token::{generate_token, hash_token};

/// Returned once on request creation; the raw token is never retrievable
/// again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionRequestReceipt {
    pub request_id: Uuid,
    pub token: String,
    pub requested_at: DateTime<Utc>,
}

/// Result of an executed deletion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionOutcome {
    pub request_id: Uuid,
    pub user_id: Uuid,
    pub executed_at: DateTime<Utc>,
    pub deleted: DeletedRowsSummary,
}

/// Token-confirmed, grace-period account deletion workflow.
///
/// Every transition re-checks its precondition against the persisted state
/// via a guarded update; there is no in-memory locking. The store-level
/// uniqueness constraint on active requests closes the remaining
/// check-then-act window on creation.
#[derive(Clone)]
pub struct DeletionService {
    user_repo: Arc<dyn UserRepository>,
    deletion_repo: Arc<dyn DeletionRequestRepository>,
    log_repo: Arc<dyn PrivacyLogRepository>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl DeletionService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        deletion_repo: Arc<dyn DeletionRequestRepository>,
        log_repo: Arc<dyn PrivacyLogRepository>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            user_repo,
            deletion_repo,
            log_repo,
            notifier,
            clock,
        }
    }

    /// Open a new deletion request and hand back the confirmation token
    pub async fn request_deletion(
        &self,
        user_id: Uuid,
        reason: Option<String>,
    ) -> PrivacyResult<DeletionRequestReceipt> {
        let now = self.clock.now();

        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| PrivacyError::NotFound(format!("User {} not found", user_id)))?;

        if let Some(active) = self.deletion_repo.find_active_by_user(user_id).await? {
            warn!(
                user_id = %user_id,
                existing_request = %active.id,
                "deletion request rejected: one is already active"
            );
            return Err(PrivacyError::DuplicateActiveRequest);
        }

        let token = generate_token();
        let request = DeletionRequest::new(user_id, hash_token(&token), reason.clone(), now);
        let request = match self.deletion_repo.insert(request).await {
            Ok(request) => request,
            // ストアの一意制約が同時リクエストの競合を閉じる
            Err(StorageError::ConstraintViolation(_)) => {
                return Err(PrivacyError::DuplicateActiveRequest)
            }
            Err(e) => return Err(e.into()),
        };

        let entry = PrivacyLogBuilder::new(LogCategory::Deletion, PrivacyAction::DeletionRequested)
            .user_id(user_id)
            .details(json!({
                "request_id": request.id,
                "reason": reason,
            }))
            .build(now);
        self.log_repo.insert(entry).await?;

        // 通知はベストエフォート。失敗しても状態遷移は巻き戻さない
        if let Err(e) = self
            .notifier
            .notify(
                user_id,
                NotificationTemplate::DeletionRequested,
                json!({ "token": token, "request_id": request.id }),
            )
            .await
        {
            warn!(user_id = %user_id, error = %e, "deletion-request notification failed");
        }

        info!(user_id = %user_id, request_id = %request.id, "deletion requested");
        Ok(DeletionRequestReceipt {
            request_id: request.id,
            token,
            requested_at: now,
        })
    }

    /// Confirm a pending request with its token, starting the grace period
    pub async fn confirm_deletion(
        &self,
        user_id: Uuid,
        token: &str,
    ) -> PrivacyResult<DeletionRequest> {
        let now = self.clock.now();

        let mut request = match self.deletion_repo.find_active_by_user(user_id).await? {
            Some(request) if request.state == DeletionState::Pending => request,
            _ => return Err(PrivacyError::InvalidToken),
        };
        if request.token_hash != hash_token(token) {
            return Err(PrivacyError::InvalidToken);
        }

        request.confirm(now);
        if !self
            .deletion_repo
            .update_guarded(&request, DeletionState::Pending)
            .await?
        {
            // 並行する遷移に負けた
            return Err(PrivacyError::InvalidToken);
        }

        let entry = PrivacyLogBuilder::new(LogCategory::Deletion, PrivacyAction::DeletionConfirmed)
            .user_id(user_id)
            .details(json!({
                "request_id": request.id,
                "scheduled_execution_at": request.scheduled_execution_at,
                "grace_period_days": GRACE_PERIOD_DAYS,
            }))
            .build(now);
        self.log_repo.insert(entry).await?;

        info!(
            user_id = %user_id,
            request_id = %request.id,
            scheduled_execution_at = ?request.scheduled_execution_at,
            "deletion confirmed, grace period started"
        );
        Ok(request)
    }

    /// Cancel the user's active request. A new request may follow later.
    pub async fn cancel_deletion(&self, user_id: Uuid) -> PrivacyResult<DeletionRequest> {
        let now = self.clock.now();

        let mut request = self
            .deletion_repo
            .find_active_by_user(user_id)
            .await?
            .ok_or(PrivacyError::NoActiveRequest)?;

        let previous_state = request.state;
        request.cancel(now);
        if !self
            .deletion_repo
            .update_guarded(&request, previous_state)
            .await?
        {
            return Err(PrivacyError::NoActiveRequest);
        }

        let entry = PrivacyLogBuilder::new(LogCategory::Deletion, PrivacyAction::DeletionCancelled)
            .user_id(user_id)
            .details(json!({ "request_id": request.id }))
            .build(now);
        self.log_repo.insert(entry).await?;

        if let Err(e) = self
            .notifier
            .notify(
                user_id,
                NotificationTemplate::DeletionCancelled,
                json!({ "request_id": request.id }),
            )
            .await
        {
            warn!(user_id = %user_id, error = %e, "deletion-cancelled notification failed");
        }

        info!(user_id = %user_id, request_id = %request.id, "deletion cancelled");
        Ok(request)
    }

    /// Irreversibly execute a due deletion. Invoked by the external
    /// scheduler, never directly by the user.
    pub async fn execute_deletion(&self, request_id: Uuid) -> PrivacyResult<DeletionOutcome> {
        let now = self.clock.now();

        let mut request = self
            .deletion_repo
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| {
                PrivacyError::NotFound(format!("Deletion request {} not found", request_id))
            })?;

        if request.state != DeletionState::InGracePeriod {
            return Err(PrivacyError::NotInGracePeriod);
        }
        let scheduled_for = request
            .scheduled_execution_at
            .ok_or(PrivacyError::NotInGracePeriod)?;
        if now < scheduled_for {
            return Err(PrivacyError::GracePeriodNotElapsed { scheduled_for });
        }

        let user_id = request.user_id;

        // 破壊的削除の前に監査証跡を書く。ユーザー削除後も残るように
        // user 参照は nullable で保持される。
        let entry = PrivacyLogBuilder::new(LogCategory::Deletion, PrivacyAction::DeletionExecuted)
            .user_id(user_id)
            .details(json!({
                "request_id": request.id,
                "requested_at": request.requested_at,
                "confirmed_at": request.confirmed_at,
            }))
            .build(now);
        self.log_repo.insert(entry).await?;

        request.mark_executed(now);
        if !self
            .deletion_repo
            .update_guarded(&request, DeletionState::InGracePeriod)
            .await?
        {
            return Err(PrivacyError::NotInGracePeriod);
        }

        // カスケード削除は all-or-nothing。途中失敗は ERROR として
        // オペレーター対応に引き渡す。自動リトライはしない。
        let deleted = match self.user_repo.delete_cascade(user_id).await {
            Ok(deleted) => deleted,
            Err(e) => {
                request.mark_error(format!("cascade delete failed: {}", e));
                self.deletion_repo
                    .update_guarded(&request, DeletionState::Executed)
                    .await?;

                let failure = PrivacyLogBuilder::new(
                    LogCategory::Deletion,
                    PrivacyAction::DeletionFailed,
                )
                .user_id(user_id)
                .details(json!({ "request_id": request.id, "error": e.to_string() }))
                .build(now);
                self.log_repo.insert(failure).await?;

                warn!(
                    user_id = %user_id,
                    request_id = %request.id,
                    error = %e,
                    "deletion execution failed; request marked for operator remediation"
                );
                return Err(e.into());
            }
        };

        if let Err(e) = self
            .notifier
            .notify(
                user_id,
                NotificationTemplate::DeletionExecuted,
                json!({ "request_id": request.id }),
            )
            .await
        {
            warn!(user_id = %user_id, error = %e, "deletion-executed notification failed");
        }

        info!(
            user_id = %user_id,
            request_id = %request.id,
            records = ?deleted,
            "deletion executed"
        );
        Ok(DeletionOutcome {
            request_id: request.id,
            user_id,
            executed_at: now,
            deleted,
        })
    }

    /// Due requests for the external scheduler to drive `execute_deletion`
    pub async fn due_deletions(&self) -> PrivacyResult<Vec<DeletionRequest>> {
        Ok(self.deletion_repo.find_due(self.clock.now()).await?)
    }
}
