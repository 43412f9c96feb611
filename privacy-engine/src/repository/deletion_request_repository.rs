// src/repository/deletion_request_repository.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::StorageResult;
use crate::domain::deletion_request_model::{DeletionRequest, DeletionState};

#[async_trait]
pub trait DeletionRequestRepository: Send + Sync {
    /// Persist a new request. Implementations must enforce the uniqueness
    /// constraint "at most one non-terminal request per user" and return
    /// `StorageError::ConstraintViolation` when it would be violated; this
    /// closes the check-then-act race at the store level.
    async fn insert(&self, request: DeletionRequest) -> StorageResult<DeletionRequest>;

    async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<DeletionRequest>>;

    /// The user's non-terminal request, if any
    async fn find_active_by_user(&self, user_id: Uuid) -> StorageResult<Option<DeletionRequest>>;

    /// IN_GRACE_PERIOD requests whose scheduled execution time has passed
    async fn find_due(&self, now: DateTime<Utc>) -> StorageResult<Vec<DeletionRequest>>;

    /// Conditional update: persists `request` only while the stored row is
    /// still in `expected_state` (WHERE-clause guard). Returns false when the
    /// guard did not match, in which case nothing was written.
    async fn update_guarded(
        &self,
        request: &DeletionRequest,
        expected_state: DeletionState,
    ) -> StorageResult<bool>;
}
