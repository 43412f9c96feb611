// src/repository/export_request_repository.rs

use async_trait::async_trait;
use uuid::Uuid;

use super::StorageResult;
use crate::domain::export_request_model::{ExportRequest, ExportState};

#[async_trait]
pub trait ExportRequestRepository: Send + Sync {
    async fn insert(&self, request: ExportRequest) -> StorageResult<ExportRequest>;

    async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<ExportRequest>>;

    /// All requests for one user, ordered by created_at ascending. Used to
    /// include prior export metadata in a new bundle.
    async fn find_by_user(&self, user_id: Uuid) -> StorageResult<Vec<ExportRequest>>;

    /// Conditional update guarded by the currently stored state. Returns
    /// false (writing nothing) when the guard does not match.
    async fn update_guarded(
        &self,
        request: &ExportRequest,
        expected_state: ExportState,
    ) -> StorageResult<bool>;
}
