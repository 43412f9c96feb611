// src/repository/consent_repository.rs

use async_trait::async_trait;
use uuid::Uuid;

use super::StorageResult;
use crate::domain::consent_model::ConsentRecord;

#[async_trait]
pub trait ConsentRepository: Send + Sync {
    /// Append-only: the ledger is never updated in place
    async fn insert(&self, record: ConsentRecord) -> StorageResult<ConsentRecord>;

    /// Full ledger for one user, ordered by recorded_at ascending
    async fn find_by_user(&self, user_id: Uuid) -> StorageResult<Vec<ConsentRecord>>;
}
