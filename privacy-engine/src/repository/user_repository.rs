// src/repository/user_repository.rs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StorageResult;
use crate::domain::user_model::{User, UserOwnedData};

/// Counts of rows removed by a cascading user delete
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeletedRowsSummary {
    pub user_deleted: bool,
    pub financial_records: u64,
    pub documents: u64,
    pub conversations: u64,
    pub reminders: u64,
    pub consent_records: u64,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<User>>;

    /// Gather every collection the user owns (export pipeline)
    async fn load_owned_data(&self, user_id: Uuid) -> StorageResult<UserOwnedData>;

    /// Cascading delete of the whole user aggregate. All-or-nothing from the
    /// caller's perspective: a partial failure must surface as an error.
    /// Audit-trail rows (privacy log, deletion/export requests) are NOT part
    /// of the cascade; they are retained under their own retention policies.
    async fn delete_cascade(&self, user_id: Uuid) -> StorageResult<DeletedRowsSummary>;
}
