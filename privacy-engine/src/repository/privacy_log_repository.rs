// src/repository/privacy_log_repository.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::StorageResult;
use crate::domain::privacy_log_model::PrivacyLogEntry;
use crate::domain::retention_policy_model::LogCategory;

#[async_trait]
pub trait PrivacyLogRepository: Send + Sync {
    async fn insert(&self, entry: PrivacyLogEntry) -> StorageResult<PrivacyLogEntry>;

    async fn find_by_user(&self, user_id: Uuid) -> StorageResult<Vec<PrivacyLogEntry>>;

    async fn count_by_category(&self, category: LogCategory) -> StorageResult<u64>;

    async fn count_older_than(
        &self,
        category: LogCategory,
        cutoff: DateTime<Utc>,
    ) -> StorageResult<u64>;

    /// Paginated delete: removes at most `limit` rows of `category` strictly
    /// older than `cutoff`, returning the number removed. The retention
    /// enforcer loops on this instead of issuing one large delete.
    async fn delete_older_than(
        &self,
        category: LogCategory,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> StorageResult<u64>;
}
