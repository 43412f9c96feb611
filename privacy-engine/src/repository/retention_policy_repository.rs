// src/repository/retention_policy_repository.rs

use async_trait::async_trait;

use super::StorageResult;
use crate::domain::retention_policy_model::{LogCategory, RetentionPolicy};

#[async_trait]
pub trait RetentionPolicyRepository: Send + Sync {
    async fn find_all(&self) -> StorageResult<Vec<RetentionPolicy>>;

    async fn find_active(&self) -> StorageResult<Vec<RetentionPolicy>>;

    async fn find_by_category(
        &self,
        category: LogCategory,
    ) -> StorageResult<Option<RetentionPolicy>>;

    /// Create-or-update keyed by category (seeding and administrator edits)
    async fn upsert(&self, policy: RetentionPolicy) -> StorageResult<RetentionPolicy>;
}
