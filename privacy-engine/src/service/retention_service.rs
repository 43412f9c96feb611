// src/service/retention_service.rs

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::domain::privacy_log_model::{PrivacyAction, PrivacyLogBuilder};
use crate::domain::retention_policy_model::{default_policies, LogCategory, RetentionPolicy};
use crate::error::PrivacyResult;
use crate::repository::privacy_log_repository::PrivacyLogRepository;
use crate::repository::retention_policy_repository::RetentionPolicyRepository;
use crate::utils::clock::Clock;

/// Rows removed per batch. Bounded deletes keep single transactions small
/// on a live store.
pub const PURGE_BATCH_SIZE: usize = 1_000;

/// Pause between batches; the only intentional blocking point in the engine
pub const PURGE_BATCH_PAUSE: Duration = Duration::from_millis(100);

/// Purge result for one category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySweep {
    pub category: LogCategory,
    pub cutoff: DateTime<Utc>,
    pub rows_removed: u64,
}

/// Result of one full sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepOutcome {
    pub started_at: DateTime<Utc>,
    pub categories: Vec<CategorySweep>,
    pub total_removed: u64,
}

/// Per-category operational visibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRetentionStats {
    pub category: LogCategory,
    pub retention_days: i64,
    pub active: bool,
    pub total_rows: u64,
    pub purgeable_rows: u64,
}

/// Enforces per-category time-to-live over the privacy audit trail
#[derive(Clone)]
pub struct RetentionService {
    policy_repo: Arc<dyn RetentionPolicyRepository>,
    log_repo: Arc<dyn PrivacyLogRepository>,
    clock: Arc<dyn Clock>,
}

impl RetentionService {
    pub fn new(
        policy_repo: Arc<dyn RetentionPolicyRepository>,
        log_repo: Arc<dyn PrivacyLogRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            policy_repo,
            log_repo,
            clock,
        }
    }

    /// Seed the default policy table for categories without a policy yet.
    /// Administrator edits are preserved.
    pub async fn ensure_default_policies(&self) -> PrivacyResult<usize> {
        let mut seeded = 0;
        for policy in default_policies() {
            if self
                .policy_repo
                .find_by_category(policy.category)
                .await?
                .is_none()
            {
                self.policy_repo.upsert(policy).await?;
                seeded += 1;
            }
        }
        Ok(seeded)
    }

    pub async fn update_policy(&self, policy: RetentionPolicy) -> PrivacyResult<RetentionPolicy> {
        Ok(self.policy_repo.upsert(policy).await?)
    }

    /// Purge everything past its category's time-to-live, in bounded
    /// batches with a pause between them. Idempotent and safe to re-run.
    pub async fn sweep(&self) -> PrivacyResult<SweepOutcome> {
        let started_at = self.clock.now();
        let mut categories = Vec::new();
        let mut total_removed = 0;

        for policy in self.policy_repo.find_active().await? {
            let cutoff = policy.cutoff(started_at);
            let mut rows_removed = 0;

            loop {
                let removed = self
                    .log_repo
                    .delete_older_than(policy.category, cutoff, PURGE_BATCH_SIZE)
                    .await?;
                rows_removed += removed;

                // バッチが埋まらなければ残りはない
                if (removed as usize) < PURGE_BATCH_SIZE {
                    break;
                }
                tokio::time::sleep(PURGE_BATCH_PAUSE).await;
            }

            debug!(
                category = policy.category.as_str(),
                cutoff = %cutoff,
                rows_removed,
                "retention purge for category finished"
            );
            total_removed += rows_removed;
            categories.push(CategorySweep {
                category: policy.category,
                cutoff,
                rows_removed,
            });
        }

        let entry = PrivacyLogBuilder::new(LogCategory::System, PrivacyAction::RetentionSweep)
            .details(json!({
                "total_removed": total_removed,
                "categories": categories
                    .iter()
                    .map(|c| json!({
                        "category": c.category.as_str(),
                        "rows_removed": c.rows_removed,
                    }))
                    .collect::<Vec<_>>(),
            }))
            .build(self.clock.now());
        self.log_repo.insert(entry).await?;

        info!(total_removed, "retention sweep finished");
        Ok(SweepOutcome {
            started_at,
            categories,
            total_removed,
        })
    }

    /// Read-only report of total vs purge-eligible rows per category.
    /// Mutates nothing.
    pub async fn stats(&self) -> PrivacyResult<Vec<CategoryRetentionStats>> {
        let now = self.clock.now();
        let mut stats = Vec::new();

        for policy in self.policy_repo.find_all().await? {
            let total_rows = self.log_repo.count_by_category(policy.category).await?;
            let purgeable_rows = self
                .log_repo
                .count_older_than(policy.category, policy.cutoff(now))
                .await?;
            stats.push(CategoryRetentionStats {
                category: policy.category,
                retention_days: policy.retention_days,
                active: policy.active,
                total_rows,
                purgeable_rows,
            });
        }

        Ok(stats)
    }
}
