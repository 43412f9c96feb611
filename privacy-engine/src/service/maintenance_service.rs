// src/service/maintenance_service.rs

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::PrivacyResult;
use crate::service::deletion_service::DeletionService;
use crate::service::retention_service::{RetentionService, SweepOutcome};

/// Result of one maintenance tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickSummary {
    pub deletions_due: usize,
    pub deletions_executed: usize,
    pub deletions_failed: usize,
    pub retention: SweepOutcome,
}

/// The externally triggered (cron-like) entry point. One tick drives every
/// deferred step: due deletions first, then the retention sweep. Both are
/// idempotent, so overlapping or repeated ticks are harmless.
#[derive(Clone)]
pub struct MaintenanceService {
    deletion: Arc<DeletionService>,
    retention: Arc<RetentionService>,
}

impl MaintenanceService {
    pub fn new(deletion: Arc<DeletionService>, retention: Arc<RetentionService>) -> Self {
        Self {
            deletion,
            retention,
        }
    }

    pub async fn run_tick(&self) -> PrivacyResult<TickSummary> {
        let due = self.deletion.due_deletions().await?;
        let deletions_due = due.len();
        let mut deletions_executed = 0;
        let mut deletions_failed = 0;

        for request in due {
            match self.deletion.execute_deletion(request.id).await {
                Ok(outcome) => {
                    deletions_executed += 1;
                    info!(
                        request_id = %outcome.request_id,
                        user_id = %outcome.user_id,
                        "scheduled deletion executed"
                    );
                }
                Err(e) => {
                    // 1 件の失敗でティック全体は止めない
                    deletions_failed += 1;
                    warn!(
                        request_id = %request.id,
                        error = %e,
                        "scheduled deletion failed"
                    );
                }
            }
        }

        let retention = self.retention.sweep().await?;

        info!(
            deletions_due,
            deletions_executed,
            deletions_failed,
            rows_purged = retention.total_removed,
            "maintenance tick finished"
        );
        Ok(TickSummary {
            deletions_due,
            deletions_executed,
            deletions_failed,
            retention,
        })
    }
}
