// src/domain/export_request_model.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How long an export artifact stays downloadable after creation
pub const EXPORT_TTL_DAYS: i64 = 7;

/// Persisted pipeline states. `Expired` is intentionally absent: it is a
/// read-time view of a completed record, never written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportState {
    Pending,
    Processing,
    Completed,
    Error,
}

impl ExportState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportState::Pending => "pending",
            ExportState::Processing => "processing",
            ExportState::Completed => "completed",
            ExportState::Error => "error",
        }
    }
}

/// Status reported to the data subject, including the derived expiry view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    Pending,
    Processing,
    Completed,
    Expired,
    Error,
}

/// Data-portability request. The artifact expires; the record persists as
/// audit history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub state: ExportState,
    pub artifact_location: Option<String>,
    pub artifact_size: Option<u64>,
    pub artifact_expires_at: Option<DateTime<Utc>>,
    pub error_detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExportRequest {
    pub fn new(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            state: ExportState::Pending,
            artifact_location: None,
            artifact_size: None,
            artifact_expires_at: None,
            error_detail: None,
            created_at: now,
            completed_at: None,
        }
    }

    pub fn mark_processing(&mut self) {
        self.state = ExportState::Processing;
    }

    pub fn mark_completed(
        &mut self,
        location: impl Into<String>,
        size: u64,
        now: DateTime<Utc>,
    ) {
        self.state = ExportState::Completed;
        self.artifact_location = Some(location.into());
        self.artifact_size = Some(size);
        self.artifact_expires_at = Some(now + Duration::days(EXPORT_TTL_DAYS));
        self.completed_at = Some(now);
    }

    pub fn mark_error(&mut self, detail: impl Into<String>) {
        self.state = ExportState::Error;
        self.error_detail = Some(detail.into());
        // 無効なアーティファクトを参照しない
        self.artifact_location = None;
        self.artifact_size = None;
        self.artifact_expires_at = None;
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.state == ExportState::Completed
            && self
                .artifact_expires_at
                .map(|expires| expires <= now)
                .unwrap_or(false)
    }

    /// Derived status at a point in time; never mutates the stored state
    pub fn status_at(&self, now: DateTime<Utc>) -> ExportStatus {
        match self.state {
            ExportState::Pending => ExportStatus::Pending,
            ExportState::Processing => ExportStatus::Processing,
            ExportState::Completed if self.is_expired(now) => ExportStatus::Expired,
            ExportState::Completed => ExportStatus::Completed,
            ExportState::Error => ExportStatus::Error,
        }
    }
}
