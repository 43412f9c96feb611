// src/domain/deletion_request_model.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mandatory waiting interval between confirming a deletion and its
/// irreversible execution. A fixed system constant, not user-configurable.
pub const GRACE_PERIOD_DAYS: i64 = 30;

/// Account-deletion workflow states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionState {
    Pending,
    InGracePeriod,
    Executed,
    Cancelled,
    Error,
}

impl DeletionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeletionState::Pending => "pending",
            DeletionState::InGracePeriod => "in_grace_period",
            DeletionState::Executed => "executed",
            DeletionState::Cancelled => "cancelled",
            DeletionState::Error => "error",
        }
    }

    /// Terminal states allow a brand-new request for the same user
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeletionState::Executed | DeletionState::Cancelled | DeletionState::Error
        )
    }
}

/// One deletion request per user may be non-terminal at any time. The record
/// is never deleted; it remains as audit trail after the user is purged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub state: DeletionState,
    /// SHA-256 of the confirmation token. The raw token is never stored.
    pub token_hash: String,
    pub reason: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub scheduled_execution_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub executed_at: Option<DateTime<Utc>>,
    pub error_detail: Option<String>,
}

impl DeletionRequest {
    pub fn new(
        user_id: Uuid,
        token_hash: impl Into<String>,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            state: DeletionState::Pending,
            token_hash: token_hash.into(),
            reason,
            requested_at: now,
            confirmed_at: None,
            scheduled_execution_at: None,
            cancelled_at: None,
            executed_at: None,
            error_detail: None,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.state.is_terminal()
    }

    /// PENDING -> IN_GRACE_PERIOD, stamping the mandatory execution schedule
    pub fn confirm(&mut self, now: DateTime<Utc>) {
        self.state = DeletionState::InGracePeriod;
        self.confirmed_at = Some(now);
        self.scheduled_execution_at = Some(now + Duration::days(GRACE_PERIOD_DAYS));
    }

    /// PENDING | IN_GRACE_PERIOD -> CANCELLED
    pub fn cancel(&mut self, now: DateTime<Utc>) {
        self.state = DeletionState::Cancelled;
        self.cancelled_at = Some(now);
    }

    /// IN_GRACE_PERIOD -> EXECUTED
    pub fn mark_executed(&mut self, now: DateTime<Utc>) {
        self.state = DeletionState::Executed;
        self.executed_at = Some(now);
    }

    /// Any state -> ERROR; re-driveable only by operator intervention
    pub fn mark_error(&mut self, detail: impl Into<String>) {
        self.state = DeletionState::Error;
        self.error_detail = Some(detail.into());
    }

    /// True once the grace period has elapsed and execution is allowed
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.state == DeletionState::InGracePeriod
            && self
                .scheduled_execution_at
                .map(|scheduled| scheduled <= now)
                .unwrap_or(false)
    }
}
