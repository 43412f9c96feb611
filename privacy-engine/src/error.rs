// src/error.rs

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::repository::StorageError;

#[derive(Error, Debug)]
pub enum PrivacyError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("An active deletion request already exists for this user")]
    DuplicateActiveRequest,

    #[error("Confirmation token is invalid")]
    InvalidToken,

    #[error("No active deletion request exists for this user")]
    NoActiveRequest,

    #[error("Deletion request is not in its grace period")]
    NotInGracePeriod,

    #[error("Grace period has not elapsed; execution is scheduled for {scheduled_for}")]
    GracePeriodNotElapsed { scheduled_for: DateTime<Utc> },

    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("External service error: {0}")]
    ExternalService(String),
}

impl PrivacyError {
    /// Stable machine-readable code surfaced alongside the human-readable message
    pub fn error_code(&self) -> &'static str {
        match self {
            PrivacyError::Configuration(_) => "configuration_error",
            PrivacyError::Integrity(_) => "integrity_error",
            PrivacyError::DuplicateActiveRequest => "duplicate_active_request",
            PrivacyError::InvalidToken => "invalid_token",
            PrivacyError::NoActiveRequest => "no_active_request",
            PrivacyError::NotInGracePeriod => "not_in_grace_period",
            PrivacyError::GracePeriodNotElapsed { .. } => "grace_period_not_elapsed",
            PrivacyError::NotFound(_) => "not_found",
            PrivacyError::Storage(_) => "storage_error",
            PrivacyError::ExternalService(_) => "external_service_error",
        }
    }

    /// State-guard violations are user-actionable and must never be retried
    /// automatically
    pub fn is_guard_violation(&self) -> bool {
        matches!(
            self,
            PrivacyError::DuplicateActiveRequest
                | PrivacyError::InvalidToken
                | PrivacyError::NoActiveRequest
                | PrivacyError::NotInGracePeriod
                | PrivacyError::GracePeriodNotElapsed { .. }
        )
    }
}

// Result 型のエイリアス
pub type PrivacyResult<T> = Result<T, PrivacyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(
            PrivacyError::DuplicateActiveRequest.error_code(),
            "duplicate_active_request"
        );
        assert_eq!(PrivacyError::InvalidToken.error_code(), "invalid_token");
        assert_eq!(
            PrivacyError::GracePeriodNotElapsed {
                scheduled_for: Utc::now()
            }
            .error_code(),
            "grace_period_not_elapsed"
        );
    }

    #[test]
    fn test_guard_violation_classification() {
        assert!(PrivacyError::NoActiveRequest.is_guard_violation());
        assert!(PrivacyError::NotInGracePeriod.is_guard_violation());
        assert!(!PrivacyError::Configuration("bad key".to_string()).is_guard_violation());
        assert!(!PrivacyError::Integrity("tag mismatch".to_string()).is_guard_violation());
    }
}
