// src/service/notification_service.rs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::PrivacyResult;

/// Outbound notification templates used by the lifecycle workflows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTemplate {
    DeletionRequested,
    DeletionCancelled,
    DeletionExecuted,
    ExportReady,
}

impl NotificationTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationTemplate::DeletionRequested => "deletion_requested",
            NotificationTemplate::DeletionCancelled => "deletion_cancelled",
            NotificationTemplate::DeletionExecuted => "deletion_executed",
            NotificationTemplate::ExportReady => "export_ready",
        }
    }
}

/// Delivery channel for user-facing notices. Consumed here, implemented by
/// the mail/push layer elsewhere. Delivery failures must never roll back the
/// state transition that triggered the notice.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        user_id: Uuid,
        template: NotificationTemplate,
        payload: serde_json::Value,
    ) -> PrivacyResult<()>;
}

/// Development-mode notifier: writes the notice to the log instead of
/// delivering it.
#[derive(Debug, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify(
        &self,
        user_id: Uuid,
        template: NotificationTemplate,
        payload: serde_json::Value,
    ) -> PrivacyResult<()> {
        info!(
            user_id = %user_id,
            template = template.as_str(),
            payload = %payload,
            "notification (development mode, not delivered)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_logging_notifier_always_succeeds() {
        let notifier = LoggingNotifier;
        let result = notifier
            .notify(
                Uuid::new_v4(),
                NotificationTemplate::ExportReady,
                json!({ "expires_in_days": 7 }),
            )
            .await;
        assert!(result.is_ok());
    }
}
