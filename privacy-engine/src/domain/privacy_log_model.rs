// src/domain/privacy_log_model.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::retention_policy_model::LogCategory;

// プライバシー監査アクションの定義
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum PrivacyAction {
    // 同意関連
    ConsentGranted,
    ConsentRevoked,
    ConsentStatusChecked,

    // 削除関連
    DeletionRequested,
    DeletionConfirmed,
    DeletionCancelled,
    DeletionExecuted,
    DeletionFailed,

    // エクスポート関連
    ExportRequested,
    ExportCompleted,
    ExportFailed,
    ExportDownloaded,

    // 運用関連
    RetentionSweep,

    // その他
    Custom(String),
}

impl PrivacyAction {
    pub fn as_str(&self) -> &str {
        match self {
            PrivacyAction::ConsentGranted => "consent_granted",
            PrivacyAction::ConsentRevoked => "consent_revoked",
            PrivacyAction::ConsentStatusChecked => "consent_status_checked",
            PrivacyAction::DeletionRequested => "deletion_requested",
            PrivacyAction::DeletionConfirmed => "deletion_confirmed",
            PrivacyAction::DeletionCancelled => "deletion_cancelled",
            PrivacyAction::DeletionExecuted => "deletion_executed",
            PrivacyAction::DeletionFailed => "deletion_failed",
            PrivacyAction::ExportRequested => "export_requested",
            PrivacyAction::ExportCompleted => "export_completed",
            PrivacyAction::ExportFailed => "export_failed",
            PrivacyAction::ExportDownloaded => "export_downloaded",
            PrivacyAction::RetentionSweep => "retention_sweep",
            PrivacyAction::Custom(action) => action,
        }
    }
}

/// One structured entry in the shared privacy audit trail. The user
/// reference is nullable so entries survive the user's removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivacyLogEntry {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub category: LogCategory,
    pub action: String,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

// 監査ログエントリービルダー
pub struct PrivacyLogBuilder {
    user_id: Option<Uuid>,
    category: LogCategory,
    action: PrivacyAction,
    details: Option<serde_json::Value>,
}

impl PrivacyLogBuilder {
    pub fn new(category: LogCategory, action: PrivacyAction) -> Self {
        Self {
            user_id: None,
            category,
            action,
            details: None,
        }
    }

    pub fn user_id(mut self, id: Uuid) -> Self {
        self.user_id = Some(id);
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn build(self, now: DateTime<Utc>) -> PrivacyLogEntry {
        PrivacyLogEntry {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            category: self.category,
            action: self.action.as_str().to_string(),
            details: self.details,
            created_at: now,
        }
    }
}
