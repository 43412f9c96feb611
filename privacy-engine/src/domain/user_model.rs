// src/domain/user_model.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The data subject. `email` and `tax_id` are stored as encryption
/// envelopes at rest; everything the user owns hangs off this aggregate and
/// is destroyed only by the deletion workflow's terminal step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub tax_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Bookkeeping entry owned by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub description: String,
    pub amount_cents: i64,
    pub currency: String,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Uploaded document metadata owned by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// Assistant conversation summary owned by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message_count: u64,
    pub created_at: DateTime<Utc>,
}

/// Scheduled reminder owned by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub note: String,
    pub remind_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Snapshot of every collection owned by one user, as gathered for export
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserOwnedData {
    pub financial_records: Vec<FinancialRecord>,
    pub documents: Vec<Document>,
    pub conversations: Vec<Conversation>,
    pub reminders: Vec<Reminder>,
}

impl UserOwnedData {
    pub fn record_count(&self) -> usize {
        self.financial_records.len()
            + self.documents.len()
            + self.conversations.len()
            + self.reminders.len()
    }
}
