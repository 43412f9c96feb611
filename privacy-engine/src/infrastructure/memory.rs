// src/infrastructure/memory.rs
//
// In-memory store adapter. Implements every repository trait behind one
// mutex-guarded state block; used by the test suite and as the reference
// semantics for relational adapters (uniqueness constraint, guarded
// updates, bounded deletes, cascade scope).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::consent_model::ConsentRecord;
use crate::domain::deletion_request_model::{DeletionRequest, DeletionState};
use crate::domain::export_request_model::{ExportRequest, ExportState};
use crate::domain::privacy_log_model::PrivacyLogEntry;
use crate::domain::retention_policy_model::{LogCategory, RetentionPolicy};
use crate::domain::user_model::{User, UserOwnedData};
use crate::repository::consent_repository::ConsentRepository;
use crate::repository::deletion_request_repository::DeletionRequestRepository;
use crate::repository::export_request_repository::ExportRequestRepository;
use crate::repository::privacy_log_repository::PrivacyLogRepository;
use crate::repository::retention_policy_repository::RetentionPolicyRepository;
use crate::repository::user_repository::{DeletedRowsSummary, UserRepository};
use crate::repository::{StorageError, StorageResult};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    owned_data: HashMap<Uuid, UserOwnedData>,
    consents: Vec<ConsentRecord>,
    deletion_requests: HashMap<Uuid, DeletionRequest>,
    export_requests: HashMap<Uuid, ExportRequest>,
    policies: HashMap<LogCategory, RetentionPolicy>,
    logs: Vec<PrivacyLogEntry>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("store lock poisoned")
    }

    /// Seed a user aggregate (no user-management module lives in this crate)
    pub fn insert_user(&self, user: User) {
        let mut state = self.lock();
        state.owned_data.entry(user.id).or_default();
        state.users.insert(user.id, user);
    }

    pub fn set_owned_data(&self, user_id: Uuid, data: UserOwnedData) {
        self.lock().owned_data.insert(user_id, data);
    }

    pub fn user_exists(&self, user_id: Uuid) -> bool {
        self.lock().users.contains_key(&user_id)
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<User>> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn load_owned_data(&self, user_id: Uuid) -> StorageResult<UserOwnedData> {
        Ok(self.lock().owned_data.get(&user_id).cloned().unwrap_or_default())
    }

    async fn delete_cascade(&self, user_id: Uuid) -> StorageResult<DeletedRowsSummary> {
        let mut state = self.lock();
        if state.users.remove(&user_id).is_none() {
            return Err(StorageError::RecordNotFound(format!(
                "user {} not found for cascade delete",
                user_id
            )));
        }

        let owned = state.owned_data.remove(&user_id).unwrap_or_default();

        let consents_before = state.consents.len();
        state.consents.retain(|c| c.user_id != user_id);
        let consent_records = (consents_before - state.consents.len()) as u64;

        // 監査系レコード (privacy log / deletion / export requests) はカスケード対象外

        Ok(DeletedRowsSummary {
            user_deleted: true,
            financial_records: owned.financial_records.len() as u64,
            documents: owned.documents.len() as u64,
            conversations: owned.conversations.len() as u64,
            reminders: owned.reminders.len() as u64,
            consent_records,
        })
    }
}

#[async_trait]
impl ConsentRepository for InMemoryStore {
    async fn insert(&self, record: ConsentRecord) -> StorageResult<ConsentRecord> {
        self.lock().consents.push(record.clone());
        Ok(record)
    }

    async fn find_by_user(&self, user_id: Uuid) -> StorageResult<Vec<ConsentRecord>> {
        let mut records: Vec<ConsentRecord> = self
            .lock()
            .consents
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by_key(|c| c.recorded_at);
        Ok(records)
    }
}

#[async_trait]
impl DeletionRequestRepository for InMemoryStore {
    async fn insert(&self, request: DeletionRequest) -> StorageResult<DeletionRequest> {
        let mut state = self.lock();
        // UNIQUE (user_id) WHERE state NOT IN (terminal states) 相当
        let has_active = state
            .deletion_requests
            .values()
            .any(|r| r.user_id == request.user_id && r.is_active());
        if has_active {
            return Err(StorageError::ConstraintViolation(format!(
                "user {} already has an active deletion request",
                request.user_id
            )));
        }
        state.deletion_requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<DeletionRequest>> {
        Ok(self.lock().deletion_requests.get(&id).cloned())
    }

    async fn find_active_by_user(
        &self,
        user_id: Uuid,
    ) -> StorageResult<Option<DeletionRequest>> {
        Ok(self
            .lock()
            .deletion_requests
            .values()
            .find(|r| r.user_id == user_id && r.is_active())
            .cloned())
    }

    async fn find_due(&self, now: DateTime<Utc>) -> StorageResult<Vec<DeletionRequest>> {
        let mut due: Vec<DeletionRequest> = self
            .lock()
            .deletion_requests
            .values()
            .filter(|r| r.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|r| r.scheduled_execution_at);
        Ok(due)
    }

    async fn update_guarded(
        &self,
        request: &DeletionRequest,
        expected_state: DeletionState,
    ) -> StorageResult<bool> {
        let mut state = self.lock();
        match state.deletion_requests.get_mut(&request.id) {
            Some(stored) if stored.state == expected_state => {
                *stored = request.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(StorageError::RecordNotFound(format!(
                "deletion request {} not found",
                request.id
            ))),
        }
    }
}

#[async_trait]
impl ExportRequestRepository for InMemoryStore {
    async fn insert(&self, request: ExportRequest) -> StorageResult<ExportRequest> {
        self.lock().export_requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<ExportRequest>> {
        Ok(self.lock().export_requests.get(&id).cloned())
    }

    async fn find_by_user(&self, user_id: Uuid) -> StorageResult<Vec<ExportRequest>> {
        let mut requests: Vec<ExportRequest> = self
            .lock()
            .export_requests
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }

    async fn update_guarded(
        &self,
        request: &ExportRequest,
        expected_state: ExportState,
    ) -> StorageResult<bool> {
        let mut state = self.lock();
        match state.export_requests.get_mut(&request.id) {
            Some(stored) if stored.state == expected_state => {
                *stored = request.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(StorageError::RecordNotFound(format!(
                "export request {} not found",
                request.id
            ))),
        }
    }
}

#[async_trait]
impl RetentionPolicyRepository for InMemoryStore {
    async fn find_all(&self) -> StorageResult<Vec<RetentionPolicy>> {
        let mut policies: Vec<RetentionPolicy> = self.lock().policies.values().cloned().collect();
        policies.sort_by_key(|p| p.category.as_str());
        Ok(policies)
    }

    async fn find_active(&self) -> StorageResult<Vec<RetentionPolicy>> {
        let mut policies: Vec<RetentionPolicy> = self
            .lock()
            .policies
            .values()
            .filter(|p| p.active)
            .cloned()
            .collect();
        policies.sort_by_key(|p| p.category.as_str());
        Ok(policies)
    }

    async fn find_by_category(
        &self,
        category: LogCategory,
    ) -> StorageResult<Option<RetentionPolicy>> {
        Ok(self.lock().policies.get(&category).cloned())
    }

    async fn upsert(&self, policy: RetentionPolicy) -> StorageResult<RetentionPolicy> {
        self.lock().policies.insert(policy.category, policy.clone());
        Ok(policy)
    }
}

#[async_trait]
impl PrivacyLogRepository for InMemoryStore {
    async fn insert(&self, entry: PrivacyLogEntry) -> StorageResult<PrivacyLogEntry> {
        self.lock().logs.push(entry.clone());
        Ok(entry)
    }

    async fn find_by_user(&self, user_id: Uuid) -> StorageResult<Vec<PrivacyLogEntry>> {
        let mut entries: Vec<PrivacyLogEntry> = self
            .lock()
            .logs
            .iter()
            .filter(|e| e.user_id == Some(user_id))
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.created_at);
        Ok(entries)
    }

    async fn count_by_category(&self, category: LogCategory) -> StorageResult<u64> {
        Ok(self
            .lock()
            .logs
            .iter()
            .filter(|e| e.category == category)
            .count() as u64)
    }

    async fn count_older_than(
        &self,
        category: LogCategory,
        cutoff: DateTime<Utc>,
    ) -> StorageResult<u64> {
        Ok(self
            .lock()
            .logs
            .iter()
            .filter(|e| e.category == category && e.created_at < cutoff)
            .count() as u64)
    }

    async fn delete_older_than(
        &self,
        category: LogCategory,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> StorageResult<u64> {
        let mut state = self.lock();
        let mut remaining = limit;
        let before = state.logs.len();
        state.logs.retain(|e| {
            if remaining > 0 && e.category == category && e.created_at < cutoff {
                remaining -= 1;
                false
            } else {
                true
            }
        });
        Ok((before - state.logs.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::privacy_log_model::{PrivacyAction, PrivacyLogBuilder};
    use chrono::Duration;

    fn user(id: Uuid) -> User {
        let now = Utc::now();
        User {
            id,
            email: "user@example.com".to_string(),
            display_name: "Test User".to_string(),
            tax_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_active_deletion_uniqueness_constraint() {
        let store = InMemoryStore::new();
        let user_id = Uuid::new_v4();
        let now = Utc::now();

        DeletionRequestRepository::insert(
            &store,
            DeletionRequest::new(user_id, "h1", None, now),
        )
        .await
        .unwrap();

        let second = DeletionRequestRepository::insert(
            &store,
            DeletionRequest::new(user_id, "h2", None, now),
        )
        .await;
        assert!(matches!(second, Err(StorageError::ConstraintViolation(_))));
    }

    #[tokio::test]
    async fn test_guarded_update_refuses_stale_state() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let mut request = DeletionRequestRepository::insert(
            &store,
            DeletionRequest::new(Uuid::new_v4(), "h", None, now),
        )
        .await
        .unwrap();

        request.confirm(now);
        assert!(
            DeletionRequestRepository::update_guarded(&store, &request, DeletionState::Pending)
                .await
                .unwrap()
        );

        // 保存状態はもう PENDING ではない
        let mut stale = request.clone();
        stale.cancel(now);
        assert!(
            !DeletionRequestRepository::update_guarded(&store, &stale, DeletionState::Pending)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_cascade_keeps_audit_rows() {
        let store = InMemoryStore::new();
        let user_id = Uuid::new_v4();
        store.insert_user(user(user_id));

        let entry = PrivacyLogBuilder::new(LogCategory::Deletion, PrivacyAction::DeletionExecuted)
            .user_id(user_id)
            .build(Utc::now());
        PrivacyLogRepository::insert(&store, entry).await.unwrap();

        let summary = store.delete_cascade(user_id).await.unwrap();
        assert!(summary.user_deleted);
        assert!(!store.user_exists(user_id));
        let kept = PrivacyLogRepository::find_by_user(&store, user_id).await.unwrap();
        assert_eq!(kept.len(), 1);
    }

    #[tokio::test]
    async fn test_bounded_delete_respects_limit_and_cutoff() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        for i in 0..5 {
            let entry = PrivacyLogBuilder::new(LogCategory::Access, PrivacyAction::ConsentStatusChecked)
                .build(now - Duration::days(100 + i));
            PrivacyLogRepository::insert(&store, entry).await.unwrap();
        }
        let recent = PrivacyLogBuilder::new(LogCategory::Access, PrivacyAction::ConsentStatusChecked)
            .build(now);
        PrivacyLogRepository::insert(&store, recent).await.unwrap();

        let cutoff = now - Duration::days(90);
        assert_eq!(store.delete_older_than(LogCategory::Access, cutoff, 3).await.unwrap(), 3);
        assert_eq!(store.delete_older_than(LogCategory::Access, cutoff, 3).await.unwrap(), 2);
        assert_eq!(store.count_by_category(LogCategory::Access).await.unwrap(), 1);
    }
}
