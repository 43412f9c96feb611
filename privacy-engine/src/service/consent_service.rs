// src/service/consent_service.rs

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::domain::consent_model::{ConsentMetadata, ConsentRecord, ConsentStatus, ConsentType};
use crate::domain::privacy_log_model::{PrivacyAction, PrivacyLogBuilder};
use crate::domain::retention_policy_model::LogCategory;
use crate::error::PrivacyResult;
use crate::repository::consent_repository::ConsentRepository;
use crate::repository::privacy_log_repository::PrivacyLogRepository;
use crate::utils::clock::Clock;

/// Append-only consent ledger. Has no business-rule rejections of its own;
/// only storage failures can surface here.
#[derive(Clone)]
pub struct ConsentService {
    consent_repo: Arc<dyn ConsentRepository>,
    log_repo: Arc<dyn PrivacyLogRepository>,
    clock: Arc<dyn Clock>,
}

impl ConsentService {
    pub fn new(
        consent_repo: Arc<dyn ConsentRepository>,
        log_repo: Arc<dyn PrivacyLogRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            consent_repo,
            log_repo,
            clock,
        }
    }

    /// Record a grant or revocation. Always inserts; history is never
    /// rewritten.
    pub async fn record_consent(
        &self,
        user_id: Uuid,
        consent_type: ConsentType,
        granted: bool,
        policy_version: &str,
        metadata: ConsentMetadata,
    ) -> PrivacyResult<ConsentRecord> {
        let now = self.clock.now();
        let record = ConsentRecord::new(
            user_id,
            consent_type,
            granted,
            policy_version,
            metadata,
            now,
        );
        let record = self.consent_repo.insert(record).await?;

        let action = if granted {
            PrivacyAction::ConsentGranted
        } else {
            PrivacyAction::ConsentRevoked
        };
        let entry = PrivacyLogBuilder::new(LogCategory::Consent, action)
            .user_id(user_id)
            .details(json!({
                "consent_type": consent_type.as_str(),
                "policy_version": policy_version,
            }))
            .build(now);
        self.log_repo.insert(entry).await?;

        info!(
            user_id = %user_id,
            consent_type = consent_type.as_str(),
            granted,
            "consent recorded"
        );
        Ok(record)
    }

    /// Current posture: the latest ledger record per consent type
    pub async fn current_consents(&self, user_id: Uuid) -> PrivacyResult<Vec<ConsentStatus>> {
        let statuses = self.reduce_ledger(user_id).await?;
        self.log_status_check(user_id).await?;

        let mut result: Vec<ConsentStatus> = statuses.into_values().collect();
        result.sort_by_key(|s| s.consent_type.as_str());
        Ok(result)
    }

    /// Required consent types the user has not currently granted
    pub async fn missing_required_consents(
        &self,
        user_id: Uuid,
    ) -> PrivacyResult<Vec<ConsentType>> {
        let statuses = self.reduce_ledger(user_id).await?;
        self.log_status_check(user_id).await?;

        let missing = ConsentType::required()
            .into_iter()
            .filter(|required| {
                statuses
                    .get(required)
                    .map(|status| !status.granted)
                    .unwrap_or(true)
            })
            .collect();
        Ok(missing)
    }

    /// Whether the user's consent posture is complete
    pub async fn has_complete_consents(&self, user_id: Uuid) -> PrivacyResult<bool> {
        Ok(self.missing_required_consents(user_id).await?.is_empty())
    }

    async fn reduce_ledger(
        &self,
        user_id: Uuid,
    ) -> PrivacyResult<HashMap<ConsentType, ConsentStatus>> {
        let records = self.consent_repo.find_by_user(user_id).await?;
        // recorded_at 昇順なので最後の insert が現在状態になる
        let mut latest: HashMap<ConsentType, ConsentStatus> = HashMap::new();
        for record in &records {
            latest.insert(record.consent_type, ConsentStatus::from(record));
        }
        Ok(latest)
    }

    async fn log_status_check(&self, user_id: Uuid) -> PrivacyResult<()> {
        let entry = PrivacyLogBuilder::new(LogCategory::Access, PrivacyAction::ConsentStatusChecked)
            .user_id(user_id)
            .build(self.clock.now());
        self.log_repo.insert(entry).await?;
        Ok(())
    }
}
