// src/domain/consent_model.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User consent types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentType {
    DataProcessing,
    Marketing,
    Analytics,
    ThirdPartySharing,
}

// Conversion implementations for ConsentType
impl From<ConsentType> for String {
    fn from(consent_type: ConsentType) -> Self {
        consent_type.as_str().to_string()
    }
}

impl TryFrom<String> for ConsentType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "data_processing" => Ok(ConsentType::DataProcessing),
            "marketing" => Ok(ConsentType::Marketing),
            "analytics" => Ok(ConsentType::Analytics),
            "third_party_sharing" => Ok(ConsentType::ThirdPartySharing),
            _ => Err(format!("Invalid consent type: {}", value)),
        }
    }
}

impl ConsentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentType::DataProcessing => "data_processing",
            ConsentType::Marketing => "marketing",
            ConsentType::Analytics => "analytics",
            ConsentType::ThirdPartySharing => "third_party_sharing",
        }
    }

    pub fn all() -> [ConsentType; 4] {
        [
            ConsentType::DataProcessing,
            ConsentType::Marketing,
            ConsentType::Analytics,
            ConsentType::ThirdPartySharing,
        ]
    }

    /// Consent types that every account must have granted
    pub fn required() -> Vec<ConsentType> {
        Self::all().into_iter().filter(|c| c.is_required()).collect()
    }

    /// Get display name for consent type
    pub fn display_name(&self) -> &'static str {
        match self {
            ConsentType::DataProcessing => "Essential Data Processing",
            ConsentType::Marketing => "Marketing Communications",
            ConsentType::Analytics => "Analytics and Performance",
            ConsentType::ThirdPartySharing => "Third-Party Data Sharing",
        }
    }

    /// Check if consent is required
    pub fn is_required(&self) -> bool {
        matches!(self, ConsentType::DataProcessing)
    }
}

/// Optional request metadata captured alongside a consent decision
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsentMetadata {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// One row of the append-only consent ledger. Revocation is a new record
/// with `granted = false`, never a mutation of history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub consent_type: ConsentType,
    pub granted: bool,
    pub policy_version: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl ConsentRecord {
    pub fn new(
        user_id: Uuid,
        consent_type: ConsentType,
        granted: bool,
        policy_version: impl Into<String>,
        metadata: ConsentMetadata,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            consent_type,
            granted,
            policy_version: policy_version.into(),
            ip_address: metadata.ip_address,
            user_agent: metadata.user_agent,
            recorded_at: now,
        }
    }
}

/// Current consent posture for one type, reduced from the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentStatus {
    pub consent_type: ConsentType,
    pub granted: bool,
    pub policy_version: String,
    pub recorded_at: DateTime<Utc>,
}

impl From<&ConsentRecord> for ConsentStatus {
    fn from(record: &ConsentRecord) -> Self {
        Self {
            consent_type: record.consent_type,
            granted: record.granted,
            policy_version: record.policy_version.clone(),
            recorded_at: record.recorded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consent_creation() {
        let user_id = Uuid::new_v4();
        let consent = ConsentRecord::new(
            user_id,
            ConsentType::Marketing,
            true,
            "v2",
            ConsentMetadata {
                ip_address: Some("192.168.1.1".to_string()),
                user_agent: Some("Mozilla/5.0".to_string()),
            },
            Utc::now(),
        );

        assert_eq!(consent.user_id, user_id);
        assert_eq!(consent.consent_type, ConsentType::Marketing);
        assert!(consent.granted);
        assert_eq!(consent.policy_version, "v2");
    }

    #[test]
    fn test_consent_type_round_trip() {
        for consent_type in ConsentType::all() {
            let as_string: String = consent_type.into();
            let parsed = ConsentType::try_from(as_string).unwrap();
            assert_eq!(parsed, consent_type);
        }
        assert!(ConsentType::try_from("bogus".to_string()).is_err());
    }

    #[test]
    fn test_consent_type_properties() {
        assert!(ConsentType::DataProcessing.is_required());
        assert!(!ConsentType::Marketing.is_required());
        assert!(!ConsentType::Analytics.is_required());
        assert!(!ConsentType::ThirdPartySharing.is_required());

        assert_eq!(ConsentType::required(), vec![ConsentType::DataProcessing]);
        assert_eq!(
            ConsentType::Marketing.display_name(),
            "Marketing Communications"
        );
    }
}
