// src/domain/retention_policy_model.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Categories of audit/privacy-log records, each governed by its own
/// retention policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    Consent,
    Deletion,
    Export,
    Access,
    Security,
    System,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Consent => "consent",
            LogCategory::Deletion => "deletion",
            LogCategory::Export => "export",
            LogCategory::Access => "access",
            LogCategory::Security => "security",
            LogCategory::System => "system",
        }
    }

    pub fn all() -> [LogCategory; 6] {
        [
            LogCategory::Consent,
            LogCategory::Deletion,
            LogCategory::Export,
            LogCategory::Access,
            LogCategory::Security,
            LogCategory::System,
        ]
    }
}

impl TryFrom<String> for LogCategory {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "consent" => Ok(LogCategory::Consent),
            "deletion" => Ok(LogCategory::Deletion),
            "export" => Ok(LogCategory::Export),
            "access" => Ok(LogCategory::Access),
            "security" => Ok(LogCategory::Security),
            "system" => Ok(LogCategory::System),
            _ => Err(format!("Invalid log category: {}", value)),
        }
    }
}

/// Per-category rule stating how long records may be kept before mandatory
/// purge. Seeded once, editable by an administrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub category: LogCategory,
    pub retention_days: i64,
    pub description: String,
    pub legal_basis: Option<String>,
    pub active: bool,
}

impl RetentionPolicy {
    /// Records strictly older than this cutoff are eligible for purge
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.retention_days)
    }
}

/// Default policy table, seeded on first start
pub fn default_policies() -> Vec<RetentionPolicy> {
    vec![
        RetentionPolicy {
            category: LogCategory::Consent,
            retention_days: 1825,
            description: "Consent decisions kept five years for dispute resolution".to_string(),
            legal_basis: Some("Legal obligation".to_string()),
            active: true,
        },
        RetentionPolicy {
            category: LogCategory::Deletion,
            retention_days: 3650,
            description: "Proof of erasure kept ten years".to_string(),
            legal_basis: Some("Legal obligation".to_string()),
            active: true,
        },
        RetentionPolicy {
            category: LogCategory::Export,
            retention_days: 365,
            description: "Portability request history kept one year".to_string(),
            legal_basis: Some("Legitimate interest".to_string()),
            active: true,
        },
        RetentionPolicy {
            category: LogCategory::Access,
            retention_days: 90,
            description: "Read-access trail kept ninety days".to_string(),
            legal_basis: None,
            active: true,
        },
        RetentionPolicy {
            category: LogCategory::Security,
            retention_days: 365,
            description: "Security events kept one year".to_string(),
            legal_basis: Some("Legitimate interest".to_string()),
            active: true,
        },
        RetentionPolicy {
            category: LogCategory::System,
            retention_days: 180,
            description: "Operational records kept six months".to_string(),
            legal_basis: None,
            active: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cutoff_subtracts_retention_window() {
        let policy = RetentionPolicy {
            category: LogCategory::Access,
            retention_days: 90,
            description: String::new(),
            legal_basis: None,
            active: true,
        };
        let now = Utc::now();
        assert_eq!(policy.cutoff(now), now - Duration::days(90));
    }

    #[test]
    fn test_default_policies_cover_every_category() {
        let policies = default_policies();
        for category in LogCategory::all() {
            assert!(
                policies.iter().any(|p| p.category == category),
                "missing default policy for {}",
                category.as_str()
            );
        }
    }

    #[test]
    fn test_category_round_trip() {
        for category in LogCategory::all() {
            let parsed = LogCategory::try_from(category.as_str().to_string()).unwrap();
            assert_eq!(parsed, category);
        }
    }
}
