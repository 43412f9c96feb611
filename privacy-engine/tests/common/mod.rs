// tests/common/mod.rs
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use privacy_engine::config::PrivacyConfig;
use privacy_engine::utils::clock::Clock;
use privacy_engine::domain::user_model::{
    Conversation, Document, FinancialRecord, Reminder, User, UserOwnedData,
};
use privacy_engine::infrastructure::memory::InMemoryStore;
use privacy_engine::service::consent_service::ConsentService;
use privacy_engine::service::deletion_service::DeletionService;
use privacy_engine::service::encryption_service::EncryptionService;
use privacy_engine::service::export_service::{ExportService, ExportWorker};
use privacy_engine::service::maintenance_service::MaintenanceService;
use privacy_engine::service::notification_service::{LoggingNotifier, Notifier};
use privacy_engine::service::retention_service::RetentionService;
use privacy_engine::service::storage_service::InMemoryArtifactStorage;
use privacy_engine::utils::clock::ManualClock;

/// Fixed test epoch so assertions on schedules are exact
pub fn test_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap()
}

pub struct TestEngine {
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<ManualClock>,
    pub artifacts: Arc<InMemoryArtifactStorage>,
    pub encryption: Arc<EncryptionService>,
    pub consent: ConsentService,
    pub deletion: Arc<DeletionService>,
    pub export: Arc<ExportService>,
    pub export_worker: Option<ExportWorker>,
    pub retention: Arc<RetentionService>,
    pub maintenance: MaintenanceService,
}

pub fn engine() -> TestEngine {
    let config = PrivacyConfig::for_testing();
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(ManualClock::new(test_epoch()));
    let artifacts = Arc::new(InMemoryArtifactStorage::new());
    let encryption = Arc::new(EncryptionService::new(&config.encryption_key));
    let notifier: Arc<dyn Notifier> = Arc::new(LoggingNotifier);

    let consent = ConsentService::new(store.clone(), store.clone(), clock.clone());
    let deletion = Arc::new(DeletionService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        notifier.clone(),
        clock.clone(),
    ));
    let (export, export_worker) = ExportService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        artifacts.clone(),
        encryption.clone(),
        notifier.clone(),
        clock.clone(),
        config.export_queue_capacity,
    );
    let retention = Arc::new(RetentionService::new(
        store.clone(),
        store.clone(),
        clock.clone(),
    ));
    let maintenance = MaintenanceService::new(deletion.clone(), retention.clone());

    TestEngine {
        store,
        clock,
        artifacts,
        encryption,
        consent,
        deletion,
        export,
        export_worker: Some(export_worker),
        retention,
        maintenance,
    }
}

impl TestEngine {
    /// Seed a user whose sensitive attributes are encrypted at rest, with a
    /// small set of owned records.
    pub fn seed_user(&self, email: &str) -> Uuid {
        let now = self.clock.now();
        let user_id = Uuid::new_v4();

        let encrypted_email = self
            .encryption
            .encrypt(Some(email))
            .expect("encrypt email")
            .expect("email is Some");
        let encrypted_tax_id = self
            .encryption
            .encrypt(Some("900123456-7"))
            .expect("encrypt tax id");

        self.store.insert_user(User {
            id: user_id,
            email: encrypted_email,
            display_name: "Laura Gómez".to_string(),
            tax_id: encrypted_tax_id,
            created_at: now,
            updated_at: now,
        });
        self.store.set_owned_data(user_id, sample_owned_data(user_id, now));
        user_id
    }
}

pub fn sample_owned_data(user_id: Uuid, now: DateTime<Utc>) -> UserOwnedData {
    UserOwnedData {
        financial_records: vec![
            FinancialRecord {
                id: Uuid::new_v4(),
                user_id,
                description: "Invoice #2026-041".to_string(),
                amount_cents: 3_450_000,
                currency: "COP".to_string(),
                occurred_at: now - Duration::days(14),
                created_at: now - Duration::days(14),
            },
            FinancialRecord {
                id: Uuid::new_v4(),
                user_id,
                description: "Software subscription".to_string(),
                amount_cents: -89_000,
                currency: "COP".to_string(),
                occurred_at: now - Duration::days(7),
                created_at: now - Duration::days(7),
            },
        ],
        documents: vec![Document {
            id: Uuid::new_v4(),
            user_id,
            file_name: "rut-certificate.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            size_bytes: 182_044,
            created_at: now - Duration::days(30),
        }],
        conversations: vec![Conversation {
            id: Uuid::new_v4(),
            user_id,
            title: "Quarterly tax questions".to_string(),
            message_count: 18,
            created_at: now - Duration::days(3),
        }],
        reminders: vec![Reminder {
            id: Uuid::new_v4(),
            user_id,
            note: "File bimonthly VAT return".to_string(),
            remind_at: now + Duration::days(10),
            created_at: now - Duration::days(1),
        }],
    }
}
