// tests/maintenance_tick_tests.rs

mod common;

use chrono::Duration;

use privacy_engine::domain::consent_model::{ConsentMetadata, ConsentType};
use privacy_engine::domain::deletion_request_model::{DeletionState, GRACE_PERIOD_DAYS};
use privacy_engine::domain::export_request_model::ExportStatus;
use privacy_engine::repository::deletion_request_repository::DeletionRequestRepository;
use privacy_engine::repository::user_repository::UserRepository;

#[tokio::test]
async fn test_tick_executes_only_due_deletions() {
    let eng = common::engine();
    eng.retention.ensure_default_policies().await.unwrap();

    let due_user = eng.seed_user("laura@example.com");
    let pending_user = eng.seed_user("carlos@example.com");

    let receipt = eng.deletion.request_deletion(due_user, None).await.unwrap();
    eng.deletion
        .confirm_deletion(due_user, &receipt.token)
        .await
        .unwrap();

    eng.clock.advance(Duration::days(GRACE_PERIOD_DAYS));
    // this one stays PENDING: unconfirmed requests never come due
    eng.deletion
        .request_deletion(pending_user, None)
        .await
        .unwrap();

    let summary = eng.maintenance.run_tick().await.unwrap();
    assert_eq!(summary.deletions_due, 1);
    assert_eq!(summary.deletions_executed, 1);
    assert_eq!(summary.deletions_failed, 0);

    assert!(!eng.store.user_exists(due_user));
    assert!(eng.store.user_exists(pending_user));
}

#[tokio::test]
async fn test_tick_survives_a_failing_deletion() {
    let eng = common::engine();
    eng.retention.ensure_default_policies().await.unwrap();

    let user_id = eng.seed_user("laura@example.com");
    let receipt = eng.deletion.request_deletion(user_id, None).await.unwrap();
    eng.deletion
        .confirm_deletion(user_id, &receipt.token)
        .await
        .unwrap();
    eng.clock.advance(Duration::days(GRACE_PERIOD_DAYS));

    // user row gone out-of-band: the cascade will fail
    eng.store.delete_cascade(user_id).await.unwrap();

    let summary = eng.maintenance.run_tick().await.unwrap();
    assert_eq!(summary.deletions_due, 1);
    assert_eq!(summary.deletions_executed, 0);
    assert_eq!(summary.deletions_failed, 1);

    let stored = DeletionRequestRepository::find_by_id(&*eng.store, receipt.request_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.state, DeletionState::Error);
}

#[tokio::test]
async fn test_end_to_end_account_lifecycle() {
    let eng = common::engine();
    eng.retention.ensure_default_policies().await.unwrap();
    let user_id = eng.seed_user("laura@example.com");

    // day 0: the account consents and pulls its data out
    eng.consent
        .record_consent(
            user_id,
            ConsentType::DataProcessing,
            true,
            "v1",
            ConsentMetadata::default(),
        )
        .await
        .unwrap();
    let export = eng.export.request_export(user_id).await.unwrap();
    eng.export.process_export(export.id).await.unwrap();
    let bundle = eng.export.download(export.id).await.unwrap();
    assert!(!bundle.is_empty());

    // day 1: deletion requested and confirmed
    eng.clock.advance(Duration::days(1));
    let receipt = eng.deletion.request_deletion(user_id, None).await.unwrap();
    eng.deletion
        .confirm_deletion(user_id, &receipt.token)
        .await
        .unwrap();

    // day 15: nothing is due yet, the tick is a no-op for deletions
    eng.clock.advance(Duration::days(14));
    let mid_grace = eng.maintenance.run_tick().await.unwrap();
    assert_eq!(mid_grace.deletions_due, 0);
    assert!(eng.store.user_exists(user_id));

    // day 31: past the grace period, the tick purges the account
    eng.clock.advance(Duration::days(GRACE_PERIOD_DAYS - 14));
    let summary = eng.maintenance.run_tick().await.unwrap();
    assert_eq!(summary.deletions_executed, 1);
    assert!(!eng.store.user_exists(user_id));

    // the export record outlives the account, as expired audit history
    let report = eng.export.status(export.id).await.unwrap();
    assert_eq!(report.status, ExportStatus::Expired);

    // the deletion request record outlives it too
    let stored = DeletionRequestRepository::find_by_id(&*eng.store, receipt.request_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.state, DeletionState::Executed);
}
