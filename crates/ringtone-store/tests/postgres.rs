//! PostgreSQL store integration tests.
//!
//! These tests run against a real PostgreSQL database.
//! Set the `DATABASE_URL` environment variable to a scratch database.
//!
//! Run with: cargo test -p ringtone-store --test postgres -- --ignored

use ringtone_core::{AccountId, AccountPatch, Badge, BadgeId};
use ringtone_store::{AccountStore, AwardStore, BadgeStore, PgStore, StoreError};

async fn connect() -> PgStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let store = PgStore::connect(&url, 2)
        .await
        .expect("Failed to connect to PostgreSQL");
    store.migrate().await.expect("Failed to run migrations");
    store
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
#[ignore] // Run with --ignored flag
async fn pg_stale_version_is_a_conflict() {
    let store = connect().await;
    let id = AccountId::generate();
    let account = store.upsert_account(&id, None).await.unwrap();

    let updated = store
        .update_account(&id, account.version, &AccountPatch::points(520))
        .await
        .unwrap();
    assert_eq!(updated.version, account.version + 1);
    assert_eq!(updated.level, 2);

    let stale = store
        .update_account(&id, account.version, &AccountPatch::points(10))
        .await;
    assert!(matches!(stale, Err(StoreError::VersionConflict { .. })));

    let stored = store.get_account(&id).await.unwrap().unwrap();
    assert_eq!(stored.points, 520);
}

#[tokio::test]
#[ignore] // Run with --ignored flag
async fn pg_update_missing_account_is_not_found() {
    let store = connect().await;

    let result = store
        .update_account(&AccountId::generate(), 0, &AccountPatch::points(1))
        .await;
    assert!(matches!(result, Err(StoreError::NotFound { .. })));
}

// ============================================================================
// Badges
// ============================================================================

#[tokio::test]
#[ignore] // Run with --ignored flag
async fn pg_duplicate_award_is_ignored() {
    let store = connect().await;
    let badge = Badge::upload_count(
        &format!("Test Badge {}", BadgeId::generate()),
        "integration test",
        "*",
        1,
    );
    store.put_badge(&badge).await.unwrap();
    let account = AccountId::generate();
    store.upsert_account(&account, None).await.unwrap();

    assert!(store
        .award_ignoring_conflict(&account, &badge.id)
        .await
        .unwrap());
    assert!(!store
        .award_ignoring_conflict(&account, &badge.id)
        .await
        .unwrap());
    assert_eq!(store.list_awarded(&account).await.unwrap().len(), 1);
}
