//! Catalog endpoint integration tests.

mod common;

use common::TestHarness;

#[tokio::test]
async fn test_list_ringtones_trending() {
    let harness = TestHarness::new();
    harness.seed_ringtone("kesariya", 10).await;
    harness.seed_ringtone("tum-hi-ho", 90).await;

    let response = harness.server.get("/v1/ringtones").await;

    response.assert_status_ok();
    let body = response.json::<serde_json::Value>();
    let ringtones = body["ringtones"].as_array().unwrap();
    assert_eq!(ringtones.len(), 2);
    assert_eq!(ringtones[0]["slug"], "tum-hi-ho");
}

#[tokio::test]
async fn test_listing_is_served_from_cache() {
    let harness = TestHarness::new();
    harness.seed_ringtone("kesariya", 10).await;

    let first = harness.server.get("/v1/ringtones?limit=5").await;
    first.assert_status_ok();

    harness.seed_ringtone("tum-hi-ho", 90).await;

    let second = harness.server.get("/v1/ringtones?limit=5").await;
    let body = second.json::<serde_json::Value>();
    assert_eq!(body["ringtones"].as_array().unwrap().len(), 1);

    // A different query is a different key.
    let other = harness.server.get("/v1/ringtones?limit=6").await;
    let body = other.json::<serde_json::Value>();
    assert_eq!(body["ringtones"].as_array().unwrap().len(), 2);

    let health = harness
        .server
        .get("/health")
        .await
        .json::<serde_json::Value>();
    assert_eq!(health["cache"]["hits"], 1);
    assert_eq!(health["cache"]["misses"], 2);
}

#[tokio::test]
async fn test_get_ringtone_by_slug() {
    let harness = TestHarness::new();
    harness.seed_ringtone("kesariya", 10).await;

    let response = harness.server.get("/v1/ringtones/Kesariya").await;

    response.assert_status_ok();
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["ringtone"]["slug"], "kesariya");
    assert_eq!(body["ringtone"]["downloads"], 10);
}

#[tokio::test]
async fn test_get_ringtone_not_found() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/ringtones/missing").await;

    response.assert_status_not_found();
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["success"], false);

    // Absent slugs are not cached, so a later upload becomes visible.
    harness.seed_ringtone("missing", 1).await;
    harness
        .server
        .get("/v1/ringtones/missing")
        .await
        .assert_status_ok();
}
