//! Moderation pipeline integration tests.

mod common;

use common::{TestHarness, SERVICE_API_KEY};
use serde_json::json;

#[tokio::test]
async fn test_contribution_approved_credits_points() {
    let harness = TestHarness::new();
    harness.seed_account(0, 0).await;
    harness.seed_badge("First Beat", 1).await;
    harness
        .seed_uploads(Some(harness.test_account_id), 1)
        .await;

    let response = harness
        .server
        .post("/v1/contributions/approved")
        .add_header("x-api-key", SERVICE_API_KEY)
        .json(&json!({ "account_id": harness.test_account_id.to_string() }))
        .await;

    response.assert_status_ok();
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["account"]["points"], 50);
    assert_eq!(body["new_badges"][0]["name"], "First Beat");
}

#[tokio::test]
async fn test_contribution_approved_requires_service_key() {
    let harness = TestHarness::new();
    harness.seed_account(0, 0).await;

    let response = harness
        .server
        .post("/v1/contributions/approved")
        .add_header("x-api-key", "wrong-key")
        .json(&json!({ "account_id": harness.test_account_id.to_string() }))
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_contribution_approved_unknown_account() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/contributions/approved")
        .add_header("x-api-key", SERVICE_API_KEY)
        .json(&json!({ "account_id": harness.test_account_id.to_string() }))
        .await;

    response.assert_status_not_found();
}
