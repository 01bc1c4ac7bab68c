//! Account endpoint integration tests.

mod common;

use common::TestHarness;
use serde_json::json;

#[tokio::test]
async fn test_create_account() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/accounts")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({}))
        .await;

    response.assert_status_ok();
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["success"], true);
    assert_eq!(
        body["account"]["account_id"],
        harness.test_account_id.to_string()
    );
    assert_eq!(body["account"]["points"], 0);
    assert_eq!(body["account"]["level"], 1);
    assert_eq!(body["account"]["points_to_next_level"], 500);
    assert_eq!(body["account"]["email"], "fan@example.com");
}

#[tokio::test]
async fn test_create_account_is_idempotent() {
    let harness = TestHarness::new();
    harness.seed_account(120, 1).await;

    let response = harness
        .server
        .post("/v1/accounts")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "email": "other@example.com" }))
        .await;

    response.assert_status_ok();
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["account"]["points"], 120);
    assert_eq!(body["account"]["withdrawal_count"], 1);
}

#[tokio::test]
async fn test_create_account_unauthorized() {
    let harness = TestHarness::new();

    let response = harness.server.post("/v1/accounts").json(&json!({})).await;

    response.assert_status_unauthorized();
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let harness = TestHarness::new();

    let claims = json!({
        "sub": harness.test_account_id.to_string(),
        "aud": "authenticated",
        "exp": chrono::Utc::now().timestamp() + 3_600,
    });
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(b"not-the-secret"),
    )
    .unwrap();

    let response = harness
        .server
        .get("/v1/accounts/me")
        .add_header("authorization", format!("Bearer {token}"))
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_get_account_not_found() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/accounts/me")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn test_profile_includes_badges_and_withdrawals() {
    let harness = TestHarness::new();
    harness.seed_account(40, 0).await;

    harness
        .server
        .post(&format!(
            "/v1/accounts/{}/withdrawals",
            harness.test_account_id
        ))
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "amount": 15, "payout_destination": "fan@upi" }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get("/v1/accounts/me")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["account"]["points"], 25);
    assert_eq!(body["account"]["payout_destination"], "fan@upi");
    assert_eq!(body["badges"], json!([]));
    assert_eq!(body["withdrawals"].as_array().unwrap().len(), 1);
    assert_eq!(body["withdrawals"][0]["status"], "pending");
}

#[tokio::test]
async fn test_sync_reconciles_points_and_awards_badges() {
    let harness = TestHarness::new();
    harness.seed_account(999, 0).await;
    harness.seed_badge("First Beat", 1).await;
    harness.seed_badge("Rhythm Maker", 10).await;
    harness
        .seed_uploads(Some(harness.test_account_id), 2)
        .await;

    let response = harness
        .server
        .post("/v1/accounts/me/sync")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["corrected"], true);
    assert_eq!(body["account"]["points"], 100);
    assert_eq!(body["account"]["level"], 1);
    assert_eq!(body["new_badges"].as_array().unwrap().len(), 1);
    assert_eq!(body["new_badges"][0]["name"], "First Beat");

    // A second refresh with no new approvals changes nothing.
    let response = harness
        .server
        .post("/v1/accounts/me/sync")
        .add_header("authorization", harness.user_auth_header())
        .await;

    let body = response.json::<serde_json::Value>();
    assert_eq!(body["corrected"], false);
    assert_eq!(body["new_badges"], json!([]));
}

#[tokio::test]
async fn test_first_contribution_bonus_paid_once() {
    let harness = TestHarness::new();
    harness.seed_account(0, 0).await;
    let path = format!(
        "/v1/accounts/{}/first-contribution-bonus",
        harness.test_account_id
    );

    let first = harness
        .server
        .post(&path)
        .add_header("authorization", harness.user_auth_header())
        .await;
    first.assert_status_ok();
    let body = first.json::<serde_json::Value>();
    assert_eq!(body["bonus_given"], true);
    assert_eq!(body["points"], 15);

    let second = harness
        .server
        .post(&path)
        .add_header("authorization", harness.user_auth_header())
        .await;
    second.assert_status_ok();
    let body = second.json::<serde_json::Value>();
    assert_eq!(body["bonus_given"], false);
    assert_eq!(body["points"], 15);
}

#[tokio::test]
async fn test_first_contribution_bonus_for_other_account_is_forbidden() {
    let harness = TestHarness::new();
    harness.seed_account(0, 0).await;

    let response = harness
        .server
        .post(&format!(
            "/v1/accounts/{}/first-contribution-bonus",
            harness.test_account_id
        ))
        .add_header("authorization", TestHarness::other_user_auth_header())
        .await;

    response.assert_status_forbidden();
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["error"]["code"], "forbidden");
}

#[tokio::test]
async fn test_malformed_account_id_is_bad_request() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/accounts/not-a-uuid/first-contribution-bonus")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_bad_request();
}
