//! Withdrawal endpoint integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::json;

fn withdrawals_path(harness: &TestHarness) -> String {
    format!("/v1/accounts/{}/withdrawals", harness.test_account_id)
}

#[tokio::test]
async fn test_first_withdrawal_is_forced_to_fifteen() {
    let harness = TestHarness::new();
    harness.seed_account(300, 0).await;

    let response = harness
        .server
        .post(&withdrawals_path(&harness))
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "amount": 100, "payout_destination": "fan@upi" }))
        .await;

    response.assert_status_ok();
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["success"], true);
    assert_eq!(body["withdrawal"]["amount"], 15);
    assert_eq!(body["withdrawal"]["status"], "pending");
    assert_eq!(body["remaining_points"], 285);
}

#[tokio::test]
async fn test_first_withdrawal_below_minimum() {
    let harness = TestHarness::new();
    harness.seed_account(300, 0).await;

    let response = harness
        .server
        .post(&withdrawals_path(&harness))
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "amount": 10, "payout_destination": "fan@upi" }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["error"]["code"], "validation_failed");
    assert!(body["error"]["message"].as_str().unwrap().contains("15"));
}

#[tokio::test]
async fn test_repeat_withdrawal_below_minimum_cites_200() {
    let harness = TestHarness::new();
    harness.seed_account(1_000, 1).await;

    let response = harness
        .server
        .post(&withdrawals_path(&harness))
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "amount": 150, "payout_destination": "fan@upi" }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.json::<serde_json::Value>();
    assert!(body["error"]["message"].as_str().unwrap().contains("200"));
}

#[tokio::test]
async fn test_repeat_withdrawal_insufficient_points() {
    let harness = TestHarness::new();
    harness.seed_account(120, 1).await;

    let response = harness
        .server
        .post(&withdrawals_path(&harness))
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "amount": 250, "payout_destination": "fan@upi" }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.json::<serde_json::Value>();
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("250"));
    assert!(message.contains("120"));
}

#[tokio::test]
async fn test_repeat_withdrawal_debits_requested_amount() {
    let harness = TestHarness::new();
    harness.seed_account(700, 2).await;

    let response = harness
        .server
        .post(&withdrawals_path(&harness))
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "amount": 250, "payout_destination": "fan@upi" }))
        .await;

    response.assert_status_ok();
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["withdrawal"]["amount"], 250);
    assert_eq!(body["remaining_points"], 450);

    let profile = harness
        .server
        .get("/v1/accounts/me")
        .add_header("authorization", harness.user_auth_header())
        .await
        .json::<serde_json::Value>();
    assert_eq!(profile["account"]["withdrawal_count"], 3);
    assert_eq!(profile["account"]["points"], 450);
}

#[tokio::test]
async fn test_withdrawal_requires_destination() {
    let harness = TestHarness::new();
    harness.seed_account(300, 0).await;

    let response = harness
        .server
        .post(&withdrawals_path(&harness))
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "amount": 15, "payout_destination": "   " }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_withdrawal_for_other_account_is_forbidden() {
    let harness = TestHarness::new();
    harness.seed_account(300, 0).await;

    let response = harness
        .server
        .post(&withdrawals_path(&harness))
        .add_header("authorization", TestHarness::other_user_auth_header())
        .json(&json!({ "amount": 15, "payout_destination": "fan@upi" }))
        .await;

    response.assert_status_forbidden();
}

#[tokio::test]
async fn test_withdrawal_unknown_account_is_not_found() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post(&withdrawals_path(&harness))
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "amount": 15, "payout_destination": "fan@upi" }))
        .await;

    response.assert_status_not_found();
}
