//! Health endpoint integration tests.

mod common;

use common::TestHarness;

#[tokio::test]
async fn test_health() {
    let harness = TestHarness::new();

    let response = harness.server.get("/health").await;

    response.assert_status_ok();
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "ringtone-rewards");
    assert_eq!(body["cache"]["hits"], 0);
    assert_eq!(body["cache"]["degraded"], 0);
}
