//! Consumption endpoint integration tests.

mod common;

use common::TestHarness;
use serde_json::json;

#[tokio::test]
async fn manual_form_costs_one_credit() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let response = harness
        .server
        .post("/v1/usage")
        .add_header("x-api-key", &harness.service_api_key)
        .add_header("x-service-name", "forms-backend")
        .json(&json!({
            "user_id": harness.test_user_id.to_string(),
            "method": "manual",
            "form_id": "form_123",
            "form_title": "Customer Survey"
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["cost"], 1);
    assert_eq!(body["balance"], 4);
    assert!(!body["transaction_id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn ai_form_costs_two_credits() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let response = harness
        .server
        .post("/v1/usage")
        .add_header("x-api-key", &harness.service_api_key)
        .json(&json!({
            "user_id": harness.test_user_id.to_string(),
            "method": "ai",
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["cost"], 2);
    assert_eq!(body["balance"], 3);
}

#[tokio::test]
async fn usage_requires_service_key() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let response = harness
        .server
        .post("/v1/usage")
        .json(&json!({
            "user_id": harness.test_user_id.to_string(),
            "method": "manual",
        }))
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn usage_with_wrong_key_is_rejected() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let response = harness
        .server
        .post("/v1/usage")
        .add_header("x-api-key", "wrong-key")
        .json(&json!({
            "user_id": harness.test_user_id.to_string(),
            "method": "manual",
        }))
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn insufficient_credits_returns_402_with_details() {
    let harness = TestHarness::new();
    harness.create_account().await;

    // Drain the signup bonus: 5 credits, two AI forms cost 4.
    for _ in 0..2 {
        harness
            .server
            .post("/v1/usage")
            .add_header("x-api-key", &harness.service_api_key)
            .json(&json!({
                "user_id": harness.test_user_id.to_string(),
                "method": "ai",
            }))
            .await
            .assert_status_ok();
    }

    // One credit left; an AI form needs two.
    let response = harness
        .server
        .post("/v1/usage")
        .add_header("x-api-key", &harness.service_api_key)
        .json(&json!({
            "user_id": harness.test_user_id.to_string(),
            "method": "ai",
        }))
        .await;

    assert_eq!(response.status_code().as_u16(), 402);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "insufficient_credits");
    assert_eq!(body["error"]["details"]["balance"], 1);
    assert_eq!(body["error"]["details"]["requested"], 2);

    // The failed debit must not have touched the balance.
    let response = harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", harness.user_auth_header())
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["balance"], 1);
}

#[tokio::test]
async fn usage_for_unknown_account_is_not_found() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/usage")
        .add_header("x-api-key", &harness.service_api_key)
        .json(&json!({
            "user_id": harness.test_user_id.to_string(),
            "method": "manual",
        }))
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn check_balance_is_advisory() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let response = harness
        .server
        .post("/v1/usage/check")
        .add_header("x-api-key", &harness.service_api_key)
        .json(&json!({
            "user_id": harness.test_user_id.to_string(),
            "method": "ai",
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["sufficient"], true);
    assert_eq!(body["balance"], 5);
    assert_eq!(body["required"], 2);
}

#[tokio::test]
async fn check_balance_reports_insufficient() {
    let harness = TestHarness::new();
    harness.create_account().await;

    // Drain to 1 credit.
    for _ in 0..2 {
        harness
            .server
            .post("/v1/usage")
            .add_header("x-api-key", &harness.service_api_key)
            .json(&json!({
                "user_id": harness.test_user_id.to_string(),
                "method": "ai",
            }))
            .await
            .assert_status_ok();
    }

    let response = harness
        .server
        .post("/v1/usage/check")
        .add_header("x-api-key", &harness.service_api_key)
        .json(&json!({
            "user_id": harness.test_user_id.to_string(),
            "method": "ai",
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["sufficient"], false);
    assert_eq!(body["balance"], 1);
}
