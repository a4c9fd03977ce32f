//! Shared test harness for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum_test::{TestServer, TestServerConfig, Transport};

use formcredits_core::UserId;
use formcredits_service::{create_router, AppState, ServiceConfig};
use formcredits_store::MemoryStore;

/// Integration test harness: an in-memory service behind an axum test
/// server, with test-token auth and a known service API key.
pub struct TestHarness {
    pub server: TestServer,
    pub test_user_id: UserId,
    pub service_api_key: String,
    pub webhook_secret: String,
}

impl TestHarness {
    /// Harness without webhook signature verification (development mode).
    pub fn new() -> Self {
        Self::build(false, false, false)
    }

    /// Harness with webhook signature verification enabled.
    pub fn with_webhook_verification() -> Self {
        Self::build(true, false, false)
    }

    /// Harness with a webhook secret configured but no payments client,
    /// as when the processor credentials are missing from a deployment.
    pub fn with_secret_but_no_client() -> Self {
        Self::build(true, true, false)
    }

    /// Harness served over a real HTTP port, which WebSocket tests need.
    pub fn with_http_transport() -> Self {
        Self::build(false, false, true)
    }

    fn build(verify_webhooks: bool, drop_client: bool, http_transport: bool) -> Self {
        let service_api_key = "test-service-key".to_string();
        let webhook_secret = "whsec_test".to_string();

        let mut config = ServiceConfig {
            service_api_key: Some(service_api_key.clone()),
            ..ServiceConfig::default()
        };

        if verify_webhooks {
            // The payments client never makes a request in these tests; it
            // only verifies signatures locally.
            if !drop_client {
                config.payments_api_url = Some("https://payments.invalid".to_string());
                config.payments_api_key = Some("sk_test".to_string());
            }
            config.payments_webhook_secret = Some(webhook_secret.clone());
        }

        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store, config);
        let server = if http_transport {
            let server_config = TestServerConfig {
                transport: Some(Transport::HttpRandomPort),
                ..TestServerConfig::default()
            };
            TestServer::new_with_config(create_router(state), server_config)
        } else {
            TestServer::new(create_router(state))
        }
        .expect("failed to start test server");

        Self {
            server,
            test_user_id: UserId::generate(),
            service_api_key,
            webhook_secret,
        }
    }

    /// Authorization header value for the harness's test user.
    pub fn user_auth_header(&self) -> String {
        format!("Bearer test-token:{}", self.test_user_id)
    }

    /// Authorization header value for an arbitrary user.
    pub fn auth_header_for(&self, user_id: UserId) -> String {
        format!("Bearer test-token:{user_id}")
    }

    /// Create the test user's account (grants the signup bonus).
    pub async fn create_account(&self) {
        self.server
            .post("/v1/accounts")
            .add_header("authorization", self.user_auth_header())
            .await
            .assert_status_ok();
    }

    /// Sign a webhook body the way the payment processor does.
    pub fn sign_webhook(&self, body: &str) -> String {
        let timestamp = chrono::Utc::now().timestamp();
        let signature = formcredits_service::crypto::hmac_sha256_hex(
            &self.webhook_secret,
            &format!("{timestamp}.{body}"),
        );
        format!("t={timestamp},v1={signature}")
    }
}
