//! Payment processor client.
//!
//! A thin HTTP client for the hosted-checkout payment processor. The
//! processor's own protocol stays behind this boundary: the rest of the
//! service only sees checkout sessions and verified webhook payloads.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::{constant_time_eq, hmac_sha256_hex};

/// Timeout for payment API requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum accepted age of a webhook signature timestamp, in seconds.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Payment processor errors.
#[derive(Debug, thiserror::Error)]
pub enum PaymentsError {
    /// HTTP transport failure.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a non-success status.
    #[error("payments API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// Webhook signature header is missing parts or malformed.
    #[error("invalid signature header: {0}")]
    InvalidSignatureHeader(String),

    /// Webhook signature did not verify.
    #[error("signature verification failed")]
    SignatureMismatch,

    /// Webhook signature timestamp is outside the tolerance window.
    #[error("signature timestamp outside tolerance")]
    SignatureExpired,
}

/// A hosted checkout session for a credit pack purchase.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    /// Session ID (becomes the payment id on completion).
    pub id: String,
    /// URL the buyer is redirected to.
    pub url: String,
}

#[derive(Debug, Serialize)]
struct CreateSessionRequest<'a> {
    client_reference_id: &'a str,
    item_name: &'a str,
    quantity: u64,
    amount_cents: u64,
    success_url: &'a str,
    metadata: serde_json::Value,
}

/// Client for the payment processor API.
pub struct PaymentsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    webhook_secret: Option<String>,
}

impl PaymentsClient {
    /// Create a new payments client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: &str,
        webhook_secret: Option<String>,
    ) -> Result<Self, PaymentsError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            webhook_secret,
        })
    }

    /// Create a hosted checkout session for a credit pack.
    ///
    /// `reference` identifies the buying user and comes back on the webhook
    /// as `client_reference_id`.
    pub async fn create_checkout_session(
        &self,
        reference: &str,
        pack_name: &str,
        quantity: u64,
        amount_cents: u64,
        success_url: &str,
        metadata: serde_json::Value,
    ) -> Result<CheckoutSession, PaymentsError> {
        let url = format!("{}/v1/checkout/sessions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&CreateSessionRequest {
                client_reference_id: reference,
                item_name: pack_name,
                quantity,
                amount_cents,
                success_url,
                metadata,
            })
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Verify a webhook signature header of the form `t=<unix>,v1=<hex>`.
    ///
    /// The signed payload is `"{t}.{body}"`; comparison is constant-time
    /// and the timestamp must be within the tolerance window.
    ///
    /// # Errors
    ///
    /// Returns an error when no webhook secret is configured, the header is
    /// malformed, the timestamp is stale, or the signature does not match.
    pub fn verify_webhook_signature(
        &self,
        body: &str,
        signature_header: &str,
    ) -> Result<(), PaymentsError> {
        let secret = self.webhook_secret.as_ref().ok_or_else(|| {
            PaymentsError::InvalidSignatureHeader("no webhook secret configured".into())
        })?;

        let mut timestamp: Option<i64> = None;
        let mut signature: Option<&str> = None;

        for part in signature_header.split(',') {
            match part.split_once('=') {
                Some(("t", value)) => timestamp = value.parse().ok(),
                Some(("v1", value)) => signature = Some(value),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            PaymentsError::InvalidSignatureHeader("missing timestamp".into())
        })?;
        let signature = signature.ok_or_else(|| {
            PaymentsError::InvalidSignatureHeader("missing v1 signature".into())
        })?;

        let age = chrono::Utc::now().timestamp() - timestamp;
        if age.abs() > SIGNATURE_TOLERANCE_SECS {
            return Err(PaymentsError::SignatureExpired);
        }

        let signed_payload = format!("{timestamp}.{body}");
        let expected = hmac_sha256_hex(secret, &signed_payload);

        if constant_time_eq(&expected, signature) {
            Ok(())
        } else {
            Err(PaymentsError::SignatureMismatch)
        }
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PaymentsError> {
        let status = response.status();

        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());

            Err(PaymentsError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}
