//! Payment webhook handler.
//!
//! The processor delivers payment notifications at least once; redelivered
//! events must not credit twice. The ledger keys every credit by the
//! payment id, so this handler simply credits on every delivery and lets
//! the idempotency index absorb replays.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use formcredits_core::UserId;
use formcredits_store::CreditOutcome;

use crate::error::ApiError;
use crate::state::AppState;

/// Payment webhook payload.
#[derive(Debug, Deserialize)]
pub struct PaymentWebhook {
    /// Event type.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event ID.
    pub id: String,
    /// Event data.
    pub data: PaymentEventData,
}

/// Payment event data container.
#[derive(Debug, Deserialize)]
pub struct PaymentEventData {
    /// Event object.
    pub object: serde_json::Value,
}

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the webhook was processed.
    pub received: bool,
}

/// Handle payment processor webhooks.
pub async fn payments_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    // Verify signature if a webhook secret is configured
    if state.config.payments_webhook_secret.is_some() {
        let signature = headers
            .get("x-payments-signature")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::BadRequest("Missing payment signature".into()))?;

        // A configured secret means deliveries must verify; without the
        // payments client there is nothing to verify against, so reject
        // rather than credit on an unchecked payload.
        let payments = state.payments.as_ref().ok_or_else(|| {
            tracing::error!("Payments webhook secret configured but client not available");
            ApiError::Internal("webhook verification unavailable".into())
        })?;

        payments
            .verify_webhook_signature(&body, signature)
            .map_err(|e| {
                tracing::warn!(error = %e, "Invalid payment webhook signature");
                ApiError::BadRequest("Invalid webhook signature".into())
            })?;
    } else {
        // No webhook secret configured - skip verification (development mode)
        tracing::warn!("Payments webhook secret not configured - skipping signature verification");
    }

    let webhook: PaymentWebhook =
        serde_json::from_str(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    tracing::info!(
        event_type = %webhook.event_type,
        event_id = %webhook.id,
        "Received payment webhook"
    );

    match webhook.event_type.as_str() {
        "checkout.session.completed" | "payment.succeeded" => {
            handle_payment_completed(&state, &webhook.data.object)?;
        }
        _ => {
            tracing::debug!(event_type = %webhook.event_type, "Unhandled payment event");
        }
    }

    Ok(Json(WebhookResponse { received: true }))
}

fn handle_payment_completed(
    state: &AppState,
    data: &serde_json::Value,
) -> Result<(), ApiError> {
    let user_id_str = data
        .get("client_reference_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ApiError::BadRequest("Missing client_reference_id".into()))?;

    let user_id: UserId = user_id_str
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid client_reference_id".into()))?;

    // The payment id keys the credit; redelivery reuses it.
    let payment_id = data
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ApiError::BadRequest("Missing payment id".into()))?;

    let pack_id = data
        .get("metadata")
        .and_then(|m| m.get("pack_id"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| ApiError::BadRequest("Missing pack_id metadata".into()))?;

    let pack = state
        .ledger
        .config()
        .pack(pack_id)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown pack: {pack_id}")))?
        .clone();

    // The account normally exists, but a payment must never be dropped
    // because the webhook raced account creation.
    state.ledger.ensure_account(user_id)?;

    let outcome = state.ledger.credit_purchase(
        &user_id,
        pack.quantity,
        payment_id.to_string(),
        format!("Purchased {}", pack.name),
        serde_json::json!({ "pack_id": pack.id, "payment_id": payment_id }),
    )?;

    match outcome {
        CreditOutcome::Applied(account) => {
            tracing::info!(
                user_id = %user_id,
                payment_id = %payment_id,
                quantity = %pack.quantity,
                balance = %account.balance,
                "Payment credited"
            );
        }
        CreditOutcome::Duplicate(_) => {
            tracing::info!(
                user_id = %user_id,
                payment_id = %payment_id,
                "Payment already credited - acknowledging redelivery"
            );
        }
    }

    Ok(())
}
