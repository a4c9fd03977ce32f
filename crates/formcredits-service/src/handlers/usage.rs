//! Consumption handlers for the form generator backend.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use formcredits_core::{CreationMethod, UserId};

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Consumption request from the form generator backend.
#[derive(Debug, Deserialize)]
pub struct UsageRequest {
    /// User being charged.
    pub user_id: String,
    /// How the form was created; determines the cost.
    pub method: CreationMethod,
    /// The generated form's ID (optional).
    pub form_id: Option<String>,
    /// The generated form's title (optional, used in the description).
    pub form_title: Option<String>,
    /// Additional metadata.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Consumption response.
#[derive(Debug, Serialize)]
pub struct UsageResponse {
    /// Whether the debit was applied.
    pub success: bool,
    /// New balance after the debit.
    pub balance: u64,
    /// Credits deducted.
    pub cost: u64,
    /// Transaction ID of the debit.
    pub transaction_id: String,
}

/// Debit credits for a generated form.
pub async fn report_usage(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<UsageRequest>,
) -> Result<Json<UsageResponse>, ApiError> {
    let user_id = parse_user_id(&body.user_id)?;
    let cost = state.ledger.config().cost_of(body.method);

    tracing::debug!(
        service = %auth.service_name,
        user_id = %user_id,
        method = ?body.method,
        cost = %cost,
        "Processing consumption"
    );

    let description = match &body.form_title {
        Some(title) => format!("Form: {title}"),
        None => format!("Form ({})", method_label(body.method)),
    };

    let mut metadata = serde_json::json!({
        "method": body.method,
        "service": auth.service_name,
    });
    if let Some(form_id) = &body.form_id {
        metadata["form_id"] = serde_json::Value::String(form_id.clone());
    }
    if !body.metadata.is_null() {
        metadata["extra"] = body.metadata;
    }

    let account = state.ledger.consume(&user_id, cost, description, metadata)?;

    let transaction_id = account
        .history
        .last()
        .map(|tx| tx.id.to_string())
        .unwrap_or_default();

    Ok(Json(UsageResponse {
        success: true,
        balance: account.balance,
        cost,
        transaction_id,
    }))
}

/// Balance pre-check request.
#[derive(Debug, Deserialize)]
pub struct CheckBalanceRequest {
    /// User to check.
    pub user_id: String,
    /// Creation method the caller is about to charge for.
    pub method: CreationMethod,
}

/// Balance pre-check response.
#[derive(Debug, Serialize)]
pub struct CheckBalanceResponse {
    /// Whether the balance covers the cost right now.
    pub sufficient: bool,
    /// Current balance.
    pub balance: u64,
    /// Cost of the requested method.
    pub required: u64,
}

/// Advisory pre-check before generating a form.
///
/// The answer can go stale immediately; the atomic debit in
/// [`report_usage`] remains the authoritative rejection.
pub async fn check_balance(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(body): Json<CheckBalanceRequest>,
) -> Result<Json<CheckBalanceResponse>, ApiError> {
    let user_id = parse_user_id(&body.user_id)?;
    let required = state.ledger.config().cost_of(body.method);
    let account = state.ledger.account(&user_id)?;

    Ok(Json(CheckBalanceResponse {
        sufficient: account.has_sufficient_credits(required),
        balance: account.balance,
        required,
    }))
}

fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest("invalid user ID".into()))
}

fn method_label(method: CreationMethod) -> &'static str {
    match method {
        CreationMethod::Manual => "manual",
        CreationMethod::FileImport => "file import",
        CreationMethod::Ai => "AI",
    }
}
