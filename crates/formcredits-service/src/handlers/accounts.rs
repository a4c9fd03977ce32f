//! Account management handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use formcredits_core::{CreditAccount, CreditStats};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Account response.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// User ID.
    pub user_id: String,
    /// Current credit balance.
    pub balance: u64,
    /// Number of recorded transactions.
    pub transaction_count: usize,
    /// Created timestamp.
    pub created_at: String,
    /// Last updated timestamp.
    pub updated_at: String,
}

impl From<&CreditAccount> for AccountResponse {
    fn from(account: &CreditAccount) -> Self {
        Self {
            user_id: account.user_id.to_string(),
            balance: account.balance,
            transaction_count: account.history.len(),
            created_at: account.created_at.to_rfc3339(),
            updated_at: account.updated_at.to_rfc3339(),
        }
    }
}

/// Create or return the current user's account.
///
/// Idempotent: the first call creates the account with the signup bonus,
/// every later call returns the existing account unchanged.
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state.ledger.ensure_account(auth.user_id)?;

    Ok(Json(AccountResponse::from(&account)))
}

/// Get the current user's account.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state.ledger.account(&auth.user_id)?;

    Ok(Json(AccountResponse::from(&account)))
}

/// Get the current user's credit statistics.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<CreditStats>, ApiError> {
    let stats = state.ledger.stats(&auth.user_id)?;

    Ok(Json(stats))
}
