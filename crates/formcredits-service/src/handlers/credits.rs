//! Credit balance, history, purchase and watch handlers.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use formcredits_core::{CreditAccount, CreditPack, Transaction, UserId};

use crate::auth::{AuthUser, ServiceAuth};
use crate::error::ApiError;
use crate::state::AppState;

/// Default page size for transaction listings.
const DEFAULT_TRANSACTIONS_LIMIT: usize = 50;

/// Maximum page size for transaction listings.
const MAX_TRANSACTIONS_LIMIT: usize = 200;

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Current credit balance.
    pub balance: u64,
}

/// Get the current user's balance.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<BalanceResponse>, ApiError> {
    let account = state.ledger.account(&auth.user_id)?;

    Ok(Json(BalanceResponse {
        balance: account.balance,
    }))
}

/// Transaction listing query parameters.
#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    /// Maximum number of transactions to return.
    pub limit: Option<usize>,
    /// Number of transactions to skip.
    pub offset: Option<usize>,
}

/// Transaction listing response.
#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    /// Transactions, newest first.
    pub transactions: Vec<Transaction>,
    /// Total number of recorded transactions.
    pub total: usize,
}

/// List the current user's transactions, newest first.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<TransactionsResponse>, ApiError> {
    let account = state.ledger.account(&auth.user_id)?;

    let limit = query
        .limit
        .unwrap_or(DEFAULT_TRANSACTIONS_LIMIT)
        .min(MAX_TRANSACTIONS_LIMIT);
    let offset = query.offset.unwrap_or(0);

    let total = account.history.len();
    let transactions: Vec<Transaction> = account
        .history
        .iter()
        .rev()
        .skip(offset)
        .take(limit)
        .cloned()
        .collect();

    Ok(Json(TransactionsResponse {
        transactions,
        total,
    }))
}

/// Pack catalog response.
#[derive(Debug, Serialize)]
pub struct PacksResponse {
    /// Purchasable credit packs.
    pub packs: Vec<CreditPack>,
}

/// List the purchasable credit packs.
pub async fn list_packs(State(state): State<Arc<AppState>>) -> Json<PacksResponse> {
    Json(PacksResponse {
        packs: state.ledger.config().packs.clone(),
    })
}

/// Purchase request.
#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    /// ID of the pack to buy.
    pub pack_id: String,
}

/// Purchase response.
#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    /// Checkout session ID.
    pub session_id: String,
    /// URL to redirect the buyer to.
    pub checkout_url: String,
}

/// Start a credit pack purchase by creating a hosted checkout session.
///
/// The credits are granted later, when the payment webhook confirms the
/// payment.
pub async fn purchase_credits(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<PurchaseRequest>,
) -> Result<Json<PurchaseResponse>, ApiError> {
    let pack = state
        .ledger
        .config()
        .pack(&body.pack_id)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown pack: {}", body.pack_id)))?
        .clone();

    let payments = state
        .payments
        .as_ref()
        .ok_or_else(|| ApiError::ExternalService("payments not configured".into()))?;

    // The buyer may not have hit an authenticated endpoint before buying.
    state.ledger.ensure_account(auth.user_id)?;

    let session = payments
        .create_checkout_session(
            &auth.user_id.to_string(),
            &pack.name,
            pack.quantity,
            pack.price_cents,
            &state.config.checkout_return_url,
            serde_json::json!({ "pack_id": pack.id }),
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, pack_id = %pack.id, "Failed to create checkout session");
            ApiError::ExternalService("failed to create checkout session".into())
        })?;

    tracing::info!(
        user_id = %auth.user_id,
        pack_id = %pack.id,
        session_id = %session.id,
        "Checkout session created"
    );

    Ok(Json(PurchaseResponse {
        session_id: session.id,
        checkout_url: session.url,
    }))
}

/// Refund request (service-authenticated, administrative).
#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    /// User to refund.
    pub user_id: String,
    /// Credits to return.
    pub amount: u64,
    /// Why the refund was issued.
    pub reason: String,
}

/// Refund response.
#[derive(Debug, Serialize)]
pub struct RefundResponse {
    /// Whether the refund was applied.
    pub refunded: bool,
    /// New balance.
    pub balance: u64,
}

/// Credit a refund to a user's account.
pub async fn refund_credits(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<RefundRequest>,
) -> Result<Json<RefundResponse>, ApiError> {
    let user_id: UserId = body
        .user_id
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid user ID".into()))?;

    tracing::info!(
        service = %auth.service_name,
        user_id = %user_id,
        amount = %body.amount,
        reason = %body.reason,
        "Processing refund"
    );

    let account = state.ledger.refund(&user_id, body.amount, body.reason)?;

    Ok(Json(RefundResponse {
        refunded: true,
        balance: account.balance,
    }))
}

/// Watch the current user's account over a WebSocket.
///
/// The socket immediately receives the current snapshot (or `null` when no
/// account exists yet), then one message per subsequent change. Closing the
/// socket unsubscribes.
pub async fn watch_credits(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let receiver = state.ledger.subscribe(&auth.user_id)?;

    Ok(ws.on_upgrade(move |socket| stream_account(socket, auth.user_id, receiver)))
}

async fn stream_account(
    mut socket: WebSocket,
    user_id: UserId,
    mut receiver: watch::Receiver<Option<CreditAccount>>,
) {
    // Send the seed snapshot before waiting for changes.
    let snapshot = receiver.borrow().clone();
    if send_snapshot(&mut socket, snapshot.as_ref()).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            changed = receiver.changed() => {
                if changed.is_err() {
                    // Sender gone; the store was dropped.
                    break;
                }
                let snapshot = receiver.borrow_and_update().clone();
                if send_snapshot(&mut socket, snapshot.as_ref()).await.is_err() {
                    break;
                }
            }
            message = socket.recv() => {
                match message {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    tracing::debug!(user_id = %user_id, "Balance watch closed");
}

async fn send_snapshot(
    socket: &mut WebSocket,
    account: Option<&CreditAccount>,
) -> Result<(), axum::Error> {
    let payload = match account {
        Some(account) => serde_json::json!({
            "user_id": account.user_id.to_string(),
            "balance": account.balance,
            "updated_at": account.updated_at.to_rfc3339(),
        }),
        None => serde_json::Value::Null,
    };

    socket.send(Message::Text(payload.to_string())).await
}
