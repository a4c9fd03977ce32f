//! Router configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{accounts, credits, health, usage, webhooks};
use crate::state::AppState;

/// Maximum concurrent requests for consumption endpoints.
/// These take the high-volume traffic from the form generator backend.
const USAGE_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Accounts (bearer JWT auth)
/// - `POST /v1/accounts` - Ensure account (idempotent, grants signup bonus)
/// - `GET /v1/accounts/me` - Get current user's account
/// - `GET /v1/accounts/me/stats` - Credit statistics
///
/// ## Credits (bearer JWT auth unless noted)
/// - `GET /v1/credits/balance` - Current balance
/// - `GET /v1/credits/transactions` - Transaction history, newest first
/// - `GET /v1/credits/packs` - Purchasable pack catalog
/// - `POST /v1/credits/purchase` - Create a checkout session
/// - `POST /v1/credits/refund` - Credit a refund (service API key auth)
/// - `GET /v1/credits/watch` - WebSocket balance observer
///
/// ## Usage (service API key auth)
/// - `POST /v1/usage` - Debit credits for a generated form
/// - `POST /v1/usage/check` - Advisory balance pre-check
///
/// ## Webhooks (signature verification)
/// - `POST /webhooks/payments` - Payment processor notifications
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let usage_routes = Router::new()
        .route("/", post(usage::report_usage))
        .route("/check", post(usage::check_balance))
        .layer(ConcurrencyLimitLayer::new(USAGE_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        // Accounts
        .route("/accounts", post(accounts::create_account))
        .route("/accounts/me", get(accounts::get_account))
        .route("/accounts/me/stats", get(accounts::get_stats))
        // Credits
        .route("/credits/balance", get(credits::get_balance))
        .route("/credits/transactions", get(credits::list_transactions))
        .route("/credits/packs", get(credits::list_packs))
        .route("/credits/purchase", post(credits::purchase_credits))
        .route("/credits/refund", post(credits::refund_credits))
        .route("/credits/watch", get(credits::watch_credits))
        // Usage routes (with their own concurrency limit)
        .nest("/usage", usage_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        // API v1 routes (rate limited)
        .nest("/v1", api_routes)
        // Webhooks (no rate limit - controlled by the payment processor)
        .route("/webhooks/payments", post(webhooks::payments_webhook))
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
