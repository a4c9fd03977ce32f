//! Formcredits HTTP API service.
//!
//! This crate provides the credit ledger and its HTTP API:
//!
//! - Account creation with signup bonus
//! - Credit balance, transaction history and statistics
//! - Consumption debits for form generation
//! - Payment webhooks (idempotent crediting)
//! - Live balance watching over WebSocket
//!
//! # Authentication
//!
//! The service supports two authentication methods:
//!
//! 1. **Bearer JWT tokens** - For end-user requests (dashboard, etc.)
//! 2. **Service API keys** - For service-to-service requests (the form
//!    generator backend)

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Some handlers need async for consistency

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod payments;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use ledger::CreditLedger;
pub use payments::{CheckoutSession, PaymentsClient, PaymentsError};
pub use routes::create_router;
pub use state::AppState;
