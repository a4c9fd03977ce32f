//! Core types for the formcredits ledger.
//!
//! This crate provides the foundational types shared by the storage layer and
//! the HTTP service:
//!
//! - **Identifiers**: [`UserId`], [`TransactionId`]
//! - **Accounts**: [`CreditAccount`] with its embedded transaction history
//! - **Transactions**: [`Transaction`], [`TransactionKind`]
//! - **Configuration**: [`CreditConfig`], [`CreationMethod`], [`CreditPack`]
//! - **Statistics**: [`CreditStats`]
//! - **Errors**: [`LedgerError`]
//!
//! # Credits
//!
//! A credit is the spendable unit of the product: one credit authorizes one
//! unit of a billable action (publishing a manually built or imported form
//! costs 1 credit, an AI-generated form costs 2 by default). Balances are
//! stored as `u64` and can never go negative; every balance change is
//! recorded as an immutable [`Transaction`] in the account's history.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod config;
pub mod error;
pub mod ids;
pub mod stats;
pub mod transaction;

pub use account::CreditAccount;
pub use config::{CreationMethod, CreditConfig, CreditPack};
pub use error::{LedgerError, Result};
pub use ids::{IdError, TransactionId, UserId};
pub use stats::CreditStats;
pub use transaction::{Transaction, TransactionKind};
