//! Storage layer for the formcredits ledger.
//!
//! This crate provides durable account storage behind the [`Store`] trait.
//! Two implementations ship: [`RocksStore`] (RocksDB, CBOR-encoded records)
//! for production and [`MemoryStore`] for tests and embedding.
//!
//! # Atomicity
//!
//! The ledger's correctness rests on three store guarantees:
//!
//! - `create_account_if_absent` has exactly one winner under concurrent
//!   first-time calls.
//! - `apply_credit` performs its duplicate-key check, balance increment, and
//!   history append as one indivisible unit.
//! - `apply_debit` performs its balance check and decrement as one
//!   indivisible unit, so concurrent debits can never overdraw.
//!
//! Both implementations serialize compound mutations through a writer lock;
//! reads never block. A read-modify-write spread across separate calls is a
//! correctness bug, not an acceptable implementation.
//!
//! # Change feed
//!
//! [`Store::watch_account`] returns a `tokio::sync::watch` receiver that
//! holds the current record (or `None` before the account exists) and
//! observes every subsequent mutation. Dropping the receiver unsubscribes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod feed;
pub mod keys;
pub mod memory;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use rocks::RocksStore;

use tokio::sync::watch;

use formcredits_core::{CreditAccount, Transaction, UserId};

/// Outcome of [`Store::apply_credit`].
///
/// Duplicate delivery of a purchase notification is a value, not an error:
/// at-least-once webhook transports redeliver routinely and the ledger must
/// treat replays as successful no-ops.
#[derive(Debug, Clone)]
pub enum CreditOutcome {
    /// The credit was applied; carries the updated account.
    Applied(CreditAccount),

    /// A transaction with the same idempotency key already exists; carries
    /// the account unchanged.
    Duplicate(CreditAccount),
}

impl CreditOutcome {
    /// The account state after the operation, applied or not.
    #[must_use]
    pub fn into_account(self) -> CreditAccount {
        match self {
            Self::Applied(account) | Self::Duplicate(account) => account,
        }
    }

    /// Whether the credit was a duplicate-delivery no-op.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

/// The storage contract the ledger is built on.
pub trait Store: Send + Sync {
    /// Fetch an account by user id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    fn get_account(&self, user_id: &UserId) -> Result<Option<CreditAccount>>;

    /// Create `account` unless a record for its user already exists.
    ///
    /// Returns the stored account either way: the new record when this call
    /// won creation, the pre-existing record otherwise. Exactly one of any
    /// number of concurrent calls for the same user creates the record.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    fn create_account_if_absent(&self, account: &CreditAccount) -> Result<CreditAccount>;

    /// Atomically apply a credit transaction (purchase, refund).
    ///
    /// When `tx` carries an idempotency key that already appears in the
    /// account's history, nothing is written and
    /// [`CreditOutcome::Duplicate`] is returned. Otherwise the balance
    /// increment and history append commit as one unit.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the account does not exist.
    /// - [`StoreError::BalanceOverflow`] if the credit would overflow the
    ///   balance counter; nothing is written.
    /// - [`StoreError::Unavailable`] if the storage backend fails.
    fn apply_credit(&self, user_id: &UserId, tx: &Transaction) -> Result<CreditOutcome>;

    /// Atomically apply a debit transaction.
    ///
    /// The balance check and decrement are one indivisible unit: on
    /// insufficient funds nothing is written.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the account does not exist.
    /// - [`StoreError::InsufficientCredits`] if the balance cannot cover
    ///   the debit; carries the balance and requested amount.
    /// - [`StoreError::Unavailable`] if the storage backend fails.
    fn apply_debit(&self, user_id: &UserId, tx: &Transaction) -> Result<CreditAccount>;

    /// Subscribe to the account's change feed.
    ///
    /// The returned receiver holds the current record immediately (`None`
    /// when the account does not exist yet) and is updated on every
    /// mutation. Dropping the receiver releases the subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial snapshot cannot be loaded.
    fn watch_account(&self, user_id: &UserId) -> Result<watch::Receiver<Option<CreditAccount>>>;
}
