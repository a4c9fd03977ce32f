//! Error taxonomy for ledger operations.

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors surfaced by the credit ledger.
///
/// `InsufficientCredits` is an expected business outcome callers branch on;
/// the rest are infrastructure failures or caller programming errors.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Balance cannot cover the requested debit. Carries both sides so the
    /// caller can render a precise message. No mutation was performed.
    #[error("insufficient credits: balance={balance}, requested={requested}")]
    InsufficientCredits {
        /// Current balance.
        balance: u64,
        /// Requested debit amount.
        requested: u64,
    },

    /// No account exists for the user. Only reachable when a caller bypasses
    /// account initialization.
    #[error("account not found: {user_id}")]
    AccountNotFound {
        /// The user id that has no account.
        user_id: String,
    },

    /// Caller passed a non-positive amount or quantity.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Caller passed an empty idempotency key for a purchase.
    #[error("idempotency key must be non-empty")]
    EmptyIdempotencyKey,

    /// Transient storage failure. Safe to retry: account initialization and
    /// purchase crediting are idempotent, and a failed consume has no side
    /// effect.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}
