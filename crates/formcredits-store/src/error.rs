//! Error types for formcredits storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The storage backend failed. Transient; callers may retry.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Record encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// No account exists for the user.
    #[error("account not found: {user_id}")]
    NotFound {
        /// The user id that has no account.
        user_id: String,
    },

    /// Balance cannot cover the requested debit. Nothing was written.
    #[error("insufficient credits: balance={balance}, requested={requested}")]
    InsufficientCredits {
        /// Current balance.
        balance: u64,
        /// Requested debit amount.
        requested: u64,
    },

    /// Crediting would overflow the balance counter. Nothing was written.
    #[error("balance overflow: balance={balance}, credit={credit}")]
    BalanceOverflow {
        /// Current balance.
        balance: u64,
        /// Credit amount that would overflow it.
        credit: u64,
    },
}
