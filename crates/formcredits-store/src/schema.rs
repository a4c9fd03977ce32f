//! Column family layout for the RocksDB backend.

/// Column family names.
pub mod cf {
    /// Account records (full history embedded), keyed by user id.
    pub const ACCOUNTS: &str = "accounts";

    /// Idempotency index: `user_id || idempotency_key` -> transaction id.
    /// Written in the same batch as the account record it guards.
    pub const CREDITED_KEYS: &str = "credited_keys";
}

/// All column families the store opens.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::ACCOUNTS, cf::CREDITED_KEYS]
}
