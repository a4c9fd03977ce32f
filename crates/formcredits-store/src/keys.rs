//! Key encoding for the RocksDB backend.

use formcredits_core::UserId;

/// Account record key: the 16 UUID bytes of the user id.
#[must_use]
pub fn account_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Idempotency index key.
///
/// Format: `user_id (16 bytes) || idempotency_key (UTF-8)`. Keys are scoped
/// per account, so the same payment reference for two users never collides.
#[must_use]
pub fn credited_key(user_id: &UserId, idempotency_key: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(16 + idempotency_key.len());
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(idempotency_key.as_bytes());
    key
}
