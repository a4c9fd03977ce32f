//! Credit transactions.
//!
//! Every balance change is recorded as an immutable [`Transaction`] appended
//! to the account history. Amounts are positive magnitudes; the direction of
//! the balance change is implied by the [`TransactionKind`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::TransactionId;

/// An immutable record of a single balance change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction id (ULID, time-ordered).
    pub id: TransactionId,

    /// What kind of balance change this is.
    pub kind: TransactionKind,

    /// Magnitude of the change in credits. Always positive; the sign is
    /// implied by `kind`.
    pub amount: u64,

    /// External payment reference used for at-most-once crediting.
    /// Present only on `Purchase` transactions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,

    /// Human-readable label (form title, pack name). Informational only.
    pub description: String,

    /// Additional context (`form_id`, pack size, payment session).
    pub metadata: serde_json::Value,

    /// When the transaction was created.
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Create the one-time signup bonus transaction.
    #[must_use]
    pub fn bonus(amount: u64, description: String) -> Self {
        Self {
            id: TransactionId::generate(),
            kind: TransactionKind::Bonus,
            amount,
            idempotency_key: None,
            description,
            metadata: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    /// Create a purchase transaction carrying its payment reference.
    #[must_use]
    pub fn purchase(
        amount: u64,
        idempotency_key: String,
        description: String,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            kind: TransactionKind::Purchase,
            amount,
            idempotency_key: Some(idempotency_key),
            description,
            metadata,
            created_at: Utc::now(),
        }
    }

    /// Create a consumption (debit) transaction.
    #[must_use]
    pub fn usage(amount: u64, description: String, metadata: serde_json::Value) -> Self {
        Self {
            id: TransactionId::generate(),
            kind: TransactionKind::Use,
            amount,
            idempotency_key: None,
            description,
            metadata,
            created_at: Utc::now(),
        }
    }

    /// Create a refund transaction.
    #[must_use]
    pub fn refund(amount: u64, reason: String) -> Self {
        Self {
            id: TransactionId::generate(),
            kind: TransactionKind::Refund,
            amount,
            idempotency_key: None,
            description: reason,
            metadata: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    /// The signed effect of this transaction on the balance.
    ///
    /// # Panics
    ///
    /// Panics if `amount` exceeds `i64::MAX`, which no operation produces.
    #[must_use]
    pub fn signed_delta(&self) -> i64 {
        let amount = i64::try_from(self.amount).expect("transaction amount fits in i64");
        if self.kind.is_debit() {
            -amount
        } else {
            amount
        }
    }
}

/// Kind of balance change. Closed set so balance and statistics math is
/// exhaustiveness-checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// One-time signup bonus granted at account creation.
    Bonus,

    /// Credits bought through the payment processor.
    Purchase,

    /// Credits spent on a billable action (publishing a form).
    Use,

    /// Credits returned to the user.
    Refund,
}

impl TransactionKind {
    /// Whether this kind increases the balance.
    #[must_use]
    pub const fn is_credit(&self) -> bool {
        matches!(self, Self::Bonus | Self::Purchase | Self::Refund)
    }

    /// Whether this kind decreases the balance.
    #[must_use]
    pub const fn is_debit(&self) -> bool {
        matches!(self, Self::Use)
    }
}
