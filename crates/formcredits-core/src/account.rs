//! Credit accounts.
//!
//! One [`CreditAccount`] exists per user. The account record embeds its full
//! transaction history; the balance is authoritative but must always equal
//! the net effect of the history, which tests assert through
//! [`CreditAccount::net_history`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Transaction, UserId};

/// A user's credit account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditAccount {
    /// The owning user. Immutable.
    pub user_id: UserId,

    /// Current spendable credits. Never negative.
    pub balance: u64,

    /// Append-only transaction history, oldest first.
    pub history: Vec<Transaction>,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl CreditAccount {
    /// Create a new account seeded with the signup bonus.
    ///
    /// A `signup_bonus` of zero yields an empty history; transactions always
    /// carry a positive magnitude.
    #[must_use]
    pub fn open(user_id: UserId, signup_bonus: u64) -> Self {
        let now = Utc::now();
        let history = if signup_bonus > 0 {
            vec![Transaction::bonus(signup_bonus, "Signup bonus".into())]
        } else {
            Vec::new()
        };

        Self {
            user_id,
            balance: signup_bonus,
            history,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the balance can cover a debit of `amount`.
    #[must_use]
    pub fn has_sufficient_credits(&self, amount: u64) -> bool {
        self.balance >= amount
    }

    /// Find the transaction carrying the given idempotency key, if any.
    ///
    /// At most one transaction per account ever carries a given key; the
    /// store enforces this before appending.
    #[must_use]
    pub fn find_by_idempotency_key(&self, key: &str) -> Option<&Transaction> {
        self.history
            .iter()
            .find(|tx| tx.idempotency_key.as_deref() == Some(key))
    }

    /// Net effect of the full history, in signed credits.
    ///
    /// Equals `balance` for any account produced through ledger operations.
    #[must_use]
    pub fn net_history(&self) -> i64 {
        self.history.iter().map(Transaction::signed_delta).sum()
    }
}
