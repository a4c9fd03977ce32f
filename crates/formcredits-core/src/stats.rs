//! Usage statistics projection.

use serde::{Deserialize, Serialize};

use crate::{CreditAccount, TransactionKind};

/// Derived totals over an account's transaction history.
///
/// A pure read-side projection: no side effects, and malformed or empty
/// history simply yields zeros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditStats {
    /// Sum of all purchase amounts.
    pub total_purchased: u64,

    /// Sum of all use amounts.
    pub total_used: u64,

    /// Current account balance.
    pub current_balance: u64,

    /// `round(100 * total_used / total_purchased)`; 0 when nothing has been
    /// purchased.
    pub usage_percentage: u32,
}

impl CreditStats {
    /// Derive statistics from an account.
    #[must_use]
    pub fn for_account(account: &CreditAccount) -> Self {
        let mut total_purchased: u64 = 0;
        let mut total_used: u64 = 0;

        for tx in &account.history {
            match tx.kind {
                TransactionKind::Purchase => total_purchased += tx.amount,
                TransactionKind::Use => total_used += tx.amount,
                TransactionKind::Bonus | TransactionKind::Refund => {}
            }
        }

        let usage_percentage = if total_purchased == 0 {
            0
        } else {
            #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
            {
                ((total_used as f64 / total_purchased as f64) * 100.0).round() as u32
            }
        };

        Self {
            total_purchased,
            total_used,
            current_balance: account.balance,
            usage_percentage,
        }
    }
}
