//! The credit ledger service object.
//!
//! `CreditLedger` owns the business rules (signup bonus, validation, the
//! idempotent purchase contract) and delegates atomicity to the injected
//! [`Store`]. It holds no mutable state of its own, so one instance is
//! shared across all handlers.

use std::sync::Arc;

use tokio::sync::watch;

use formcredits_core::{
    CreditAccount, CreditConfig, CreditStats, LedgerError, Transaction, UserId,
};
use formcredits_store::{CreditOutcome, Store, StoreError};

/// Credit ledger over an injected storage backend.
#[derive(Clone)]
pub struct CreditLedger {
    store: Arc<dyn Store>,
    config: CreditConfig,
}

impl CreditLedger {
    /// Create a ledger over the given store and configuration.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: CreditConfig) -> Self {
        Self { store, config }
    }

    /// The credit configuration (signup bonus, costs, pack catalog).
    #[must_use]
    pub fn config(&self) -> &CreditConfig {
        &self.config
    }

    /// Ensure the user has an account, creating one with the signup bonus
    /// when absent. Idempotent: an existing account is returned unchanged
    /// no matter how many times this is called.
    pub fn ensure_account(&self, user_id: UserId) -> Result<CreditAccount, LedgerError> {
        let account = CreditAccount::open(user_id, self.config.signup_bonus);
        self.store
            .create_account_if_absent(&account)
            .map_err(map_store_err)
    }

    /// Current account snapshot, `None` when no account exists.
    pub fn snapshot(&self, user_id: &UserId) -> Result<Option<CreditAccount>, LedgerError> {
        self.store.get_account(user_id).map_err(map_store_err)
    }

    /// Account snapshot, erroring when no account exists.
    pub fn account(&self, user_id: &UserId) -> Result<CreditAccount, LedgerError> {
        self.snapshot(user_id)?
            .ok_or_else(|| LedgerError::AccountNotFound {
                user_id: user_id.to_string(),
            })
    }

    /// Statistics projection for the user's account.
    pub fn stats(&self, user_id: &UserId) -> Result<CreditStats, LedgerError> {
        Ok(CreditStats::for_account(&self.account(user_id)?))
    }

    /// Credit a purchase, keyed by the payment processor's payment id.
    ///
    /// Redelivery with an already-applied key is a strict no-op: the ledger
    /// returns [`CreditOutcome::Duplicate`] with the unchanged account.
    pub fn credit_purchase(
        &self,
        user_id: &UserId,
        quantity: u64,
        idempotency_key: String,
        description: String,
        metadata: serde_json::Value,
    ) -> Result<CreditOutcome, LedgerError> {
        if quantity == 0 {
            return Err(LedgerError::InvalidAmount(
                "purchase quantity must be positive".into(),
            ));
        }
        if idempotency_key.is_empty() {
            return Err(LedgerError::EmptyIdempotencyKey);
        }

        let tx = Transaction::purchase(quantity, idempotency_key, description, metadata);
        let outcome = self
            .store
            .apply_credit(user_id, &tx)
            .map_err(map_store_err)?;

        if let CreditOutcome::Applied(account) = &outcome {
            tracing::info!(
                user_id = %user_id,
                quantity = %quantity,
                balance = %account.balance,
                "Purchase credited"
            );
        }

        Ok(outcome)
    }

    /// Debit credits for a consumed generation.
    ///
    /// The balance check and the debit commit as one atomic unit in the
    /// store; on insufficient funds nothing is written and the error
    /// carries the balance and requested amount.
    pub fn consume(
        &self,
        user_id: &UserId,
        amount: u64,
        description: String,
        metadata: serde_json::Value,
    ) -> Result<CreditAccount, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount(
                "consumption amount must be positive".into(),
            ));
        }

        let tx = Transaction::usage(amount, description, metadata);
        let account = self.store.apply_debit(user_id, &tx).map_err(map_store_err)?;

        tracing::info!(
            user_id = %user_id,
            amount = %amount,
            balance = %account.balance,
            "Credits consumed"
        );

        Ok(account)
    }

    /// Credit a refund. Administrative path, no idempotency key.
    pub fn refund(
        &self,
        user_id: &UserId,
        amount: u64,
        reason: String,
    ) -> Result<CreditAccount, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount(
                "refund amount must be positive".into(),
            ));
        }

        let tx = Transaction::refund(amount, reason);
        let account = self
            .store
            .apply_credit(user_id, &tx)
            .map_err(map_store_err)?
            .into_account();

        tracing::info!(
            user_id = %user_id,
            amount = %amount,
            balance = %account.balance,
            "Refund credited"
        );

        Ok(account)
    }

    /// Subscribe to the user's account. The receiver holds the current
    /// state immediately (`None` when no account exists yet) and observes
    /// every subsequent change. Unsubscribing is dropping the receiver.
    pub fn subscribe(
        &self,
        user_id: &UserId,
    ) -> Result<watch::Receiver<Option<CreditAccount>>, LedgerError> {
        self.store.watch_account(user_id).map_err(map_store_err)
    }
}

fn map_store_err(err: StoreError) -> LedgerError {
    match err {
        StoreError::NotFound { user_id } => LedgerError::AccountNotFound { user_id },
        StoreError::InsufficientCredits { balance, requested } => {
            LedgerError::InsufficientCredits { balance, requested }
        }
        StoreError::BalanceOverflow { balance, credit } => LedgerError::InvalidAmount(format!(
            "crediting {credit} would overflow balance {balance}"
        )),
        StoreError::Unavailable(msg) | StoreError::Serialization(msg) => {
            LedgerError::StoreUnavailable(msg)
        }
    }
}
