//! In-memory storage implementation for tests and local development.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::watch;

use formcredits_core::{CreditAccount, Transaction, UserId};

use crate::error::{Result, StoreError};
use crate::feed::ChangeFeed;
use crate::{CreditOutcome, Store};

/// `HashMap`-backed store with the same atomicity contract as the
/// persistent backend: compound mutations hold the map lock from read to
/// write, so no interleaving can overdraw a balance or double-apply a
/// credit.
pub struct MemoryStore {
    accounts: Mutex<HashMap<UserId, CreditAccount>>,
    feed: ChangeFeed,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            feed: ChangeFeed::new(),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<UserId, CreditAccount>>> {
        self.accounts
            .lock()
            .map_err(|_| StoreError::Unavailable("account map lock poisoned".into()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn get_account(&self, user_id: &UserId) -> Result<Option<CreditAccount>> {
        Ok(self.lock()?.get(user_id).cloned())
    }

    fn create_account_if_absent(&self, account: &CreditAccount) -> Result<CreditAccount> {
        let mut accounts = self.lock()?;

        if let Some(existing) = accounts.get(&account.user_id) {
            return Ok(existing.clone());
        }

        accounts.insert(account.user_id, account.clone());
        drop(accounts);
        self.feed.publish(account);
        Ok(account.clone())
    }

    fn apply_credit(&self, user_id: &UserId, tx: &Transaction) -> Result<CreditOutcome> {
        let mut accounts = self.lock()?;

        let account = accounts.get_mut(user_id).ok_or_else(|| StoreError::NotFound {
            user_id: user_id.to_string(),
        })?;

        if let Some(key) = tx.idempotency_key.as_deref() {
            if account.find_by_idempotency_key(key).is_some() {
                return Ok(CreditOutcome::Duplicate(account.clone()));
            }
        }

        account.balance = account.balance.checked_add(tx.amount).ok_or(
            StoreError::BalanceOverflow {
                balance: account.balance,
                credit: tx.amount,
            },
        )?;
        account.history.push(tx.clone());
        account.updated_at = chrono::Utc::now();

        let snapshot = account.clone();
        drop(accounts);
        self.feed.publish(&snapshot);
        Ok(CreditOutcome::Applied(snapshot))
    }

    fn apply_debit(&self, user_id: &UserId, tx: &Transaction) -> Result<CreditAccount> {
        let mut accounts = self.lock()?;

        let account = accounts.get_mut(user_id).ok_or_else(|| StoreError::NotFound {
            user_id: user_id.to_string(),
        })?;

        if account.balance < tx.amount {
            return Err(StoreError::InsufficientCredits {
                balance: account.balance,
                requested: tx.amount,
            });
        }

        account.balance -= tx.amount;
        account.history.push(tx.clone());
        account.updated_at = chrono::Utc::now();

        let snapshot = account.clone();
        drop(accounts);
        self.feed.publish(&snapshot);
        Ok(snapshot)
    }

    fn watch_account(&self, user_id: &UserId) -> Result<watch::Receiver<Option<CreditAccount>>> {
        self.feed.watch(*user_id, || {
            Ok(self
                .accounts
                .lock()
                .map_err(|_| StoreError::Unavailable("account map lock poisoned".into()))?
                .get(user_id)
                .cloned())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn create_then_get() {
        let store = MemoryStore::new();
        let user_id = UserId::generate();

        assert!(store.get_account(&user_id).unwrap().is_none());

        store
            .create_account_if_absent(&CreditAccount::open(user_id, 5))
            .unwrap();
        let account = store.get_account(&user_id).unwrap().unwrap();
        assert_eq!(account.balance, 5);
    }

    #[test]
    fn create_if_absent_keeps_existing() {
        let store = MemoryStore::new();
        let user_id = UserId::generate();

        store
            .create_account_if_absent(&CreditAccount::open(user_id, 5))
            .unwrap();
        store
            .apply_debit(
                &user_id,
                &Transaction::usage(1, "Form".into(), serde_json::Value::Null),
            )
            .unwrap();

        let account = store
            .create_account_if_absent(&CreditAccount::open(user_id, 5))
            .unwrap();
        assert_eq!(account.balance, 4);
    }

    #[test]
    fn credit_dedup_by_key() {
        let store = MemoryStore::new();
        let user_id = UserId::generate();
        store
            .create_account_if_absent(&CreditAccount::open(user_id, 0))
            .unwrap();

        let tx = Transaction::purchase(
            20,
            "pay_abc".into(),
            "Starter pack".into(),
            serde_json::Value::Null,
        );
        assert!(!store.apply_credit(&user_id, &tx).unwrap().is_duplicate());

        let replay = Transaction::purchase(
            20,
            "pay_abc".into(),
            "Starter pack".into(),
            serde_json::Value::Null,
        );
        let outcome = store.apply_credit(&user_id, &replay).unwrap();
        assert!(outcome.is_duplicate());
        assert_eq!(outcome.into_account().balance, 20);
    }

    #[test]
    fn credit_overflow_is_rejected() {
        let store = MemoryStore::new();
        let user_id = UserId::generate();
        store
            .create_account_if_absent(&CreditAccount::open(user_id, 5))
            .unwrap();

        let result = store.apply_credit(&user_id, &Transaction::refund(u64::MAX, "bad".into()));
        assert!(matches!(
            result,
            Err(StoreError::BalanceOverflow {
                balance: 5,
                credit: u64::MAX
            })
        ));

        // The rejected credit must leave no trace.
        let account = store.get_account(&user_id).unwrap().unwrap();
        assert_eq!(account.balance, 5);
        assert_eq!(account.history.len(), 1);
    }

    #[test]
    fn debit_never_overdraws() {
        let store = MemoryStore::new();
        let user_id = UserId::generate();
        store
            .create_account_if_absent(&CreditAccount::open(user_id, 1))
            .unwrap();

        let result = store.apply_debit(
            &user_id,
            &Transaction::usage(2, "AI form".into(), serde_json::Value::Null),
        );
        assert!(matches!(
            result,
            Err(StoreError::InsufficientCredits {
                balance: 1,
                requested: 2
            })
        ));

        let account = store.get_account(&user_id).unwrap().unwrap();
        assert_eq!(account.balance, 1);
        assert_eq!(account.history.len(), 1);
    }

    #[test]
    fn concurrent_debits_settle_exactly() {
        let store = Arc::new(MemoryStore::new());
        let user_id = UserId::generate();
        store
            .create_account_if_absent(&CreditAccount::open(user_id, 10))
            .unwrap();

        // 20 threads race for 10 credits; exactly 10 debits may win.
        let handles: Vec<_> = (0..20)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .apply_debit(
                            &user_id,
                            &Transaction::usage(1, "Form".into(), serde_json::Value::Null),
                        )
                        .is_ok()
                })
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&won| won)
            .count();
        assert_eq!(wins, 10);

        let account = store.get_account(&user_id).unwrap().unwrap();
        assert_eq!(account.balance, 0);
        assert_eq!(account.history.len(), 11);
    }

    #[test]
    fn concurrent_credits_apply_once_per_key() {
        let store = Arc::new(MemoryStore::new());
        let user_id = UserId::generate();
        store
            .create_account_if_absent(&CreditAccount::open(user_id, 0))
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let tx = Transaction::purchase(
                        50,
                        "pay_race".into(),
                        "Standard pack".into(),
                        serde_json::Value::Null,
                    );
                    store.apply_credit(&user_id, &tx).unwrap().is_duplicate()
                })
            })
            .collect();

        let duplicates = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&dup| dup)
            .count();
        assert_eq!(duplicates, 7);

        let account = store.get_account(&user_id).unwrap().unwrap();
        assert_eq!(account.balance, 50);
    }

    #[tokio::test]
    async fn watch_sees_debits() {
        let store = MemoryStore::new();
        let user_id = UserId::generate();
        store
            .create_account_if_absent(&CreditAccount::open(user_id, 5))
            .unwrap();

        let mut receiver = store.watch_account(&user_id).unwrap();
        assert_eq!(receiver.borrow().as_ref().unwrap().balance, 5);

        store
            .apply_debit(
                &user_id,
                &Transaction::usage(2, "AI form".into(), serde_json::Value::Null),
            )
            .unwrap();
        receiver.changed().await.unwrap();
        assert_eq!(receiver.borrow().as_ref().unwrap().balance, 3);
    }
}
