//! RocksDB storage implementation.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, MultiThreaded, Options, WriteBatch,
};
use tokio::sync::watch;

use formcredits_core::{CreditAccount, Transaction, UserId};

use crate::error::{Result, StoreError};
use crate::feed::ChangeFeed;
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{CreditOutcome, Store};

/// RocksDB-backed account store.
///
/// Account records are CBOR-encoded with the full history embedded, so every
/// mutation rewrites one value and commits together with its idempotency
/// index entry in a single `WriteBatch`. Compound mutations serialize
/// through `write_lock`; reads go straight to the database.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    feed: ChangeFeed,
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            feed: ChangeFeed::new(),
            write_lock: Mutex::new(()),
        })
    }

    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Unavailable(format!("column family not found: {name}")))
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn lock_writer(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Unavailable("writer lock poisoned".into()))
    }

    fn load_account(&self, user_id: &UserId) -> Result<CreditAccount> {
        self.get_account(user_id)?.ok_or_else(|| StoreError::NotFound {
            user_id: user_id.to_string(),
        })
    }

    fn put_account(&self, batch: &mut WriteBatch, account: &CreditAccount) -> Result<()> {
        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let key = keys::account_key(&account.user_id);
        let value = Self::serialize(account)?;
        batch.put_cf(&cf_accounts, key, value);
        Ok(())
    }

    fn commit(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

impl Store for RocksStore {
    fn get_account(&self, user_id: &UserId) -> Result<Option<CreditAccount>> {
        let cf = self.cf(cf::ACCOUNTS)?;
        let key = keys::account_key(user_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn create_account_if_absent(&self, account: &CreditAccount) -> Result<CreditAccount> {
        let _guard = self.lock_writer()?;

        if let Some(existing) = self.get_account(&account.user_id)? {
            tracing::debug!(user_id = %account.user_id, "Account already exists");
            return Ok(existing);
        }

        let mut batch = WriteBatch::default();
        self.put_account(&mut batch, account)?;
        self.commit(batch)?;
        self.feed.publish(account);

        tracing::info!(
            user_id = %account.user_id,
            balance = %account.balance,
            "Account created"
        );

        Ok(account.clone())
    }

    fn apply_credit(&self, user_id: &UserId, tx: &Transaction) -> Result<CreditOutcome> {
        let _guard = self.lock_writer()?;

        let mut account = self.load_account(user_id)?;

        let mut batch = WriteBatch::default();

        if let Some(key) = tx.idempotency_key.as_deref() {
            let cf_credited = self.cf(cf::CREDITED_KEYS)?;
            let index_key = keys::credited_key(user_id, key);

            let already_applied = self
                .db
                .get_cf(&cf_credited, &index_key)
                .map_err(|e| StoreError::Unavailable(e.to_string()))?
                .is_some();

            if already_applied {
                tracing::info!(
                    user_id = %user_id,
                    idempotency_key = %key,
                    "Duplicate credit delivery, returning account unchanged"
                );
                return Ok(CreditOutcome::Duplicate(account));
            }

            batch.put_cf(&cf_credited, index_key, tx.id.to_bytes());
        }

        account.balance = account.balance.checked_add(tx.amount).ok_or(
            StoreError::BalanceOverflow {
                balance: account.balance,
                credit: tx.amount,
            },
        )?;
        account.history.push(tx.clone());
        account.updated_at = chrono::Utc::now();

        self.put_account(&mut batch, &account)?;
        self.commit(batch)?;
        self.feed.publish(&account);

        Ok(CreditOutcome::Applied(account))
    }

    fn apply_debit(&self, user_id: &UserId, tx: &Transaction) -> Result<CreditAccount> {
        let _guard = self.lock_writer()?;

        let mut account = self.load_account(user_id)?;

        if account.balance < tx.amount {
            return Err(StoreError::InsufficientCredits {
                balance: account.balance,
                requested: tx.amount,
            });
        }

        account.balance -= tx.amount;
        account.history.push(tx.clone());
        account.updated_at = chrono::Utc::now();

        let mut batch = WriteBatch::default();
        self.put_account(&mut batch, &account)?;
        self.commit(batch)?;
        self.feed.publish(&account);

        Ok(account)
    }

    fn watch_account(&self, user_id: &UserId) -> Result<watch::Receiver<Option<CreditAccount>>> {
        self.feed.watch(*user_id, || self.get_account(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    #[test]
    fn create_if_absent_single_winner() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();

        let first = store
            .create_account_if_absent(&CreditAccount::open(user_id, 5))
            .unwrap();
        assert_eq!(first.balance, 5);
        assert_eq!(first.history.len(), 1);

        // A redundant create must return the original record, not reseed it.
        let second = store
            .create_account_if_absent(&CreditAccount::open(user_id, 5))
            .unwrap();
        assert_eq!(second.balance, 5);
        assert_eq!(second.history.len(), 1);
        assert_eq!(second.history[0].id, first.history[0].id);
    }

    #[test]
    fn apply_credit_and_dedup() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        store
            .create_account_if_absent(&CreditAccount::open(user_id, 5))
            .unwrap();

        let tx = Transaction::purchase(
            50,
            "pay_123".into(),
            "Standard pack".into(),
            serde_json::Value::Null,
        );
        let outcome = store.apply_credit(&user_id, &tx).unwrap();
        assert!(!outcome.is_duplicate());
        assert_eq!(outcome.into_account().balance, 55);

        // Redelivery with the same key must change nothing.
        let replay = Transaction::purchase(
            50,
            "pay_123".into(),
            "Standard pack".into(),
            serde_json::Value::Null,
        );
        let outcome = store.apply_credit(&user_id, &replay).unwrap();
        assert!(outcome.is_duplicate());

        let account = outcome.into_account();
        assert_eq!(account.balance, 55);
        assert_eq!(account.history.len(), 2);
        assert_eq!(account.net_history(), 55);
    }

    #[test]
    fn refund_without_key_always_applies() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        store
            .create_account_if_absent(&CreditAccount::open(user_id, 0))
            .unwrap();

        let account = store
            .apply_credit(&user_id, &Transaction::refund(2, "failed form".into()))
            .unwrap()
            .into_account();
        assert_eq!(account.balance, 2);
    }

    #[test]
    fn credit_overflow_is_rejected() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        store
            .create_account_if_absent(&CreditAccount::open(user_id, 5))
            .unwrap();

        let tx = Transaction::purchase(
            u64::MAX,
            "pay_huge".into(),
            "bad".into(),
            serde_json::Value::Null,
        );
        let result = store.apply_credit(&user_id, &tx);
        assert!(matches!(result, Err(StoreError::BalanceOverflow { .. })));

        // Neither the account nor the idempotency index may be written.
        let account = store.get_account(&user_id).unwrap().unwrap();
        assert_eq!(account.balance, 5);
        assert_eq!(account.history.len(), 1);

        // The same key must still be usable by a sane retry.
        let retry = Transaction::purchase(
            50,
            "pay_huge".into(),
            "Standard pack".into(),
            serde_json::Value::Null,
        );
        assert!(!store.apply_credit(&user_id, &retry).unwrap().is_duplicate());
    }

    #[test]
    fn apply_debit_success_and_insufficient() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        store
            .create_account_if_absent(&CreditAccount::open(user_id, 2))
            .unwrap();

        let account = store
            .apply_debit(
                &user_id,
                &Transaction::usage(1, "Form: X".into(), serde_json::Value::Null),
            )
            .unwrap();
        assert_eq!(account.balance, 1);

        let result = store.apply_debit(
            &user_id,
            &Transaction::usage(2, "Form: Y".into(), serde_json::Value::Null),
        );
        assert!(matches!(
            result,
            Err(StoreError::InsufficientCredits {
                balance: 1,
                requested: 2
            })
        ));

        // Failed debit must leave no trace.
        let account = store.get_account(&user_id).unwrap().unwrap();
        assert_eq!(account.balance, 1);
        assert_eq!(account.history.len(), 2);
    }

    #[test]
    fn debit_missing_account_is_not_found() {
        let (store, _dir) = create_test_store();

        let result = store.apply_debit(
            &UserId::generate(),
            &Transaction::usage(1, "Form".into(), serde_json::Value::Null),
        );
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let user_id = UserId::generate();

        {
            let store = RocksStore::open(dir.path()).unwrap();
            store
                .create_account_if_absent(&CreditAccount::open(user_id, 5))
                .unwrap();
            let tx = Transaction::purchase(
                20,
                "pay_1".into(),
                "Starter pack".into(),
                serde_json::Value::Null,
            );
            store.apply_credit(&user_id, &tx).unwrap();
        }

        let store = RocksStore::open(dir.path()).unwrap();
        let account = store.get_account(&user_id).unwrap().unwrap();
        assert_eq!(account.balance, 25);
        assert_eq!(account.history.len(), 2);

        // Idempotency index must survive too.
        let replay = Transaction::purchase(
            20,
            "pay_1".into(),
            "Starter pack".into(),
            serde_json::Value::Null,
        );
        assert!(store.apply_credit(&user_id, &replay).unwrap().is_duplicate());
    }

    #[tokio::test]
    async fn watch_sees_mutations() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();

        let mut receiver = store.watch_account(&user_id).unwrap();
        assert!(receiver.borrow().is_none());

        store
            .create_account_if_absent(&CreditAccount::open(user_id, 5))
            .unwrap();
        receiver.changed().await.unwrap();
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
