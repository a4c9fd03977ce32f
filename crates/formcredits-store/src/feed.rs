//! Change-feed plumbing shared by the store backends.
//!
//! Each watched account gets a `tokio::sync::watch` channel holding the
//! latest snapshot. Publishing replaces the value; subscribers observe every
//! change after the one they were seeded with. Channels with no remaining
//! receivers are pruned on the next publish.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::watch;

use formcredits_core::{CreditAccount, UserId};

/// Per-user change-feed registry.
pub struct ChangeFeed {
    channels: Mutex<HashMap<UserId, watch::Sender<Option<CreditAccount>>>>,
}

impl ChangeFeed {
    /// Create an empty feed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to a user's account, seeding a new channel from `load`
    /// when no live channel exists.
    ///
    /// `load` runs while the registry is locked, so a mutation committed
    /// after the seed read is guaranteed to be published to the new channel
    /// rather than lost.
    ///
    /// # Errors
    ///
    /// Propagates the error from `load`.
    pub fn watch<E>(
        &self,
        user_id: UserId,
        load: impl FnOnce() -> Result<Option<CreditAccount>, E>,
    ) -> Result<watch::Receiver<Option<CreditAccount>>, E> {
        let mut channels = self.lock();

        if let Some(sender) = channels.get(&user_id) {
            if !sender.is_closed() {
                return Ok(sender.subscribe());
            }
        }

        let (sender, receiver) = watch::channel(load()?);
        channels.insert(user_id, sender);
        Ok(receiver)
    }

    /// Publish a new snapshot to the user's channel, if anyone is watching.
    pub fn publish(&self, account: &CreditAccount) {
        let mut channels = self.lock();

        if let Some(sender) = channels.get(&account.user_id) {
            if sender.receiver_count() == 0 {
                channels.remove(&account.user_id);
            } else {
                sender.send_replace(Some(account.clone()));
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<UserId, watch::Sender<Option<CreditAccount>>>> {
        // The map holds no invariants a panic could break mid-update.
        self.channels
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}
