//! Per-user serialisation of flows.

use dashmap::DashMap;
use gatekeeper_types::UserId;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per user with a flow in progress.
///
/// An entry is dropped as soon as nobody holds or waits on it. Both the
/// clone in [`UserLocks::acquire`] and the check in [`UserLocks::release`]
/// happen under the map's shard lock, so a waiter can never end up on a
/// mutex that has been removed.
#[derive(Debug, Default)]
pub(crate) struct UserLocks {
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl UserLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn acquire(&self, user: UserId) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(user).or_default().clone();
        lock.lock_owned().await
    }

    /// Drop the guard and forget the user's mutex if it is idle.
    pub(crate) fn release(&self, user: UserId, guard: OwnedMutexGuard<()>) {
        drop(guard);
        self.locks
            .remove_if(&user, |_, lock| Arc::strong_count(lock) == 1);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.len()
    }
}
