//! Per-key asynchronous mutual exclusion.
//!
//! [`KeyedLock`] hands out at most one guard per key at a time while leaving
//! holders of distinct keys fully concurrent. Entries are created lazily on
//! first acquisition and removed again once the last interested task lets
//! go, so an idle lock map holds no state.
//!
//! The insert path uses this to serialize insert-plus-identity-resolution
//! per table name: two inserts into the same table queue up, inserts into
//! different tables overlap freely.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

type Slots = HashMap<String, Arc<AsyncMutex<()>>>;

/// A map of lazily-created asynchronous locks, one per key.
#[derive(Debug, Default)]
pub struct KeyedLock {
    slots: Mutex<Slots>,
}

impl KeyedLock {
    /// Create an empty lock map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `key`, waiting until any current holder of the
    /// same key releases it. Holders of other keys are not awaited.
    pub async fn acquire(&self, key: &str) -> KeyedLockGuard<'_> {
        let slot = {
            let mut slots = self.lock_slots();
            slots.entry(key.to_string()).or_default().clone()
        };
        let guard = slot.lock_owned().await;
        debug!(key = %key, "keyed lock acquired");
        KeyedLockGuard {
            owner: self,
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of keys currently tracked (held or awaited).
    pub fn len(&self) -> usize {
        self.lock_slots().len()
    }

    /// Check whether no key is currently tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_slots(&self) -> std::sync::MutexGuard<'_, Slots> {
        // A poisoned map only means a panic elsewhere; the data is a plain
        // HashMap and stays usable.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive access to one key of a [`KeyedLock`].
///
/// Dropping the guard releases the key and removes the map entry when no
/// other task is waiting on it.
#[derive(Debug)]
pub struct KeyedLockGuard<'a> {
    owner: &'a KeyedLock,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyedLockGuard<'_> {
    fn drop(&mut self) {
        // Release the mutex (and our Arc clone of the slot) before deciding
        // whether the entry can be pruned.
        self.guard.take();
        let mut slots = self.owner.lock_slots();
        if let Some(slot) = slots.get(&self.key) {
            if Arc::strong_count(slot) == 1 {
                slots.remove(&self.key);
                debug!(key = %self.key, "keyed lock entry pruned");
            }
        }
    }
}
