//! Per-key locks serializing concurrent cache misses

use crate::cache::CacheKey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<CacheKey, Arc<AsyncMutex<()>>>;

/// Registry of in-flight keys
///
/// Entries exist only while some task holds or waits for the key.
#[derive(Default)]
pub(crate) struct KeyLocks {
    locks: Mutex<LockMap>,
}

/// Exclusive hold on one key, released on drop
pub(crate) struct KeyGuard<'a> {
    owner: &'a KeyLocks,
    key: CacheKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyLocks {
    fn map(&self) -> MutexGuard<'_, LockMap> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait until no other task holds `key`
    pub(crate) async fn acquire(&self, key: &CacheKey) -> KeyGuard<'_> {
        let lock = self.map().entry(key.clone()).or_default().clone();
        let guard = lock.lock_owned().await;
        KeyGuard {
            owner: self,
            key: key.clone(),
            guard: Some(guard),
        }
    }

    /// Number of keys currently held or awaited
    #[cfg(test)]
    pub(crate) fn in_flight(&self) -> usize {
        self.map().len()
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut map = self.owner.map();
        if map
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&self.key);
        }
    }
}
