//! Per-key async locks.
//!
//! Callers holding the guard for a key run one at a time; different keys
//! never wait on each other. An entry is removed from the map when its last
//! holder releases it and nobody is waiting.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

pub struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

pub struct KeyGuard<'a, K: Eq + Hash> {
    owner: &'a KeyedLocks<K>,
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn map(&self) -> MutexGuard<'_, HashMap<K, Arc<AsyncMutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait until no one else holds `key`.
    pub async fn lock(&self, key: K) -> KeyGuard<'_, K> {
        let lock = self
            .map()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        let guard = lock.lock_owned().await;
        KeyGuard {
            owner: self,
            key,
            guard: Some(guard),
        }
    }

    /// Keys currently held or waited on.
    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> Drop for KeyGuard<'_, K> {
    fn drop(&mut self) {
        let mut map = self.owner.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(guard) = self.guard.take() {
            // One reference in the map, one in this guard.
            let idle = map
                .get(&self.key)
                .is_some_and(|lock| Arc::strong_count(lock) == 2);
            drop(guard);
            if idle {
                map.remove(&self.key);
            }
        }
    }
}
