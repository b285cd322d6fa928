//! Per-key serialisation of cache misses.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Hands out one async lock per cache key so that concurrent misses on the
/// same key compute once. The registry holds weak references; a key's slot
/// is pruned when its last holder drops the guard.
#[derive(Debug, Default)]
pub(crate) struct MissCoalescer {
    locks: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl MissCoalescer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive ownership of `key`.
    pub(crate) async fn acquire(&self, key: &str) -> KeyGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock();
            match locks.get(key).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(AsyncMutex::new(()));
                    locks.insert(key.to_string(), Arc::downgrade(&lock));
                    lock
                }
            }
        };

        let guard = lock.lock_owned().await;
        KeyGuard {
            coalescer: self,
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.locks.lock().len()
    }
}

/// Exclusive hold on one key. Dropping it releases the key.
pub(crate) struct KeyGuard<'a> {
    coalescer: &'a MissCoalescer,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        // Release the async lock first so the strong count reflects waiters only
        let lock = self.guard.take().map(|guard| OwnedMutexGuard::mutex(&guard).clone());
        let mut locks = self.coalescer.locks.lock();
        if let Some(lock) = lock {
            // One reference is ours; anything above that is a waiter
            if Arc::strong_count(&lock) <= 1 {
                locks.remove(&self.key);
            }
        }
    }
}
