use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use tracing::debug;

use super::{Lock, LockError, LockManager};

/// Process-local lock backed by `Mutex<bool>` + `Condvar`.
///
/// Unlike a `MutexGuard`, holding this lock is not tied to a stack frame, so
/// it can be taken in one call and released through a [`super::LockGuard`].
pub struct InMemoryLock {
    held: Mutex<bool>,
    released: Condvar,
}

impl InMemoryLock {
    pub fn new() -> Self {
        InMemoryLock {
            held: Mutex::new(false),
            released: Condvar::new(),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, bool>, LockError> {
        self.held
            .lock()
            .map_err(|e| LockError::Poisoned(e.to_string()))
    }

    fn is_held(&self) -> bool {
        self.held.lock().map(|held| *held).unwrap_or(true)
    }
}

impl Default for InMemoryLock {
    fn default() -> Self {
        Self::new()
    }
}

impl Lock for InMemoryLock {
    fn lock(&self) -> Result<(), LockError> {
        let mut held = self
            .released
            .wait_while(self.state()?, |held| *held)
            .map_err(|e| LockError::Poisoned(e.to_string()))?;
        *held = true;
        Ok(())
    }

    fn try_lock(&self) -> Result<bool, LockError> {
        let mut held = self.state()?;
        if *held {
            return Ok(false);
        }
        *held = true;
        Ok(true)
    }

    fn unlock(&self) -> Result<(), LockError> {
        let mut held = self.state()?;
        if *held {
            *held = false;
            self.released.notify_one();
        }
        Ok(())
    }
}

/// Lock manager creating one [`InMemoryLock`] per key on first use.
#[derive(Default)]
pub struct InMemoryLockManager {
    locks: Mutex<HashMap<String, Arc<InMemoryLock>>>,
}

impl InMemoryLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> Result<usize, LockError> {
        Ok(self.map()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, LockError> {
        Ok(self.map()?.is_empty())
    }

    /// Drop locks that nobody holds or references. Returns how many were removed.
    pub fn prune(&self) -> Result<usize, LockError> {
        let mut locks = self.map()?;
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1 || lock.is_held());
        let removed = before - locks.len();
        if removed > 0 {
            debug!(removed, remaining = locks.len(), "pruned idle locks");
        }
        Ok(removed)
    }

    fn map(&self) -> Result<MutexGuard<'_, HashMap<String, Arc<InMemoryLock>>>, LockError> {
        self.locks
            .lock()
            .map_err(|_| LockError::Poisoned("lock manager map poisoned".into()))
    }
}

impl LockManager for InMemoryLockManager {
    type Lock = InMemoryLock;

    fn get_lock(&self, key: &str) -> Result<Arc<InMemoryLock>, LockError> {
        let mut locks = self.map()?;
        Ok(locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(InMemoryLock::new()))
            .clone())
    }

    fn evict_idle(&self, key: &str) -> Result<bool, LockError> {
        let mut locks = self.map()?;
        // Holders and waiters each keep an `Arc`, and new ones can only get
        // one through this map, so a lone reference means the key is idle.
        let idle = locks
            .get(key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1 && !lock.is_held());
        if idle {
            locks.remove(key);
        }
        Ok(idle)
    }
}
