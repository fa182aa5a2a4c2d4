use std::sync::Arc;

use tracing::error;

use super::{Lock, LockError};

/// Holds a keyed lock until dropped.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<L: Lock> {
    lock: Option<Arc<L>>,
    key: String,
}

impl<L: Lock> LockGuard<L> {
    pub(super) fn new(lock: Arc<L>, key: &str) -> Self {
        Self {
            lock: Some(lock),
            key: key.to_string(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release now, surfacing any unlock error instead of logging it.
    pub fn release(mut self) -> Result<(), LockError> {
        match self.lock.take() {
            Some(lock) => lock.unlock(),
            None => Ok(()),
        }
    }
}

impl<L: Lock> Drop for LockGuard<L> {
    fn drop(&mut self) {
        if let Some(lock) = self.lock.take() {
            if let Err(err) = lock.unlock() {
                error!(key = %self.key, error = %err, "failed to release lock");
            }
        }
    }
}

impl<L: Lock> std::fmt::Debug for LockGuard<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard").field("key", &self.key).finish()
    }
}
