//! Keyed locks serializing writes per enrollment.
//!
//! Every mutation touching a `(user, course)` enrollment runs while holding the
//! lock for that key. Different keys never contend.

mod guard;
mod in_memory;

use std::sync::Arc;

use thiserror::Error;

pub use guard::LockGuard;
pub use in_memory::{InMemoryLock, InMemoryLockManager};

/// Error type for lock operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// The underlying primitive was poisoned (a holder panicked).
    #[error("lock poisoned: {0}")]
    Poisoned(String),
    /// Failed to acquire the lock.
    #[error("lock acquire failed: {0}")]
    AcquireFailed(String),
    /// Failed to release the lock.
    #[error("lock release failed: {0}")]
    ReleaseFailed(String),
}

/// A single lock instance.
///
/// In-memory locks use `Mutex` + `Condvar`; a shared deployment would back
/// this with Postgres advisory locks or a Redis lease.
pub trait Lock: Send + Sync {
    /// Acquire the lock, blocking until it becomes available.
    fn lock(&self) -> Result<(), LockError>;

    /// Try to acquire the lock without blocking.
    /// Returns `Ok(true)` if acquired, `Ok(false)` if already held.
    fn try_lock(&self) -> Result<bool, LockError>;

    /// Release the lock.
    fn unlock(&self) -> Result<(), LockError>;
}

/// Hands out one lock per key.
pub trait LockManager: Send + Sync {
    type Lock: Lock;

    /// Get (or create) the lock for `key`.
    ///
    /// Repeated calls with the same key must return the same logical lock.
    fn get_lock(&self, key: &str) -> Result<Arc<Self::Lock>, LockError>;

    /// Block until the lock for `key` is held and return a guard releasing it on drop.
    fn acquire(&self, key: &str) -> Result<LockGuard<Self::Lock>, LockError> {
        let lock = self.get_lock(key)?;
        lock.lock()?;
        Ok(LockGuard::new(lock, key))
    }

    /// Forget the lock for `key` if nobody holds or waits on it.
    ///
    /// Returns true when the entry was dropped. Managers without per-key
    /// state keep the default no-op.
    fn evict_idle(&self, _key: &str) -> Result<bool, LockError> {
        Ok(false)
    }

    /// Like [`LockManager::acquire`] but returns `None` instead of waiting.
    fn try_acquire(&self, key: &str) -> Result<Option<LockGuard<Self::Lock>>, LockError> {
        let lock = self.get_lock(key)?;
        if lock.try_lock()? {
            Ok(Some(LockGuard::new(lock, key)))
        } else {
            Ok(None)
        }
    }
}
