//! Exclusive access lock serializing lifecycle-mutating operations.
//!
//! The lock is process-wide and not tied to any statification. Only the
//! held/free state matters, never the identity of the holder.

mod file;
mod memory;

pub use file::{FileLockManager, LOCK_SENTINEL};
pub use memory::InMemoryLockManager;

use thiserror::Error;

/// Errors from the lock backend.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Non-blocking, idempotently releasable mutual exclusion.
pub trait LockManager: Send + Sync {
    /// Try to take the lock. Returns `false` immediately if it is already held.
    fn try_acquire(&self) -> Result<bool, LockError>;

    /// Free the lock. Releasing a free lock is a no-op.
    fn release(&self) -> Result<(), LockError>;

    /// Whether the lock is currently held by anyone.
    fn is_locked(&self) -> Result<bool, LockError>;
}

/// Releases a lock when dropped unless disarmed.
///
/// Used on synchronous admission paths that take the lock and may bail out
/// before handing it over to a background job.
pub struct LockGuard<'a> {
    lock: &'a dyn LockManager,
    armed: bool,
}

impl<'a> LockGuard<'a> {
    pub fn new(lock: &'a dyn LockManager) -> Self {
        Self { lock, armed: true }
    }

    /// Keep the lock held past the guard's lifetime.
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.lock.release() {
                tracing::error!(error = %e, "Failed to release lock");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_releases_on_drop() {
        let lock = InMemoryLockManager::new();
        assert!(lock.try_acquire().unwrap());
        {
            let _guard = LockGuard::new(&lock);
        }
        assert!(!lock.is_locked().unwrap());
    }

    #[test]
    fn test_disarmed_guard_keeps_lock() {
        let lock = InMemoryLockManager::new();
        assert!(lock.try_acquire().unwrap());
        LockGuard::new(&lock).disarm();
        assert!(lock.is_locked().unwrap());
    }
}
