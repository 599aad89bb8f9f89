//! In-memory lock, for tests and single-process embedding.

use std::sync::atomic::{AtomicBool, Ordering};

use super::{LockError, LockManager};

/// Lock held in an atomic flag. Does not survive restarts.
#[derive(Debug, Default)]
pub struct InMemoryLockManager {
    held: AtomicBool,
}

impl InMemoryLockManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LockManager for InMemoryLockManager {
    fn try_acquire(&self) -> Result<bool, LockError> {
        Ok(self
            .held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok())
    }

    fn release(&self) -> Result<(), LockError> {
        self.held.store(false, Ordering::Release);
        Ok(())
    }

    fn is_locked(&self) -> Result<bool, LockError> {
        Ok(self.held.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_acquire_release_cycle() {
        let lock = InMemoryLockManager::new();
        assert!(!lock.is_locked().unwrap());
        assert!(lock.try_acquire().unwrap());
        assert!(!lock.try_acquire().unwrap());
        lock.release().unwrap();
        lock.release().unwrap();
        assert!(lock.try_acquire().unwrap());
    }

    #[test]
    fn test_single_holder_across_threads() {
        let lock = Arc::new(InMemoryLockManager::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let lock = Arc::clone(&lock);
                std::thread::spawn(move || lock.try_acquire().unwrap())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|held| *held)
            .count();
        assert_eq!(winners, 1);
    }
}
