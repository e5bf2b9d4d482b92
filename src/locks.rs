// Copyright (c) 2024-2025 Peersync contributors
// Licensed under the MIT License. See LICENSE file for details.

//! Lock helpers that recover from poisoning instead of panicking.
//!
//! The shared session view is read from the CLI and written by poll ticks. If
//! a task panics while holding the write lock, the view may be one snapshot
//! stale, but the next applied refresh replaces it wholesale anyway, so
//! recovering the guard is always safe here.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Acquire a read lock, recovering the guard if the lock was poisoned.
#[inline]
pub fn resilient_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::error!(
                target: "peersync::locks",
                "session view lock poisoned during read; recovering"
            );
            poisoned.into_inner()
        }
    }
}

/// Acquire a write lock, recovering the guard if the lock was poisoned.
#[inline]
pub fn resilient_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::error!(
                target: "peersync::locks",
                "session view lock poisoned during write; recovering"
            );
            poisoned.into_inner()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_resilient_read_normal() {
        let lock = RwLock::new(42);
        assert_eq!(*resilient_read(&lock), 42);
    }

    #[test]
    fn test_resilient_write_normal() {
        let lock = RwLock::new(42);
        {
            let mut guard = resilient_write(&lock);
            *guard = 100;
        }
        assert_eq!(*resilient_read(&lock), 100);
    }

    #[test]
    fn test_recovers_from_poisoned_lock() {
        let lock = Arc::new(RwLock::new(42));
        let lock_clone = Arc::clone(&lock);

        let handle = thread::spawn(move || {
            let _guard = lock_clone.write().unwrap();
            panic!("intentional panic to poison lock");
        });
        let _ = handle.join();

        assert_eq!(*resilient_read(&lock), 42);
        *resilient_write(&lock) = 7;
        assert_eq!(*resilient_read(&lock), 7);
    }
}
