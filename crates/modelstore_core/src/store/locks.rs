//! In-process critical sections keyed by document id.
//!
//! # Invariants
//! - An id has a map entry only while some caller holds or waits on its lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One mutex per document id, created on first use and dropped by the last
/// releasing caller.
#[derive(Debug, Default)]
pub(super) struct IdLocks {
    entries: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IdLocks {
    /// Runs `critical` while holding the lock for `id`.
    pub(super) fn with_lock<T>(&self, id: &str, critical: impl FnOnce() -> T) -> T {
        let lease = self.lease(id);
        let _guard = lock_ignoring_poison(&lease.slot);
        critical()
    }

    fn lease<'a>(&'a self, id: &'a str) -> Lease<'a> {
        let mut entries = lock_ignoring_poison(&self.entries);
        let slot = Arc::clone(entries.entry(id.to_string()).or_default());
        Lease {
            locks: self,
            id,
            slot,
        }
    }

    #[cfg(test)]
    pub(super) fn tracked(&self) -> usize {
        lock_ignoring_poison(&self.entries).len()
    }
}

/// Shared handle on one id's mutex; prunes the map entry on last release.
struct Lease<'a> {
    locks: &'a IdLocks,
    id: &'a str,
    slot: Arc<Mutex<()>>,
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        // New leases are taken under the map lock, so a count of two (map plus
        // this lease) cannot grow while we hold it.
        let mut entries = lock_ignoring_poison(&self.locks.entries);
        let last = entries
            .get(self.id)
            .is_some_and(|slot| Arc::ptr_eq(slot, &self.slot) && Arc::strong_count(slot) == 2);
        if last {
            entries.remove(self.id);
        }
    }
}

/// Locks `mutex`, recovering the guard if a previous holder panicked.
///
/// Guarded sections only sequence file I/O, so no in-memory state can be left
/// half-updated.
pub(super) fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
