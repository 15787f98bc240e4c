//! Per-content-hash mutual exclusion.
//!
//! Uploads and deletes touching the same content hash serialize on one
//! async mutex; operations on distinct hashes never contend. Lock slots
//! are created on demand and pruned once no task holds them.

use blobvault_core::ContentHash;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-hash locks.
#[derive(Default)]
pub struct HashLocks {
    locks: DashMap<ContentHash, Arc<Mutex<()>>>,
}

impl HashLocks {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for a hash, waiting if another task holds it.
    pub async fn acquire(&self, hash: ContentHash) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(hash)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drops the lock slot for a hash if no task currently holds or awaits
    /// it. An outstanding guard keeps its Arc alive, so `strong_count == 1`
    /// means only the registry references the slot.
    pub fn prune(&self, hash: ContentHash) {
        self.locks
            .remove_if(&hash, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Number of live lock slots (test visibility).
    pub fn slot_count(&self) -> usize {
        self.locks.len()
    }
}
