//! Per-path locking for read-modify-write merges
//!
//! Reads of cached records take no per-path lock. Merges of listing fragments
//! into the same node serialise on that node's lock so concurrent prefetch
//! branches cannot lose each other's fragments.

use crate::types::NodeNamesPath;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// Per-path lock manager
///
/// Different paths never contend; the same path is mutually exclusive.
pub struct PathLockManager {
    /// Map from path to per-path lock
    locks: RwLock<HashMap<NodeNamesPath, Arc<Mutex<()>>>>,
}

impl PathLockManager {
    pub fn new() -> Self {
        Self {
            locks: RwLock::new(HashMap::new()),
        }
    }

    /// Get or create the lock for a path
    pub fn get_lock(&self, path: &NodeNamesPath) -> Arc<Mutex<()>> {
        {
            let map = self.locks.read();
            if let Some(lock) = map.get(path) {
                return lock.clone();
            }
        }

        let mut map = self.locks.write();
        // Double-check after acquiring write lock
        map.entry(path.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop locks nobody holds any more
    pub fn prune(&self) -> usize {
        let mut map = self.locks.write();
        let before = map.len();
        map.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - map.len()
    }

    /// Drop unheld locks for `prefix` and every path beneath it
    pub fn prune_under(&self, prefix: &NodeNamesPath) -> usize {
        let mut map = self.locks.write();
        let before = map.len();
        map.retain(|path, lock| !path.starts_with(prefix) || Arc::strong_count(lock) > 1);
        before - map.len()
    }

    pub fn len(&self) -> usize {
        self.locks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.read().is_empty()
    }
}

impl Default for PathLockManager {
    fn default() -> Self {
        Self::new()
    }
}
