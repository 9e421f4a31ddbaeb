//! Cached Base Tree
//!
//! In-memory, read-only (to callers) cache of backend truth. Populated only
//! through the prefetch protocol; the override overlay never writes here.

use crate::concurrency::PathLockManager;
use crate::error::StorageError;
use crate::tree::{NodeData, PartialNodeData, PartialTreeData, TreeData};
use crate::types::{now_millis, NodeName, NodeNamesPath, TimeMillis};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::debug;

fn default_max_age_millis() -> i64 {
    300_000
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Age after which a record counts as stale; negative means never
    #[serde(default = "default_max_age_millis")]
    pub max_age_millis: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age_millis: default_max_age_millis(),
        }
    }
}

/// A fully known record plus its query stamp
///
/// The record itself is replaced wholesale on refresh; only the query time is
/// updated in place, atomically.
struct CachedNode {
    data: Arc<NodeData>,
    last_query_time_millis: AtomicI64,
}

impl CachedNode {
    fn new(data: NodeData) -> Arc<Self> {
        let last_query = data.stamps.last_tree_data_query_time_millis;
        Arc::new(Self {
            data: Arc::new(data),
            last_query_time_millis: AtomicI64::new(last_query),
        })
    }

    fn snapshot(&self) -> NodeData {
        let mut data = (*self.data).clone();
        data.stamps.last_tree_data_query_time_millis =
            self.last_query_time_millis.load(Ordering::SeqCst);
        data
    }
}

#[derive(Clone)]
enum CacheEntry {
    Complete(Arc<CachedNode>),
    /// Directory whose child listing is still incomplete
    Partial {
        template: Arc<NodeData>,
        partial: PartialNodeData,
    },
}

/// In-memory cached base tree
pub struct CachedTree {
    entries: RwLock<HashMap<NodeNamesPath, CacheEntry>>,
    path_locks: PathLockManager,
    config: CacheConfig,
}

impl CachedTree {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            path_locks: PathLockManager::new(),
            config,
        }
    }

    /// Store a record produced by prefetch
    ///
    /// An incomplete directory record merges into the partial knowledge for
    /// the path. A complete record supersedes it; children it no longer lists
    /// are evicted along with everything cached beneath them. Returns the
    /// names of those evicted children.
    pub fn put_prefetched(
        &self,
        path: &NodeNamesPath,
        data: NodeData,
        is_incomplete: bool,
    ) -> Vec<NodeName> {
        let lock = self.path_locks.get_lock(path);
        let _guard = lock.lock();

        let existing = self.entries.read().get(path).cloned();

        if is_incomplete && data.is_dir() {
            let entry = match existing {
                Some(CacheEntry::Complete(node)) => {
                    // Already complete: keep the child set, take the fresh attributes
                    debug!(path = %path, "Ignoring fragment for complete directory");
                    let merged = data.with_child_names(node.data.child_names.clone());
                    CacheEntry::Complete(CachedNode::new(merged))
                }
                Some(CacheEntry::Partial { mut partial, .. }) => {
                    let added = partial.merge_fragment(data.child_names.iter().cloned());
                    debug!(path = %path, added = added.len(), "Merged listing fragment");
                    CacheEntry::Partial {
                        template: Arc::new(data),
                        partial,
                    }
                }
                None => {
                    let mut partial = PartialNodeData::absent();
                    partial.merge_fragment(data.child_names.iter().cloned());
                    CacheEntry::Partial {
                        template: Arc::new(data),
                        partial,
                    }
                }
            };
            self.entries.write().insert(path.clone(), entry);
            return Vec::new();
        }

        let (stale, mut partial) = match existing {
            Some(CacheEntry::Complete(node)) => {
                (Some(node.data.child_names.clone()), PartialNodeData::absent())
            }
            Some(CacheEntry::Partial { partial, .. }) => (None, partial),
            None => (None, PartialNodeData::absent()),
        };
        let removed = partial.merge_complete_listing(&data.child_names, stale.as_ref());

        self.entries
            .write()
            .insert(path.clone(), CacheEntry::Complete(CachedNode::new(data)));

        for name in &removed {
            let evicted = self.evict_subtree(&path.child(name.clone()));
            debug!(path = %path, child = %name, evicted, "Evicted removed child");
        }
        removed
    }

    /// Evict `path` and all cached descendants, along with their merge locks
    pub fn evict_subtree(&self, path: &NodeNamesPath) -> usize {
        let evicted = {
            let mut entries = self.entries.write();
            let before = entries.len();
            entries.retain(|p, _| !p.starts_with(path));
            before - entries.len()
        };
        self.path_locks.prune_under(path);
        evicted
    }

    /// Best-effort record: complete data, or the incomplete template with the
    /// child names known so far. The flag is true when complete.
    pub fn get_best_effort(&self, path: &NodeNamesPath) -> Option<(NodeData, bool)> {
        let entries = self.entries.read();
        match entries.get(path)? {
            CacheEntry::Complete(node) => Some((node.snapshot(), true)),
            CacheEntry::Partial { template, partial } => Some((
                template.with_child_names(partial.child_names_present.clone()),
                false,
            )),
        }
    }

    /// Whether the record at `path` is older than `max_age_millis`
    ///
    /// `None` when nothing complete is cached.
    pub fn is_stale(&self, path: &NodeNamesPath, now: TimeMillis) -> Option<bool> {
        let entries = self.entries.read();
        match entries.get(path)? {
            CacheEntry::Complete(node) => Some(self.is_stale_record(&node.data, now)),
            CacheEntry::Partial { .. } => None,
        }
    }

    pub fn stale_paths(&self, now: TimeMillis) -> Vec<NodeNamesPath> {
        let entries = self.entries.read();
        let mut paths: Vec<NodeNamesPath> = entries
            .iter()
            .filter_map(|(path, entry)| match entry {
                CacheEntry::Complete(node) if self.is_stale_record(&node.data, now) => {
                    Some(path.clone())
                }
                _ => None,
            })
            .collect();
        paths.sort();
        paths
    }

    fn is_stale_record(&self, data: &NodeData, now: TimeMillis) -> bool {
        self.config.max_age_millis >= 0
            && now - data.stamps.last_external_refresh_time_millis > self.config.max_age_millis
    }

    pub fn paths(&self) -> Vec<NodeNamesPath> {
        let mut paths: Vec<NodeNamesPath> = self.entries.read().keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for CachedTree {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl TreeData for CachedTree {
    fn get(&self, path: &NodeNamesPath) -> Result<Option<NodeData>, StorageError> {
        let entries = self.entries.read();
        match entries.get(path) {
            Some(CacheEntry::Complete(node)) => {
                node.last_query_time_millis
                    .store(now_millis(), Ordering::SeqCst);
                Ok(Some(node.snapshot()))
            }
            Some(CacheEntry::Partial { .. }) | None => Ok(None),
        }
    }
}

impl PartialTreeData for CachedTree {
    fn get_partial(&self, path: &NodeNamesPath) -> PartialNodeData {
        let entries = self.entries.read();
        match entries.get(path) {
            Some(CacheEntry::Complete(node)) => PartialNodeData::from_complete(node.snapshot()),
            Some(CacheEntry::Partial { partial, .. }) => partial.clone(),
            None => PartialNodeData::absent(),
        }
    }
}
