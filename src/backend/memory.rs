//! In-process backend
//!
//! Holds a tree of backend records in memory. Supports paged (incomplete)
//! listings, artificial latency and injected per-path failures, which makes it
//! the backend of choice for tests and demos.

use super::{BackendChildEntry, BackendLister, BackendListing, BackendRecord, PageCursor};
use crate::error::BackendError;
use crate::types::{NodeName, NodeNamesPath, NodeType};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub struct MemoryBackend {
    records: RwLock<BTreeMap<NodeNamesPath, BackendRecord>>,
    failing: RwLock<HashSet<NodeNamesPath>>,
    /// Maximum children returned per page; longer listings continue through a cursor
    page_size: Option<usize>,
    /// Whether listings carry full child records
    inline_child_records: bool,
    latency: Option<Duration>,
    list_calls: AtomicUsize,
    stat_calls: AtomicUsize,
}

impl MemoryBackend {
    /// Backend holding only an empty root directory
    pub fn new() -> Self {
        let mut records = BTreeMap::new();
        records.insert(NodeNamesPath::root(), Self::dir_record(NodeName::new("")));
        Self {
            records: RwLock::new(records),
            failing: RwLock::new(HashSet::new()),
            page_size: None,
            inline_child_records: false,
            latency: None,
            list_calls: AtomicUsize::new(0),
            stat_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn with_inline_child_records(mut self, inline: bool) -> Self {
        self.inline_child_records = inline;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn dir_record(name: NodeName) -> BackendRecord {
        BackendRecord {
            name,
            node_type: NodeType::Dir,
            creation_time: 0,
            last_modified_time: 0,
            length: 0,
            attrs: BTreeMap::new(),
            child_names: Vec::new(),
        }
    }

    /// Add a directory, creating missing parents
    pub fn add_dir(&self, path: &str) -> NodeNamesPath {
        let path = NodeNamesPath::parse(path);
        let mut records = self.records.write();
        Self::insert_with_parents(&mut records, &path, NodeType::Dir, 0);
        path
    }

    /// Add a file of `length` bytes, creating missing parents
    pub fn add_file(&self, path: &str, length: u64) -> NodeNamesPath {
        let path = NodeNamesPath::parse(path);
        let mut records = self.records.write();
        Self::insert_with_parents(&mut records, &path, NodeType::File, length);
        path
    }

    fn insert_with_parents(
        records: &mut BTreeMap<NodeNamesPath, BackendRecord>,
        path: &NodeNamesPath,
        node_type: NodeType,
        length: u64,
    ) {
        let mut current = NodeNamesPath::root();
        for (index, name) in path.names().iter().enumerate() {
            let child = current.child(name.clone());
            if let Some(parent) = records.get_mut(&current) {
                if !parent.child_names.contains(name) {
                    parent.child_names.push(name.clone());
                    parent.child_names.sort();
                }
            }
            let is_last = index + 1 == path.len();
            records.entry(child.clone()).or_insert_with(|| {
                if is_last && node_type == NodeType::File {
                    BackendRecord {
                        name: name.clone(),
                        node_type: NodeType::File,
                        creation_time: 0,
                        last_modified_time: 0,
                        length,
                        attrs: BTreeMap::new(),
                        child_names: Vec::new(),
                    }
                } else {
                    Self::dir_record(name.clone())
                }
            });
            current = child;
        }
    }

    /// Remove a node and its subtree
    pub fn delete(&self, path: &str) {
        let path = NodeNamesPath::parse(path);
        let mut records = self.records.write();
        records.retain(|p, _| !p.starts_with(&path));
        if let (Some(parent), Some(name)) = (path.parent(), path.last()) {
            if let Some(record) = records.get_mut(&parent) {
                record.child_names.retain(|child| child != name);
            }
        }
    }

    /// Make every listing or stat of `path` fail
    pub fn fail_on(&self, path: &str) {
        self.failing.write().insert(NodeNamesPath::parse(path));
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn stat_calls(&self) -> usize {
        self.stat_calls.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_failure(&self, path: &NodeNamesPath) -> Result<(), BackendError> {
        if self.failing.read().contains(path) {
            return Err(BackendError::ListingFailed(format!(
                "injected failure at {}",
                path
            )));
        }
        Ok(())
    }

    fn lookup(&self, path: &NodeNamesPath) -> Result<BackendRecord, BackendError> {
        self.records
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(path.to_string()))
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackendLister for MemoryBackend {
    async fn list_page(
        &self,
        path: &NodeNamesPath,
        cursor: Option<&PageCursor>,
    ) -> Result<BackendListing, BackendError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        self.check_failure(path)?;

        let offset = match cursor {
            Some(cursor) => cursor.as_str().parse::<usize>().map_err(|_| {
                BackendError::ListingFailed(format!(
                    "bad page cursor {:?} for {}",
                    cursor.as_str(),
                    path
                ))
            })?,
            None => 0,
        };

        let mut record = self.lookup(path)?;
        let total = record.child_names.len();
        let end = match self.page_size {
            Some(page_size) => offset.saturating_add(page_size).min(total),
            None => total,
        };
        record.child_names = record
            .child_names
            .get(offset.min(total)..end)
            .map(<[NodeName]>::to_vec)
            .unwrap_or_default();
        let next_page = (end < total).then(|| PageCursor::new(end.to_string()));

        let records = self.records.read();
        let children = record
            .child_names
            .iter()
            .filter_map(|name| {
                let child = records.get(&path.child(name.clone()))?;
                Some(BackendChildEntry {
                    name: name.clone(),
                    node_type: child.node_type,
                    record: self.inline_child_records.then(|| child.clone()),
                })
            })
            .collect();

        Ok(BackendListing {
            record,
            children,
            is_incomplete: next_page.is_some(),
            next_page,
        })
    }

    async fn stat(&self, path: &NodeNamesPath) -> Result<BackendRecord, BackendError> {
        self.stat_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        self.check_failure(path)?;
        self.lookup(path)
    }
}
