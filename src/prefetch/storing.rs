//! Result sink that stores prefetched records into the cached base

use super::{PrefetchNodeDataContext, PrefetchProposedPathItem, ProposalOutcome};
use crate::cache::CachedTree;
use crate::tree::NodeData;
use crate::types::NodeNamesPath;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Handling of proposed children
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalPolicy {
    /// Fetch full data immediately
    #[default]
    Complete,
    /// Drop the proposal
    Ignore,
    /// Remember the path for a later completion pass
    Defer,
}

/// Unlimited sink; wrap it in a `LimitingPrefetchContext` to bound it
#[derive(Clone)]
pub struct CacheStoringPrefetchContext {
    cache: Arc<CachedTree>,
    policy: ProposalPolicy,
    deferred: Arc<Mutex<Vec<NodeNamesPath>>>,
    stored: Arc<AtomicUsize>,
}

impl CacheStoringPrefetchContext {
    pub fn new(cache: Arc<CachedTree>, policy: ProposalPolicy) -> Self {
        Self {
            cache,
            policy,
            deferred: Arc::new(Mutex::new(Vec::new())),
            stored: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Drain the paths deferred so far
    pub fn take_deferred(&self) -> Vec<NodeNamesPath> {
        std::mem::take(&mut *self.deferred.lock())
    }

    /// Records stored by this context and all of its children
    pub fn stored_count(&self) -> usize {
        self.stored.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PrefetchNodeDataContext<NodeData> for CacheStoringPrefetchContext {
    fn accept_prefetch_node_datas(&self) -> bool {
        true
    }

    fn accept_recurse_propose_prefetch_path_items(&self) -> bool {
        true
    }

    fn incr_prefetch_count(&self, _count: u64) {}

    fn create_child_prefetch_context(&self) -> Arc<dyn PrefetchNodeDataContext<NodeData>> {
        Arc::new(self.clone())
    }

    async fn on_propose_prefetch_path_item(
        &self,
        item: Arc<dyn PrefetchProposedPathItem<NodeData>>,
    ) -> ProposalOutcome {
        match self.policy {
            ProposalPolicy::Ignore => ProposalOutcome::Ignored,
            ProposalPolicy::Defer => {
                self.deferred.lock().push(item.path().clone());
                ProposalOutcome::Deferred
            }
            ProposalPolicy::Complete => match item.complete().await {
                Ok(data) => {
                    self.on_prefetch_node_data(item.path(), data, false);
                    ProposalOutcome::Completed
                }
                Err(e) => {
                    warn!(path = %item.path(), error = %e, "Failed to complete proposed item");
                    ProposalOutcome::Failed
                }
            },
        }
    }

    fn on_prefetch_node_data(&self, path: &NodeNamesPath, data: NodeData, is_incomplete: bool) {
        let removed = self.cache.put_prefetched(path, data, is_incomplete);
        self.stored.fetch_add(1, Ordering::SeqCst);
        if !removed.is_empty() {
            debug!(path = %path, removed = removed.len(), "Listing dropped cached children");
        }
    }
}
