//! TreeCache: the cached base, the override overlay and the prefetch crawler
//! wired together.
//!
//! Reads resolve overrides first, then the cached base. A base miss triggers a
//! single-node prefetch unless an override already decided the answer.

use crate::backend::{BackendLister, BackendRecord};
use crate::cache::CachedTree;
use crate::error::CacheError;
use crate::overlay::{OverrideNodeData, OverrideTree, UnionTree};
use crate::prefetch::{
    BackendRecordConverter, CacheStoringPrefetchContext, ConverterPrefetchContext,
    LimitingPrefetchContext, PrefetchConfig, PrefetchCrawler, PrefetchLimits,
    PrefetchNodeDataContext, PrefetchReport, RecordConverter,
};
use crate::tree::{NodeData, PartialNodeData, PartialTreeData, TreeData};
use crate::types::{now_millis, NodeNamesPath, TimeMillis};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct TreeCache<L, O> {
    base: Arc<CachedTree>,
    union: UnionTree<CachedTree, O>,
    crawler: PrefetchCrawler<L>,
    prefetch_config: PrefetchConfig,
    sink: CacheStoringPrefetchContext,
}

impl<L, O> TreeCache<L, O>
where
    L: BackendLister + 'static,
    O: OverrideTree,
{
    pub fn new(
        lister: Arc<L>,
        base: Arc<CachedTree>,
        overrides: Arc<O>,
        prefetch_config: PrefetchConfig,
    ) -> Self {
        let sink = CacheStoringPrefetchContext::new(
            Arc::clone(&base),
            prefetch_config.proposal_policy,
        );
        Self {
            union: UnionTree::new(Arc::clone(&base), overrides),
            crawler: PrefetchCrawler::new(lister, prefetch_config.max_concurrent_listings),
            base,
            prefetch_config,
            sink,
        }
    }

    pub fn base(&self) -> &Arc<CachedTree> {
        &self.base
    }

    pub fn union(&self) -> &UnionTree<CachedTree, O> {
        &self.union
    }

    fn root_context(
        &self,
        limits: PrefetchLimits,
        outer_ceiling_millis: TimeMillis,
    ) -> Arc<dyn PrefetchNodeDataContext<BackendRecord>> {
        let sink: Arc<dyn PrefetchNodeDataContext<NodeData>> = Arc::new(self.sink.clone());
        let limiting: Arc<LimitingPrefetchContext<NodeData>> = Arc::new(
            LimitingPrefetchContext::root(sink, limits, outer_ceiling_millis),
        );
        Arc::new(ConverterPrefetchContext::new(
            Arc::new(BackendRecordConverter),
            limiting,
        ))
    }

    /// Prefetch `path` under explicit limits
    pub async fn prefetch_with(
        &self,
        path: &NodeNamesPath,
        limits: PrefetchLimits,
        outer_ceiling_millis: TimeMillis,
    ) -> PrefetchReport {
        let ctx = self.root_context(limits, outer_ceiling_millis);
        self.crawler.prefetch(path, ctx).await
    }

    /// Prefetch `path` under the configured limits
    pub async fn prefetch(&self, path: &NodeNamesPath) -> PrefetchReport {
        self.prefetch_with(path, self.prefetch_config.limits(), 0)
            .await
    }

    /// Resolve `path` through the overlay, loading the base lazily on a miss
    pub async fn get(&self, path: &NodeNamesPath) -> Result<Option<NodeData>, CacheError> {
        match self.union.overrides().get_override(path)? {
            OverrideNodeData::Deleted => return Ok(None),
            OverrideNodeData::Updated(data) => return Ok(Some(data)),
            OverrideNodeData::NotOverriden => {}
        }
        if let Some(data) = self.base.get(path)? {
            return Ok(Some(data));
        }

        debug!(path = %path, "Base miss, fetching single node");
        self.prefetch_with(path, PrefetchLimits::single_node(), 0)
            .await;
        Ok(self.base.get(path)?)
    }

    /// Best currently-available knowledge, without touching the backend
    pub fn get_partial(&self, path: &NodeNamesPath) -> PartialNodeData {
        self.union.get_partial(path)
    }

    /// Children of `path` as seen through the overlay
    pub async fn list_children(
        &self,
        path: &NodeNamesPath,
    ) -> Result<Option<Vec<(NodeNamesPath, NodeData)>>, CacheError> {
        if self.get(path).await?.is_none() {
            return Ok(None);
        }
        Ok(self.union.list_children(path)?)
    }

    pub fn put(&self, path: &NodeNamesPath, data: NodeData) -> Result<(), CacheError> {
        Ok(self.union.put(path, data)?)
    }

    pub fn remove(&self, path: &NodeNamesPath) -> Result<(), CacheError> {
        Ok(self.union.remove(path)?)
    }

    pub fn forget_override(&self, path: &NodeNamesPath) -> Result<(), CacheError> {
        Ok(self.union.overrides().forget(path)?)
    }

    pub fn discard_overrides(&self) -> Result<(), CacheError> {
        Ok(self.union.discard_overrides()?)
    }

    /// Re-list every stale record, one node each, without recursing
    pub async fn refresh_stale(&self) -> usize {
        let stale = self.base.stale_paths(now_millis());
        let count = stale.len();
        for path in stale {
            self.prefetch_with(&path, PrefetchLimits::single_node(), 0)
                .await;
        }
        count
    }

    /// Complete proposals deferred by earlier traversals; returns how many
    /// were stored
    pub async fn complete_deferred(&self) -> usize {
        let converter = BackendRecordConverter;
        let mut completed = 0;
        for path in self.sink.take_deferred() {
            let record = match self.crawler.lister().stat(&path).await {
                Ok(record) => record,
                Err(e) => {
                    warn!(path = %path, error = %e, "Deferred completion failed");
                    continue;
                }
            };
            match converter.convert(&path, record, now_millis(), false) {
                Ok(data) => {
                    self.sink.on_prefetch_node_data(&path, data, false);
                    completed += 1;
                }
                Err(e) => warn!(path = %path, error = %e, "Deferred record not convertible"),
            }
        }
        completed
    }
}
