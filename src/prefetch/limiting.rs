//! Budget-enforcing context
//!
//! Wraps a delegate that receives results. Count and deadline are shared by
//! every context derived from one root; the recursion level is private to each
//! branch.

use super::limits::{PrefetchCountLimit, PrefetchLimits, PrefetchTimeLimit};
use super::{PrefetchNodeDataContext, PrefetchProposedPathItem, ProposalOutcome};
use crate::types::{now_millis, NodeNamesPath, TimeMillis};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Recursion level of a root context
///
/// The root sits one level above the first listed directory, so the first
/// child context is level 0.
pub const ROOT_RECURSE_LEVEL: i32 = -1;

pub struct LimitingPrefetchContext<T: Send + 'static> {
    delegate: Arc<dyn PrefetchNodeDataContext<T>>,
    count_limit: Arc<PrefetchCountLimit>,
    time_limit: Arc<PrefetchTimeLimit>,
    max_recurse_level: i32,
    curr_recurse_level: i32,
}

impl<T: Send + 'static> LimitingPrefetchContext<T> {
    /// Root context; the deadline is computed from the current time
    pub fn root(
        delegate: Arc<dyn PrefetchNodeDataContext<T>>,
        limits: PrefetchLimits,
        outer_ceiling_millis: TimeMillis,
    ) -> Self {
        Self::root_at(delegate, limits, outer_ceiling_millis, now_millis())
    }

    /// Root context with an explicit start time
    pub fn root_at(
        delegate: Arc<dyn PrefetchNodeDataContext<T>>,
        limits: PrefetchLimits,
        outer_ceiling_millis: TimeMillis,
        start_millis: TimeMillis,
    ) -> Self {
        Self {
            delegate,
            count_limit: Arc::new(PrefetchCountLimit::new(limits.max_count)),
            time_limit: Arc::new(PrefetchTimeLimit::new(
                start_millis,
                limits.max_duration_millis,
                outer_ceiling_millis,
            )),
            max_recurse_level: limits.max_recurse_level,
            curr_recurse_level: ROOT_RECURSE_LEVEL,
        }
    }

    pub fn curr_recurse_level(&self) -> i32 {
        self.curr_recurse_level
    }

    pub fn current_count(&self) -> i64 {
        self.count_limit.current()
    }

    pub fn max_time_millis(&self) -> TimeMillis {
        self.time_limit.max_time_millis()
    }

    fn accept_recurse_level(&self) -> bool {
        self.max_recurse_level == -1 || self.curr_recurse_level + 1 < self.max_recurse_level
    }

    fn child(&self) -> Self {
        Self {
            delegate: self.delegate.create_child_prefetch_context(),
            count_limit: Arc::clone(&self.count_limit),
            time_limit: Arc::clone(&self.time_limit),
            max_recurse_level: self.max_recurse_level,
            curr_recurse_level: self.curr_recurse_level + 1,
        }
    }
}

#[async_trait]
impl<T: Send + 'static> PrefetchNodeDataContext<T> for LimitingPrefetchContext<T> {
    fn accept_prefetch_node_datas(&self) -> bool {
        self.count_limit.accept() && self.time_limit.accept(now_millis())
    }

    fn accept_recurse_propose_prefetch_path_items(&self) -> bool {
        self.count_limit.accept() && self.time_limit.accept(now_millis()) && self.accept_recurse_level()
    }

    fn incr_prefetch_count(&self, count: u64) {
        self.count_limit.incr(count);
    }

    fn create_child_prefetch_context(&self) -> Arc<dyn PrefetchNodeDataContext<T>> {
        Arc::new(self.child())
    }

    async fn on_propose_prefetch_path_item(
        &self,
        item: Arc<dyn PrefetchProposedPathItem<T>>,
    ) -> ProposalOutcome {
        if !self.accept_prefetch_node_datas() {
            debug!(path = %item.path(), "Budget exhausted, ignoring proposal");
            return ProposalOutcome::Ignored;
        }
        self.delegate.on_propose_prefetch_path_item(item).await
    }

    fn on_prefetch_node_data(&self, path: &NodeNamesPath, data: T, is_incomplete: bool) {
        self.delegate.on_prefetch_node_data(path, data, is_incomplete);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CachedTree;
    use crate::prefetch::storing::{CacheStoringPrefetchContext, ProposalPolicy};
    use crate::tree::NodeData;

    fn sink() -> Arc<dyn PrefetchNodeDataContext<NodeData>> {
        Arc::new(CacheStoringPrefetchContext::new(
            Arc::new(CachedTree::default()),
            ProposalPolicy::Complete,
        ))
    }

    #[test]
    fn test_count_and_depth_budget() {
        let limits = PrefetchLimits {
            max_count: 3,
            max_recurse_level: 2,
            max_duration_millis: -1,
        };
        let root = LimitingPrefetchContext::root(sink(), limits, 0);

        root.incr_prefetch_count(1);
        root.incr_prefetch_count(1);
        assert!(root.accept_prefetch_node_datas());
        root.incr_prefetch_count(1);
        assert!(!root.accept_prefetch_node_datas());

        let fresh = LimitingPrefetchContext::root(sink(), limits, 0);
        let child = fresh.child();
        let grandchild = child.child();
        assert!(child.accept_recurse_propose_prefetch_path_items());
        assert!(!grandchild.accept_recurse_propose_prefetch_path_items());
        assert_eq!(grandchild.curr_recurse_level(), ROOT_RECURSE_LEVEL + 2);
    }

    #[test]
    fn test_children_share_count() {
        let limits = PrefetchLimits {
            max_count: 2,
            max_recurse_level: -1,
            max_duration_millis: -1,
        };
        let root = LimitingPrefetchContext::root(sink(), limits, 0);
        let child = root.create_child_prefetch_context();
        let other = root.create_child_prefetch_context();
        child.incr_prefetch_count(1);
        other.incr_prefetch_count(1);
        assert_eq!(root.current_count(), 2);
        assert!(!root.accept_prefetch_node_datas());
        assert!(!child.accept_prefetch_node_datas());
    }

    #[test]
    fn test_expired_deadline_rejects() {
        let limits = PrefetchLimits {
            max_count: -1,
            max_recurse_level: -1,
            max_duration_millis: 10,
        };
        let root = LimitingPrefetchContext::root_at(sink(), limits, 0, 1_000);
        assert_eq!(root.max_time_millis(), 1_010);
        assert!(!root.accept_prefetch_node_datas());
        assert!(!root.accept_recurse_propose_prefetch_path_items());
    }

    #[test]
    fn test_depth_does_not_gate_data() {
        let limits = PrefetchLimits {
            max_count: -1,
            max_recurse_level: 0,
            max_duration_millis: -1,
        };
        let root = LimitingPrefetchContext::root(sink(), limits, 0);
        assert!(root.accept_prefetch_node_datas());
        assert!(!root.accept_recurse_propose_prefetch_path_items());
    }
}
