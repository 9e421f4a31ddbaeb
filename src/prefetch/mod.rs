//! Prefetch Budgeting Protocol
//!
//! Bulk, recursive population of the cached base. A traversal stays generic
//! while a pluggable context enforces limits and receives results:
//!
//! - `accept_prefetch_node_datas` before producing more data on a branch
//! - `accept_recurse_propose_prefetch_path_items` before recursing or proposing
//! - `on_propose_prefetch_path_item` for each candidate child; the context
//!   completes, defers or ignores it
//! - `on_prefetch_node_data` for every produced record
//!
//! Accept checks are read-only; the traversal increments the shared count
//! explicitly, once per accepted unit of work.

pub mod converter;
pub mod crawler;
pub mod limiting;
pub mod limits;
pub mod storing;

pub use converter::{BackendRecordConverter, ConverterPrefetchContext, RecordConverter};
pub use crawler::{PrefetchCrawler, PrefetchReport};
pub use limiting::{LimitingPrefetchContext, ROOT_RECURSE_LEVEL};
pub use limits::{PrefetchConfig, PrefetchCountLimit, PrefetchLimits, PrefetchTimeLimit};
pub use storing::{CacheStoringPrefetchContext, ProposalPolicy};

use crate::error::BackendError;
use crate::types::{NodeNamesPath, NodeType};
use async_trait::async_trait;
use std::sync::Arc;

/// What a context did with a proposed item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalOutcome {
    /// Full data fetched and reported
    Completed,
    /// Dropped (budget exhausted or policy)
    Ignored,
    /// Recorded for later completion
    Deferred,
    /// Completion failed; local to this item
    Failed,
}

/// Candidate child offered before its full data has been fetched
#[async_trait]
pub trait PrefetchProposedPathItem<T>: Send + Sync {
    fn path(&self) -> &NodeNamesPath;

    fn node_type_hint(&self) -> Option<NodeType> {
        None
    }

    /// Fetch or build the full data; potentially slow and backend-bound
    async fn complete(&self) -> Result<T, BackendError>;
}

/// Budgeting and result sink for one branch of a prefetch traversal
#[async_trait]
pub trait PrefetchNodeDataContext<T: Send + 'static>: Send + Sync {
    fn accept_prefetch_node_datas(&self) -> bool;

    fn accept_recurse_propose_prefetch_path_items(&self) -> bool;

    /// Account `count` accepted units of work against the shared budget
    fn incr_prefetch_count(&self, count: u64);

    /// Context for the next recursion level; shares budget state with `self`
    fn create_child_prefetch_context(&self) -> Arc<dyn PrefetchNodeDataContext<T>>;

    async fn on_propose_prefetch_path_item(
        &self,
        item: Arc<dyn PrefetchProposedPathItem<T>>,
    ) -> ProposalOutcome;

    fn on_prefetch_node_data(&self, path: &NodeNamesPath, data: T, is_incomplete: bool);
}
