//! Format-converting pass-through context
//!
//! Turns backend-specific records into `NodeData` on their way to a delegate.
//! Every budgeting decision is forwarded unchanged.

use super::{PrefetchNodeDataContext, PrefetchProposedPathItem, ProposalOutcome};
use crate::backend::BackendRecord;
use crate::error::BackendError;
use crate::tree::{NodeCacheStamps, NodeData};
use crate::types::{now_millis, NodeNamesPath, NodeType, TimeMillis};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Converts one backend record into a cache record
///
/// The produced record's refresh and query stamps are set to
/// `refresh_time_millis`.
pub trait RecordConverter: Send + Sync + 'static {
    type Record: Send + Sync + 'static;

    fn convert(
        &self,
        path: &NodeNamesPath,
        record: Self::Record,
        refresh_time_millis: TimeMillis,
        is_incomplete: bool,
    ) -> Result<NodeData, BackendError>;
}

/// Converter for `BackendRecord`
#[derive(Debug, Clone, Copy, Default)]
pub struct BackendRecordConverter;

impl RecordConverter for BackendRecordConverter {
    type Record = BackendRecord;

    fn convert(
        &self,
        path: &NodeNamesPath,
        record: BackendRecord,
        refresh_time_millis: TimeMillis,
        _is_incomplete: bool,
    ) -> Result<NodeData, BackendError> {
        if let Some(last) = path.last() {
            if *last != record.name {
                return Err(BackendError::ConversionFailed(format!(
                    "record name {} does not match path {}",
                    record.name, path
                )));
            }
        }
        let child_names = match record.node_type {
            NodeType::Dir => record.child_names.into_iter().collect(),
            NodeType::File => Default::default(),
        };
        Ok(NodeData {
            name: record.name,
            node_type: record.node_type,
            child_names,
            attrs: record.attrs,
            external_creation_time: record.creation_time,
            external_last_modified_time: record.last_modified_time,
            external_length: record.length,
            stamps: NodeCacheStamps::refreshed_at(refresh_time_millis),
        })
    }
}

pub struct ConverterPrefetchContext<C: RecordConverter> {
    converter: Arc<C>,
    delegate: Arc<dyn PrefetchNodeDataContext<NodeData>>,
}

impl<C: RecordConverter> ConverterPrefetchContext<C> {
    pub fn new(converter: Arc<C>, delegate: Arc<dyn PrefetchNodeDataContext<NodeData>>) -> Self {
        Self {
            converter,
            delegate,
        }
    }
}

/// Proposed item whose completion is converted before reaching the delegate
struct ConvertedProposedItem<C: RecordConverter> {
    inner: Arc<dyn PrefetchProposedPathItem<C::Record>>,
    converter: Arc<C>,
}

#[async_trait]
impl<C: RecordConverter> PrefetchProposedPathItem<NodeData> for ConvertedProposedItem<C> {
    fn path(&self) -> &NodeNamesPath {
        self.inner.path()
    }

    fn node_type_hint(&self) -> Option<NodeType> {
        self.inner.node_type_hint()
    }

    async fn complete(&self) -> Result<NodeData, BackendError> {
        let record = self.inner.complete().await?;
        self.converter
            .convert(self.inner.path(), record, now_millis(), false)
    }
}

#[async_trait]
impl<C: RecordConverter> PrefetchNodeDataContext<C::Record> for ConverterPrefetchContext<C> {
    fn accept_prefetch_node_datas(&self) -> bool {
        self.delegate.accept_prefetch_node_datas()
    }

    fn accept_recurse_propose_prefetch_path_items(&self) -> bool {
        self.delegate.accept_recurse_propose_prefetch_path_items()
    }

    fn incr_prefetch_count(&self, count: u64) {
        self.delegate.incr_prefetch_count(count);
    }

    fn create_child_prefetch_context(&self) -> Arc<dyn PrefetchNodeDataContext<C::Record>> {
        Arc::new(Self {
            converter: Arc::clone(&self.converter),
            delegate: self.delegate.create_child_prefetch_context(),
        })
    }

    async fn on_propose_prefetch_path_item(
        &self,
        item: Arc<dyn PrefetchProposedPathItem<C::Record>>,
    ) -> ProposalOutcome {
        let converted = Arc::new(ConvertedProposedItem {
            inner: item,
            converter: Arc::clone(&self.converter),
        });
        self.delegate.on_propose_prefetch_path_item(converted).await
    }

    fn on_prefetch_node_data(&self, path: &NodeNamesPath, data: C::Record, is_incomplete: bool) {
        match self.converter.convert(path, data, now_millis(), is_incomplete) {
            Ok(node) => self.delegate.on_prefetch_node_data(path, node, is_incomplete),
            Err(e) => warn!(path = %path, error = %e, "Dropping unconvertible record"),
        }
    }
}
