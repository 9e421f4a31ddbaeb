//! Tree data: node records, partial knowledge and the read-only tree contract

pub mod node;
pub mod partial;

pub use node::{NodeCacheStamps, NodeData};
pub use partial::{PartialNodeData, PartialTreeData};

use crate::error::StorageError;
use crate::types::NodeNamesPath;

/// Read-only view of plain tree data
///
/// Implemented by the cached base and by the union façade. Override-only stores
/// do not implement it; they are read through `get_override`.
pub trait TreeData: Send + Sync {
    fn get(&self, path: &NodeNamesPath) -> Result<Option<NodeData>, StorageError>;
}
