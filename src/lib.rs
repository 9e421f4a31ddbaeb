//! Treecache: Tree Metadata Cache with Local Overrides
//!
//! Caches metadata of a remote, slow-to-list directory tree. Knowledge may be
//! partial; a local override overlay records edits and tombstones that win over
//! the cached base; and a budgeted prefetch protocol populates the base in bulk.

pub mod backend;
pub mod cache;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod logging;
pub mod overlay;
pub mod prefetch;
pub mod service;
pub mod tooling;
pub mod tree;
pub mod types;

pub use cache::CachedTree;
pub use error::{BackendError, CacheError, StorageError};
pub use overlay::{OverrideNodeData, OverrideTree, UnionTree};
pub use service::TreeCache;
pub use tree::{NodeData, PartialNodeData, PartialTreeData, TreeData};
pub use types::{NodeName, NodeNamesPath, NodeType};
