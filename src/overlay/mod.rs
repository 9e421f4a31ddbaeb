//! Override Overlay
//!
//! Records local intent (update, delete) per path and layers it over the
//! read-only cached base. Overrides always win; the base is never written
//! through the overlay.

pub mod memory;
pub mod persistence;
pub mod union;

pub use memory::InMemoryOverrideTree;
pub use persistence::SledOverrideTree;
pub use union::UnionTree;

use crate::error::StorageError;
use crate::tree::NodeData;
use crate::types::{NodeName, NodeNamesPath, NodeType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Override status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideStatus {
    NotOverriden,
    Updated,
    Deleted,
}

/// Recorded override for one path
///
/// Only `Updated` carries a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverrideNodeData {
    NotOverriden,
    Updated(NodeData),
    Deleted,
}

impl OverrideNodeData {
    pub fn status(&self) -> OverrideStatus {
        match self {
            OverrideNodeData::NotOverriden => OverrideStatus::NotOverriden,
            OverrideNodeData::Updated(_) => OverrideStatus::Updated,
            OverrideNodeData::Deleted => OverrideStatus::Deleted,
        }
    }

    pub fn data(&self) -> Option<&NodeData> {
        match self {
            OverrideNodeData::Updated(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_overridden(&self) -> bool {
        !matches!(self, OverrideNodeData::NotOverriden)
    }
}

/// Result of `get_override_with_child`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideWithChildren {
    /// Override at the parent path itself
    pub override_data: OverrideNodeData,
    /// Children that carry a recorded override
    pub found: BTreeMap<NodeName, OverrideNodeData>,
    /// Children without override, in child-name order
    pub not_found: Vec<NodeName>,
}

/// Store of per-path overrides
///
/// Last writer wins per path; there is no cross-path transaction. There is no
/// plain-data `get`: reads always go through `get_override`.
pub trait OverrideTree: Send + Sync {
    /// Record `Updated(data)` at `path`, superseding any prior override there
    fn put(&self, path: &NodeNamesPath, data: NodeData) -> Result<(), StorageError>;

    /// Record a tombstone at `path`, whatever the base holds
    fn remove(&self, path: &NodeNamesPath) -> Result<(), StorageError>;

    /// Recorded override, or `NotOverriden`
    fn get_override(&self, path: &NodeNamesPath) -> Result<OverrideNodeData, StorageError>;

    /// Forget the override at `path`; reads fall through to the base again
    fn forget(&self, path: &NodeNamesPath) -> Result<(), StorageError>;

    /// Discard every recorded override
    fn clear(&self) -> Result<(), StorageError>;

    /// All recorded overrides, sorted by path
    fn list_overrides(&self) -> Result<Vec<(NodeNamesPath, OverrideNodeData)>, StorageError>;

    /// Resolve the override at `path` and partition child names by whether
    /// they carry an override of their own.
    ///
    /// A deleted parent, or one overridden as a file, yields no partition. A
    /// parent overridden as a directory partitions its own child names;
    /// otherwise `base_child_names` are partitioned.
    fn get_override_with_child(
        &self,
        path: &NodeNamesPath,
        base_child_names: &BTreeSet<NodeName>,
    ) -> Result<OverrideWithChildren, StorageError> {
        let override_data = self.get_override(path)?;
        let mut found = BTreeMap::new();
        let mut not_found = Vec::new();

        let child_names = match &override_data {
            OverrideNodeData::Deleted => None,
            OverrideNodeData::Updated(data) if data.node_type == NodeType::File => None,
            OverrideNodeData::Updated(data) => Some(&data.child_names),
            OverrideNodeData::NotOverriden => Some(base_child_names),
        };

        if let Some(child_names) = child_names {
            for name in child_names {
                let child = self.get_override(&path.child(name.clone()))?;
                if child.is_overridden() {
                    found.insert(name.clone(), child);
                } else {
                    not_found.push(name.clone());
                }
            }
        }

        Ok(OverrideWithChildren {
            override_data,
            found,
            not_found,
        })
    }
}
