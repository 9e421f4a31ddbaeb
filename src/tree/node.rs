//! Node records and content equality

use crate::types::{NodeName, NodeType, TimeMillis};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Cache bookkeeping carried by every node record
///
/// Not part of content equality: two records describing the same backend state
/// at different refresh times are content-equal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCacheStamps {
    /// When this record was last confirmed against the backend
    pub last_external_refresh_time_millis: TimeMillis,
    /// Last local read
    pub last_tree_data_query_time_millis: TimeMillis,
    /// Last local mutation
    pub last_tree_data_update_time_millis: TimeMillis,
    /// Number of local mutations
    pub last_tree_data_update_count: u32,
}

impl NodeCacheStamps {
    /// Stamps for a record freshly obtained from the backend
    pub fn refreshed_at(refresh_time_millis: TimeMillis) -> Self {
        Self {
            last_external_refresh_time_millis: refresh_time_millis,
            last_tree_data_query_time_millis: refresh_time_millis,
            last_tree_data_update_time_millis: 0,
            last_tree_data_update_count: 0,
        }
    }
}

/// NodeData: full known state of one file or directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeData {
    pub name: NodeName,
    pub node_type: NodeType,
    /// Complete child set; empty for files
    pub child_names: BTreeSet<NodeName>,
    pub attrs: BTreeMap<String, String>,
    pub external_creation_time: TimeMillis,
    pub external_last_modified_time: TimeMillis,
    pub external_length: u64,
    pub stamps: NodeCacheStamps,
}

impl NodeData {
    pub fn file(name: NodeName, length: u64, last_modified: TimeMillis) -> Self {
        Self {
            name,
            node_type: NodeType::File,
            child_names: BTreeSet::new(),
            attrs: BTreeMap::new(),
            external_creation_time: last_modified,
            external_last_modified_time: last_modified,
            external_length: length,
            stamps: NodeCacheStamps::default(),
        }
    }

    pub fn dir<I>(name: NodeName, child_names: I) -> Self
    where
        I: IntoIterator<Item = NodeName>,
    {
        Self {
            name,
            node_type: NodeType::Dir,
            child_names: child_names.into_iter().collect(),
            attrs: BTreeMap::new(),
            external_creation_time: 0,
            external_last_modified_time: 0,
            external_length: 0,
            stamps: NodeCacheStamps::default(),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.node_type == NodeType::Dir
    }

    /// Compare everything except the cache bookkeeping
    pub fn content_eq(&self, other: &NodeData) -> bool {
        self.name == other.name
            && self.node_type == other.node_type
            && self.child_names == other.child_names
            && self.attrs == other.attrs
            && self.external_creation_time == other.external_creation_time
            && self.external_last_modified_time == other.external_last_modified_time
            && self.external_length == other.external_length
    }

    /// Copy of this record with a replaced child set
    pub fn with_child_names(&self, child_names: BTreeSet<NodeName>) -> NodeData {
        NodeData {
            child_names,
            ..self.clone()
        }
    }

    pub fn with_stamps(mut self, stamps: NodeCacheStamps) -> NodeData {
        self.stamps = stamps;
        self
    }
}
