//! Partial knowledge about a node's children
//!
//! Directory listings often arrive in fragments. `PartialNodeData` records what
//! is known so far and merges later fragments without re-deriving what is
//! already certain.

use crate::tree::node::NodeData;
use crate::types::{NodeName, NodeNamesPath};
use std::collections::BTreeSet;

/// Best currently-available knowledge about one node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialNodeData {
    pub data_if_present: Option<NodeData>,
    pub is_complete_child_names: bool,
    pub child_names_present: BTreeSet<NodeName>,
    /// Names confirmed gone by a complete superseding listing; informational
    /// once the child set is complete.
    pub child_names_known_removed: BTreeSet<NodeName>,
}

impl PartialNodeData {
    /// Nothing known yet
    pub fn absent() -> Self {
        Self::default()
    }

    /// Knowledge derived from a fully resolved record
    pub fn from_complete(data: NodeData) -> Self {
        Self {
            child_names_present: data.child_names.clone(),
            data_if_present: Some(data),
            is_complete_child_names: true,
            child_names_known_removed: BTreeSet::new(),
        }
    }

    pub fn is_absent(&self) -> bool {
        self.data_if_present.is_none()
            && !self.is_complete_child_names
            && self.child_names_present.is_empty()
            && self.child_names_known_removed.is_empty()
    }

    /// Merge an incremental (non-complete) listing fragment
    ///
    /// The present set only grows. Once the child set is complete, unknown names
    /// are not re-added. Returns the names newly added.
    pub fn merge_fragment<I>(&mut self, names: I) -> Vec<NodeName>
    where
        I: IntoIterator<Item = NodeName>,
    {
        let mut added = Vec::new();
        for name in names {
            if self.is_complete_child_names {
                continue;
            }
            if self.child_names_present.insert(name.clone()) {
                added.push(name);
            }
        }
        added
    }

    /// Merge a complete listing that supersedes everything known so far
    ///
    /// Every name previously present, or present in the stale cached child set,
    /// that is missing from `fresh` is recorded as known-removed. Returns those
    /// names in order.
    pub fn merge_complete_listing(
        &mut self,
        fresh: &BTreeSet<NodeName>,
        stale_cached: Option<&BTreeSet<NodeName>>,
    ) -> Vec<NodeName> {
        let mut removed: BTreeSet<NodeName> = self
            .child_names_present
            .iter()
            .filter(|name| !fresh.contains(*name))
            .cloned()
            .collect();
        if let Some(stale) = stale_cached {
            removed.extend(stale.iter().filter(|name| !fresh.contains(*name)).cloned());
        }

        self.child_names_present = fresh.clone();
        self.is_complete_child_names = true;
        self.child_names_known_removed = removed.clone();
        if let Some(data) = self.data_if_present.as_mut() {
            data.child_names = fresh.clone();
        }
        removed.into_iter().collect()
    }

    /// Build a full record from `template` once the child set is complete
    pub fn resolve(&self, template: &NodeData) -> Option<NodeData> {
        if !self.is_complete_child_names {
            return None;
        }
        Some(template.with_child_names(self.child_names_present.clone()))
    }
}

/// Pure query for partial knowledge; never blocks on the backend
pub trait PartialTreeData: Send + Sync {
    fn get_partial(&self, path: &NodeNamesPath) -> PartialNodeData;
}
