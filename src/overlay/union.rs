//! Union tree: overrides layered over the cached base

use super::{OverrideNodeData, OverrideTree};
use crate::error::StorageError;
use crate::tree::{NodeData, PartialNodeData, PartialTreeData, TreeData};
use crate::types::NodeNamesPath;
use std::sync::Arc;
use tracing::{debug, warn};

/// Read façade combining an override store with a read-only base
///
/// Writes go to the override store only.
pub struct UnionTree<B, O> {
    base: Arc<B>,
    overrides: Arc<O>,
}

impl<B, O> UnionTree<B, O>
where
    B: TreeData,
    O: OverrideTree,
{
    pub fn new(base: Arc<B>, overrides: Arc<O>) -> Self {
        Self { base, overrides }
    }

    pub fn base(&self) -> &Arc<B> {
        &self.base
    }

    pub fn overrides(&self) -> &Arc<O> {
        &self.overrides
    }

    pub fn put(&self, path: &NodeNamesPath, data: NodeData) -> Result<(), StorageError> {
        self.overrides.put(path, data)
    }

    pub fn remove(&self, path: &NodeNamesPath) -> Result<(), StorageError> {
        self.overrides.remove(path)
    }

    /// Drop every local edit; cached backend truth is untouched
    pub fn discard_overrides(&self) -> Result<(), StorageError> {
        self.overrides.clear()
    }

    /// Resolve the children of a directory in one override query
    ///
    /// Deleted children are skipped, updated ones come from the overlay and the
    /// rest from the base. `None` when `path` itself resolves to nothing.
    pub fn list_children(
        &self,
        path: &NodeNamesPath,
    ) -> Result<Option<Vec<(NodeNamesPath, NodeData)>>, StorageError> {
        let base_data = match self.overrides.get_override(path)? {
            OverrideNodeData::Deleted => return Ok(None),
            OverrideNodeData::Updated(_) => None,
            OverrideNodeData::NotOverriden => match self.base.get(path)? {
                Some(data) => Some(data),
                None => return Ok(None),
            },
        };
        let base_child_names = base_data
            .map(|data| data.child_names)
            .unwrap_or_default();

        let resolved = self
            .overrides
            .get_override_with_child(path, &base_child_names)?;

        let mut children = Vec::new();
        for (name, child) in resolved.found {
            if let OverrideNodeData::Updated(data) = child {
                children.push((path.child(name), data));
            }
        }
        for name in resolved.not_found {
            let child_path = path.child(name);
            if let Some(data) = self.base.get(&child_path)? {
                children.push((child_path, data));
            } else {
                debug!(path = %child_path, "Child not cached in base");
            }
        }
        children.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(Some(children))
    }
}

impl<B, O> TreeData for UnionTree<B, O>
where
    B: TreeData,
    O: OverrideTree,
{
    fn get(&self, path: &NodeNamesPath) -> Result<Option<NodeData>, StorageError> {
        match self.overrides.get_override(path)? {
            OverrideNodeData::Deleted => Ok(None),
            OverrideNodeData::Updated(data) => Ok(Some(data)),
            OverrideNodeData::NotOverriden => self.base.get(path),
        }
    }
}

impl<B, O> PartialTreeData for UnionTree<B, O>
where
    B: TreeData + PartialTreeData,
    O: OverrideTree,
{
    fn get_partial(&self, path: &NodeNamesPath) -> PartialNodeData {
        // An unreadable override store answers nothing rather than base data
        match self.overrides.get_override(path) {
            Ok(OverrideNodeData::Deleted) => PartialNodeData::absent(),
            Ok(OverrideNodeData::Updated(data)) => PartialNodeData::from_complete(data),
            Ok(OverrideNodeData::NotOverriden) => self.base.get_partial(path),
            Err(e) => {
                warn!(path = %path, error = %e, "Override lookup failed, reporting no knowledge");
                PartialNodeData::absent()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CachedTree;
    use crate::overlay::InMemoryOverrideTree;
    use crate::types::NodeName;

    fn n(s: &str) -> NodeName {
        NodeName::new(s)
    }

    fn union_with_base() -> UnionTree<CachedTree, InMemoryOverrideTree> {
        let base = Arc::new(CachedTree::default());
        base.put_prefetched(
            &NodeNamesPath::parse("/a"),
            NodeData::dir(n("a"), vec![n("x"), n("y")]),
            false,
        );
        base.put_prefetched(&NodeNamesPath::parse("/a/x"), NodeData::file(n("x"), 1, 0), false);
        base.put_prefetched(&NodeNamesPath::parse("/a/y"), NodeData::file(n("y"), 2, 0), false);
        UnionTree::new(base, Arc::new(InMemoryOverrideTree::new()))
    }

    #[test]
    fn test_fallthrough_to_base() {
        let union = union_with_base();
        let path = NodeNamesPath::parse("/a");
        let via_union = union.get(&path).unwrap().unwrap();
        let via_base = union.base().get(&path).unwrap().unwrap();
        assert!(via_union.content_eq(&via_base));
    }

    #[test]
    fn test_delete_wins_over_base() {
        let union = union_with_base();
        let path = NodeNamesPath::parse("/a/x");
        union.remove(&path).unwrap();
        assert!(union.get(&path).unwrap().is_none());
        // Base is untouched
        assert!(union.base().get(&path).unwrap().is_some());
        assert!(union.get_partial(&path).is_absent());
    }

    #[test]
    fn test_update_wins_over_base() {
        let union = union_with_base();
        let path = NodeNamesPath::parse("/a/y");
        let data = NodeData::file(n("y"), 99, 7);
        union.put(&path, data.clone()).unwrap();
        assert_eq!(union.get(&path).unwrap(), Some(data));
    }

    #[test]
    fn test_list_children_applies_child_overrides() {
        let union = union_with_base();
        let parent = NodeNamesPath::parse("/a");
        union.remove(&parent.child(n("x"))).unwrap();
        union
            .put(&parent.child(n("y")), NodeData::file(n("y"), 50, 0))
            .unwrap();

        let children = union.list_children(&parent).unwrap().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].1.external_length, 50);
    }

    #[test]
    fn test_discard_overrides_restores_base_view() {
        let union = union_with_base();
        let path = NodeNamesPath::parse("/a/x");
        union.remove(&path).unwrap();
        union.discard_overrides().unwrap();
        assert!(union.get(&path).unwrap().is_some());
    }

    struct UnreadableOverrides;

    impl OverrideTree for UnreadableOverrides {
        fn put(&self, _path: &NodeNamesPath, _data: NodeData) -> Result<(), StorageError> {
            Ok(())
        }

        fn remove(&self, _path: &NodeNamesPath) -> Result<(), StorageError> {
            Ok(())
        }

        fn get_override(&self, path: &NodeNamesPath) -> Result<OverrideNodeData, StorageError> {
            Err(StorageError::InvalidPath(path.to_string()))
        }

        fn forget(&self, _path: &NodeNamesPath) -> Result<(), StorageError> {
            Ok(())
        }

        fn clear(&self) -> Result<(), StorageError> {
            Ok(())
        }

        fn list_overrides(&self) -> Result<Vec<(NodeNamesPath, OverrideNodeData)>, StorageError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_unreadable_overrides_hide_base_partial() {
        let base = Arc::clone(union_with_base().base());
        let union = UnionTree::new(base, Arc::new(UnreadableOverrides));
        let path = NodeNamesPath::parse("/a/x");

        assert!(union.base().get_partial(&path).data_if_present.is_some());
        assert!(union.get_partial(&path).is_absent());
        assert!(union.get(&path).is_err());
    }
}
