//! In-memory override store

use super::{OverrideNodeData, OverrideTree};
use crate::error::StorageError;
use crate::tree::NodeData;
use crate::types::NodeNamesPath;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Override store held in a lock-guarded map
///
/// Only `Updated` and `Deleted` entries are stored; absence means not overridden.
#[derive(Default)]
pub struct InMemoryOverrideTree {
    overrides: RwLock<HashMap<NodeNamesPath, OverrideNodeData>>,
}

impl InMemoryOverrideTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.overrides.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.read().is_empty()
    }
}

impl OverrideTree for InMemoryOverrideTree {
    fn put(&self, path: &NodeNamesPath, data: NodeData) -> Result<(), StorageError> {
        debug!(path = %path, "Recording update override");
        self.overrides
            .write()
            .insert(path.clone(), OverrideNodeData::Updated(data));
        Ok(())
    }

    fn remove(&self, path: &NodeNamesPath) -> Result<(), StorageError> {
        debug!(path = %path, "Recording delete override");
        self.overrides
            .write()
            .insert(path.clone(), OverrideNodeData::Deleted);
        Ok(())
    }

    fn get_override(&self, path: &NodeNamesPath) -> Result<OverrideNodeData, StorageError> {
        Ok(self
            .overrides
            .read()
            .get(path)
            .cloned()
            .unwrap_or(OverrideNodeData::NotOverriden))
    }

    fn forget(&self, path: &NodeNamesPath) -> Result<(), StorageError> {
        self.overrides.write().remove(path);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.overrides.write().clear();
        Ok(())
    }

    fn list_overrides(&self) -> Result<Vec<(NodeNamesPath, OverrideNodeData)>, StorageError> {
        let mut entries: Vec<(NodeNamesPath, OverrideNodeData)> = self
            .overrides
            .read()
            .iter()
            .map(|(path, data)| (path.clone(), data.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeName;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_put_supersedes_remove() {
        let tree = InMemoryOverrideTree::new();
        let path = NodeNamesPath::parse("/a/b");
        tree.remove(&path).unwrap();
        assert_eq!(tree.get_override(&path).unwrap(), OverrideNodeData::Deleted);

        let data = NodeData::file(NodeName::new("b"), 7, 0);
        tree.put(&path, data.clone()).unwrap();
        assert_eq!(
            tree.get_override(&path).unwrap(),
            OverrideNodeData::Updated(data)
        );
    }

    #[test]
    fn test_override_does_not_touch_siblings_or_descendants() {
        let tree = InMemoryOverrideTree::new();
        tree.remove(&NodeNamesPath::parse("/a")).unwrap();
        assert_eq!(
            tree.get_override(&NodeNamesPath::parse("/a/child")).unwrap(),
            OverrideNodeData::NotOverriden
        );
        assert_eq!(
            tree.get_override(&NodeNamesPath::parse("/b")).unwrap(),
            OverrideNodeData::NotOverriden
        );
    }

    #[test]
    fn test_forget_and_clear() {
        let tree = InMemoryOverrideTree::new();
        tree.remove(&NodeNamesPath::parse("/a")).unwrap();
        tree.remove(&NodeNamesPath::parse("/b")).unwrap();
        tree.forget(&NodeNamesPath::parse("/a")).unwrap();
        assert_eq!(tree.len(), 1);
        tree.clear().unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_concurrent_writers_on_distinct_paths() {
        let tree = Arc::new(InMemoryOverrideTree::new());
        let mut handles = vec![];
        for i in 0..8 {
            let tree = tree.clone();
            handles.push(thread::spawn(move || {
                let path = NodeNamesPath::parse(&format!("/dir/f{}", i));
                tree.remove(&path).unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        let listed = tree.list_overrides().unwrap();
        assert_eq!(listed.len(), 8);
        assert!(listed.windows(2).all(|w| w[0].0 < w[1].0));
    }
}
