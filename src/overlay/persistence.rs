//! Durable override store backed by sled
//!
//! Keys are the bincode encoding of the path, values the bincode encoding of
//! the override. Each write is a single-key insert, so per-path last writer wins.

use super::{OverrideNodeData, OverrideTree};
use crate::error::StorageError;
use crate::tree::NodeData;
use crate::types::NodeNamesPath;
use std::path::Path;
use tracing::{debug, info};

pub struct SledOverrideTree {
    db: sled::Db,
}

impl SledOverrideTree {
    /// Open (or create) the store at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = sled::open(path)?;
        info!(path = ?path, entries = db.len(), "Opened override store");
        Ok(Self { db })
    }

    /// Store that lives only as long as this handle
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    fn key(path: &NodeNamesPath) -> Result<Vec<u8>, StorageError> {
        Ok(bincode::serialize(path)?)
    }

    fn write(&self, path: &NodeNamesPath, value: &OverrideNodeData) -> Result<(), StorageError> {
        let key = Self::key(path)?;
        let bytes = bincode::serialize(value)?;
        self.db.insert(key, bytes)?;
        Ok(())
    }
}

impl OverrideTree for SledOverrideTree {
    fn put(&self, path: &NodeNamesPath, data: NodeData) -> Result<(), StorageError> {
        debug!(path = %path, "Persisting update override");
        self.write(path, &OverrideNodeData::Updated(data))
    }

    fn remove(&self, path: &NodeNamesPath) -> Result<(), StorageError> {
        debug!(path = %path, "Persisting delete override");
        self.write(path, &OverrideNodeData::Deleted)
    }

    fn get_override(&self, path: &NodeNamesPath) -> Result<OverrideNodeData, StorageError> {
        match self.db.get(Self::key(path)?)? {
            Some(bytes) => Ok(bincode::deserialize(&bytes)?),
            None => Ok(OverrideNodeData::NotOverriden),
        }
    }

    fn forget(&self, path: &NodeNamesPath) -> Result<(), StorageError> {
        self.db.remove(Self::key(path)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.db.clear()?;
        Ok(())
    }

    fn list_overrides(&self) -> Result<Vec<(NodeNamesPath, OverrideNodeData)>, StorageError> {
        let mut entries = Vec::new();
        for item in self.db.iter() {
            let (key, value) = item?;
            let path: NodeNamesPath = bincode::deserialize(&key)?;
            let data: OverrideNodeData = bincode::deserialize(&value)?;
            entries.push((path, data));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeName;

    #[test]
    fn test_roundtrip_update_and_delete() {
        let tree = SledOverrideTree::temporary().unwrap();
        let updated = NodeNamesPath::parse("/a/u");
        let deleted = NodeNamesPath::parse("/a/d");
        let data = NodeData::file(NodeName::new("u"), 12, 5);

        tree.put(&updated, data.clone()).unwrap();
        tree.remove(&deleted).unwrap();

        assert_eq!(
            tree.get_override(&updated).unwrap(),
            OverrideNodeData::Updated(data)
        );
        assert_eq!(tree.get_override(&deleted).unwrap(), OverrideNodeData::Deleted);
        assert_eq!(
            tree.get_override(&NodeNamesPath::parse("/a")).unwrap(),
            OverrideNodeData::NotOverriden
        );
        assert_eq!(tree.list_overrides().unwrap().len(), 2);
    }

    #[test]
    fn test_reopen_keeps_overrides() {
        let temp = tempfile::tempdir().unwrap();
        let db_path = temp.path().join("overrides");
        let path = NodeNamesPath::parse("/gone");
        {
            let tree = SledOverrideTree::open(&db_path).unwrap();
            tree.remove(&path).unwrap();
            tree.flush().unwrap();
        }
        let tree = SledOverrideTree::open(&db_path).unwrap();
        assert_eq!(tree.get_override(&path).unwrap(), OverrideNodeData::Deleted);
    }
}
