//! Local directory lister used by the `treecache` binary

use super::{BackendChildEntry, BackendLister, BackendListing, BackendRecord, PageCursor};
use crate::error::BackendError;
use crate::types::{NodeName, NodeNamesPath, NodeType, TimeMillis};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fs::Metadata;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Lists a directory tree on the local filesystem
///
/// Blocking filesystem calls run on tokio's blocking pool.
pub struct LocalFsBackend {
    root: PathBuf,
}

impl LocalFsBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map `path` under the root; segments that are not plain names are
    /// rejected so a listing can never leave the root
    fn resolve(&self, path: &NodeNamesPath) -> Result<PathBuf, BackendError> {
        let mut resolved = self.root.clone();
        for name in path.names() {
            let mut components = Path::new(name.as_str()).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(segment)), None) => resolved.push(segment),
                _ => return Err(BackendError::InvalidPath(path.to_string())),
            }
        }
        Ok(resolved)
    }
}

fn millis(time: std::io::Result<SystemTime>) -> TimeMillis {
    time.ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as TimeMillis)
        .unwrap_or(0)
}

fn io_error(path: &Path, source: std::io::Error) -> BackendError {
    if source.kind() == std::io::ErrorKind::NotFound {
        return BackendError::NotFound(path.display().to_string());
    }
    BackendError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn record_from_metadata(name: NodeName, metadata: &Metadata) -> BackendRecord {
    let node_type = if metadata.is_dir() {
        NodeType::Dir
    } else {
        NodeType::File
    };
    let mut attrs = BTreeMap::new();
    if metadata.permissions().readonly() {
        attrs.insert("readonly".to_string(), "true".to_string());
    }
    BackendRecord {
        name,
        node_type,
        creation_time: millis(metadata.created()),
        last_modified_time: millis(metadata.modified()),
        length: if metadata.is_dir() { 0 } else { metadata.len() },
        attrs,
        child_names: Vec::new(),
    }
}

fn node_name_of(path: &NodeNamesPath) -> NodeName {
    path.last().cloned().unwrap_or_else(|| NodeName::new(""))
}

fn list_blocking(fs_path: &Path, name: NodeName) -> Result<BackendListing, BackendError> {
    let metadata = std::fs::metadata(fs_path).map_err(|e| io_error(fs_path, e))?;
    let mut record = record_from_metadata(name, &metadata);
    let mut children = Vec::new();

    if metadata.is_dir() {
        let entries = std::fs::read_dir(fs_path).map_err(|e| io_error(fs_path, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| io_error(fs_path, e))?;
            let child_name = NodeName::new(&entry.file_name().to_string_lossy());
            // Entries that vanish or cannot be stat'ed are skipped
            let child_metadata = match entry.metadata() {
                Ok(m) => m,
                Err(_) => continue,
            };
            let child_record = record_from_metadata(child_name.clone(), &child_metadata);
            children.push(BackendChildEntry {
                name: child_name,
                node_type: child_record.node_type,
                record: (child_record.node_type == NodeType::File).then_some(child_record),
            });
        }
        children.sort_by(|a, b| a.name.cmp(&b.name));
        record.child_names = children.iter().map(|c| c.name.clone()).collect();
    }

    Ok(BackendListing {
        record,
        children,
        is_incomplete: false,
        next_page: None,
    })
}

#[async_trait]
impl BackendLister for LocalFsBackend {
    /// Directories are read whole; there is never a second page
    async fn list_page(
        &self,
        path: &NodeNamesPath,
        _cursor: Option<&PageCursor>,
    ) -> Result<BackendListing, BackendError> {
        let fs_path = self.resolve(path)?;
        let name = node_name_of(path);
        tokio::task::spawn_blocking(move || list_blocking(&fs_path, name))
            .await
            .map_err(|e| BackendError::ListingFailed(e.to_string()))?
    }

    async fn stat(&self, path: &NodeNamesPath) -> Result<BackendRecord, BackendError> {
        let fs_path = self.resolve(path)?;
        let name = node_name_of(path);
        tokio::task::spawn_blocking(move || {
            let metadata = std::fs::metadata(&fs_path).map_err(|e| io_error(&fs_path, e))?;
            Ok(record_from_metadata(name, &metadata))
        })
        .await
        .map_err(|e| BackendError::ListingFailed(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_lists_directory_children_sorted() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("b.txt"), "bb").unwrap();
        fs::write(temp.path().join("a.txt"), "a").unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();

        let backend = LocalFsBackend::new(temp.path());
        let listing = backend.list(&NodeNamesPath::root()).await.unwrap();
        let names: Vec<&str> = listing.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "sub"]);
        assert!(listing.children[0].record.is_some());
        assert!(listing.children[2].record.is_none());
        assert!(!listing.is_incomplete);
    }

    #[tokio::test]
    async fn test_stat_missing_is_not_found() {
        let temp = tempfile::tempdir().unwrap();
        let backend = LocalFsBackend::new(temp.path());
        let err = backend
            .stat(&NodeNamesPath::parse("/nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));

        fs::write(temp.path().join("f"), "12345").unwrap();
        let record = backend.stat(&NodeNamesPath::parse("/f")).await.unwrap();
        assert_eq!(record.length, 5);
        assert_eq!(record.node_type, NodeType::File);
    }

    #[tokio::test]
    async fn test_dot_segments_cannot_leave_root() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("root");
        fs::create_dir(&root).unwrap();
        fs::write(temp.path().join("secret.txt"), "s").unwrap();

        let backend = LocalFsBackend::new(&root);
        for text in ["/..", "/../secret.txt", "/.", "/sub/../.."] {
            let path = NodeNamesPath::parse(text);
            let err = backend.list(&path).await.unwrap_err();
            assert!(matches!(err, BackendError::InvalidPath(_)), "{}", text);
            let err = backend.stat(&path).await.unwrap_err();
            assert!(matches!(err, BackendError::InvalidPath(_)), "{}", text);
        }
    }
}
