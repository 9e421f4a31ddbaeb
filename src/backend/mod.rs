//! Backend listing provider contract
//!
//! The slow hierarchical source being cached. The core consumes backend records
//! only through a `RecordConverter`.

pub mod local;
pub mod memory;

pub use local::LocalFsBackend;
pub use memory::MemoryBackend;

use crate::error::BackendError;
use crate::types::{NodeName, NodeNamesPath, NodeType, TimeMillis};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Backend-specific description of one file or directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendRecord {
    pub name: NodeName,
    pub node_type: NodeType,
    pub creation_time: TimeMillis,
    pub last_modified_time: TimeMillis,
    pub length: u64,
    pub attrs: BTreeMap<String, String>,
    /// Child names enumerated so far; empty for files
    pub child_names: Vec<NodeName>,
}

/// One child discovered by a listing
///
/// `record` is present when the listing already carried full metadata.
#[derive(Debug, Clone)]
pub struct BackendChildEntry {
    pub name: NodeName,
    pub node_type: NodeType,
    pub record: Option<BackendRecord>,
}

/// Opaque continuation token handed back by a paged listing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageCursor(String);

impl PageCursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Result of listing one page of a path
///
/// `record.child_names` and `children` cover this page only.
#[derive(Debug, Clone)]
pub struct BackendListing {
    pub record: BackendRecord,
    pub children: Vec<BackendChildEntry>,
    /// True when the listing was truncated (e.g. one page of many)
    pub is_incomplete: bool,
    /// Cursor for the next page; `None` on the last page
    pub next_page: Option<PageCursor>,
}

/// Backend listing provider
#[async_trait]
pub trait BackendLister: Send + Sync {
    /// List one page of `path`: its own record plus the children on that
    /// page. `cursor` is `None` for the first page.
    async fn list_page(
        &self,
        path: &NodeNamesPath,
        cursor: Option<&PageCursor>,
    ) -> Result<BackendListing, BackendError>;

    /// First page of `path`
    async fn list(&self, path: &NodeNamesPath) -> Result<BackendListing, BackendError> {
        self.list_page(path, None).await
    }

    /// Fetch the full record for a single path
    async fn stat(&self, path: &NodeNamesPath) -> Result<BackendRecord, BackendError>;
}
