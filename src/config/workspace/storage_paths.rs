//! StorageConfig: where the durable override store lives.

use crate::config::xdg;
use crate::error::CacheError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Storage configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Override store location; relative paths resolve against the root.
    /// `None` uses the per-root XDG data directory.
    #[serde(default)]
    pub overrides_path: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the sled directory holding overrides for `root`
    pub fn resolve_overrides_path(&self, root: &Path) -> Result<PathBuf, CacheError> {
        match &self.overrides_path {
            Some(path) if path.is_absolute() => Ok(path.clone()),
            Some(path) => Ok(root.join(path)),
            None => Ok(xdg::root_data_dir(root)?.join("overrides")),
        }
    }
}
