//! ConfigLoader: source composition and deserialization.

use super::sources::{environment, file};
use super::TreeCacheConfig;
use crate::error::CacheError;
use config::Config;
use std::path::Path;

/// Name of the per-workspace configuration file
pub const WORKSPACE_CONFIG_FILE: &str = "treecache.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence: global file (lowest) -> `<workspace>/treecache.toml` -> environment.
    pub fn load(workspace_root: &Path) -> Result<TreeCacheConfig, CacheError> {
        let builder = Config::builder();
        let builder = file::add_global(builder);
        let builder = file::add_optional(builder, &workspace_root.join(WORKSPACE_CONFIG_FILE));
        let builder = environment::add_to_builder(builder);

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Load configuration from a specific file with the environment overlay.
    ///
    /// The file must exist.
    pub fn load_from_file(path: &Path) -> Result<TreeCacheConfig, CacheError> {
        if !path.is_file() {
            return Err(CacheError::ConfigError(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let builder = Config::builder();
        let builder = file::add_global(builder);
        let builder = file::add_optional(builder, path);
        let builder = environment::add_to_builder(builder);

        Ok(builder.build()?.try_deserialize()?)
    }
}
