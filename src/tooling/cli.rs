//! CLI Tooling
//!
//! Command-line interface over a local directory tree: prefetch under limits,
//! list through the override overlay, and manage persisted overrides.

use super::format::{
    format_listing_json, format_listing_text, format_overrides_json, format_overrides_text, ListingEntry,
};
use crate::backend::LocalFsBackend;
use crate::cache::CachedTree;
use crate::config::{ConfigLoader, TreeCacheConfig};
use crate::error::CacheError;
use crate::overlay::{OverrideTree, SledOverrideTree};
use crate::service::TreeCache;
use crate::types::NodeNamesPath;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Treecache CLI - cached tree metadata with local overrides
#[derive(Parser, Debug)]
#[command(name = "treecache")]
#[command(about = "Tree metadata cache with a local override overlay and budgeted prefetch")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Maximum records per prefetch (-1 for unlimited)
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub max_count: Option<i64>,

    /// Maximum directory levels below the listed path (-1 for unlimited)
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub max_depth: Option<i32>,

    /// Prefetch time budget in milliseconds (-1 for unlimited)
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub max_duration_ms: Option<i64>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Prefetch a directory and list its children through the overlay
    Ls {
        /// Root directory of the cached tree
        root: PathBuf,
        /// Path below the root (default: the root itself)
        #[arg(default_value = "/")]
        path: String,
    },
    /// Record a deletion override
    Rm { root: PathBuf, path: String },
    /// Forget the override at a path so reads fall through to the base
    Restore { root: PathBuf, path: String },
    /// List recorded overrides
    Overrides { root: PathBuf },
    /// Discard every override for a root
    Reset { root: PathBuf },
}

impl Commands {
    pub fn root(&self) -> &Path {
        match self {
            Commands::Ls { root, .. }
            | Commands::Rm { root, .. }
            | Commands::Restore { root, .. }
            | Commands::Overrides { root }
            | Commands::Reset { root } => root,
        }
    }
}

impl Cli {
    /// Load configuration and apply the limit flags on top
    pub fn resolve_config(&self) -> Result<TreeCacheConfig, CacheError> {
        let mut config = match &self.config {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(self.command.root())?,
        };
        if let Some(max_count) = self.max_count {
            config.prefetch.max_count = max_count;
        }
        if let Some(max_depth) = self.max_depth {
            config.prefetch.max_recurse_level = max_depth;
        }
        if let Some(max_duration_ms) = self.max_duration_ms {
            config.prefetch.max_duration_millis = max_duration_ms;
        }
        Ok(config)
    }
}

/// Everything one command invocation needs for a single root
pub struct CliContext {
    cache: TreeCache<LocalFsBackend, SledOverrideTree>,
    overrides: Arc<SledOverrideTree>,
    format: OutputFormat,
}

impl CliContext {
    pub fn new(root: &Path, config: &TreeCacheConfig, format: OutputFormat) -> Result<Self, CacheError> {
        if !root.is_dir() {
            return Err(CacheError::ConfigError(format!(
                "root is not a directory: {}",
                root.display()
            )));
        }
        let overrides_path = config.storage.resolve_overrides_path(root)?;
        let overrides = Arc::new(SledOverrideTree::open(&overrides_path)?);
        let cache = TreeCache::new(
            Arc::new(LocalFsBackend::new(root)),
            Arc::new(CachedTree::new(config.cache.clone())),
            Arc::clone(&overrides),
            config.prefetch.clone(),
        );
        Ok(Self {
            cache,
            overrides,
            format,
        })
    }

    pub fn cache(&self) -> &TreeCache<LocalFsBackend, SledOverrideTree> {
        &self.cache
    }

    /// Run one command and return its rendered output
    pub async fn execute(&self, command: &Commands) -> Result<String, CacheError> {
        match command {
            Commands::Ls { path, .. } => self.handle_ls(&NodeNamesPath::parse(path)).await,
            Commands::Rm { path, .. } => {
                let path = NodeNamesPath::parse(path);
                self.cache.remove(&path)?;
                self.overrides.flush()?;
                info!(path = %path, "Recorded deletion override");
                Ok(format!("Removed {}", path))
            }
            Commands::Restore { path, .. } => {
                let path = NodeNamesPath::parse(path);
                self.cache.forget_override(&path)?;
                self.overrides.flush()?;
                Ok(format!("Restored {}", path))
            }
            Commands::Overrides { .. } => {
                let overrides = self.overrides.list_overrides()?;
                Ok(match self.format {
                    OutputFormat::Text => format_overrides_text(&overrides),
                    OutputFormat::Json => format_overrides_json(&overrides),
                })
            }
            Commands::Reset { .. } => {
                let count = self.overrides.len();
                self.cache.discard_overrides()?;
                self.overrides.flush()?;
                Ok(format!("Discarded {} overrides", count))
            }
        }
    }

    async fn handle_ls(&self, path: &NodeNamesPath) -> Result<String, CacheError> {
        let report = self.cache.prefetch(path).await;
        let children = self.cache.list_children(path).await?.ok_or_else(|| {
            CacheError::BackendError(crate::error::BackendError::NotFound(path.to_string()))
        })?;

        let mut entries = Vec::with_capacity(children.len());
        for (child_path, data) in children {
            let overridden = self.overrides.get_override(&child_path)?.is_overridden();
            entries.push(ListingEntry {
                path: child_path,
                data,
                overridden,
            });
        }
        Ok(match self.format {
            OutputFormat::Text => format_listing_text(path, &entries, &report),
            OutputFormat::Json => format_listing_json(path, &entries, &report),
        })
    }
}
