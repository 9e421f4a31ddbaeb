//! Configuration
//!
//! `TreeCacheConfig` is assembled by the `config` crate from serde defaults, an
//! optional global file, an optional workspace or explicit file, and the
//! environment, in that order of increasing precedence.

mod facade;

pub mod paths {
    pub mod xdg_root;
}

pub mod sources {
    pub mod environment;
    pub mod file;
}

pub mod workspace {
    pub mod storage_paths;
}

pub use facade::ConfigLoader;
pub use paths::xdg_root as xdg;
pub use workspace::storage_paths::StorageConfig;

use crate::cache::CacheConfig;
use crate::logging::LoggingConfig;
use crate::prefetch::PrefetchConfig;
use serde::{Deserialize, Serialize};

/// Complete runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeCacheConfig {
    #[serde(default)]
    pub prefetch: PrefetchConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}
