//! XDG Base Directory utilities for per-root data and global config.

use crate::error::CacheError;
use std::path::{Component, Path, PathBuf};

const APP_DIR: &str = "treecache";

/// Get XDG data home directory
///
/// Returns `$XDG_DATA_HOME` if set, otherwise defaults to `$HOME/.local/share`
pub fn data_home() -> Option<PathBuf> {
    if let Ok(xdg_data_home) = std::env::var("XDG_DATA_HOME") {
        return Some(PathBuf::from(xdg_data_home));
    }

    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".local").join("share"))
}

/// Get XDG config home directory
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise defaults to `$HOME/.config`
pub fn config_home() -> Result<PathBuf, CacheError> {
    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg_config_home));
    }

    let home = std::env::var("HOME").map_err(|_| {
        CacheError::ConfigError(
            "Could not determine XDG config home directory (HOME not set)".to_string(),
        )
    })?;

    Ok(PathBuf::from(home).join(".config"))
}

/// `$XDG_CONFIG_HOME/treecache/config.toml`
pub fn global_config_path() -> Result<PathBuf, CacheError> {
    Ok(config_home()?.join(APP_DIR).join("config.toml"))
}

/// Get the data directory for a cached root
///
/// The canonical root path is mirrored below `$XDG_DATA_HOME/treecache/`, so
/// `/srv/share` maps to `$XDG_DATA_HOME/treecache/srv/share/`.
pub fn root_data_dir(root: &Path) -> Result<PathBuf, CacheError> {
    let data_home = data_home().ok_or_else(|| {
        CacheError::ConfigError(
            "Could not determine XDG data home directory (HOME not set)".to_string(),
        )
    })?;
    let canonical = root.canonicalize().map_err(|e| {
        CacheError::ConfigError(format!(
            "Failed to canonicalize root path {}: {}",
            root.display(),
            e
        ))
    })?;
    Ok(mirror_under(data_home.join(APP_DIR), &canonical))
}

/// Append the normal components of `path` to `base`
pub(crate) fn mirror_under(base: PathBuf, path: &Path) -> PathBuf {
    path.components().fold(base, |dir, component| match component {
        Component::Normal(name) => dir.join(name),
        Component::RootDir | Component::Prefix(_) | Component::CurDir | Component::ParentDir => dir,
    })
}
