//! File sources: the global config file and optional per-workspace files

use crate::config::xdg;
use config::builder::DefaultState;
use config::{ConfigBuilder, File};
use std::path::Path;

/// Add `$XDG_CONFIG_HOME/treecache/config.toml` when it can be located
pub fn add_global(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    match xdg::global_config_path() {
        Ok(path) => add_optional(builder, &path),
        Err(_) => builder,
    }
}

/// Add a file that may not exist; the format follows the extension
pub fn add_optional(builder: ConfigBuilder<DefaultState>, path: &Path) -> ConfigBuilder<DefaultState> {
    builder.add_source(File::from(path).required(false))
}
