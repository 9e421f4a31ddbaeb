//! Environment variable source: TREECACHE__* prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

/// Add environment variable overlay to builder.
///
/// `TREECACHE__PREFETCH__MAX_COUNT=10` sets `prefetch.max_count`.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("TREECACHE")
            .separator("__")
            .try_parsing(true),
    )
}
