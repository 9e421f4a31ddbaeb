//! Tooling layer
//!
//! The clap command surface and output formatting for the `treecache` binary.

pub mod cli;
pub mod format;

pub use cli::{Cli, CliContext, Commands, OutputFormat};
