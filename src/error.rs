//! Error types for storage, backend and cache operations.
//!
//! Budget exhaustion and missing nodes are not errors; they surface as booleans
//! and `None` respectively.

use thiserror::Error;

/// Errors raised by the persisted stores
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("encoding error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// Errors raised while fetching or converting a backend record
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend path not found: {0}")]
    NotFound(String),

    #[error("backend I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("backend listing failed: {0}")]
    ListingFailed(String),

    #[error("path does not map into the backend: {0}")]
    InvalidPath(String),

    #[error("record conversion failed: {0}")]
    ConversionFailed(String),
}

/// Top-level error type for the cache façade, configuration and tooling
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("backend error: {0}")]
    BackendError(#[from] BackendError),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for CacheError {
    fn from(err: config::ConfigError) -> Self {
        CacheError::ConfigError(err.to_string())
    }
}
