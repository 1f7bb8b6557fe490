//! Error types for canary operations

use crate::catalog::CatalogError;

/// Result type for canary operations
pub type Result<T> = std::result::Result<T, CanaryError>;

/// Run-level errors.
///
/// Entry-level and unit-level problems (missing symbols, shape mismatches,
/// behavior mismatches, timeouts, type-check divergences) are never raised as
/// errors; they are captured into the [`Report`](crate::report::Report).
/// Only the variants below abort a run.
#[derive(Debug, thiserror::Error)]
pub enum CanaryError {
    /// The environment is broken: the dependency cannot be loaded, its
    /// metadata does not match the catalog, or its declarations are unreadable
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),

    /// Catalog or type fixture document is invalid
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid `--filter` pattern
    #[error("Invalid filter pattern: {0}")]
    Filter(#[from] regex::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl CanaryError {
    /// Whether this error signals a broken environment rather than a bad
    /// invocation. Drives the distinct process exit code.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, CanaryError::Infrastructure(_))
    }
}

impl From<String> for CanaryError {
    fn from(s: String) -> Self {
        CanaryError::Other(s)
    }
}

impl From<&str> for CanaryError {
    fn from(s: &str) -> Self {
        CanaryError::Other(s.to_string())
    }
}

impl From<anyhow::Error> for CanaryError {
    fn from(err: anyhow::Error) -> Self {
        CanaryError::Other(err.to_string())
    }
}
