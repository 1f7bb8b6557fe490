//! Error types for toolkit operations

use crate::tools::{RegistryError, ToolError};

/// Result type for toolkit operations
pub type Result<T> = std::result::Result<T, ToolkitError>;

/// Main error type for the toolkit
#[derive(Debug, thiserror::Error)]
pub enum ToolkitError {
    /// Tool registry error
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Tool execution error
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}
