//! # Canary Toolkit
//!
//! The tool-serving framework release pinned by the canary. It exposes three
//! public areas:
//! - `tools`: tool trait, schema validation and the tool registry
//! - `config`: the process-wide server configuration accessor
//! - `llm`: the LLM provider manager and its initialization state
//!
//! The package ships its type declarations alongside the code
//! ([`DECLARATIONS`]), the way a published package ships its typings.

pub mod config;
pub mod error;
pub mod llm;
pub mod tools;

pub use error::{Result, ToolkitError};

/// Current release version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name as published
pub const PACKAGE: &str = env!("CARGO_PKG_NAME");

/// Type declarations shipped with this release
pub const DECLARATIONS: &str = include_str!("../types/declarations.json");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ToolkitConfig, Transport, current_config};
    pub use crate::error::{Result, ToolkitError};
    pub use crate::llm::{InitState, ProviderConfig, ProviderManager};
    pub use crate::tools::{
        HandlerTool, RegistryError, Tool, ToolError, ToolMetadata, ToolRegistry, ToolSchema,
        ToolSummary,
    };
}
