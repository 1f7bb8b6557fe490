//! Tools served by the framework
//!
//! A [`Tool`] declares its metadata and a JSON Schema for its arguments;
//! the [`ToolRegistry`] owns a named set of tools, validates arguments
//! against each tool's schema and dispatches calls.

mod registry;
mod tool;

pub use registry::{RegistryError, ToolRegistry, ToolSummary};
pub use tool::{HandlerTool, Tool, ToolError, ToolHandler, ToolMetadata, ToolSchema};
