//! Tool registry: registration, lookup, listing and dispatch
//!
//! ```rust,ignore
//! use canary_toolkit::tools::ToolRegistry;
//!
//! let mut registry = ToolRegistry::new();
//! registry.add(Arc::new(GreetTool::new()))?;
//!
//! let greeting = registry.call("greet", json!({ "name": "Ada" })).await?;
//! ```

use super::tool::{Tool, ToolError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A tool with this name is already registered
    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),

    /// No tool with this name
    #[error("Tool '{0}' not found")]
    NotFound(String),

    /// Arguments rejected by the tool's schema
    #[error("Invalid arguments for tool '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// The tool itself failed
    #[error("Tool '{tool}' failed: {source}")]
    Execution {
        tool: String,
        #[source]
        source: ToolError,
    },
}

/// Summary of a tool for listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSummary {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl From<&dyn Tool> for ToolSummary {
    fn from(tool: &dyn Tool) -> Self {
        let metadata = tool.metadata();
        Self {
            name: metadata.name.clone(),
            description: metadata.description.clone(),
            tags: metadata.tags.clone(),
            version: metadata.version.clone(),
        }
    }
}

/// A named set of tools
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool
    ///
    /// Returns an error if a tool with the same name is already registered.
    pub fn add(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        debug!(tool = %name, "Registered tool");
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Summaries of all tools, ordered by name
    pub fn list(&self) -> Vec<ToolSummary> {
        self.tools
            .values()
            .map(|t| ToolSummary::from(t.as_ref()))
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Move every tool of `other` into this registry.
    ///
    /// All-or-nothing: if any name collides, nothing is added and the first
    /// colliding name is reported. Returns the number of tools added.
    pub fn merge(&mut self, other: &ToolRegistry) -> Result<usize, RegistryError> {
        if let Some(name) = other.tools.keys().find(|name| self.tools.contains_key(*name)) {
            return Err(RegistryError::DuplicateTool(name.clone()));
        }
        for (name, tool) in &other.tools {
            self.tools.insert(name.clone(), tool.clone());
        }
        debug!(added = other.len(), total = self.len(), "Merged tool registry");
        Ok(other.len())
    }

    /// Validate arguments against a tool's schema without running it
    pub fn validate_args(&self, name: &str, args: &Value) -> Result<(), RegistryError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        tool.schema()
            .validate(args)
            .map_err(|e| RegistryError::InvalidArguments {
                tool: name.to_string(),
                reason: match e {
                    ToolError::InvalidArguments(reason) => reason,
                    other => other.to_string(),
                },
            })
    }

    /// Validate arguments and execute a tool
    pub async fn call(&self, name: &str, args: Value) -> Result<Value, RegistryError> {
        self.validate_args(name, &args)?;
        let tool = self
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

        debug!(tool = %name, "Calling tool");
        tool.execute(args)
            .await
            .map_err(|source| RegistryError::Execution {
                tool: name.to_string(),
                source,
            })
    }
}
