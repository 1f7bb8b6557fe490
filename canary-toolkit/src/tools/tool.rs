//! Tool trait and metadata definitions

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Errors raised by a tool or its argument validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    /// Arguments failed schema validation
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The tool's schema is itself not a valid JSON Schema
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// The tool ran and failed
    #[error("execution failed: {0}")]
    Execution(String),
}

/// Tool metadata used for listing and discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolMetadata {
    /// Tool name (unique within a registry)
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// Tags for categorization
    #[serde(default)]
    pub tags: Vec<String>,

    /// Tool version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ToolMetadata {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            tags: Vec::new(),
            version: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// JSON Schema for tool parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub parameters: Value,
}

impl ToolSchema {
    pub fn new(parameters: Value) -> Self {
        Self { parameters }
    }

    /// Schema of a tool that takes no parameters
    pub fn empty() -> Self {
        Self {
            parameters: serde_json::json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        }
    }

    /// Validate arguments, reporting at most five violations
    pub fn validate(&self, args: &Value) -> Result<(), ToolError> {
        let validator = jsonschema::validator_for(&self.parameters)
            .map_err(|e| ToolError::InvalidSchema(e.to_string()))?;
        if validator.is_valid(args) {
            return Ok(());
        }

        let msg = validator
            .iter_errors(args)
            .take(5)
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Err(ToolError::InvalidArguments(if msg.is_empty() {
            "arguments rejected by schema".to_string()
        } else {
            msg
        }))
    }
}

impl Default for ToolSchema {
    fn default() -> Self {
        Self::empty()
    }
}

/// A tool the framework can serve
#[async_trait]
pub trait Tool: Send + Sync {
    fn metadata(&self) -> &ToolMetadata;

    fn schema(&self) -> ToolSchema {
        ToolSchema::empty()
    }

    fn name(&self) -> &str {
        &self.metadata().name
    }

    fn description(&self) -> &str {
        &self.metadata().description
    }

    /// Execute with already validated arguments
    async fn execute(&self, args: Value) -> Result<Value, ToolError>;
}

/// Synchronous handler behind a [`HandlerTool`]
pub trait ToolHandler: Send + Sync {
    fn handle(&self, args: Value) -> Result<Value, ToolError>;
}

impl<F> ToolHandler for F
where
    F: Fn(Value) -> Result<Value, ToolError> + Send + Sync,
{
    fn handle(&self, args: Value) -> Result<Value, ToolError> {
        self(args)
    }
}

/// A tool assembled from metadata, a schema and a handler closure
#[derive(Clone)]
pub struct HandlerTool {
    metadata: ToolMetadata,
    schema: ToolSchema,
    handler: Arc<dyn ToolHandler>,
}

impl HandlerTool {
    pub fn new<H>(metadata: ToolMetadata, schema: ToolSchema, handler: H) -> Self
    where
        H: ToolHandler + 'static,
    {
        Self {
            metadata,
            schema,
            handler: Arc::new(handler),
        }
    }
}

impl std::fmt::Debug for HandlerTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerTool")
            .field("metadata", &self.metadata)
            .field("schema", &self.schema)
            .finish()
    }
}

#[async_trait]
impl Tool for HandlerTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    fn schema(&self) -> ToolSchema {
        self.schema.clone()
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        self.handler.handle(args)
    }
}
