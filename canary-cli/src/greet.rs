//! The example tool served by the canary

use async_trait::async_trait;
use canary_toolkit::tools::{Tool, ToolError, ToolMetadata, ToolSchema};
use serde_json::{Value, json};

/// Greets someone by name
pub struct GreetTool {
    metadata: ToolMetadata,
}

impl GreetTool {
    pub const NAME: &'static str = "greet";

    pub fn new() -> Self {
        Self {
            metadata: ToolMetadata::new(Self::NAME, "Greets someone by name")
                .with_tag("example")
                .with_version(env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for GreetTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for GreetTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "minLength": 1 }
            },
            "required": ["name"],
            "additionalProperties": false
        }))
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let name = args
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("name is required".to_string()))?;
        Ok(json!(format!("Hello, {}!", name)))
    }
}
