//! Public surface of the release as a consumer sees it

use canary_toolkit::prelude::*;
use serde_json::{Value, json};
use std::sync::Arc;

fn greet_tool() -> HandlerTool {
    HandlerTool::new(
        ToolMetadata::new("greet", "Greets someone by name").with_version("1.0.0"),
        ToolSchema::new(json!({
            "type": "object",
            "properties": { "name": { "type": "string", "minLength": 1 } },
            "required": ["name"]
        })),
        |args: Value| {
            let name = args
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| ToolError::Execution("name missing".into()))?;
            Ok(json!(format!("Hello, {name}!")))
        },
    )
}

#[test]
fn test_shipped_declarations_describe_this_release() {
    let decls: Value = serde_json::from_str(canary_toolkit::DECLARATIONS).unwrap();

    assert_eq!(decls["package"], canary_toolkit::PACKAGE);
    assert_eq!(decls["version"], canary_toolkit::VERSION);

    let modules = decls["modules"].as_object().unwrap();
    for module in ["tools", "config", "llm", "package"] {
        assert!(modules.contains_key(module), "module {module} not declared");
    }
    assert_eq!(
        decls["modules"]["config"]["types"]["ToolkitConfig"]["struct"]["fields"]["server_name"],
        json!({ "ty": "string" })
    );
}

#[tokio::test]
async fn test_registry_round_trip_through_prelude() {
    let mut registry = ToolRegistry::new();
    registry.add(Arc::new(greet_tool())).unwrap();

    let greeting = registry.call("greet", json!({ "name": "Ada" })).await.unwrap();
    assert_eq!(greeting, json!("Hello, Ada!"));

    let err = registry.call("greet", json!({ "name": "" })).await.unwrap_err();
    assert!(matches!(err, RegistryError::InvalidArguments { .. }));

    let summary = &registry.list()[0];
    assert_eq!(summary.version.as_deref(), Some("1.0.0"));
}

#[test]
fn test_errors_convert_into_toolkit_error() {
    let err: ToolkitError = RegistryError::NotFound("x".into()).into();
    assert_eq!(err.to_string(), "Registry error: Tool 'x' not found");
}
