//! Binds the pinned toolkit release to the canary's surface model
//!
//! Only the toolkit's public API is used here. Each export is wrapped as a
//! function, class or constant with an introspectable signature; toolkit
//! errors surface as thrown errors whose kind names the failure.

use crate::greet::GreetTool;
use canary_core::statics::Declarations;
use canary_core::surface::{
    FnClass, Instance, Invocation, MemberInfo, ReturnKind, Signature, StaticSurface, Surface,
    SurfaceBuilder, SurfaceRegistry, Thrown, ValueKind,
};
use canary_toolkit::config::current_config;
use canary_toolkit::llm::{ProviderConfig, ProviderManager};
use canary_toolkit::tools::{
    HandlerTool, RegistryError, Tool, ToolMetadata, ToolRegistry, ToolSchema, ToolSummary,
};
use canary_toolkit::ToolkitError;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

/// Installations linked into this binary
pub fn installed() -> SurfaceRegistry {
    SurfaceRegistry::new().install(canary_toolkit::PACKAGE, || {
        Ok(Arc::new(toolkit_surface()?) as Arc<dyn Surface>)
    })
}

/// The toolkit's exports together with its shipped declarations
pub fn toolkit_surface() -> canary_core::Result<StaticSurface> {
    let declarations = Declarations::from_json_str(canary_toolkit::DECLARATIONS)?;

    Ok(SurfaceBuilder::new(canary_toolkit::PACKAGE, canary_toolkit::VERSION)
        .constant("package", "VERSION", json!(canary_toolkit::VERSION))
        .function(
            "config",
            "current_config",
            Signature::new(ReturnKind::Value),
            |_| match serde_json::to_value(current_config()) {
                Ok(config) => Invocation::value(config),
                Err(e) => Invocation::thrown(Thrown::new("SerializationError", e.to_string())),
            },
        )
        .class("tools", "ToolRegistry", tool_registry_class())
        .class("llm", "ProviderManager", provider_manager_class())
        .declarations(declarations)
        .build())
}

fn type_error(message: impl Into<String>) -> Thrown {
    Thrown::new("TypeError", message)
}

fn string_arg(args: &[Value], idx: usize, name: &str) -> Result<String, Thrown> {
    args.get(idx)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| type_error(format!("argument `{}` must be a string", name)))
}

fn registry_thrown(err: RegistryError) -> Thrown {
    let kind = match &err {
        RegistryError::DuplicateTool(_) => "DuplicateTool",
        RegistryError::NotFound(_) => "ToolNotFound",
        RegistryError::InvalidArguments { .. } => "InvalidArguments",
        RegistryError::Execution { .. } => "ToolExecutionError",
    };
    Thrown::new(kind, err.to_string())
}

fn toolkit_thrown(err: ToolkitError) -> Thrown {
    let kind = match &err {
        ToolkitError::Registry(_) => "RegistryError",
        ToolkitError::Tool(_) => "ToolError",
        ToolkitError::Provider(_) => "ProviderError",
        ToolkitError::Configuration(_) => "ConfigurationError",
    };
    Thrown::new(kind, err.to_string())
}

/// Tool description accepted by `add` and `merge`
#[derive(Debug, Deserialize)]
struct ToolSpec {
    name: String,
    description: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    input_schema: Option<Value>,
}

impl ToolSpec {
    fn parse(value: Value) -> Result<Self, Thrown> {
        serde_json::from_value(value).map_err(|e| type_error(format!("invalid tool: {}", e)))
    }

    /// The built-in tool of the same name, or an echo tool with this description
    fn into_tool(self) -> Arc<dyn Tool> {
        if self.name == GreetTool::NAME {
            return Arc::new(GreetTool::new());
        }
        let metadata = self
            .tags
            .into_iter()
            .fold(ToolMetadata::new(self.name, self.description), |m, tag| {
                m.with_tag(tag)
            });
        let schema = self
            .input_schema
            .map(ToolSchema::new)
            .unwrap_or_else(|| ToolSchema::new(json!({ "type": "object" })));
        Arc::new(HandlerTool::new(metadata, schema, |args: Value| Ok(args)))
    }
}

fn tool_registry_class() -> FnClass {
    FnClass::new(Signature::new(ReturnKind::Value), |_| {
        Ok(Arc::new(RegistryInstance::default()) as Arc<dyn Instance>)
    })
    .with_members([
        MemberInfo::method(
            "add",
            Signature::new(ReturnKind::None).param("tool", ValueKind::Object),
        ),
        MemberInfo::method(
            "get",
            Signature::new(ReturnKind::Value).param("name", ValueKind::String),
        ),
        MemberInfo::method(
            "has",
            Signature::new(ReturnKind::Value).param("name", ValueKind::String),
        ),
        MemberInfo::method("list", Signature::new(ReturnKind::Value)),
        MemberInfo::method(
            "merge",
            Signature::new(ReturnKind::Value).param("tools", ValueKind::Array),
        ),
        MemberInfo::method(
            "call",
            Signature::new(ReturnKind::Deferred)
                .param("name", ValueKind::String)
                .optional("args", ValueKind::Object),
        ),
        MemberInfo::field("size"),
    ])
}

#[derive(Default)]
struct RegistryInstance {
    registry: Mutex<ToolRegistry>,
}

impl RegistryInstance {
    fn dispatch(&self, method: &str, args: Vec<Value>) -> Result<Invocation, Thrown> {
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        let value = match method {
            "add" => {
                let spec = ToolSpec::parse(args.into_iter().next().unwrap_or(Value::Null))?;
                registry.add(spec.into_tool()).map_err(registry_thrown)?;
                Value::Null
            }
            "get" => {
                let name = string_arg(&args, 0, "name")?;
                match registry.get(&name) {
                    Some(tool) => serde_json::to_value(ToolSummary::from(tool.as_ref()))
                        .map_err(|e| type_error(e.to_string()))?,
                    None => Value::Null,
                }
            }
            "has" => json!(registry.has(&string_arg(&args, 0, "name")?)),
            "list" => serde_json::to_value(registry.list()).map_err(|e| type_error(e.to_string()))?,
            "merge" => {
                let Some(Value::Array(specs)) = args.into_iter().next() else {
                    return Err(type_error("argument `tools` must be an array"));
                };
                let mut other = ToolRegistry::new();
                for spec in specs {
                    other
                        .add(ToolSpec::parse(spec)?.into_tool())
                        .map_err(registry_thrown)?;
                }
                json!(registry.merge(&other).map_err(registry_thrown)?)
            }
            "call" => {
                let name = string_arg(&args, 0, "name")?;
                let call_args = args.get(1).cloned().unwrap_or_else(|| json!({}));
                let registry = registry.clone();
                return Ok(Invocation::deferred(async move {
                    registry.call(&name, call_args).await.map_err(registry_thrown)
                }));
            }
            other => return Err(type_error(format!("registry.{} is not a function", other))),
        };
        Ok(Invocation::value(value))
    }
}

impl Instance for RegistryInstance {
    fn invoke(&self, method: &str, args: Vec<Value>) -> Invocation {
        self.dispatch(method, args).unwrap_or_else(Invocation::thrown)
    }

    fn read(&self, field: &str) -> Option<Value> {
        match field {
            "size" => {
                let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
                Some(json!(registry.len()))
            }
            _ => None,
        }
    }
}

fn provider_manager_class() -> FnClass {
    FnClass::new(
        Signature::new(ReturnKind::Value).optional("providers", ValueKind::Array),
        |args| {
            let providers: Vec<ProviderConfig> = match args.into_iter().next() {
                None | Some(Value::Null) => Vec::new(),
                Some(value) => serde_json::from_value(value)
                    .map_err(|e| type_error(format!("invalid providers: {}", e)))?,
            };
            Ok(Arc::new(ManagerInstance {
                manager: Arc::new(ProviderManager::new(providers)),
            }) as Arc<dyn Instance>)
        },
    )
    .with_members([
        MemberInfo::method("initialize", Signature::new(ReturnKind::Deferred)),
        MemberInfo::method("list_available_providers", Signature::new(ReturnKind::Value)),
        MemberInfo::method(
            "is_provider_available",
            Signature::new(ReturnKind::Value).param("name", ValueKind::String),
        ),
        MemberInfo::method("state", Signature::new(ReturnKind::Value)),
    ])
}

struct ManagerInstance {
    manager: Arc<ProviderManager>,
}

impl Instance for ManagerInstance {
    fn invoke(&self, method: &str, args: Vec<Value>) -> Invocation {
        match method {
            "initialize" => {
                let manager = self.manager.clone();
                Invocation::deferred(async move {
                    manager
                        .initialize()
                        .await
                        .map(|_| Value::Null)
                        .map_err(toolkit_thrown)
                })
            }
            "list_available_providers" => {
                Invocation::value(json!(self.manager.list_available_providers()))
            }
            "is_provider_available" => match string_arg(&args, 0, "name") {
                Ok(name) => Invocation::value(json!(self.manager.is_provider_available(&name))),
                Err(thrown) => Invocation::thrown(thrown),
            },
            "state" => match serde_json::to_value(self.manager.state()) {
                Ok(state) => Invocation::value(state),
                Err(e) => Invocation::thrown(type_error(e.to_string())),
            },
            other => Invocation::thrown(type_error(format!(
                "manager.{} is not a function",
                other
            ))),
        }
    }

    fn read(&self, _field: &str) -> Option<Value> {
        None
    }
}

#[cfg(test)]
mod binding_tests {
    use super::*;
    use canary_core::surface::Symbol;

    async fn settle(invocation: Invocation) -> Result<Value, Thrown> {
        match invocation {
            Invocation::Returned(result) => result,
            Invocation::Deferred(fut) => fut.await,
        }
    }

    fn construct(surface: &StaticSurface, module: &str, class: &str, args: Vec<Value>) -> Arc<dyn Instance> {
        match surface.resolve(module, class) {
            Some(Symbol::Class(class)) => class.construct(args).unwrap(),
            other => panic!("expected a class, found {other:?}"),
        }
    }

    #[test]
    fn test_surface_matches_installed_release() {
        let surface = installed().load(canary_toolkit::PACKAGE).unwrap();
        assert_eq!(surface.metadata().version, canary_toolkit::VERSION);
        assert!(surface.declarations().is_some());
        assert_eq!(
            surface.exports(),
            vec![
                ("config".to_string(), "current_config".to_string()),
                ("llm".to_string(), "ProviderManager".to_string()),
                ("package".to_string(), "VERSION".to_string()),
                ("tools".to_string(), "ToolRegistry".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_registry_instance_dispatch() {
        let surface = toolkit_surface().unwrap();
        let registry = construct(&surface, "tools", "ToolRegistry", vec![]);

        let added = settle(registry.invoke(
            "add",
            vec![json!({ "name": "greet", "description": "Greets" })],
        ))
        .await;
        assert_eq!(added, Ok(Value::Null));
        assert_eq!(registry.read("size"), Some(json!(1)));

        let duplicate = settle(registry.invoke(
            "add",
            vec![json!({ "name": "greet", "description": "Greets" })],
        ))
        .await
        .unwrap_err();
        assert_eq!(duplicate.kind, "DuplicateTool");

        let greeting = settle(registry.invoke("call", vec![json!("greet"), json!({ "name": "Ada" })]))
            .await
            .unwrap();
        assert_eq!(greeting, json!("Hello, Ada!"));

        let missing = settle(registry.invoke("call", vec![json!("nope")])).await.unwrap_err();
        assert_eq!(missing.kind, "ToolNotFound");
    }

    #[tokio::test]
    async fn test_manager_instance_dispatch() {
        let surface = toolkit_surface().unwrap();
        let manager = construct(&surface, "llm", "ProviderManager", vec![json!([{ "name": "ollama" }])]);

        assert_eq!(settle(manager.invoke("state", vec![])).await, Ok(json!("uninitialized")));
        assert_eq!(settle(manager.invoke("initialize", vec![])).await, Ok(Value::Null));
        assert_eq!(settle(manager.invoke("state", vec![])).await, Ok(json!("ready")));
        assert_eq!(
            settle(manager.invoke("list_available_providers", vec![])).await,
            Ok(json!(["ollama"]))
        );

        let unknown = settle(manager.invoke("shutdown", vec![])).await.unwrap_err();
        assert_eq!(unknown.kind, "TypeError");
    }
}
