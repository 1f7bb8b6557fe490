//! In-memory surface assembly
//!
//! Bindings describe a dependency's exports by composing closures into a
//! [`StaticSurface`]. Tests use the same builder to stand up conforming and
//! drifted dependency doubles.

use super::{
    Callable, Class, Instance, Invocation, MemberInfo, PackageMetadata, Signature, Surface,
    Symbol, Thrown,
};
use crate::statics::Declarations;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A callable backed by a closure
pub struct FnCallable<F> {
    signature: Signature,
    f: F,
}

impl<F> FnCallable<F>
where
    F: Fn(Vec<Value>) -> Invocation + Send + Sync + 'static,
{
    pub fn new(signature: Signature, f: F) -> Self {
        Self { signature, f }
    }
}

impl<F> Callable for FnCallable<F>
where
    F: Fn(Vec<Value>) -> Invocation + Send + Sync + 'static,
{
    fn signature(&self) -> Signature {
        self.signature.clone()
    }

    fn invoke(&self, args: Vec<Value>) -> Invocation {
        (self.f)(args)
    }
}

type Constructor = dyn Fn(Vec<Value>) -> Result<Arc<dyn Instance>, Thrown> + Send + Sync;

/// A class backed by a constructor closure and a declared member list
pub struct FnClass {
    signature: Signature,
    members: Vec<MemberInfo>,
    constructor: Box<Constructor>,
}

impl FnClass {
    pub fn new<F>(signature: Signature, constructor: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Arc<dyn Instance>, Thrown> + Send + Sync + 'static,
    {
        Self {
            signature,
            members: Vec::new(),
            constructor: Box::new(constructor),
        }
    }

    /// Add a prototype member
    pub fn with_member(mut self, member: MemberInfo) -> Self {
        self.members.push(member);
        self
    }

    /// Add several prototype members
    pub fn with_members(mut self, members: impl IntoIterator<Item = MemberInfo>) -> Self {
        self.members.extend(members);
        self
    }
}

impl Class for FnClass {
    fn signature(&self) -> Signature {
        self.signature.clone()
    }

    fn members(&self) -> Vec<MemberInfo> {
        self.members.clone()
    }

    fn construct(&self, args: Vec<Value>) -> Result<Arc<dyn Instance>, Thrown> {
        (self.constructor)(args)
    }
}

/// A surface whose exports are fixed at build time
pub struct StaticSurface {
    metadata: PackageMetadata,
    modules: BTreeMap<String, BTreeMap<String, Symbol>>,
    declarations: Option<Arc<Declarations>>,
}

impl std::fmt::Debug for StaticSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticSurface")
            .field("metadata", &self.metadata)
            .field("exports", &self.exports())
            .field("has_declarations", &self.declarations.is_some())
            .finish()
    }
}

impl Surface for StaticSurface {
    fn metadata(&self) -> &PackageMetadata {
        &self.metadata
    }

    fn resolve(&self, module: &str, export: &str) -> Option<Symbol> {
        self.modules.get(module)?.get(export).cloned()
    }

    fn exports(&self) -> Vec<(String, String)> {
        self.modules
            .iter()
            .flat_map(|(module, exports)| {
                exports
                    .keys()
                    .map(move |export| (module.clone(), export.clone()))
            })
            .collect()
    }

    fn declarations(&self) -> Option<Arc<Declarations>> {
        self.declarations.clone()
    }
}

/// Builder for [`StaticSurface`]
pub struct SurfaceBuilder {
    surface: StaticSurface,
}

impl SurfaceBuilder {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            surface: StaticSurface {
                metadata: PackageMetadata::new(name, version),
                modules: BTreeMap::new(),
                declarations: None,
            },
        }
    }

    /// Export a symbol under `module`
    pub fn export(mut self, module: &str, name: &str, symbol: Symbol) -> Self {
        self.surface
            .modules
            .entry(module.to_string())
            .or_default()
            .insert(name.to_string(), symbol);
        self
    }

    /// Export a closure-backed function
    pub fn function<F>(self, module: &str, name: &str, signature: Signature, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Invocation + Send + Sync + 'static,
    {
        self.export(
            module,
            name,
            Symbol::Function(Arc::new(FnCallable::new(signature, f))),
        )
    }

    /// Export a class
    pub fn class(self, module: &str, name: &str, class: FnClass) -> Self {
        self.export(module, name, Symbol::Class(Arc::new(class)))
    }

    /// Export a constant
    pub fn constant(self, module: &str, name: &str, value: Value) -> Self {
        self.export(module, name, Symbol::Constant(value))
    }

    /// Remove an export (used to model a symbol dropped by a release)
    pub fn without(mut self, module: &str, name: &str) -> Self {
        if let Some(exports) = self.surface.modules.get_mut(module) {
            exports.remove(name);
            if exports.is_empty() {
                self.surface.modules.remove(module);
            }
        }
        self
    }

    /// Attach shipped type declarations
    pub fn declarations(mut self, declarations: Declarations) -> Self {
        self.surface.declarations = Some(Arc::new(declarations));
        self
    }

    pub fn build(self) -> StaticSurface {
        self.surface
    }
}

#[cfg(test)]
mod builder_tests {
    use super::*;
    use crate::surface::{ReturnKind, ValueKind};
    use serde_json::json;

    #[test]
    fn test_resolve_and_exports_are_sorted() {
        let surface = SurfaceBuilder::new("pkg", "1.0.0")
            .constant("b", "VERSION", json!("1.0.0"))
            .function(
                "a",
                "double",
                Signature::new(ReturnKind::Value).param("n", ValueKind::Number),
                |args| {
                    let n = args.first().and_then(Value::as_i64).unwrap_or_default();
                    Invocation::value(json!(n * 2))
                },
            )
            .build();

        assert_eq!(
            surface.exports(),
            vec![
                ("a".to_string(), "double".to_string()),
                ("b".to_string(), "VERSION".to_string())
            ]
        );
        assert!(matches!(surface.resolve("a", "double"), Some(Symbol::Function(_))));
        assert!(surface.resolve("a", "triple").is_none());
        assert!(surface.resolve("c", "double").is_none());
    }

    #[test]
    fn test_without_removes_export_and_empty_module() {
        let surface = SurfaceBuilder::new("pkg", "1.0.0")
            .constant("consts", "A", json!(1))
            .without("consts", "A")
            .build();

        assert!(surface.exports().is_empty());
        assert!(surface.declarations().is_none());
    }
}
