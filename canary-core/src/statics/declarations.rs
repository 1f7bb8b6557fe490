//! Type-level surface shipped with a dependency

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// A type expression in declaration files and fixtures
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeExpr {
    Any,
    Unit,
    Null,
    Boolean,
    Number,
    String,
    /// A single string literal
    Literal(String),
    Array(Box<TypeExpr>),
    /// String-keyed map
    Map(Box<TypeExpr>),
    /// Value or null
    Optional(Box<TypeExpr>),
    /// Deferred (awaitable) value
    Deferred(Box<TypeExpr>),
    Union(Vec<TypeExpr>),
    /// Reference to a declared type, `module:Name`
    Named(String),
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named(name.into())
    }

    pub fn optional(inner: TypeExpr) -> Self {
        TypeExpr::Optional(Box::new(inner))
    }

    pub fn array(inner: TypeExpr) -> Self {
        TypeExpr::Array(Box::new(inner))
    }

    pub fn deferred(inner: TypeExpr) -> Self {
        TypeExpr::Deferred(Box::new(inner))
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Any => f.write_str("any"),
            TypeExpr::Unit => f.write_str("()"),
            TypeExpr::Null => f.write_str("null"),
            TypeExpr::Boolean => f.write_str("boolean"),
            TypeExpr::Number => f.write_str("number"),
            TypeExpr::String => f.write_str("string"),
            TypeExpr::Literal(s) => write!(f, "\"{}\"", s),
            TypeExpr::Array(inner) => write!(f, "{}[]", inner),
            TypeExpr::Map(inner) => write!(f, "map<string, {}>", inner),
            TypeExpr::Optional(inner) => write!(f, "{}?", inner),
            TypeExpr::Deferred(inner) => write!(f, "deferred<{}>", inner),
            TypeExpr::Union(members) => {
                let parts: Vec<String> = members.iter().map(|m| m.to_string()).collect();
                write!(f, "{}", parts.join(" | "))
            }
            TypeExpr::Named(name) => f.write_str(name),
        }
    }
}

/// A struct field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub ty: TypeExpr,
    #[serde(default)]
    pub optional: bool,
}

impl FieldDecl {
    pub fn required(ty: TypeExpr) -> Self {
        Self { ty, optional: false }
    }

    pub fn optional(ty: TypeExpr) -> Self {
        Self { ty, optional: true }
    }

    /// The type seen when reading the field without a guard
    pub fn read_type(&self) -> TypeExpr {
        if self.optional {
            TypeExpr::optional(self.ty.clone())
        } else {
            self.ty.clone()
        }
    }
}

/// A declared type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeDecl {
    Struct {
        #[serde(default)]
        fields: BTreeMap<String, FieldDecl>,
    },
    Enum {
        variants: Vec<String>,
    },
    Alias(TypeExpr),
}

/// A function or method parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    pub ty: TypeExpr,
    #[serde(default)]
    pub optional: bool,
}

fn unit_type() -> TypeExpr {
    TypeExpr::Unit
}

/// A function or method signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FnDecl {
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    #[serde(default = "unit_type")]
    pub returns: TypeExpr,
}

impl FnDecl {
    pub fn required_count(&self) -> usize {
        self.params.iter().filter(|p| !p.optional).count()
    }
}

/// A class: constructor, methods and public fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDecl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constructor: Option<FnDecl>,
    #[serde(default)]
    pub methods: BTreeMap<String, FnDecl>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDecl>,
}

/// Declarations of one module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDecl {
    #[serde(default)]
    pub types: BTreeMap<String, TypeDecl>,
    #[serde(default)]
    pub functions: BTreeMap<String, FnDecl>,
    #[serde(default)]
    pub classes: BTreeMap<String, ClassDecl>,
    #[serde(default)]
    pub constants: BTreeMap<String, TypeExpr>,
}

/// What a `module:Name` reference resolves to
#[derive(Debug, Clone, Copy)]
pub enum DeclaredSymbol<'a> {
    Type(&'a TypeDecl),
    Function(&'a FnDecl),
    Class(&'a ClassDecl),
    Constant(&'a TypeExpr),
}

/// The full type-level surface of a package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declarations {
    pub package: String,
    pub version: String,
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleDecl>,
}

impl Declarations {
    pub fn new(package: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            version: version.into(),
            modules: BTreeMap::new(),
        }
    }

    /// Parse a JSON declaration document
    pub fn from_json_str(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// Load a JSON declaration file
    pub fn load(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json_str(&content)?)
    }

    /// Mutable access to a module, created on demand
    pub fn module_mut(&mut self, module: &str) -> &mut ModuleDecl {
        self.modules.entry(module.to_string()).or_default()
    }

    /// Resolve an export of a module to its declaration
    pub fn lookup(&self, module: &str, name: &str) -> Option<DeclaredSymbol<'_>> {
        let decl = self.modules.get(module)?;
        if let Some(ty) = decl.types.get(name) {
            return Some(DeclaredSymbol::Type(ty));
        }
        if let Some(func) = decl.functions.get(name) {
            return Some(DeclaredSymbol::Function(func));
        }
        if let Some(class) = decl.classes.get(name) {
            return Some(DeclaredSymbol::Class(class));
        }
        decl.constants.get(name).map(DeclaredSymbol::Constant)
    }

    /// Resolve a qualified type name (`module:Name`)
    pub fn type_decl(&self, qualified: &str) -> Option<&TypeDecl> {
        let (module, name) = qualified.split_once(':')?;
        self.modules.get(module)?.types.get(name)
    }

    /// Resolve a qualified class name (`module:Name`)
    pub fn class_decl(&self, qualified: &str) -> Option<&ClassDecl> {
        let (module, name) = qualified.split_once(':')?;
        self.modules.get(module)?.classes.get(name)
    }

    /// Resolve `module:function` or `module:Class.method`
    pub fn callable(&self, qualified: &str) -> Option<&FnDecl> {
        let (module, rest) = qualified.split_once(':')?;
        let decl = self.modules.get(module)?;
        match rest.split_once('.') {
            Some((class, method)) => decl.classes.get(class)?.methods.get(method),
            None => decl.functions.get(rest),
        }
    }

    /// Fields of a struct type or class, by qualified name
    pub fn fields_of(&self, qualified: &str) -> Option<&BTreeMap<String, FieldDecl>> {
        match self.type_decl(qualified) {
            Some(TypeDecl::Struct { fields }) => Some(fields),
            Some(_) => None,
            None => self.class_decl(qualified).map(|c| &c.fields),
        }
    }
}

#[cfg(test)]
mod declarations_tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Declarations {
        serde_json::from_value(json!({
            "package": "pkg",
            "version": "1.0.0",
            "modules": {
                "config": {
                    "types": {
                        "Config": { "struct": { "fields": {
                            "name": { "ty": "string" },
                            "port": { "ty": "number", "optional": true }
                        } } },
                        "Mode": { "enum": { "variants": ["stdio", "http"] } }
                    },
                    "functions": {
                        "current_config": { "returns": { "named": "config:Config" } }
                    }
                },
                "tools": {
                    "classes": {
                        "ToolRegistry": {
                            "methods": {
                                "has": { "params": [{ "name": "name", "ty": "string" }], "returns": "boolean" }
                            }
                        }
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_lookup_kinds() {
        let decls = sample();
        assert!(matches!(decls.lookup("config", "Config"), Some(DeclaredSymbol::Type(_))));
        assert!(matches!(decls.lookup("config", "current_config"), Some(DeclaredSymbol::Function(_))));
        assert!(matches!(decls.lookup("tools", "ToolRegistry"), Some(DeclaredSymbol::Class(_))));
        assert!(decls.lookup("tools", "Missing").is_none());
        assert!(decls.lookup("missing", "Config").is_none());
    }

    #[test]
    fn test_callable_resolves_methods() {
        let decls = sample();
        let has = decls.callable("tools:ToolRegistry.has").unwrap();
        assert_eq!(has.returns, TypeExpr::Boolean);
        assert_eq!(has.required_count(), 1);
        assert_eq!(decls.callable("config:current_config").unwrap().params.len(), 0);
        assert!(decls.callable("tools:ToolRegistry.remove").is_none());
    }

    #[test]
    fn test_optional_field_read_type() {
        let decls = sample();
        let fields = decls.fields_of("config:Config").unwrap();
        assert_eq!(fields["name"].read_type(), TypeExpr::String);
        assert_eq!(fields["port"].read_type(), TypeExpr::optional(TypeExpr::Number));
        assert_eq!(fields["port"].read_type().to_string(), "number?");
    }
}
