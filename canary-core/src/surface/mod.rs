//! The installed dependency's public surface, as seen by the probe engine
//!
//! The canary never reaches into a dependency's internals. Everything it can
//! observe goes through the [`Surface`] trait:
//! - package metadata (name and installed version)
//! - exported symbols, resolved by module and export name
//! - the type declarations shipped with the package, if any
//!
//! A [`Symbol`] is one of three runtime shapes: a callable function, a class
//! (constructor plus prototype members) or a constant value. Calls return an
//! [`Invocation`], which distinguishes a synchronous result from a deferred
//! one that must be awaited before it can be judged.

mod builder;
mod registry;

pub use builder::{FnCallable, FnClass, StaticSurface, SurfaceBuilder};
pub use registry::{SurfaceLoader, SurfaceRegistry};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::statics::Declarations;

/// A deferred call result
pub type Deferred = BoxFuture<'static, Result<Value, Thrown>>;

/// Outcome of calling into the dependency, before it is settled
pub enum Invocation {
    /// The call completed synchronously (returned or threw)
    Returned(Result<Value, Thrown>),
    /// The call produced a deferred value that must be awaited
    Deferred(Deferred),
}

impl Invocation {
    /// Synchronous return
    pub fn value(value: Value) -> Self {
        Invocation::Returned(Ok(value))
    }

    /// Synchronous throw
    pub fn thrown(thrown: Thrown) -> Self {
        Invocation::Returned(Err(thrown))
    }

    /// Deferred result
    pub fn deferred<F>(fut: F) -> Self
    where
        F: std::future::Future<Output = Result<Value, Thrown>> + Send + 'static,
    {
        Invocation::Deferred(Box::pin(fut))
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invocation::Returned(result) => f.debug_tuple("Returned").field(result).finish(),
            Invocation::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// An error raised by the dependency. Catching one is a legitimate
/// assertion outcome, not a failure of the canary itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thrown {
    /// Error class or kind name
    pub kind: String,
    /// Error message
    pub message: String,
}

impl Thrown {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// JSON view used when evaluating predicates against a thrown error
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "kind": self.kind,
            "message": self.message,
        })
    }
}

impl fmt::Display for Thrown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Runtime category of a value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    #[default]
    Any,
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    /// Category of a concrete value
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Boolean,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }

    /// Whether `other` satisfies this expected category
    pub fn accepts(&self, other: ValueKind) -> bool {
        *self == ValueKind::Any || other == ValueKind::Any || *self == other
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Any => "any",
            ValueKind::Null => "null",
            ValueKind::Boolean => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        };
        f.write_str(name)
    }
}

/// Sync/async nature of a callable's result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnKind {
    /// Returns a value synchronously
    #[default]
    Value,
    /// Returns a deferred value
    Deferred,
    /// Returns nothing
    None,
}

impl fmt::Display for ReturnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReturnKind::Value => "value",
            ReturnKind::Deferred => "deferred",
            ReturnKind::None => "none",
        };
        f.write_str(name)
    }
}

/// One declared parameter of a callable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamInfo {
    pub name: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub category: ValueKind,
}

/// Introspectable signature of a callable, method or constructor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub params: Vec<ParamInfo>,
    pub returns: ReturnKind,
}

impl Signature {
    pub fn new(returns: ReturnKind) -> Self {
        Self {
            params: Vec::new(),
            returns,
        }
    }

    /// Add a required parameter
    pub fn param(mut self, name: impl Into<String>, category: ValueKind) -> Self {
        self.params.push(ParamInfo {
            name: name.into(),
            optional: false,
            category,
        });
        self
    }

    /// Add an optional parameter
    pub fn optional(mut self, name: impl Into<String>, category: ValueKind) -> Self {
        self.params.push(ParamInfo {
            name: name.into(),
            optional: true,
            category,
        });
        self
    }

    /// Number of required parameters
    pub fn required_count(&self) -> usize {
        self.params.iter().filter(|p| !p.optional).count()
    }

    /// Total number of accepted parameters
    pub fn total_count(&self) -> usize {
        self.params.len()
    }
}

/// A function exported by the dependency
pub trait Callable: Send + Sync {
    fn signature(&self) -> Signature;

    fn invoke(&self, args: Vec<Value>) -> Invocation;
}

/// Kind of a class member
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    #[default]
    Method,
    Field,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberKind::Method => f.write_str("method"),
            MemberKind::Field => f.write_str("field"),
        }
    }
}

/// A member visible on a class's prototype/instance surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub name: String,
    pub kind: MemberKind,
    /// Present for methods
    pub signature: Option<Signature>,
}

impl MemberInfo {
    pub fn method(name: impl Into<String>, signature: Signature) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Method,
            signature: Some(signature),
        }
    }

    pub fn field(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Field,
            signature: None,
        }
    }
}

/// A class exported by the dependency
pub trait Class: Send + Sync {
    /// Constructor signature
    fn signature(&self) -> Signature;

    /// Prototype members
    fn members(&self) -> Vec<MemberInfo>;

    fn construct(&self, args: Vec<Value>) -> Result<Arc<dyn Instance>, Thrown>;
}

/// A live instance of a dependency class
pub trait Instance: Send + Sync {
    fn invoke(&self, method: &str, args: Vec<Value>) -> Invocation;

    /// Read a field, `None` if the instance has no such field
    fn read(&self, field: &str) -> Option<Value>;
}

/// A resolved export
#[derive(Clone)]
pub enum Symbol {
    Function(Arc<dyn Callable>),
    Class(Arc<dyn Class>),
    Constant(Value),
}

impl Symbol {
    /// Runtime kind name used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Symbol::Function(_) => "function",
            Symbol::Class(_) => "class",
            Symbol::Constant(_) => "constant",
        }
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Function(callable) => f
                .debug_tuple("Function")
                .field(&callable.signature())
                .finish(),
            Symbol::Class(class) => f.debug_tuple("Class").field(&class.signature()).finish(),
            Symbol::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
        }
    }
}

/// Installed package metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub name: String,
    pub version: String,
}

impl PackageMetadata {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// The installed dependency as an opaque set of named exports
pub trait Surface: Send + Sync {
    fn metadata(&self) -> &PackageMetadata;

    /// Resolve `module`/`export`; `None` when not exported
    fn resolve(&self, module: &str, export: &str) -> Option<Symbol>;

    /// All exports as `(module, export)` pairs, in a stable order
    fn exports(&self) -> Vec<(String, String)>;

    /// Type declarations shipped with the package
    fn declarations(&self) -> Option<Arc<Declarations>>;
}
