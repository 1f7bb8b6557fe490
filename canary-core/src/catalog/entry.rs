//! Contract entries: one verifiable unit of the dependency's public surface

use super::predicate::Predicate;
use super::symbol::SymbolPath;
use super::CatalogError;
use crate::surface::{MemberKind, ReturnKind, ValueKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of exported symbol an entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Class,
    Method,
    Type,
    Constant,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Method => "method",
            SymbolKind::Type => "type",
            SymbolKind::Constant => "constant",
        };
        f.write_str(name)
    }
}

/// Expected parameter of a callable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    pub name: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub category: ValueKind,
}

impl ParamDescriptor {
    pub fn required(name: impl Into<String>, category: ValueKind) -> Self {
        Self {
            name: name.into(),
            optional: false,
            category,
        }
    }

    pub fn optional(name: impl Into<String>, category: ValueKind) -> Self {
        Self {
            name: name.into(),
            optional: true,
            category,
        }
    }
}

/// Expected member on a class's prototype surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberExpectation {
    pub name: String,
    #[serde(default)]
    pub kind: MemberKind,
    /// Checked only when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<ParamDescriptor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<ReturnKind>,
}

impl MemberExpectation {
    pub fn method(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Method,
            params: None,
            returns: None,
        }
    }

    pub fn field(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Field,
            params: None,
            returns: None,
        }
    }

    pub fn with_params(mut self, params: Vec<ParamDescriptor>) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_returns(mut self, returns: ReturnKind) -> Self {
        self.returns = Some(returns);
        self
    }
}

/// Expected field of a type or constant object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldExpectation {
    pub name: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ValueKind>,
}

impl FieldExpectation {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: false,
            category: None,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: true,
            category: None,
        }
    }
}

/// Expected structural description of a symbol.
///
/// Every part is optional: only what is stated is checked.
/// - `params`/`returns`: the callable itself (function), the constructor
///   (class) or the member (method)
/// - `members`: class prototype members
/// - `fields`: type fields (via declarations) or constant object fields
/// - `category`: constant value category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<ParamDescriptor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<ReturnKind>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<MemberExpectation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldExpectation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ValueKind>,
}

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(mut self, params: Vec<ParamDescriptor>) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_returns(mut self, returns: ReturnKind) -> Self {
        self.returns = Some(returns);
        self
    }

    pub fn with_member(mut self, member: MemberExpectation) -> Self {
        self.members.push(member);
        self
    }

    pub fn with_field(mut self, field: FieldExpectation) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_category(mut self, category: ValueKind) -> Self {
        self.category = Some(category);
        self
    }
}

/// What an assertion does to the symbol under test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Call the entry's function
    Call {
        #[serde(default)]
        args: Vec<Value>,
    },
    /// Instantiate the entry's class; the instance stays in scope for
    /// later assertions of the same entry
    Construct {
        #[serde(default)]
        args: Vec<Value>,
    },
    /// Call a method on the scoped instance (defaults to the entry's member)
    Invoke {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        method: Option<String>,
        #[serde(default)]
        args: Vec<Value>,
    },
    /// Read a constant (optionally at a path) or a field of the scoped instance
    Read {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },
}

impl Action {
    pub fn call(args: Vec<Value>) -> Self {
        Action::Call { args }
    }

    pub fn construct(args: Vec<Value>) -> Self {
        Action::Construct { args }
    }

    pub fn invoke(method: impl Into<String>, args: Vec<Value>) -> Self {
        Action::Invoke {
            method: Some(method.into()),
            args,
        }
    }

    pub fn read() -> Self {
        Action::Read { field: None }
    }
}

/// Expected outcome of an assertion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    /// Synchronous return with a value matching the predicate
    Returns {
        #[serde(default)]
        matches: Predicate,
    },
    /// Synchronous throw matching the predicate
    Throws {
        #[serde(default)]
        matches: Predicate,
    },
    /// Deferred value that resolves to a value matching the predicate
    Resolves {
        #[serde(default)]
        matches: Predicate,
    },
    /// Deferred value that rejects with an error matching the predicate
    Rejects {
        #[serde(default)]
        matches: Predicate,
    },
}

impl Expectation {
    pub fn returns(matches: Predicate) -> Self {
        Expectation::Returns { matches }
    }

    pub fn throws(matches: Predicate) -> Self {
        Expectation::Throws { matches }
    }

    pub fn resolves(matches: Predicate) -> Self {
        Expectation::Resolves { matches }
    }

    pub fn rejects(matches: Predicate) -> Self {
        Expectation::Rejects { matches }
    }

    pub fn predicate(&self) -> &Predicate {
        match self {
            Expectation::Returns { matches }
            | Expectation::Throws { matches }
            | Expectation::Resolves { matches }
            | Expectation::Rejects { matches } => matches,
        }
    }

    /// Short verb used in diagnostics
    pub fn verb(&self) -> &'static str {
        match self {
            Expectation::Returns { .. } => "return",
            Expectation::Throws { .. } => "throw",
            Expectation::Resolves { .. } => "resolve",
            Expectation::Rejects { .. } => "reject",
        }
    }
}

/// One (input, expected outcome) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorAssertion {
    pub name: String,
    pub action: Action,
    pub expect: Expectation,
}

impl BehaviorAssertion {
    pub fn new(name: impl Into<String>, action: Action, expect: Expectation) -> Self {
        Self {
            name: name.into(),
            action,
            expect,
        }
    }
}

/// One verifiable unit of the dependency's public surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractEntry {
    pub symbol: SymbolPath,
    pub kind: SymbolKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub shape: Shape,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertions: Vec<BehaviorAssertion>,
}

impl ContractEntry {
    pub fn new(symbol: SymbolPath, kind: SymbolKind) -> Self {
        Self {
            symbol,
            kind,
            description: None,
            tags: Vec::new(),
            shape: Shape::default(),
            assertions: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_assertion(mut self, assertion: BehaviorAssertion) -> Self {
        self.assertions.push(assertion);
        self
    }

    /// Reject entries whose symbol path does not fit their kind, or whose
    /// assertions cannot apply to that kind
    pub(crate) fn validate(&self) -> Result<(), CatalogError> {
        let invalid = |reason: String| CatalogError::InvalidEntry {
            symbol: self.symbol.to_string(),
            reason,
        };

        match (self.kind, &self.symbol.member) {
            (SymbolKind::Method, None) => {
                return Err(invalid("method entries need a member ('module:Class.method')".into()));
            }
            (kind, Some(_)) if kind != SymbolKind::Method => {
                return Err(invalid(format!("{} entries cannot name a member", kind)));
            }
            _ => {}
        }

        for (idx, assertion) in self.assertions.iter().enumerate() {
            let allowed = match (&assertion.action, self.kind) {
                (Action::Call { .. }, SymbolKind::Function) => true,
                (Action::Construct { .. }, SymbolKind::Class | SymbolKind::Method) => true,
                (Action::Invoke { .. }, SymbolKind::Class | SymbolKind::Method) => true,
                (Action::Read { .. }, SymbolKind::Constant | SymbolKind::Class | SymbolKind::Method) => true,
                _ => false,
            };
            if !allowed {
                return Err(invalid(format!(
                    "assertion {} ('{}') cannot be applied to a {}",
                    idx + 1,
                    assertion.name,
                    self.kind
                )));
            }
        }

        if self.kind == SymbolKind::Type && !self.assertions.is_empty() {
            return Err(invalid("type entries are verified structurally only".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod entry_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_json_shape() {
        let entry: ContractEntry = serde_json::from_value(json!({
            "symbol": "llm:ProviderManager.initialize",
            "kind": "method",
            "shape": { "params": [], "returns": "deferred" },
            "assertions": [
                { "name": "construct", "action": { "construct": { "args": [{}] } }, "expect": { "returns": {} } },
                {
                    "name": "initialize without credentials",
                    "action": { "invoke": {} },
                    "expect": { "rejects": { "matches": { "message_contains": "could not be initialized" } } }
                }
            ]
        }))
        .unwrap();

        assert_eq!(entry.kind, SymbolKind::Method);
        assert_eq!(entry.shape.returns, Some(ReturnKind::Deferred));
        assert_eq!(entry.assertions.len(), 2);
        assert_eq!(entry.assertions[1].expect.verb(), "reject");
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn test_method_entry_requires_member() {
        let entry = ContractEntry::new(SymbolPath::new("tools", "ToolRegistry"), SymbolKind::Method);
        assert!(matches!(entry.validate(), Err(CatalogError::InvalidEntry { .. })));
    }

    #[test]
    fn test_call_on_class_is_rejected() {
        let entry = ContractEntry::new(SymbolPath::new("tools", "ToolRegistry"), SymbolKind::Class)
            .with_assertion(BehaviorAssertion::new(
                "call",
                Action::call(vec![]),
                Expectation::returns(Predicate::Any),
            ));
        assert!(entry.validate().is_err());
    }
}
