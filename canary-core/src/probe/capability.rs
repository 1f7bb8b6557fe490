//! Capability predicates compiled from an entry's expected shape

use crate::catalog::{ContractEntry, MemberExpectation, ParamDescriptor, SymbolKind};
use crate::surface::{MemberInfo, MemberKind, ReturnKind, Signature, Symbol, ValueKind};
use std::fmt;

/// What a shape check looks at: a resolved export, or a method member of a
/// resolved class
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    Symbol(&'a Symbol),
    Method(&'a MemberInfo),
}

impl Subject<'_> {
    fn kind_name(&self) -> &'static str {
        match self {
            Subject::Symbol(symbol) => symbol.kind_name(),
            Subject::Method(_) => "method",
        }
    }

    /// Signature of a function, class constructor or method
    fn signature(&self) -> Option<Signature> {
        match self {
            Subject::Symbol(Symbol::Function(callable)) => Some(callable.signature()),
            Subject::Symbol(Symbol::Class(class)) => Some(class.signature()),
            Subject::Symbol(Symbol::Constant(_)) => None,
            Subject::Method(member) => member.signature.clone(),
        }
    }
}

/// A closed set of structural predicates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    /// Can be called
    Callable,
    /// Can be instantiated
    Constructible,
    /// Exactly `required` required parameters and at least `total` accepted
    AcceptsArity { required: usize, total: usize },
    /// Result is returned synchronously, deferred, or not at all
    ReturnsKind(ReturnKind),
    /// Class exposes the member, optionally with a given arity and return kind
    HasMember {
        name: String,
        kind: MemberKind,
        arity: Option<(usize, usize)>,
        returns: Option<ReturnKind>,
    },
    /// Object value carries the field
    HasField {
        name: String,
        optional: bool,
        category: Option<ValueKind>,
    },
    /// Constant value has the runtime category
    ValueOfKind(ValueKind),
}

fn arity(params: &[ParamDescriptor]) -> (usize, usize) {
    (params.iter().filter(|p| !p.optional).count(), params.len())
}

fn arity_mismatch(expected: (usize, usize), signature: &Signature) -> Option<String> {
    let (required, total) = expected;
    if signature.required_count() == required && signature.total_count() >= total {
        None
    } else {
        Some(format!(
            "expected {} required of {} parameter(s), found {} required of {}",
            required,
            total,
            signature.required_count(),
            signature.total_count()
        ))
    }
}

impl Capability {
    /// Compile the capabilities an entry's shape demands
    pub fn compile(entry: &ContractEntry) -> Vec<Capability> {
        let shape = &entry.shape;
        let mut caps = Vec::new();

        match entry.kind {
            SymbolKind::Function | SymbolKind::Method => caps.push(Capability::Callable),
            SymbolKind::Class => caps.push(Capability::Constructible),
            SymbolKind::Constant | SymbolKind::Type => {}
        }

        if matches!(
            entry.kind,
            SymbolKind::Function | SymbolKind::Method | SymbolKind::Class
        ) {
            if let Some(params) = &shape.params {
                let (required, total) = arity(params);
                caps.push(Capability::AcceptsArity { required, total });
            }
            if let Some(returns) = shape.returns {
                caps.push(Capability::ReturnsKind(returns));
            }
        }

        match entry.kind {
            SymbolKind::Class => {
                caps.extend(shape.members.iter().map(Capability::member));
                caps.extend(shape.fields.iter().map(|f| Capability::HasMember {
                    name: f.name.clone(),
                    kind: MemberKind::Field,
                    arity: None,
                    returns: None,
                }));
            }
            SymbolKind::Constant => {
                if let Some(category) = shape.category {
                    caps.push(Capability::ValueOfKind(category));
                }
                caps.extend(shape.fields.iter().map(|f| Capability::HasField {
                    name: f.name.clone(),
                    optional: f.optional,
                    category: f.category,
                }));
            }
            _ => {}
        }

        caps
    }

    fn member(expectation: &MemberExpectation) -> Capability {
        Capability::HasMember {
            name: expectation.name.clone(),
            kind: expectation.kind,
            arity: expectation.params.as_deref().map(arity),
            returns: expectation.returns,
        }
    }

    /// Gates are kind checks; when one fails the remaining checks are noise
    pub fn is_gate(&self) -> bool {
        matches!(self, Capability::Callable | Capability::Constructible)
    }

    /// Evaluate against a resolved subject, returning the violation
    pub fn check(&self, subject: Subject<'_>) -> Result<(), String> {
        match self {
            Capability::Callable => match subject {
                Subject::Symbol(Symbol::Function(_)) => Ok(()),
                Subject::Method(member) if member.kind == MemberKind::Method => Ok(()),
                other => Err(format!("expected a callable, found {}", other.kind_name())),
            },
            Capability::Constructible => match subject {
                Subject::Symbol(Symbol::Class(_)) => Ok(()),
                other => Err(format!("expected a class, found {}", other.kind_name())),
            },
            Capability::AcceptsArity { required, total } => {
                let Some(signature) = subject.signature() else {
                    return Err(format!("expected a signature, found {}", subject.kind_name()));
                };
                match arity_mismatch((*required, *total), &signature) {
                    None => Ok(()),
                    Some(reason) => Err(reason),
                }
            }
            Capability::ReturnsKind(expected) => {
                let Some(signature) = subject.signature() else {
                    return Err(format!("expected a signature, found {}", subject.kind_name()));
                };
                if signature.returns == *expected {
                    Ok(())
                } else {
                    Err(format!(
                        "expected {} return, found {}",
                        expected, signature.returns
                    ))
                }
            }
            Capability::HasMember {
                name,
                kind,
                arity,
                returns,
            } => {
                let Subject::Symbol(Symbol::Class(class)) = subject else {
                    return Err(format!(
                        "expected member `{}` on a class, found {}",
                        name,
                        subject.kind_name()
                    ));
                };
                let members = class.members();
                let Some(member) = members.iter().find(|m| &m.name == name) else {
                    return Err(format!("{} `{}` missing", kind, name));
                };
                if member.kind != *kind {
                    return Err(format!(
                        "member `{}` expected {}, found {}",
                        name, kind, member.kind
                    ));
                }
                let mut problems = Vec::new();
                if arity.is_some() || returns.is_some() {
                    match &member.signature {
                        None => problems.push("no signature".to_string()),
                        Some(signature) => {
                            if let Some(reason) = arity.and_then(|a| arity_mismatch(a, signature)) {
                                problems.push(reason);
                            }
                            if let Some(expected) = returns
                                && signature.returns != *expected
                            {
                                problems.push(format!(
                                    "expected {} return, found {}",
                                    expected, signature.returns
                                ));
                            }
                        }
                    }
                }
                if problems.is_empty() {
                    Ok(())
                } else {
                    Err(format!("member `{}`: {}", name, problems.join("; ")))
                }
            }
            Capability::HasField {
                name,
                optional,
                category,
            } => {
                let Subject::Symbol(Symbol::Constant(value)) = subject else {
                    return Err(format!(
                        "expected field `{}` on a value, found {}",
                        name,
                        subject.kind_name()
                    ));
                };
                match value.get(name.as_str()) {
                    None if *optional => Ok(()),
                    None => Err(format!("field `{}` missing", name)),
                    Some(field) => match category {
                        Some(expected) if !expected.accepts(ValueKind::of(field)) => Err(format!(
                            "field `{}` expected {}, found {}",
                            name,
                            expected,
                            ValueKind::of(field)
                        )),
                        _ => Ok(()),
                    },
                }
            }
            Capability::ValueOfKind(expected) => match subject {
                Subject::Symbol(Symbol::Constant(value)) => {
                    let actual = ValueKind::of(value);
                    if expected.accepts(actual) {
                        Ok(())
                    } else {
                        Err(format!("expected {} value, found {}", expected, actual))
                    }
                }
                other => Err(format!("expected {} value, found {}", expected, other.kind_name())),
            },
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Callable => f.write_str("callable"),
            Capability::Constructible => f.write_str("constructible"),
            Capability::AcceptsArity { required, total } => {
                write!(f, "accepts {} required of {} parameter(s)", required, total)
            }
            Capability::ReturnsKind(kind) => write!(f, "returns {}", kind),
            Capability::HasMember { name, kind, .. } => write!(f, "has {} `{}`", kind, name),
            Capability::HasField { name, .. } => write!(f, "has field `{}`", name),
            Capability::ValueOfKind(kind) => write!(f, "is {} value", kind),
        }
    }
}

#[cfg(test)]
mod capability_tests {
    use super::*;
    use crate::catalog::{FieldExpectation, Shape, SymbolPath};
    use crate::surface::{FnCallable, FnClass, Invocation, ParamInfo};
    use serde_json::json;
    use std::sync::Arc;

    fn function(signature: Signature) -> Symbol {
        Symbol::Function(Arc::new(FnCallable::new(signature, |_| Invocation::value(json!(null)))))
    }

    #[test]
    fn test_arity_requires_exact_required_count() {
        let cap = Capability::AcceptsArity {
            required: 1,
            total: 2,
        };
        let exact = function(
            Signature::new(ReturnKind::Value)
                .param("name", ValueKind::String)
                .optional("opts", ValueKind::Object),
        );
        assert!(cap.check(Subject::Symbol(&exact)).is_ok());

        // Extra optional parameters are compatible
        let wider = function(
            Signature::new(ReturnKind::Value)
                .param("name", ValueKind::String)
                .optional("opts", ValueKind::Object)
                .optional("more", ValueKind::Any),
        );
        assert!(cap.check(Subject::Symbol(&wider)).is_ok());

        // A new required parameter breaks callers
        let stricter = function(
            Signature::new(ReturnKind::Value)
                .param("name", ValueKind::String)
                .param("opts", ValueKind::Object),
        );
        let reason = cap.check(Subject::Symbol(&stricter)).unwrap_err();
        assert!(reason.contains("found 2 required"));
    }

    #[test]
    fn test_compile_function_shape() {
        let entry = ContractEntry::new(SymbolPath::new("config", "current_config"), SymbolKind::Function)
            .with_shape(Shape::new().with_params(vec![]).with_returns(ReturnKind::Value));
        assert_eq!(
            Capability::compile(&entry),
            vec![
                Capability::Callable,
                Capability::AcceptsArity {
                    required: 0,
                    total: 0
                },
                Capability::ReturnsKind(ReturnKind::Value),
            ]
        );
    }

    #[test]
    fn test_has_member_checks_signature() {
        let class = Symbol::Class(Arc::new(
            FnClass::new(Signature::default(), |_| Err(crate::surface::Thrown::new("Error", "x")))
                .with_member(MemberInfo::method(
                    "initialize",
                    Signature::new(ReturnKind::Value),
                )),
        ));

        let cap = Capability::HasMember {
            name: "initialize".into(),
            kind: MemberKind::Method,
            arity: Some((0, 0)),
            returns: Some(ReturnKind::Deferred),
        };
        let reason = cap.check(Subject::Symbol(&class)).unwrap_err();
        assert_eq!(
            reason,
            "member `initialize`: expected deferred return, found value"
        );

        let missing = Capability::HasMember {
            name: "state".into(),
            kind: MemberKind::Method,
            arity: None,
            returns: None,
        };
        assert_eq!(missing.check(Subject::Symbol(&class)).unwrap_err(), "method `state` missing");
    }

    #[test]
    fn test_constant_fields() {
        let entry = ContractEntry::new(SymbolPath::new("consts", "DEFAULTS"), SymbolKind::Constant)
            .with_shape(
                Shape::new()
                    .with_category(ValueKind::Object)
                    .with_field(FieldExpectation::required("name"))
                    .with_field(FieldExpectation::optional("port")),
            );
        let value = Symbol::Constant(json!({"name": "canary"}));
        let failures: Vec<String> = Capability::compile(&entry)
            .iter()
            .filter_map(|c| c.check(Subject::Symbol(&value)).err())
            .collect();
        assert!(failures.is_empty(), "{:?}", failures);

        let wrong = Symbol::Constant(json!({"port": 1}));
        let failures: Vec<String> = Capability::compile(&entry)
            .iter()
            .filter_map(|c| c.check(Subject::Symbol(&wrong)).err())
            .collect();
        assert_eq!(failures, vec!["field `name` missing".to_string()]);
    }

    #[test]
    fn test_method_subject() {
        let member = MemberInfo {
            name: "has".into(),
            kind: MemberKind::Method,
            signature: Some(Signature {
                params: vec![ParamInfo {
                    name: "name".into(),
                    optional: false,
                    category: ValueKind::String,
                }],
                returns: ReturnKind::Value,
            }),
        };
        assert!(Capability::Callable.check(Subject::Method(&member)).is_ok());
        assert!(Capability::AcceptsArity {
            required: 1,
            total: 1
        }
        .check(Subject::Method(&member))
        .is_ok());
        assert!(Capability::Constructible.check(Subject::Method(&member)).is_err());
    }
}
