//! Structural type checking of fixture fragments against declarations

use super::declarations::{Declarations, FieldDecl, TypeDecl, TypeExpr};
use super::fragment::Fragment;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

const MAX_ALIAS_DEPTH: usize = 16;

/// Compiler verdict for one fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "snake_case")]
pub enum Verdict {
    Accept,
    Reject(String),
}

impl Verdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }

    fn reject(reason: impl Into<String>) -> Self {
        Verdict::Reject(reason.into())
    }
}

/// Something that can judge whether a fragment type-checks
pub trait TypeChecker: Send + Sync {
    fn check(&self, fragment: &Fragment, declarations: &Declarations) -> Verdict;
}

/// Nominal-where-named, structural-elsewhere checker with strict null
/// handling: an optional value is never assignable to a non-optional slot
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralChecker;

impl StructuralChecker {
    pub fn new() -> Self {
        Self
    }

    /// Follow alias declarations until a non-alias expression
    fn resolve<'a>(&self, expr: &'a TypeExpr, decls: &'a Declarations) -> &'a TypeExpr {
        let mut current = expr;
        for _ in 0..MAX_ALIAS_DEPTH {
            match current {
                TypeExpr::Named(name) => match decls.type_decl(name) {
                    Some(TypeDecl::Alias(target)) => current = target,
                    _ => return current,
                },
                _ => return current,
            }
        }
        current
    }

    /// Whether a value of type `from` may be used where `to` is expected
    pub fn assignable(&self, from: &TypeExpr, to: &TypeExpr, decls: &Declarations) -> bool {
        self.assignable_in(from, to, decls, &mut HashSet::new())
    }

    /// Pairs involving a named type are tracked while in progress; meeting
    /// one again means a recursive alias, which is assumed assignable
    fn assignable_in(
        &self,
        from: &TypeExpr,
        to: &TypeExpr,
        decls: &Declarations,
        visiting: &mut HashSet<(TypeExpr, TypeExpr)>,
    ) -> bool {
        let named = matches!(from, TypeExpr::Named(_)) || matches!(to, TypeExpr::Named(_));
        let key = (from.clone(), to.clone());
        if named && !visiting.insert(key.clone()) {
            return true;
        }
        let result = self.assignable_resolved(from, to, decls, visiting);
        if named {
            visiting.remove(&key);
        }
        result
    }

    fn assignable_resolved(
        &self,
        from: &TypeExpr,
        to: &TypeExpr,
        decls: &Declarations,
        visiting: &mut HashSet<(TypeExpr, TypeExpr)>,
    ) -> bool {
        let from = self.resolve(from, decls);
        let to = self.resolve(to, decls);

        match (from, to) {
            (_, TypeExpr::Any) | (TypeExpr::Any, _) => true,
            (TypeExpr::Union(members), _) => members
                .iter()
                .all(|m| self.assignable_in(m, to, decls, visiting)),
            (_, TypeExpr::Union(members)) => members
                .iter()
                .any(|m| self.assignable_in(from, m, decls, visiting)),
            (TypeExpr::Null, TypeExpr::Optional(_)) => true,
            (TypeExpr::Optional(f), TypeExpr::Optional(t)) => self.assignable_in(f, t, decls, visiting),
            (_, TypeExpr::Optional(inner)) => self.assignable_in(from, inner, decls, visiting),
            (TypeExpr::Optional(_), _) => false,
            (TypeExpr::Literal(_), TypeExpr::String) => true,
            (TypeExpr::Literal(a), TypeExpr::Literal(b)) => a == b,
            (TypeExpr::Literal(value), TypeExpr::Named(name)) => match decls.type_decl(name) {
                Some(TypeDecl::Enum { variants }) => variants.iter().any(|v| v == value),
                _ => false,
            },
            (TypeExpr::Named(a), TypeExpr::Named(b)) => a == b,
            (TypeExpr::Array(f), TypeExpr::Array(t))
            | (TypeExpr::Map(f), TypeExpr::Map(t))
            | (TypeExpr::Deferred(f), TypeExpr::Deferred(t)) => self.assignable_in(f, t, decls, visiting),
            (a, b) => a == b,
        }
    }

    fn check_read_field(
        &self,
        target: &str,
        field: &str,
        guarded: bool,
        bind: &TypeExpr,
        decls: &Declarations,
    ) -> Verdict {
        let Some(fields) = decls.fields_of(target) else {
            return Verdict::reject(format!("cannot find struct or class `{}`", target));
        };
        let Some(decl) = fields.get(field) else {
            return Verdict::reject(format!("no field `{}` on `{}`", field, target));
        };
        let read = if guarded { decl.ty.clone() } else { decl.read_type() };
        if self.assignable(&read, bind, decls) {
            Verdict::Accept
        } else {
            Verdict::reject(format!(
                "`{}.{}` has type {}, which is not assignable to {}",
                target, field, read, bind
            ))
        }
    }

    fn check_exhaustive_match(&self, target: &str, arms: &[String], decls: &Declarations) -> Verdict {
        let variants: Vec<String> = match decls.type_decl(target) {
            Some(TypeDecl::Enum { variants }) => variants.clone(),
            Some(TypeDecl::Alias(aliased)) => {
                match self.resolve(aliased, decls) {
                    TypeExpr::Union(members) => {
                        let literals: Option<Vec<String>> = members
                            .iter()
                            .map(|m| match m {
                                TypeExpr::Literal(v) => Some(v.clone()),
                                _ => None,
                            })
                            .collect();
                        match literals {
                            Some(literals) => literals,
                            None => {
                                return Verdict::reject(format!(
                                    "`{}` is not a union of literals",
                                    target
                                ));
                            }
                        }
                    }
                    TypeExpr::Literal(v) => vec![v.clone()],
                    _ => return Verdict::reject(format!("`{}` is not an enumeration", target)),
                }
            }
            Some(TypeDecl::Struct { .. }) => {
                return Verdict::reject(format!("`{}` is not an enumeration", target));
            }
            None => return Verdict::reject(format!("cannot find type `{}`", target)),
        };

        if let Some(unknown) = arms.iter().find(|arm| !variants.contains(arm)) {
            return Verdict::reject(format!("no variant `{}` on `{}`", unknown, target));
        }
        let missing: Vec<&str> = variants
            .iter()
            .filter(|v| !arms.contains(v))
            .map(|v| v.as_str())
            .collect();
        if missing.is_empty() {
            Verdict::Accept
        } else {
            Verdict::reject(format!(
                "non-exhaustive match on `{}`: missing {}",
                target,
                missing.join(", ")
            ))
        }
    }

    fn check_construct(
        &self,
        target: &str,
        provided: &BTreeMap<String, TypeExpr>,
        decls: &Declarations,
    ) -> Verdict {
        let fields: &BTreeMap<String, FieldDecl> = match decls.type_decl(target) {
            Some(TypeDecl::Struct { fields }) => fields,
            Some(_) => return Verdict::reject(format!("`{}` is not a struct", target)),
            None => return Verdict::reject(format!("cannot find struct `{}`", target)),
        };

        for (name, ty) in provided {
            let Some(decl) = fields.get(name) else {
                return Verdict::reject(format!("`{}` has no field `{}`", target, name));
            };
            if !self.assignable(ty, &decl.read_type(), decls) {
                return Verdict::reject(format!(
                    "field `{}` expects {}, found {}",
                    name,
                    decl.read_type(),
                    ty
                ));
            }
        }

        let missing: Vec<&str> = fields
            .iter()
            .filter(|(name, decl)| !decl.optional && !provided.contains_key(*name))
            .map(|(name, _)| name.as_str())
            .collect();
        if missing.is_empty() {
            Verdict::Accept
        } else {
            Verdict::reject(format!(
                "missing required field(s) of `{}`: {}",
                target,
                missing.join(", ")
            ))
        }
    }

    fn check_call(
        &self,
        function: &str,
        args: &[TypeExpr],
        bind: Option<&TypeExpr>,
        decls: &Declarations,
    ) -> Verdict {
        let Some(decl) = decls.callable(function) else {
            return Verdict::reject(format!("cannot find function `{}`", function));
        };

        let required = decl.required_count();
        if args.len() < required || args.len() > decl.params.len() {
            let expected = if required == decl.params.len() {
                required.to_string()
            } else {
                format!("{}-{}", required, decl.params.len())
            };
            return Verdict::reject(format!(
                "`{}` takes {} argument(s) but {} were supplied",
                function,
                expected,
                args.len()
            ));
        }

        for (arg, param) in args.iter().zip(decl.params.iter()) {
            let slot = if param.optional {
                TypeExpr::optional(param.ty.clone())
            } else {
                param.ty.clone()
            };
            if !self.assignable(arg, &slot, decls) {
                return Verdict::reject(format!(
                    "argument `{}` expects {}, found {}",
                    param.name, slot, arg
                ));
            }
        }

        match bind {
            Some(bind) if !self.assignable(&decl.returns, bind, decls) => Verdict::reject(format!(
                "`{}` returns {}, which is not assignable to {}",
                function, decl.returns, bind
            )),
            _ => Verdict::Accept,
        }
    }
}

impl TypeChecker for StructuralChecker {
    fn check(&self, fragment: &Fragment, declarations: &Declarations) -> Verdict {
        match fragment {
            Fragment::ReadField {
                target,
                field,
                guarded,
                bind,
            } => self.check_read_field(target, field, *guarded, bind, declarations),
            Fragment::ExhaustiveMatch { target, arms } => {
                self.check_exhaustive_match(target, arms, declarations)
            }
            Fragment::Construct { target, fields } => {
                self.check_construct(target, fields, declarations)
            }
            Fragment::Call {
                function,
                args,
                bind,
            } => self.check_call(function, args, bind.as_ref(), declarations),
        }
    }
}

#[cfg(test)]
mod checker_tests {
    use super::*;
    use crate::statics::declarations::{FnDecl, ParamDecl};

    fn declarations(server_name_optional: bool) -> Declarations {
        let mut decls = Declarations::new("pkg", "1.0.0");
        let config = decls.module_mut("config");
        let mut fields = BTreeMap::new();
        fields.insert(
            "server_name".to_string(),
            FieldDecl {
                ty: TypeExpr::String,
                optional: server_name_optional,
            },
        );
        fields.insert(
            "timeout_ms".to_string(),
            FieldDecl::optional(TypeExpr::Number),
        );
        config
            .types
            .insert("Config".into(), TypeDecl::Struct { fields });
        config.types.insert(
            "Transport".into(),
            TypeDecl::Enum {
                variants: vec!["stdio".into(), "http".into()],
            },
        );
        config.types.insert(
            "Level".into(),
            TypeDecl::Alias(TypeExpr::Union(vec![
                TypeExpr::Literal("low".into()),
                TypeExpr::Literal("high".into()),
            ])),
        );
        config.functions.insert(
            "load".into(),
            FnDecl {
                params: vec![
                    ParamDecl {
                        name: "path".into(),
                        ty: TypeExpr::String,
                        optional: false,
                    },
                    ParamDecl {
                        name: "strict".into(),
                        ty: TypeExpr::Boolean,
                        optional: true,
                    },
                ],
                returns: TypeExpr::deferred(TypeExpr::named("config:Config")),
            },
        );
        decls
    }

    fn read(guarded: bool) -> Fragment {
        Fragment::ReadField {
            target: "config:Config".into(),
            field: "server_name".into(),
            guarded,
            bind: TypeExpr::String,
        }
    }

    #[test]
    fn test_required_field_read_without_guard() {
        let checker = StructuralChecker::new();
        assert_eq!(checker.check(&read(false), &declarations(false)), Verdict::Accept);

        // Loosening the field to optional breaks unguarded reads
        let verdict = checker.check(&read(false), &declarations(true));
        let Verdict::Reject(reason) = verdict else {
            panic!("expected rejection");
        };
        assert!(reason.contains("string?"));

        // A guarded read still compiles
        assert!(checker.check(&read(true), &declarations(true)).is_accept());
    }

    #[test]
    fn test_exhaustive_match() {
        let checker = StructuralChecker::new();
        let decls = declarations(false);
        let full = Fragment::ExhaustiveMatch {
            target: "config:Transport".into(),
            arms: vec!["stdio".into(), "http".into()],
        };
        assert!(checker.check(&full, &decls).is_accept());

        let partial = Fragment::ExhaustiveMatch {
            target: "config:Transport".into(),
            arms: vec!["stdio".into()],
        };
        assert_eq!(
            checker.check(&partial, &decls),
            Verdict::Reject("non-exhaustive match on `config:Transport`: missing http".into())
        );

        let alias = Fragment::ExhaustiveMatch {
            target: "config:Level".into(),
            arms: vec!["low".into(), "high".into()],
        };
        assert!(checker.check(&alias, &decls).is_accept());
    }

    #[test]
    fn test_construct_requires_fields_and_rejects_excess() {
        let checker = StructuralChecker::new();
        let decls = declarations(false);

        let mut fields = BTreeMap::new();
        fields.insert("server_name".to_string(), TypeExpr::Literal("x".into()));
        let ok = Fragment::Construct {
            target: "config:Config".into(),
            fields: fields.clone(),
        };
        assert!(checker.check(&ok, &decls).is_accept());

        let missing = Fragment::Construct {
            target: "config:Config".into(),
            fields: BTreeMap::new(),
        };
        assert!(!checker.check(&missing, &decls).is_accept());

        fields.insert("extra".to_string(), TypeExpr::Number);
        let excess = Fragment::Construct {
            target: "config:Config".into(),
            fields,
        };
        assert!(!checker.check(&excess, &decls).is_accept());
    }

    #[test]
    fn test_call_arity_and_return() {
        let checker = StructuralChecker::new();
        let decls = declarations(false);

        let call = |args: Vec<TypeExpr>, bind: Option<TypeExpr>| Fragment::Call {
            function: "config:load".into(),
            args,
            bind,
        };

        assert!(checker
            .check(
                &call(
                    vec![TypeExpr::String],
                    Some(TypeExpr::deferred(TypeExpr::named("config:Config")))
                ),
                &decls
            )
            .is_accept());
        assert!(checker
            .check(&call(vec![TypeExpr::String, TypeExpr::Boolean], None), &decls)
            .is_accept());
        assert!(!checker.check(&call(vec![], None), &decls).is_accept());
        assert!(!checker
            .check(&call(vec![TypeExpr::Number], None), &decls)
            .is_accept());
        assert!(!checker
            .check(
                &call(vec![TypeExpr::String], Some(TypeExpr::named("config:Config"))),
                &decls
            )
            .is_accept());
    }

    #[test]
    fn test_assignability_rules() {
        let checker = StructuralChecker::new();
        let decls = declarations(false);
        let opt_string = TypeExpr::optional(TypeExpr::String);

        assert!(checker.assignable(&TypeExpr::Null, &opt_string, &decls));
        assert!(checker.assignable(&TypeExpr::String, &opt_string, &decls));
        assert!(!checker.assignable(&opt_string, &TypeExpr::String, &decls));
        assert!(checker.assignable(
            &TypeExpr::Literal("http".into()),
            &TypeExpr::named("config:Transport"),
            &decls
        ));
        assert!(!checker.assignable(
            &TypeExpr::Literal("grpc".into()),
            &TypeExpr::named("config:Transport"),
            &decls
        ));
        assert!(checker.assignable(
            &TypeExpr::Literal("low".into()),
            &TypeExpr::named("config:Level"),
            &decls
        ));
    }

    #[test]
    fn test_recursive_alias_terminates() {
        let checker = StructuralChecker::new();
        let mut decls = Declarations::new("pkg", "1.0.0");
        let tree = decls.module_mut("tree");
        tree.types.insert(
            "Tree".into(),
            TypeDecl::Alias(TypeExpr::array(TypeExpr::named("tree:Tree"))),
        );
        tree.types.insert(
            "Json".into(),
            TypeDecl::Alias(TypeExpr::Union(vec![
                TypeExpr::String,
                TypeExpr::array(TypeExpr::named("tree:Json")),
            ])),
        );
        let mut fields = BTreeMap::new();
        fields.insert(
            "children".to_string(),
            FieldDecl {
                ty: TypeExpr::named("tree:Tree"),
                optional: false,
            },
        );
        tree.types.insert("Node".into(), TypeDecl::Struct { fields });

        let named = TypeExpr::named("tree:Tree");
        assert!(checker.assignable(&named, &named, &decls));
        assert!(checker.assignable(&TypeExpr::array(named.clone()), &named, &decls));
        assert!(!checker.assignable(&named, &TypeExpr::String, &decls));
        assert!(checker.assignable(&named, &TypeExpr::named("tree:Json"), &decls));
        assert!(!checker.assignable(&TypeExpr::Number, &TypeExpr::named("tree:Json"), &decls));

        let fragment = Fragment::ReadField {
            target: "tree:Node".into(),
            field: "children".into(),
            guarded: false,
            bind: named,
        };
        assert!(checker.check(&fragment, &decls).is_accept());
    }
}
