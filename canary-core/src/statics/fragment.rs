//! Type fixtures: usage fragments tagged with the verdict they must get

use super::declarations::TypeExpr;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A self-contained usage of the dependency's type-level surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fragment {
    /// `let x: bind = value.field;`, with or without a preceding null check
    ReadField {
        target: String,
        field: String,
        #[serde(default)]
        guarded: bool,
        bind: TypeExpr,
    },
    /// `match value { arms... }` with no wildcard arm
    ExhaustiveMatch { target: String, arms: Vec<String> },
    /// Object literal of the target struct with the given field types
    Construct {
        target: String,
        #[serde(default)]
        fields: BTreeMap<String, TypeExpr>,
    },
    /// Call a function (`module:name`) or method (`module:Class.method`)
    Call {
        function: String,
        #[serde(default)]
        args: Vec<TypeExpr>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bind: Option<TypeExpr>,
    },
}

/// Verdict a fixture is expected to receive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedVerdict {
    MustCompile,
    MustFailToCompile,
}

impl fmt::Display for ExpectedVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedVerdict::MustCompile => f.write_str("must compile"),
            ExpectedVerdict::MustFailToCompile => f.write_str("must fail to compile"),
        }
    }
}

/// One compile-time-only assertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCheckUnit {
    pub id: String,
    pub expected: ExpectedVerdict,
    /// Why the constraint matters, so a future change can be judged
    /// deliberate or regressive
    pub rationale: String,
    pub fragment: Fragment,
}

impl TypeCheckUnit {
    pub fn must_compile(id: impl Into<String>, rationale: impl Into<String>, fragment: Fragment) -> Self {
        Self {
            id: id.into(),
            expected: ExpectedVerdict::MustCompile,
            rationale: rationale.into(),
            fragment,
        }
    }

    pub fn must_fail(id: impl Into<String>, rationale: impl Into<String>, fragment: Fragment) -> Self {
        Self {
            id: id.into(),
            expected: ExpectedVerdict::MustFailToCompile,
            rationale: rationale.into(),
            fragment,
        }
    }
}
