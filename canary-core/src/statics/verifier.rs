//! Evaluates type fixtures against the shipped declarations

use super::checker::{StructuralChecker, TypeChecker, Verdict};
use super::declarations::Declarations;
use super::fragment::{ExpectedVerdict, TypeCheckUnit};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// How a single unit came out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitStatus {
    Matched,
    Diverged { reason: String },
    Skipped { reason: String },
}

/// Result of evaluating one type check unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCheckOutcome {
    pub unit_id: String,
    pub expected: ExpectedVerdict,
    pub rationale: String,
    #[serde(flatten)]
    pub status: UnitStatus,
}

impl TypeCheckOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self.status, UnitStatus::Matched)
    }

    pub fn is_divergence(&self) -> bool {
        matches!(self.status, UnitStatus::Diverged { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, UnitStatus::Skipped { .. })
    }
}

/// Outcomes of a whole fixture set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCheckSummary {
    pub outcomes: Vec<TypeCheckOutcome>,
}

impl TypeCheckSummary {
    pub fn matched(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_match()).count()
    }

    pub fn diverged(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_divergence()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    pub fn divergences(&self) -> impl Iterator<Item = &TypeCheckOutcome> {
        self.outcomes.iter().filter(|o| o.is_divergence())
    }
}

/// Runs fixtures through a [`TypeChecker`]
#[derive(Clone)]
pub struct StaticVerifier {
    declarations: Option<Arc<Declarations>>,
    checker: Arc<dyn TypeChecker>,
}

impl StaticVerifier {
    /// Verifier backed by the structural checker. `None` means the
    /// dependency ships no type-level surface and every unit is skipped.
    pub fn new(declarations: Option<Arc<Declarations>>) -> Self {
        Self {
            declarations,
            checker: Arc::new(StructuralChecker::new()),
        }
    }

    pub fn with_checker(mut self, checker: Arc<dyn TypeChecker>) -> Self {
        self.checker = checker;
        self
    }

    pub fn has_declarations(&self) -> bool {
        self.declarations.is_some()
    }

    /// Whether the actual verdict equals the expected one
    pub fn verify(&self, unit: &TypeCheckUnit) -> bool {
        self.evaluate(unit).is_match()
    }

    pub fn evaluate(&self, unit: &TypeCheckUnit) -> TypeCheckOutcome {
        let status = match &self.declarations {
            None => UnitStatus::Skipped {
                reason: "no type declarations available".to_string(),
            },
            Some(decls) => {
                let verdict = self.checker.check(&unit.fragment, decls);
                match (unit.expected, verdict) {
                    (ExpectedVerdict::MustCompile, Verdict::Accept)
                    | (ExpectedVerdict::MustFailToCompile, Verdict::Reject(_)) => UnitStatus::Matched,
                    (ExpectedVerdict::MustCompile, Verdict::Reject(reason)) => UnitStatus::Diverged {
                        reason: format!("expected to compile, but was rejected: {}", reason),
                    },
                    (ExpectedVerdict::MustFailToCompile, Verdict::Accept) => UnitStatus::Diverged {
                        reason: "expected a compile error, but it compiles".to_string(),
                    },
                }
            }
        };

        match &status {
            UnitStatus::Diverged { reason } => warn!(unit = %unit.id, "type check diverged: {}", reason),
            other => debug!(unit = %unit.id, status = ?other, "type check evaluated"),
        }

        TypeCheckOutcome {
            unit_id: unit.id.clone(),
            expected: unit.expected,
            rationale: unit.rationale.clone(),
            status,
        }
    }

    pub fn evaluate_all(&self, units: &[TypeCheckUnit]) -> TypeCheckSummary {
        TypeCheckSummary {
            outcomes: units.iter().map(|unit| self.evaluate(unit)).collect(),
        }
    }
}

impl std::fmt::Debug for StaticVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticVerifier")
            .field("has_declarations", &self.declarations.is_some())
            .finish()
    }
}
