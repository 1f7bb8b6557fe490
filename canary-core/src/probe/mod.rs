//! Runtime probing of a dependency's exported surface
//!
//! For each catalog entry the engine:
//! - resolves the symbol against the installed [`Surface`](crate::surface::Surface)
//! - evaluates the [`Capability`] predicates compiled from the entry's shape
//! - runs the entry's behavior assertions in order, with a per-entry
//!   [`ProbeScope`] and a per-assertion timeout
//!
//! Entries are independent and run concurrently; each in its own task so a
//! panic inside the dependency only fails the entry that triggered it.

mod capability;
mod engine;

pub use capability::{Capability, Subject};
pub use engine::{ProbeEngine, ProbeScope};

use crate::catalog::ContractEntry;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Probe engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Limit for one assertion, including awaiting a deferred result.
    /// Only awaits are bounded: a synchronous export that blocks the thread
    /// cannot be interrupted and holds its entry until it returns.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Entries probed at once; 1 runs the catalog sequentially
    pub concurrency: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            concurrency: 4,
        }
    }
}

/// Category of a detected drift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftKind {
    MissingSymbol,
    ShapeMismatch,
    BehaviorMismatch,
    ProbeTimeout,
}

impl fmt::Display for DriftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriftKind::MissingSymbol => "missing symbol",
            DriftKind::ShapeMismatch => "shape mismatch",
            DriftKind::BehaviorMismatch => "behavior mismatch",
            DriftKind::ProbeTimeout => "timeout",
        };
        f.write_str(name)
    }
}

/// One human-readable finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DriftKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DriftKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeStatus {
    Pass,
    Fail,
    Skip { reason: String },
}

/// Outcome of probing one entry
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    #[serde(rename = "symbol", serialize_with = "serialize_entry_symbol")]
    pub entry: Arc<ContractEntry>,
    #[serde(flatten)]
    pub status: ProbeStatus,
    pub failures: Vec<Diagnostic>,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

fn serialize_entry_symbol<S: Serializer>(entry: &Arc<ContractEntry>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&entry.symbol)
}

impl ProbeResult {
    pub fn passed(&self) -> bool {
        self.status == ProbeStatus::Pass
    }

    pub fn failed(&self) -> bool {
        self.status == ProbeStatus::Fail
    }

    pub fn skipped(&self) -> bool {
        matches!(self.status, ProbeStatus::Skip { .. })
    }

    /// First diagnostic message, if any
    pub fn first_failure(&self) -> Option<&str> {
        self.failures.first().map(|d| d.message.as_str())
    }

    pub fn failure_messages(&self) -> Vec<&str> {
        self.failures.iter().map(|d| d.message.as_str()).collect()
    }
}
