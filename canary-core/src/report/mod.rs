//! Aggregation of probe results and type check outcomes into one report

mod render;

pub use render::{OutputFormat, render, render_json, render_text};

use crate::probe::ProbeResult;
use crate::statics::TypeCheckSummary;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Process exit signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitStatus {
    /// Every probe passed and every type unit matched
    Green,
    /// Probe failures or type divergences (or skips under `--strict`)
    Regression,
    /// Bad flags, filter, configuration or catalog
    Usage,
    /// Dependency missing or unloadable
    Infrastructure,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Green => 0,
            ExitStatus::Regression => 1,
            ExitStatus::Usage => 2,
            ExitStatus::Infrastructure => 3,
        }
    }
}

/// Pass/fail/skip totals over probes and type units combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// What was checked against what
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunMetadata {
    pub dependency: String,
    pub dependency_version: String,
    pub baseline_version: String,
    pub catalog_fingerprint: String,
}

/// Outcome of one verification run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub metadata: RunMetadata,
    pub results: Vec<ProbeResult>,
    pub type_checks: TypeCheckSummary,
    pub counts: Counts,
    pub green: bool,
}

impl Report {
    pub fn new(metadata: RunMetadata, results: Vec<ProbeResult>, type_checks: TypeCheckSummary) -> Self {
        let counts = Counts {
            passed: results.iter().filter(|r| r.passed()).count() + type_checks.matched(),
            failed: results.iter().filter(|r| r.failed()).count() + type_checks.diverged(),
            skipped: results.iter().filter(|r| r.skipped()).count() + type_checks.skipped(),
        };
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            metadata,
            results,
            type_checks,
            green: counts.failed == 0,
            counts,
        }
    }

    pub fn dependency_version(&self) -> &str {
        &self.metadata.dependency_version
    }

    pub fn counts(&self) -> Counts {
        self.counts
    }

    /// No probe failures and no type divergences. Skips are allowed.
    pub fn is_green(&self) -> bool {
        self.green
    }

    /// Green with nothing skipped
    pub fn has_full_coverage(&self) -> bool {
        self.green && self.counts.skipped == 0
    }

    /// Failing probe results, in catalog order
    pub fn failures(&self) -> impl Iterator<Item = &ProbeResult> {
        self.results.iter().filter(|r| r.failed())
    }

    pub fn exit_status(&self, strict: bool) -> ExitStatus {
        let ok = if strict {
            self.has_full_coverage()
        } else {
            self.is_green()
        };
        if ok {
            ExitStatus::Green
        } else {
            ExitStatus::Regression
        }
    }
}

/// Collects probe results from concurrent tasks
///
/// Each result is built completely before it is pushed, so appends never
/// interleave. Results are restored to catalog order when the builder is
/// drained.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    results: Mutex<Vec<(usize, ProbeResult)>>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the result for the entry at catalog position `index`
    pub async fn push(&self, index: usize, result: ProbeResult) {
        self.results.lock().await.push((index, result));
    }

    pub async fn len(&self) -> usize {
        self.results.lock().await.len()
    }

    /// Results in catalog order
    pub async fn into_results(self) -> Vec<ProbeResult> {
        let mut results = self.results.into_inner();
        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, result)| result).collect()
    }

    pub async fn finish(self, metadata: RunMetadata, type_checks: TypeCheckSummary) -> Report {
        let results = self.into_results().await;
        Report::new(metadata, results, type_checks)
    }
}

#[cfg(test)]
mod report_tests {
    use super::*;
    use crate::catalog::{ContractEntry, SymbolKind, SymbolPath};
    use crate::probe::{Diagnostic, DriftKind, ProbeStatus};
    use crate::statics::{ExpectedVerdict, TypeCheckOutcome, UnitStatus};
    use std::sync::Arc;
    use std::time::Duration;

    pub(super) fn result(symbol: &str, status: ProbeStatus, failures: Vec<&str>) -> ProbeResult {
        ProbeResult {
            entry: Arc::new(ContractEntry::new(
                symbol.parse::<SymbolPath>().unwrap(),
                SymbolKind::Function,
            )),
            status,
            failures: failures
                .into_iter()
                .map(|m| Diagnostic::new(DriftKind::BehaviorMismatch, m))
                .collect(),
            duration: Duration::from_millis(3),
        }
    }

    pub(super) fn metadata() -> RunMetadata {
        RunMetadata {
            dependency: "canary-toolkit".into(),
            dependency_version: "1.4.0".into(),
            baseline_version: "1.4.0".into(),
            catalog_fingerprint: "abc".into(),
        }
    }

    fn unit(id: &str, status: UnitStatus) -> TypeCheckOutcome {
        TypeCheckOutcome {
            unit_id: id.into(),
            expected: ExpectedVerdict::MustCompile,
            rationale: "r".into(),
            status,
        }
    }

    #[tokio::test]
    async fn test_builder_restores_catalog_order() {
        let builder = ReportBuilder::new();
        builder.push(2, result("m:c", ProbeStatus::Pass, vec![])).await;
        builder.push(0, result("m:a", ProbeStatus::Pass, vec![])).await;
        builder.push(1, result("m:b", ProbeStatus::Pass, vec![])).await;
        assert_eq!(builder.len().await, 3);

        let report = builder.finish(metadata(), TypeCheckSummary::default()).await;
        let symbols: Vec<String> = report.results.iter().map(|r| r.entry.symbol.to_string()).collect();
        assert_eq!(symbols, vec!["m:a", "m:b", "m:c"]);
    }

    #[test]
    fn test_skips_are_green_but_not_full_coverage() {
        let report = Report::new(
            metadata(),
            vec![
                result("m:a", ProbeStatus::Pass, vec![]),
                result(
                    "m:b",
                    ProbeStatus::Skip {
                        reason: "no type declarations available".into(),
                    },
                    vec![],
                ),
            ],
            TypeCheckSummary {
                outcomes: vec![unit(
                    "u",
                    UnitStatus::Skipped {
                        reason: "no type declarations available".into(),
                    },
                )],
            },
        );

        assert!(report.is_green());
        assert!(!report.has_full_coverage());
        assert_eq!(
            report.counts(),
            Counts {
                passed: 1,
                failed: 0,
                skipped: 2
            }
        );
        assert_eq!(report.exit_status(false), ExitStatus::Green);
        assert_eq!(report.exit_status(true), ExitStatus::Regression);
    }

    #[test]
    fn test_type_divergence_breaks_green() {
        let report = Report::new(
            metadata(),
            vec![result("m:a", ProbeStatus::Pass, vec![])],
            TypeCheckSummary {
                outcomes: vec![unit(
                    "u",
                    UnitStatus::Diverged {
                        reason: "expected a compile error, but it compiles".into(),
                    },
                )],
            },
        );
        assert!(!report.is_green());
        assert_eq!(report.exit_status(false).code(), 1);
        assert_eq!(report.failures().count(), 0);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitStatus::Green.code(), 0);
        assert_eq!(ExitStatus::Regression.code(), 1);
        assert_eq!(ExitStatus::Usage.code(), 2);
        assert_eq!(ExitStatus::Infrastructure.code(), 3);
    }
}
