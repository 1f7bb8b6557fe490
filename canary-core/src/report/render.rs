//! Human-readable and JSON rendering

use super::Report;
use crate::probe::ProbeStatus;
use crate::statics::UnitStatus;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

const PASS: &str = "✓";
const FAIL: &str = "✗";
const SKIP: &str = "○";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub fn render(report: &Report, format: OutputFormat) -> crate::Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(report)),
        OutputFormat::Json => render_json(report),
    }
}

pub fn render_json(report: &Report) -> crate::Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// One line per entry and type unit (name, status, first failure), failure
/// details, then the summary line
pub fn render_text(report: &Report) -> String {
    let mut out = String::new();

    for result in &report.results {
        let _ = match &result.status {
            ProbeStatus::Pass => writeln!(out, "{}  {}", result.entry.symbol, PASS),
            ProbeStatus::Fail => writeln!(
                out,
                "{}  {}  {}",
                result.entry.symbol,
                FAIL,
                result.first_failure().unwrap_or("failed")
            ),
            ProbeStatus::Skip { reason } => {
                writeln!(out, "{}  {}  skipped: {}", result.entry.symbol, SKIP, reason)
            }
        };
    }

    for outcome in &report.type_checks.outcomes {
        let _ = match &outcome.status {
            UnitStatus::Matched => {
                writeln!(out, "type {}  {}  ({})", outcome.unit_id, PASS, outcome.expected)
            }
            UnitStatus::Diverged { reason } => {
                writeln!(out, "type {}  {}  {}", outcome.unit_id, FAIL, reason)
            }
            UnitStatus::Skipped { reason } => {
                writeln!(out, "type {}  {}  skipped: {}", outcome.unit_id, SKIP, reason)
            }
        };
    }

    let failing: Vec<_> = report.failures().collect();
    let diverged: Vec<_> = report.type_checks.divergences().collect();
    if !failing.is_empty() || !diverged.is_empty() {
        out.push_str("\nFailures:\n");
        for result in failing {
            let _ = writeln!(out, "  {} ({})", result.entry.symbol, result.entry.kind);
            for diagnostic in &result.failures {
                let _ = writeln!(out, "    - [{}] {}", diagnostic.kind, diagnostic.message);
            }
        }
        for outcome in diverged {
            let _ = writeln!(out, "  type {} ({})", outcome.unit_id, outcome.expected);
            if let UnitStatus::Diverged { reason } = &outcome.status {
                let _ = writeln!(out, "    - {}", reason);
            }
            let _ = writeln!(out, "    rationale: {}", outcome.rationale);
        }
    }

    let counts = report.counts();
    if counts.skipped > 0 {
        let _ = writeln!(
            out,
            "\nWarning: {} check(s) skipped; coverage is incomplete",
            counts.skipped
        );
    }

    let _ = writeln!(
        out,
        "\n{} passed, {} failed, {} skipped, dependencyVersion={}",
        counts.passed,
        counts.failed,
        counts.skipped,
        report.dependency_version()
    );

    out
}
