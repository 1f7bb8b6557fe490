//! Runtime probe engine

use super::capability::{Capability, Subject};
use super::{Diagnostic, DriftKind, ProbeConfig, ProbeResult, ProbeStatus};
use crate::catalog::{Action, BehaviorAssertion, Catalog, ContractEntry, Expectation, SymbolKind};
use crate::report::ReportBuilder;
use crate::statics::{DeclaredSymbol, TypeDecl};
use crate::surface::{Instance, Invocation, MemberInfo, Surface, Symbol, Thrown};
use futures::StreamExt;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// State shared by the assertions of one entry, discarded afterwards
#[derive(Default)]
pub struct ProbeScope {
    instance: Option<Arc<dyn Instance>>,
}

impl ProbeScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instance(&self) -> Option<&Arc<dyn Instance>> {
        self.instance.as_ref()
    }
}

/// Settled outcome of one action
#[derive(Debug, Clone, PartialEq)]
enum Outcome {
    Returned(Value),
    Threw(Thrown),
    Resolved(Value),
    Rejected(Thrown),
}

impl Outcome {
    fn verb(&self) -> &'static str {
        match self {
            Outcome::Returned(_) => "return",
            Outcome::Threw(_) => "throw",
            Outcome::Resolved(_) => "resolve",
            Outcome::Rejected(_) => "reject",
        }
    }

    fn subject(&self) -> Value {
        match self {
            Outcome::Returned(value) | Outcome::Resolved(value) => value.clone(),
            Outcome::Threw(thrown) | Outcome::Rejected(thrown) => thrown.to_value(),
        }
    }

    fn thrown(&self) -> Option<&Thrown> {
        match self {
            Outcome::Threw(thrown) | Outcome::Rejected(thrown) => Some(thrown),
            _ => None,
        }
    }

    fn matches_kind(&self, expect: &Expectation) -> bool {
        matches!(
            (self, expect),
            (Outcome::Returned(_), Expectation::Returns { .. })
                | (Outcome::Threw(_), Expectation::Throws { .. })
                | (Outcome::Resolved(_), Expectation::Resolves { .. })
                | (Outcome::Rejected(_), Expectation::Rejects { .. })
        )
    }
}

async fn settle(invocation: Invocation) -> Outcome {
    match invocation {
        Invocation::Returned(Ok(value)) => Outcome::Returned(value),
        Invocation::Returned(Err(thrown)) => Outcome::Threw(thrown),
        Invocation::Deferred(fut) => match fut.await {
            Ok(value) => Outcome::Resolved(value),
            Err(thrown) => Outcome::Rejected(thrown),
        },
    }
}

fn truncate(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() > 120 {
        let head: String = text.chars().take(117).collect();
        format!("{}...", head)
    } else {
        text
    }
}

/// Resolves entries against a surface and runs their checks
#[derive(Clone)]
pub struct ProbeEngine {
    surface: Arc<dyn Surface>,
    config: ProbeConfig,
}

impl ProbeEngine {
    pub fn new(surface: Arc<dyn Surface>) -> Self {
        Self::with_config(surface, ProbeConfig::default())
    }

    pub fn with_config(surface: Arc<dyn Surface>, config: ProbeConfig) -> Self {
        Self { surface, config }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Probe one entry in its own task; a panic inside the dependency fails
    /// this entry only
    pub async fn probe(&self, entry: Arc<ContractEntry>) -> ProbeResult {
        let started = Instant::now();
        let surface = self.surface.clone();
        let timeout = self.config.timeout;
        let task_entry = entry.clone();

        let joined =
            tokio::spawn(async move { probe_entry(surface.as_ref(), &task_entry, timeout).await }).await;

        let (status, failures) = match joined {
            Ok(outcome) => outcome,
            Err(err) => {
                let reason = if err.is_panic() {
                    let payload = err.into_panic();
                    payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "panic".to_string())
                } else {
                    err.to_string()
                };
                (
                    ProbeStatus::Fail,
                    vec![Diagnostic::new(
                        DriftKind::BehaviorMismatch,
                        format!("probe aborted: {}", reason),
                    )],
                )
            }
        };

        let result = ProbeResult {
            entry,
            status,
            failures,
            duration: started.elapsed(),
        };

        match &result.status {
            ProbeStatus::Fail => warn!(
                symbol = %result.entry.symbol,
                failures = result.failures.len(),
                "contract drift: {}",
                result.first_failure().unwrap_or_default()
            ),
            ProbeStatus::Skip { reason } => {
                info!(symbol = %result.entry.symbol, "probe skipped: {}", reason)
            }
            ProbeStatus::Pass => debug!(symbol = %result.entry.symbol, "probe passed"),
        }

        result
    }

    /// Probe every entry with bounded concurrency, appending each result to
    /// the builder as it completes
    pub async fn run(&self, catalog: &Catalog, builder: &ReportBuilder) {
        let concurrency = self.config.concurrency.max(1);
        info!(
            entries = catalog.len(),
            concurrency,
            timeout_ms = self.config.timeout.as_millis() as u64,
            "probing dependency surface"
        );

        futures::stream::iter(catalog.entries().iter().cloned().enumerate())
            .map(|(index, entry)| async move {
                let result = self.probe(entry).await;
                builder.push(index, result).await;
            })
            .buffer_unordered(concurrency)
            .collect::<Vec<()>>()
            .await;
    }

    /// Probe entries and return results in catalog order
    pub async fn probe_all(&self, catalog: &Catalog) -> Vec<ProbeResult> {
        let builder = ReportBuilder::new();
        self.run(catalog, &builder).await;
        builder.into_results().await
    }
}

impl std::fmt::Debug for ProbeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeEngine")
            .field("dependency", self.surface.metadata())
            .field("config", &self.config)
            .finish()
    }
}

fn fail(kind: DriftKind, message: impl Into<String>) -> (ProbeStatus, Vec<Diagnostic>) {
    (ProbeStatus::Fail, vec![Diagnostic::new(kind, message)])
}

async fn probe_entry(
    surface: &dyn Surface,
    entry: &ContractEntry,
    timeout: Duration,
) -> (ProbeStatus, Vec<Diagnostic>) {
    let path = &entry.symbol;

    if entry.kind == SymbolKind::Type {
        return probe_type(surface, entry);
    }

    let Some(symbol) = surface.resolve(&path.module, &path.export) else {
        return fail(DriftKind::MissingSymbol, "symbol not exported");
    };

    let mut failures = Vec::new();

    // Method entries are checked against the member, not the owning class
    let method: Option<MemberInfo> = match (&entry.kind, &path.member) {
        (SymbolKind::Method, Some(name)) => {
            let Symbol::Class(class) = &symbol else {
                return fail(
                    DriftKind::ShapeMismatch,
                    format!("expected `{}` to be a class, found {}", path.export, symbol.kind_name()),
                );
            };
            match class.members().into_iter().find(|m| &m.name == name) {
                Some(member) => Some(member),
                None => {
                    return fail(
                        DriftKind::MissingSymbol,
                        format!("member `{}` not exported", name),
                    );
                }
            }
        }
        _ => None,
    };

    let subject = match &method {
        Some(member) => Subject::Method(member),
        None => Subject::Symbol(&symbol),
    };
    for capability in Capability::compile(entry) {
        if let Err(reason) = capability.check(subject) {
            failures.push(Diagnostic::new(DriftKind::ShapeMismatch, reason));
            if capability.is_gate() {
                break;
            }
        }
    }

    run_assertions(entry, &symbol, timeout, &mut failures).await;

    let status = if failures.is_empty() {
        ProbeStatus::Pass
    } else {
        ProbeStatus::Fail
    };
    (status, failures)
}

fn probe_type(surface: &dyn Surface, entry: &ContractEntry) -> (ProbeStatus, Vec<Diagnostic>) {
    let Some(declarations) = surface.declarations() else {
        return (
            ProbeStatus::Skip {
                reason: "no type declarations available".to_string(),
            },
            Vec::new(),
        );
    };

    let path = &entry.symbol;
    let fields = match declarations.lookup(&path.module, &path.export) {
        Some(DeclaredSymbol::Type(TypeDecl::Struct { fields })) => fields,
        Some(DeclaredSymbol::Type(_)) if entry.shape.fields.is_empty() => {
            return (ProbeStatus::Pass, Vec::new());
        }
        Some(DeclaredSymbol::Type(_)) => {
            return fail(
                DriftKind::ShapeMismatch,
                "expected a struct type with fields, found enum or alias",
            );
        }
        Some(DeclaredSymbol::Class(class)) => &class.fields,
        _ => return fail(DriftKind::MissingSymbol, "symbol not exported"),
    };

    let mut failures = Vec::new();
    for expected in &entry.shape.fields {
        match fields.get(&expected.name) {
            None => failures.push(Diagnostic::new(
                DriftKind::ShapeMismatch,
                format!("field `{}` missing", expected.name),
            )),
            Some(declared) if declared.optional != expected.optional => {
                let describe = |optional: bool| if optional { "optional" } else { "required" };
                failures.push(Diagnostic::new(
                    DriftKind::ShapeMismatch,
                    format!(
                        "field `{}` expected {}, declared {}",
                        expected.name,
                        describe(expected.optional),
                        describe(declared.optional)
                    ),
                ));
            }
            Some(_) => {}
        }
    }

    let status = if failures.is_empty() {
        ProbeStatus::Pass
    } else {
        ProbeStatus::Fail
    };
    (status, failures)
}

async fn run_assertions(
    entry: &ContractEntry,
    symbol: &Symbol,
    timeout: Duration,
    failures: &mut Vec<Diagnostic>,
) {
    let mut scope = ProbeScope::new();
    let total = entry.assertions.len();

    for (idx, assertion) in entry.assertions.iter().enumerate() {
        let number = idx + 1;
        debug!(symbol = %entry.symbol, assertion = %assertion.name, "running assertion {}/{}", number, total);

        let performed = tokio::time::timeout(timeout, perform(entry, symbol, assertion, &mut scope)).await;

        match performed {
            Err(_) => {
                failures.push(Diagnostic::new(
                    DriftKind::ProbeTimeout,
                    format!(
                        "assertion timed out: assertion {} ({}) after {}ms; {} remaining assertion(s) not evaluated",
                        number,
                        assertion.name,
                        timeout.as_millis(),
                        total - number
                    ),
                ));
                return;
            }
            Ok(Err(reason)) => failures.push(Diagnostic::new(
                DriftKind::BehaviorMismatch,
                format!("assertion {} ({}): {}", number, assertion.name, reason),
            )),
            Ok(Ok(outcome)) => {
                if let Err(reason) = judge(&assertion.expect, &outcome) {
                    failures.push(Diagnostic::new(
                        DriftKind::BehaviorMismatch,
                        format!("assertion {} ({}): {}", number, assertion.name, reason),
                    ));
                }
            }
        }
    }
}

/// Execute an action and settle its result. `Err` means the action could
/// not be performed at all against this symbol.
async fn perform(
    entry: &ContractEntry,
    symbol: &Symbol,
    assertion: &BehaviorAssertion,
    scope: &mut ProbeScope,
) -> Result<Outcome, String> {
    match &assertion.action {
        Action::Call { args } => match symbol {
            Symbol::Function(callable) => Ok(settle(callable.invoke(args.clone())).await),
            other => Err(format!("cannot call a {}", other.kind_name())),
        },
        Action::Construct { args } => match symbol {
            Symbol::Class(class) => match class.construct(args.clone()) {
                Ok(instance) => {
                    scope.instance = Some(instance);
                    Ok(Outcome::Returned(json!({ "instance": entry.symbol.export })))
                }
                Err(thrown) => Ok(Outcome::Threw(thrown)),
            },
            other => Err(format!("cannot construct a {}", other.kind_name())),
        },
        Action::Invoke { method, args } => {
            let Some(method) = method.as_deref().or(entry.symbol.member.as_deref()) else {
                return Err("no method named for invoke".to_string());
            };
            let Some(instance) = scope.instance.clone() else {
                return Err(format!(
                    "cannot invoke `{}`: no instance constructed in this entry",
                    method
                ));
            };
            Ok(settle(instance.invoke(method, args.clone())).await)
        }
        Action::Read { field } => match (symbol, field) {
            (Symbol::Constant(value), None) => Ok(Outcome::Returned(value.clone())),
            (Symbol::Constant(value), Some(path)) => crate::catalog::json_path(value, path)
                .cloned()
                .map(Outcome::Returned)
                .ok_or_else(|| format!("no value at `{}`", path)),
            (Symbol::Class(_), Some(field)) => {
                let Some(instance) = scope.instance.as_ref() else {
                    return Err(format!(
                        "cannot read `{}`: no instance constructed in this entry",
                        field
                    ));
                };
                instance
                    .read(field)
                    .map(Outcome::Returned)
                    .ok_or_else(|| format!("field `{}` not readable", field))
            }
            (other, _) => Err(format!("cannot read a {}", other.kind_name())),
        },
    }
}

fn judge(expect: &Expectation, outcome: &Outcome) -> Result<(), String> {
    if !outcome.matches_kind(expect) {
        let mut reason = format!("expected {}, got {}", expect.verb(), outcome.verb());
        match outcome.thrown() {
            Some(thrown) => reason.push_str(&format!(" ({})", thrown)),
            None => reason.push_str(&format!(" ({})", truncate(&outcome.subject()))),
        }
        if let Some(message) = expect.predicate().expected_message() {
            reason.push_str(&format!("; expected message containing '{}'", message));
        }
        return Err(reason);
    }

    expect
        .predicate()
        .check(&outcome.subject())
        .map_err(|reason| format!("{} did not match: {}", outcome.verb(), reason))
}
