//! Canary CLI - verifies the pinned toolkit against its recorded contract

mod binding;
mod greet;

use anyhow::{Context, Result};
use canary_core::prelude::*;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// Contract recorded against the pinned toolkit release
const BASELINE_CATALOG: &str = include_str!("../contracts/catalog.json");

/// Type fixtures recorded against the pinned toolkit release
const BASELINE_TYPE_FIXTURES: &str = include_str!("../contracts/type_fixtures.json");

#[derive(Parser)]
#[command(name = "canary")]
#[command(about = "Detects drift in the pinned toolkit's public surface", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe the catalog and check type fixtures (default)
    Verify,
    /// Print catalog entries and type units in order
    List,
    /// Version information
    Version,
}

#[derive(Args)]
struct RunArgs {
    /// Only check symbols and type units whose name matches this regex
    #[arg(long, global = true)]
    filter: Option<String>,

    /// Per-assertion timeout in milliseconds
    #[arg(long, value_name = "MS", global = true)]
    timeout: Option<u64>,

    /// Number of entries probed concurrently
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Catalog file (JSON or YAML) replacing the built-in baseline
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Type fixture file replacing the built-in fixtures
    #[arg(long, global = true)]
    type_fixtures: Option<PathBuf>,

    /// Declarations file overriding the ones the dependency ships
    #[arg(long, global = true, conflicts_with = "no_declarations")]
    declarations: Option<PathBuf>,

    /// Run as if the dependency shipped no type declarations
    #[arg(long, global = true)]
    no_declarations: bool,

    /// Installed package to verify
    #[arg(long, global = true)]
    dependency: Option<String>,

    /// Emit the report as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Treat skipped checks as failures
    #[arg(long, global = true)]
    strict: bool,

    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

impl RunArgs {
    /// Flags override every configuration layer
    fn apply(&self, config: &mut CanaryConfig) {
        if let Some(filter) = &self.filter {
            config.filter = Some(filter.clone());
        }
        if let Some(ms) = self.timeout {
            config.probe.timeout = Duration::from_millis(ms);
        }
        if let Some(concurrency) = self.concurrency {
            config.probe.concurrency = concurrency;
        }
        if let Some(path) = &self.catalog {
            config.catalog = Some(path.clone());
        }
        if let Some(path) = &self.type_fixtures {
            config.type_fixtures = Some(path.clone());
        }
        if let Some(path) = &self.declarations {
            config.declarations = Some(path.clone());
            config.no_declarations = false;
        }
        if self.no_declarations {
            config.no_declarations = true;
            config.declarations = None;
        }
        if let Some(dependency) = &self.dependency {
            config.dependency = dependency.clone();
        }
        if self.json {
            config.format = OutputFormat::Json;
        }
        if self.strict {
            config.strict = true;
        }
    }

    fn config(&self) -> Result<CanaryConfig> {
        let mut config = CanaryConfig::load(self.config.as_deref())?;
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }
}

fn load_catalog(config: &CanaryConfig) -> Result<Catalog> {
    match &config.catalog {
        Some(path) => Catalog::load(path)
            .with_context(|| format!("failed to load catalog {}", path.display())),
        None => Catalog::from_json_str(BASELINE_CATALOG).context("built-in catalog is invalid"),
    }
}

fn load_fixtures(config: &CanaryConfig) -> Result<TypeFixtures> {
    match &config.type_fixtures {
        Some(path) => TypeFixtures::load(path)
            .with_context(|| format!("failed to load type fixtures {}", path.display())),
        None => TypeFixtures::from_json_str(BASELINE_TYPE_FIXTURES)
            .context("built-in type fixtures are invalid"),
    }
}

async fn verify(config: CanaryConfig) -> Result<ExitStatus> {
    let catalog = load_catalog(&config)?;
    let fixtures = load_fixtures(&config)?;
    let format = config.format;
    let strict = config.strict;

    let report = Canary::new(binding::installed(), catalog, fixtures)
        .with_config(config)
        .run()
        .await?;

    let output = render(&report, format)?;
    if output.ends_with('\n') {
        print!("{}", output);
    } else {
        println!("{}", output);
    }
    Ok(report.exit_status(strict))
}

fn list(config: &CanaryConfig) -> Result<ExitStatus> {
    let catalog = load_catalog(config)?;
    let fixtures = load_fixtures(config)?;
    let filter = config
        .filter
        .as_deref()
        .map(SymbolFilter::new)
        .transpose()
        .map_err(CanaryError::from)?;

    let catalog = match &filter {
        Some(filter) => catalog.filter(filter),
        None => catalog,
    };
    let units: Vec<&TypeCheckUnit> = fixtures
        .units()
        .iter()
        .filter(|u| filter.as_ref().is_none_or(|f| f.matches_id(&u.id)))
        .collect();

    if config.format == OutputFormat::Json {
        let listing = json!({
            "package": catalog.package(),
            "baseline_version": catalog.baseline_version(),
            "entries": catalog
                .entries()
                .iter()
                .map(|e| json!({ "symbol": e.symbol, "kind": e.kind }))
                .collect::<Vec<_>>(),
            "type_units": units
                .iter()
                .map(|u| json!({ "id": u.id, "expected": u.expected }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        for entry in catalog.entries() {
            println!("{:<9}{}", entry.kind.to_string(), entry.symbol);
        }
        for unit in units {
            println!("{:<9}{}  ({})", "type", unit.id, unit.expected);
        }
    }
    Ok(ExitStatus::Green)
}

fn version() -> ExitStatus {
    println!("canary {}", env!("CARGO_PKG_VERSION"));
    println!("canary-core {}", canary_core::VERSION);
    println!("{} {} (pinned)", canary_toolkit::PACKAGE, canary_toolkit::VERSION);
    ExitStatus::Green
}

async fn execute(cli: Cli) -> Result<ExitStatus> {
    match cli.command.unwrap_or(Commands::Verify) {
        Commands::Version => Ok(version()),
        Commands::List => list(&cli.run.config()?),
        Commands::Verify => verify(cli.run.config()?).await,
    }
}

/// Infrastructure failures get their own exit code; every other error is a
/// usage problem
fn error_status(err: &anyhow::Error) -> ExitStatus {
    let infrastructure = err
        .chain()
        .filter_map(|e| e.downcast_ref::<CanaryError>())
        .any(CanaryError::is_infrastructure);
    if infrastructure {
        ExitStatus::Infrastructure
    } else {
        ExitStatus::Usage
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let status = match execute(cli).await {
        Ok(status) => status,
        Err(err) => {
            let status = error_status(&err);
            tracing::debug!(code = status.code(), "run aborted");
            eprintln!("error: {:#}", err);
            status
        }
    };
    ExitCode::from(status.code() as u8)
}
