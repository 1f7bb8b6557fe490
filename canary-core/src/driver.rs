//! Orchestrates one verification run

use crate::catalog::{Catalog, SymbolFilter, TypeFixtures};
use crate::config::CanaryConfig;
use crate::error::{CanaryError, Result};
use crate::probe::ProbeEngine;
use crate::report::{Report, ReportBuilder, RunMetadata};
use crate::statics::{Declarations, StaticVerifier, TypeCheckUnit};
use crate::surface::{PackageMetadata, Surface, SurfaceRegistry, Symbol};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Where type declarations come from for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclarationSource {
    /// Whatever the package ships
    Shipped,
    /// A declarations file replacing the shipped ones
    Override(PathBuf),
    /// Pretend the package ships none
    Disabled,
}

impl DeclarationSource {
    pub fn from_config(config: &CanaryConfig) -> Self {
        match (&config.declarations, config.no_declarations) {
            (_, true) => DeclarationSource::Disabled,
            (Some(path), false) => DeclarationSource::Override(path.clone()),
            (None, false) => DeclarationSource::Shipped,
        }
    }
}

/// A surface whose declarations were replaced for this run
struct DeclarationOverlay {
    inner: Arc<dyn Surface>,
    declarations: Option<Arc<Declarations>>,
}

impl Surface for DeclarationOverlay {
    fn metadata(&self) -> &PackageMetadata {
        self.inner.metadata()
    }

    fn resolve(&self, module: &str, export: &str) -> Option<Symbol> {
        self.inner.resolve(module, export)
    }

    fn exports(&self) -> Vec<(String, String)> {
        self.inner.exports()
    }

    fn declarations(&self) -> Option<Arc<Declarations>> {
        self.declarations.clone()
    }
}

/// Runs a catalog and type fixtures against an installed dependency
#[derive(Debug, Clone)]
pub struct Canary {
    registry: SurfaceRegistry,
    catalog: Arc<Catalog>,
    fixtures: TypeFixtures,
    config: CanaryConfig,
}

impl Canary {
    pub fn new(registry: SurfaceRegistry, catalog: Catalog, fixtures: TypeFixtures) -> Self {
        Self {
            registry,
            catalog: Arc::new(catalog),
            fixtures,
            config: CanaryConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CanaryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &CanaryConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn fixtures(&self) -> &TypeFixtures {
        &self.fixtures
    }

    fn filter(&self) -> Result<Option<SymbolFilter>> {
        self.config
            .filter
            .as_deref()
            .map(SymbolFilter::new)
            .transpose()
            .map_err(CanaryError::from)
    }

    /// Resolve the installed dependency, applying the declaration source
    pub fn load_surface(&self) -> Result<Arc<dyn Surface>> {
        let surface = self.registry.load(&self.config.dependency)?;

        let metadata = surface.metadata();
        if metadata.name != self.catalog.package() {
            return Err(CanaryError::Infrastructure(format!(
                "catalog describes '{}' but the installed dependency is '{}'",
                self.catalog.package(),
                metadata.name
            )));
        }
        if metadata.version != self.catalog.baseline_version() {
            warn!(
                baseline = %self.catalog.baseline_version(),
                installed = %metadata.version,
                "installed dependency differs from the catalog baseline"
            );
        }

        let declarations = match DeclarationSource::from_config(&self.config) {
            DeclarationSource::Shipped => return Ok(surface),
            DeclarationSource::Disabled => None,
            DeclarationSource::Override(path) => {
                let declarations = Declarations::load(&path).map_err(|e| {
                    CanaryError::Infrastructure(format!(
                        "declarations file {} is unreadable: {}",
                        path.display(),
                        e
                    ))
                })?;
                Some(Arc::new(declarations))
            }
        };

        Ok(Arc::new(DeclarationOverlay {
            inner: surface,
            declarations,
        }))
    }

    /// Run both engines and aggregate the report.
    ///
    /// # Errors
    ///
    /// Only run-level problems are errors: an invalid filter, or an
    /// infrastructure failure loading the dependency or its declarations.
    /// Contract drift is reported, not raised.
    pub async fn run(&self) -> Result<Report> {
        let filter = self.filter()?;
        let surface = self.load_surface()?;
        let metadata = surface.metadata().clone();

        let catalog = match &filter {
            Some(filter) => Arc::new(self.catalog.filter(filter)),
            None => self.catalog.clone(),
        };
        let units: Vec<TypeCheckUnit> = self
            .fixtures
            .units()
            .iter()
            .filter(|u| filter.as_ref().is_none_or(|f| f.matches_id(&u.id)))
            .cloned()
            .collect();

        info!(
            dependency = %metadata.name,
            version = %metadata.version,
            entries = catalog.len(),
            type_units = units.len(),
            "starting verification run"
        );

        let verifier = StaticVerifier::new(surface.declarations());
        let engine = ProbeEngine::with_config(surface, self.config.probe.clone());
        let builder = ReportBuilder::new();
        engine.run(&catalog, &builder).await;

        let type_checks = verifier.evaluate_all(&units);

        let report = builder
            .finish(
                RunMetadata {
                    dependency: metadata.name,
                    dependency_version: metadata.version,
                    baseline_version: self.catalog.baseline_version().to_string(),
                    catalog_fingerprint: self.catalog.fingerprint(),
                },
                type_checks,
            )
            .await;

        let counts = report.counts();
        info!(
            run_id = %report.run_id,
            passed = counts.passed,
            failed = counts.failed,
            skipped = counts.skipped,
            green = report.is_green(),
            "verification run finished"
        );

        Ok(report)
    }
}
