//! Configuration for canary runs

use crate::error::{CanaryError, Result};
use crate::probe::ProbeConfig;
use crate::report::OutputFormat;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Package probed when none is named
pub const DEFAULT_DEPENDENCY: &str = "canary-toolkit";

/// Settings for one verification run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanaryConfig {
    /// Package name looked up in the surface registry
    pub dependency: String,

    /// Probe timeout and concurrency
    pub probe: ProbeConfig,

    /// Catalog file; the built-in baseline when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,

    /// Type fixture file; the built-in fixtures when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_fixtures: Option<PathBuf>,

    /// Declarations file overriding the ones the package ships
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declarations: Option<PathBuf>,

    /// Run as if the package shipped no declarations
    pub no_declarations: bool,

    /// Only probe symbols matching this pattern
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// Treat skips as failures
    pub strict: bool,

    pub format: OutputFormat,
}

impl Default for CanaryConfig {
    fn default() -> Self {
        Self {
            dependency: DEFAULT_DEPENDENCY.to_string(),
            probe: ProbeConfig::default(),
            catalog: None,
            type_fixtures: None,
            declarations: None,
            no_declarations: false,
            filter: None,
            strict: false,
            format: OutputFormat::Text,
        }
    }
}

impl CanaryConfig {
    /// Layered sources, lowest precedence first:
    /// 1. Defaults
    /// 2. `canary.toml` in the working directory
    /// 3. The file named by `CANARY_CONFIG_PATH`, or `explicit` when given
    /// 4. `CANARY_*` environment variables (`__` separates nested keys,
    ///    e.g. `CANARY_PROBE__CONCURRENCY=1`)
    pub fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(CanaryConfig::default()))
            .merge(Toml::file("canary.toml"));

        match explicit {
            Some(path) => figment = figment.merge(Toml::file(path)),
            None => {
                if let Ok(path) = std::env::var("CANARY_CONFIG_PATH") {
                    figment = figment.merge(Toml::file(path));
                }
            }
        }

        figment.merge(
            Env::prefixed("CANARY_")
                .ignore(&["config_path"])
                .split("__"),
        )
    }

    /// Load the layered configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error if an explicitly named file is missing,
    /// a source cannot be parsed, or the result is invalid.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit
            && !path.is_file()
        {
            return Err(CanaryError::Configuration(format!(
                "config file not found: {}",
                path.display()
            )));
        }

        let config: CanaryConfig = Self::figment(explicit).extract().map_err(|e| {
            CanaryError::Configuration(format!("Failed to load configuration: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a single TOML file over the defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config: CanaryConfig = Figment::from(Serialized::defaults(CanaryConfig::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| {
                CanaryError::Configuration(format!("Failed to load configuration file: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.dependency.trim().is_empty() {
            return Err(CanaryError::Configuration(
                "dependency name must not be empty".to_string(),
            ));
        }
        if self.probe.concurrency == 0 {
            return Err(CanaryError::Configuration(
                "probe concurrency must be at least 1".to_string(),
            ));
        }
        if self.probe.timeout.is_zero() {
            return Err(CanaryError::Configuration(
                "probe timeout must be greater than zero".to_string(),
            ));
        }
        if self.no_declarations && self.declarations.is_some() {
            return Err(CanaryError::Configuration(
                "declarations override conflicts with no_declarations".to_string(),
            ));
        }
        Ok(())
    }
}
