//! Process-wide server configuration
//!
//! The framework keeps one active configuration per process. Servers install
//! it at startup; anything else reads it through [`current_config`].

use crate::error::{Result, ToolkitError};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// How the server talks to its clients
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Stdio,
    Http,
}

/// Active server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolkitConfig {
    /// Name announced to clients
    pub server_name: String,
    /// Server version announced to clients
    pub version: String,
    #[serde(default)]
    pub transport: Transport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            server_name: "toolkit-server".to_string(),
            version: crate::VERSION.to_string(),
            transport: Transport::Stdio,
            log_level: None,
        }
    }
}

static ACTIVE: Lazy<RwLock<ToolkitConfig>> = Lazy::new(|| RwLock::new(ToolkitConfig::default()));

impl ToolkitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.server_name.trim().is_empty() {
            return Err(ToolkitError::Configuration(
                "server_name must not be empty".to_string(),
            ));
        }
        if self.version.trim().is_empty() {
            return Err(ToolkitError::Configuration(
                "version must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Snapshot of the active configuration
    pub fn current() -> Self {
        ACTIVE.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Replace the active configuration, returning the previous one
    pub fn install(config: ToolkitConfig) -> Result<ToolkitConfig> {
        config.validate()?;
        let mut active = ACTIVE.write().unwrap_or_else(|e| e.into_inner());
        tracing::debug!(server_name = %config.server_name, "Installed toolkit configuration");
        Ok(std::mem::replace(&mut *active, config))
    }

    /// Restore the defaults
    pub fn reset() {
        let mut active = ACTIVE.write().unwrap_or_else(|e| e.into_inner());
        *active = ToolkitConfig::default();
    }
}

/// Snapshot of the active configuration
pub fn current_config() -> ToolkitConfig {
    ToolkitConfig::current()
}

#[cfg(test)]
mod config_tests {
    use super::*;

    // Single test: the active configuration is process-wide state.
    #[test]
    fn test_install_current_and_reset() {
        assert_eq!(current_config(), ToolkitConfig::default());
        assert_eq!(current_config().version, crate::VERSION);

        let custom = ToolkitConfig {
            server_name: "weather".into(),
            transport: Transport::Http,
            ..ToolkitConfig::default()
        };
        let previous = ToolkitConfig::install(custom.clone()).unwrap();
        assert_eq!(previous, ToolkitConfig::default());
        assert_eq!(current_config(), custom);

        let invalid = ToolkitConfig {
            server_name: " ".into(),
            ..ToolkitConfig::default()
        };
        assert!(matches!(
            ToolkitConfig::install(invalid),
            Err(ToolkitError::Configuration(_))
        ));
        assert_eq!(current_config(), custom);

        ToolkitConfig::reset();
        assert_eq!(current_config(), ToolkitConfig::default());
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(ToolkitConfig::default()).unwrap();
        assert_eq!(json["transport"], "stdio");
        assert!(json.get("log_level").is_none());
    }
}
