//! LLM provider management
//!
//! The [`ProviderManager`] decides which configured providers are usable in
//! this process. It only checks credentials; no requests are sent to any
//! provider. Initialization is explicit and tracked by [`InitState`].

use crate::error::{Result, ToolkitError};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use tracing::{debug, info, warn};

/// A provider the manager may enable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider identifier, e.g. `openai`
    pub name: String,

    /// Environment variable holding the API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Inline API key, takes precedence over `api_key_env`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl ProviderConfig {
    /// A provider that needs no credentials (e.g. a local model server)
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api_key_env: None,
            api_key: None,
        }
    }

    /// A provider keyed from an environment variable
    pub fn from_env(name: impl Into<String>, var: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api_key_env: Some(var.into()),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Whether credentials for this provider are present
    pub fn is_available(&self) -> bool {
        if let Some(key) = &self.api_key {
            return !key.trim().is_empty();
        }
        match &self.api_key_env {
            Some(var) => std::env::var(var).is_ok_and(|v| !v.trim().is_empty()),
            None => true,
        }
    }
}

/// Initialization state of a [`ProviderManager`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitState {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
}

#[derive(Debug, Default)]
struct ManagerState {
    init: InitState,
    available: Vec<String>,
}

/// Tracks which configured LLM providers can be used
#[derive(Debug, Default)]
pub struct ProviderManager {
    providers: Vec<ProviderConfig>,
    state: RwLock<ManagerState>,
}

impl ProviderManager {
    pub fn new(providers: Vec<ProviderConfig>) -> Self {
        Self {
            providers,
            state: RwLock::new(ManagerState::default()),
        }
    }

    pub fn providers(&self) -> &[ProviderConfig] {
        &self.providers
    }

    pub fn state(&self) -> InitState {
        self.state.read().unwrap_or_else(|e| e.into_inner()).init
    }

    /// Determine available providers.
    ///
    /// Calling this on a ready manager is a no-op. On failure the manager
    /// returns to [`InitState::Uninitialized`] and may be initialized again.
    pub async fn initialize(&self) -> Result<()> {
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            match state.init {
                InitState::Ready => {
                    debug!("Provider manager already initialized");
                    return Ok(());
                }
                InitState::Initializing => {
                    return Err(ToolkitError::Provider(
                        "provider manager initialization already in progress".to_string(),
                    ));
                }
                InitState::Uninitialized => state.init = InitState::Initializing,
            }
        }

        // Credential lookup happens off the caller's poll
        tokio::task::yield_now().await;

        let outcome = if self.providers.is_empty() {
            Err("no providers configured".to_string())
        } else {
            let available: Vec<String> = self
                .providers
                .iter()
                .filter(|p| p.is_available())
                .map(|p| p.name.clone())
                .collect();
            if available.is_empty() {
                Err(format!(
                    "none of the {} configured provider(s) has credentials",
                    self.providers.len()
                ))
            } else {
                Ok(available)
            }
        };

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        match outcome {
            Ok(available) => {
                info!(providers = ?available, "Provider manager ready");
                state.available = available;
                state.init = InitState::Ready;
                Ok(())
            }
            Err(reason) => {
                warn!(%reason, "Provider manager initialization failed");
                state.available.clear();
                state.init = InitState::Uninitialized;
                Err(ToolkitError::Provider(format!(
                    "provider manager could not be initialized: {}",
                    reason
                )))
            }
        }
    }

    /// Names of usable providers, in configuration order; empty until ready
    pub fn list_available_providers(&self) -> Vec<String> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .available
            .clone()
    }

    pub fn is_provider_available(&self, name: &str) -> bool {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .available
            .iter()
            .any(|p| p == name)
    }
}
