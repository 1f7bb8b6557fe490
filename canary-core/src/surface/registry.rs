//! Lookup of installed dependencies by package name

use super::Surface;
use crate::error::{CanaryError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Loads one installed package's surface
pub type SurfaceLoader = Arc<dyn Fn() -> Result<Arc<dyn Surface>> + Send + Sync>;

/// Registry of dependency installations linked into the binary
#[derive(Default, Clone)]
pub struct SurfaceRegistry {
    loaders: BTreeMap<String, SurfaceLoader>,
}

impl std::fmt::Debug for SurfaceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceRegistry")
            .field("installed", &self.installed())
            .finish()
    }
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an installation under its package name
    pub fn install<F>(mut self, package: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Surface>> + Send + Sync + 'static,
    {
        self.loaders.insert(package.into(), Arc::new(loader));
        self
    }

    /// Names of all installed packages
    pub fn installed(&self) -> Vec<&str> {
        self.loaders.keys().map(|s| s.as_str()).collect()
    }

    /// Load a package's surface.
    ///
    /// Both a missing installation and a failing loader are infrastructure
    /// errors: no catalog entry can be evaluated without the dependency.
    pub fn load(&self, package: &str) -> Result<Arc<dyn Surface>> {
        let loader = self.loaders.get(package).ok_or_else(|| {
            CanaryError::Infrastructure(format!(
                "dependency '{}' not found (installed: {})",
                package,
                if self.loaders.is_empty() {
                    "none".to_string()
                } else {
                    self.installed().join(", ")
                }
            ))
        })?;

        let surface = loader().map_err(|e| match e {
            CanaryError::Infrastructure(msg) => CanaryError::Infrastructure(msg),
            other => CanaryError::Infrastructure(format!(
                "dependency '{}' could not be loaded: {}",
                package, other
            )),
        })?;

        let metadata = surface.metadata();
        if metadata.name != package {
            return Err(CanaryError::Infrastructure(format!(
                "installation registered as '{}' reports package name '{}'",
                package, metadata.name
            )));
        }

        tracing::debug!(
            package = %metadata.name,
            version = %metadata.version,
            "Loaded dependency surface"
        );
        Ok(surface)
    }
}

#[cfg(test)]
mod registry_tests {
    use super::*;
    use crate::surface::SurfaceBuilder;

    #[test]
    fn test_load_installed_package() {
        let registry = SurfaceRegistry::new().install("pkg", || {
            Ok(Arc::new(SurfaceBuilder::new("pkg", "2.1.0").build()) as Arc<dyn Surface>)
        });

        let surface = registry.load("pkg").unwrap();
        assert_eq!(surface.metadata().version, "2.1.0");
    }

    #[test]
    fn test_missing_package_is_infrastructure_error() {
        let registry = SurfaceRegistry::new();
        let err = registry.load("absent").err().unwrap();

        assert!(err.is_infrastructure());
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_failing_loader_is_infrastructure_error() {
        let registry = SurfaceRegistry::new()
            .install("broken", || Err(CanaryError::Other("missing entry point".into())));

        let err = registry.load("broken").err().unwrap();
        assert!(err.is_infrastructure());
        assert!(err.to_string().contains("could not be loaded"));
    }

    #[test]
    fn test_name_mismatch_is_infrastructure_error() {
        let registry = SurfaceRegistry::new().install("pkg", || {
            Ok(Arc::new(SurfaceBuilder::new("other", "1.0.0").build()) as Arc<dyn Surface>)
        });

        assert!(registry.load("pkg").err().unwrap().is_infrastructure());
    }
}
