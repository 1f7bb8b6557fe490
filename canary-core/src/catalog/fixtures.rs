//! Type fixture documents

use super::{CatalogError, DocumentFormat};
use crate::statics::TypeCheckUnit;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FixtureDocument {
    #[serde(default)]
    units: Vec<TypeCheckUnit>,
}

/// Ordered set of type check units with unique ids
#[derive(Debug, Clone, Default)]
pub struct TypeFixtures {
    units: Vec<TypeCheckUnit>,
}

impl TypeFixtures {
    pub fn new(units: Vec<TypeCheckUnit>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(units.len());
        for unit in &units {
            if !seen.insert(unit.id.as_str()) {
                return Err(CatalogError::DuplicateUnit(unit.id.clone()));
            }
        }
        Ok(Self { units })
    }

    pub fn from_json_str(content: &str) -> Result<Self, CatalogError> {
        let document: FixtureDocument = DocumentFormat::Json.parse(content, "type fixtures")?;
        Self::new(document.units)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, CatalogError> {
        let document: FixtureDocument = DocumentFormat::Yaml.parse(content, "type fixtures")?;
        Self::new(document.units)
    }

    /// Load a fixture file (`.json`, `.yaml` or `.yml`)
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let format = DocumentFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        let document: FixtureDocument = format.parse(&content, &path.display().to_string())?;
        Self::new(document.units)
    }

    pub fn units(&self) -> &[TypeCheckUnit] {
        &self.units
    }

    pub fn find(&self, id: &str) -> Option<&TypeCheckUnit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
mod fixtures_tests {
    use super::*;
    use crate::statics::{ExpectedVerdict, Fragment};

    const FIXTURES: &str = r#"{
        "units": [
            {
                "id": "server-name-required",
                "expected": "must_compile",
                "rationale": "read without null check",
                "fragment": { "read_field": {
                    "target": "config:ToolkitConfig",
                    "field": "server_name",
                    "bind": "string"
                } }
            },
            {
                "id": "transport-closed",
                "expected": "must_fail_to_compile",
                "rationale": "partial matches must not compile",
                "fragment": { "exhaustive_match": {
                    "target": "config:Transport",
                    "arms": ["stdio"]
                } }
            }
        ]
    }"#;

    #[test]
    fn test_parse_fixtures() {
        let fixtures = TypeFixtures::from_json_str(FIXTURES).unwrap();
        assert_eq!(fixtures.len(), 2);

        let unit = fixtures.find("server-name-required").unwrap();
        assert_eq!(unit.expected, ExpectedVerdict::MustCompile);
        assert!(matches!(
            &unit.fragment,
            Fragment::ReadField { guarded: false, field, .. } if field == "server_name"
        ));
        assert_eq!(
            fixtures.units()[1].expected,
            ExpectedVerdict::MustFailToCompile
        );
    }

    #[test]
    fn test_duplicate_unit_ids_rejected() {
        let doubled = FIXTURES.replace("transport-closed", "server-name-required");
        let result = TypeFixtures::from_json_str(&doubled);
        assert!(matches!(result, Err(CatalogError::DuplicateUnit(id)) if id == "server-name-required"));
    }

    #[test]
    fn test_parse_error_names_origin() {
        let err = TypeFixtures::from_json_str("{ not json").unwrap_err();
        assert!(err.to_string().contains("type fixtures"));
    }
}
