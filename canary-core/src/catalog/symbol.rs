//! Qualified symbol paths

use super::CatalogError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a symbol lives: `module:Export` or `module:Export.member`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SymbolPath {
    pub module: String,
    pub export: String,
    pub member: Option<String>,
}

impl SymbolPath {
    pub fn new(module: impl Into<String>, export: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            export: export.into(),
            member: None,
        }
    }

    pub fn with_member(mut self, member: impl Into<String>) -> Self {
        self.member = Some(member.into());
        self
    }

    /// The path without its member part
    pub fn owner(&self) -> SymbolPath {
        SymbolPath::new(&self.module, &self.export)
    }
}

fn is_ident(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '/')
}

impl FromStr for SymbolPath {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| CatalogError::InvalidSymbol {
            path: s.to_string(),
            reason: reason.to_string(),
        };

        let (module, rest) = s
            .split_once(':')
            .ok_or_else(|| invalid("expected 'module:Export'"))?;
        let (export, member) = match rest.split_once('.') {
            Some((export, member)) => (export, Some(member)),
            None => (rest, None),
        };

        if !is_ident(module) {
            return Err(invalid("empty or malformed module"));
        }
        if !is_ident(export) {
            return Err(invalid("empty or malformed export name"));
        }
        if let Some(member) = member
            && !is_ident(member)
        {
            return Err(invalid("empty or malformed member name"));
        }

        Ok(Self {
            module: module.to_string(),
            export: export.to_string(),
            member: member.map(str::to_string),
        })
    }
}

impl TryFrom<String> for SymbolPath {
    type Error = CatalogError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SymbolPath> for String {
    fn from(path: SymbolPath) -> Self {
        path.to_string()
    }
}

impl fmt::Display for SymbolPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.export)?;
        if let Some(member) = &self.member {
            write!(f, ".{}", member)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod symbol_tests {
    use super::*;

    #[test]
    fn test_parse_export_and_member() {
        let path: SymbolPath = "llm:ProviderManager.initialize".parse().unwrap();
        assert_eq!(path.module, "llm");
        assert_eq!(path.export, "ProviderManager");
        assert_eq!(path.member.as_deref(), Some("initialize"));
        assert_eq!(path.to_string(), "llm:ProviderManager.initialize");
        assert_eq!(path.owner().to_string(), "llm:ProviderManager");
    }

    #[test]
    fn test_rejects_malformed_paths() {
        assert!("ToolRegistry".parse::<SymbolPath>().is_err());
        assert!(":ToolRegistry".parse::<SymbolPath>().is_err());
        assert!("tools:".parse::<SymbolPath>().is_err());
        assert!("tools:ToolRegistry.".parse::<SymbolPath>().is_err());
        assert!("tools:Tool Registry".parse::<SymbolPath>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let path = SymbolPath::new("config", "current_config");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"config:current_config\"");

        let parsed: SymbolPath = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, path);
        assert!(serde_json::from_str::<SymbolPath>("\"nope\"").is_err());
    }
}
