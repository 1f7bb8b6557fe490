//! Contract catalog: the hand-authored ground truth of what a dependency promises
//!
//! A catalog is authored once per dependency baseline and only changes when
//! a contract change is deliberately accepted. At verification time it is
//! immutable input:
//! - `entries()` yields entries in authoring order, stable across runs
//! - `find()` looks an entry up by symbol path
//! - `filter()` narrows a run to matching symbols without mutating the original
//!
//! # Example
//!
//! ```rust
//! use canary_core::catalog::{Catalog, ContractEntry, SymbolKind, SymbolPath};
//!
//! let catalog = Catalog::builder("canary-toolkit", "1.4.0")
//!     .entry(ContractEntry::new(SymbolPath::new("tools", "ToolRegistry"), SymbolKind::Class))
//!     .build()
//!     .unwrap();
//!
//! assert!(catalog.find("tools:ToolRegistry").is_some());
//! ```

mod entry;
mod fixtures;
mod predicate;
mod symbol;

pub use entry::{
    Action, BehaviorAssertion, ContractEntry, Expectation, FieldExpectation, MemberExpectation,
    ParamDescriptor, Shape, SymbolKind,
};
pub use fixtures::TypeFixtures;
pub use predicate::Predicate;
pub use symbol::SymbolPath;

pub(crate) use predicate::json_path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Error type for catalog and fixture documents
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Two entries share a symbol path
    #[error("Symbol '{0}' is listed more than once")]
    DuplicateSymbol(String),

    /// Two type fixtures share an id
    #[error("Type fixture '{0}' is listed more than once")]
    DuplicateUnit(String),

    /// Malformed symbol path
    #[error("Invalid symbol path '{path}': {reason}")]
    InvalidSymbol { path: String, reason: String },

    /// Entry is internally inconsistent
    #[error("Invalid entry '{symbol}': {reason}")]
    InvalidEntry { symbol: String, reason: String },

    /// Document could not be parsed
    #[error("Failed to parse {origin}: {message}")]
    Parse { origin: String, message: String },

    /// Unknown document extension
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Document formats accepted for catalogs and fixtures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    pub(crate) fn from_path(path: &Path) -> Result<Self, CatalogError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(DocumentFormat::Json),
            Some("yaml") | Some("yml") => Ok(DocumentFormat::Yaml),
            other => Err(CatalogError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    pub(crate) fn parse<T: serde::de::DeserializeOwned>(
        self,
        content: &str,
        origin: &str,
    ) -> Result<T, CatalogError> {
        let parse_err = |message: String| CatalogError::Parse {
            origin: origin.to_string(),
            message,
        };
        match self {
            DocumentFormat::Json => serde_json::from_str(content).map_err(|e| parse_err(e.to_string())),
            // YAML goes through a JSON value so tagged enums keep their map form
            DocumentFormat::Yaml => {
                let value: serde_json::Value =
                    serde_yaml::from_str(content).map_err(|e| parse_err(e.to_string()))?;
                serde_json::from_value(value).map_err(|e| parse_err(e.to_string()))
            }
        }
    }
}

/// Serialized form of a catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDocument {
    /// Package the contract describes
    pub package: String,

    /// Package version the contract was authored against
    pub baseline_version: String,

    #[serde(default)]
    pub entries: Vec<ContractEntry>,
}

/// Immutable, ordered set of contract entries
#[derive(Debug, Clone)]
pub struct Catalog {
    package: String,
    baseline_version: String,
    entries: Vec<Arc<ContractEntry>>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Start authoring a catalog in code
    pub fn builder(package: impl Into<String>, baseline_version: impl Into<String>) -> CatalogBuilder {
        CatalogBuilder {
            document: CatalogDocument {
                package: package.into(),
                baseline_version: baseline_version.into(),
                entries: Vec::new(),
            },
        }
    }

    /// Build from a document, enforcing unique symbols and entry consistency
    pub fn from_document(document: CatalogDocument) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(document.entries.len());
        let mut entries = Vec::with_capacity(document.entries.len());

        for entry in document.entries {
            entry.validate()?;
            let key = entry.symbol.to_string();
            if index.insert(key.clone(), entries.len()).is_some() {
                return Err(CatalogError::DuplicateSymbol(key));
            }
            entries.push(Arc::new(entry));
        }

        Ok(Self {
            package: document.package,
            baseline_version: document.baseline_version,
            entries,
            index,
        })
    }

    /// Parse a JSON catalog
    pub fn from_json_str(content: &str) -> Result<Self, CatalogError> {
        Self::from_document(DocumentFormat::Json.parse(content, "catalog")?)
    }

    /// Parse a YAML catalog
    pub fn from_yaml_str(content: &str) -> Result<Self, CatalogError> {
        Self::from_document(DocumentFormat::Yaml.parse(content, "catalog")?)
    }

    /// Load a catalog file (`.json`, `.yaml` or `.yml`)
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let format = DocumentFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::from_document(format.parse(&content, &path.display().to_string())?)
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn baseline_version(&self) -> &str {
        &self.baseline_version
    }

    /// Entries in authoring order
    pub fn entries(&self) -> &[Arc<ContractEntry>] {
        &self.entries
    }

    /// Look an entry up by its symbol path (`module:Export[.member]`)
    pub fn find(&self, symbol: &str) -> Option<&Arc<ContractEntry>> {
        self.index.get(symbol).map(|&idx| &self.entries[idx])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A catalog restricted to entries whose symbol matches the filter
    pub fn filter(&self, filter: &SymbolFilter) -> Catalog {
        let entries: Vec<Arc<ContractEntry>> = self
            .entries
            .iter()
            .filter(|e| filter.matches(&e.symbol))
            .cloned()
            .collect();
        let index = entries
            .iter()
            .enumerate()
            .map(|(idx, e)| (e.symbol.to_string(), idx))
            .collect();

        Catalog {
            package: self.package.clone(),
            baseline_version: self.baseline_version.clone(),
            entries,
            index,
        }
    }

    /// Serializable form
    pub fn to_document(&self) -> CatalogDocument {
        CatalogDocument {
            package: self.package.clone(),
            baseline_version: self.baseline_version.clone(),
            entries: self.entries.iter().map(|e| e.as_ref().clone()).collect(),
        }
    }

    /// SHA-256 of the canonical JSON form, so a report can show which
    /// contract revision it was checked against
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_vec(&self.to_document()).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        format!("{:x}", hasher.finalize())
    }
}

/// Builder for [`Catalog`]
#[derive(Debug, Clone)]
pub struct CatalogBuilder {
    document: CatalogDocument,
}

impl CatalogBuilder {
    pub fn entry(mut self, entry: ContractEntry) -> Self {
        self.document.entries.push(entry);
        self
    }

    pub fn build(self) -> Result<Catalog, CatalogError> {
        Catalog::from_document(self.document)
    }
}

/// Symbol filter for `--filter`
#[derive(Debug, Clone)]
pub struct SymbolFilter {
    pattern: regex::Regex,
}

impl SymbolFilter {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: regex::Regex::new(pattern)?,
        })
    }

    pub fn matches(&self, symbol: &SymbolPath) -> bool {
        self.pattern.is_match(&symbol.to_string())
    }

    /// Match a type fixture id
    pub fn matches_id(&self, id: &str) -> bool {
        self.pattern.is_match(id)
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}
