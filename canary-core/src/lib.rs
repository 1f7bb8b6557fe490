//! # Canary - contract snapshot and drift detection
//!
//! Canary pins a third-party dependency and continuously checks that its
//! public surface still behaves the way the consuming code relies on. It
//! runs two kinds of checks:
//! - a **runtime probe** of every cataloged symbol (existence, shape and
//!   behavior assertions)
//! - a **static shape verification** of type fixtures against the type
//!   declarations the dependency ships, which catches changes invisible at
//!   runtime
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use canary_core::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let registry = SurfaceRegistry::new().install("greeter", || {
//!         let surface = SurfaceBuilder::new("greeter", "1.0.0")
//!             .function("api", "greet", Signature::new(ReturnKind::Value), |_| {
//!                 Invocation::value(json!("hello"))
//!             })
//!             .build();
//!         Ok(std::sync::Arc::new(surface) as std::sync::Arc<dyn Surface>)
//!     });
//!
//!     let catalog = Catalog::builder("greeter", "1.0.0")
//!         .entry(
//!             ContractEntry::new(SymbolPath::new("api", "greet"), SymbolKind::Function)
//!                 .with_assertion(BehaviorAssertion::new(
//!                     "greets",
//!                     Action::call(vec![]),
//!                     Expectation::returns(Predicate::Equals(json!("hello"))),
//!                 )),
//!         )
//!         .build()?;
//!
//!     let config = CanaryConfig {
//!         dependency: "greeter".into(),
//!         ..CanaryConfig::default()
//!     };
//!     let report = Canary::new(registry, catalog, TypeFixtures::default())
//!         .with_config(config)
//!         .run()
//!         .await?;
//!
//!     println!("{}", render_text(&report));
//!     std::process::exit(report.exit_status(false).code());
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod driver;
pub mod error;
pub mod probe;
pub mod report;
pub mod statics;
pub mod surface;

pub use error::{CanaryError, Result};

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::catalog::{
        Action, BehaviorAssertion, Catalog, CatalogBuilder, CatalogDocument, CatalogError,
        ContractEntry, Expectation, FieldExpectation, MemberExpectation, ParamDescriptor,
        Predicate, Shape, SymbolFilter, SymbolKind, SymbolPath, TypeFixtures,
    };
    pub use crate::config::CanaryConfig;
    pub use crate::driver::{Canary, DeclarationSource};
    pub use crate::error::{CanaryError, Result};
    pub use crate::probe::{
        Capability, Diagnostic, DriftKind, ProbeConfig, ProbeEngine, ProbeResult, ProbeScope,
        ProbeStatus,
    };
    pub use crate::report::{
        Counts, ExitStatus, OutputFormat, Report, ReportBuilder, RunMetadata, render,
        render_json, render_text,
    };
    pub use crate::statics::{
        Declarations, ExpectedVerdict, Fragment, StaticVerifier, StructuralChecker,
        TypeCheckOutcome, TypeCheckSummary, TypeCheckUnit, TypeChecker, TypeExpr, UnitStatus,
        Verdict,
    };
    pub use crate::surface::{
        Callable, Class, FnCallable, FnClass, Instance, Invocation, MemberInfo, MemberKind,
        PackageMetadata, ReturnKind, Signature, Surface, SurfaceBuilder, SurfaceRegistry, Symbol,
        Thrown, ValueKind,
    };
}
