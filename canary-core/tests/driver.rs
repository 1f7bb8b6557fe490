//! End-to-end runs through the driver

use canary_core::prelude::*;
use canary_core::statics::{FieldDecl, TypeDecl};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

fn declarations(server_name_optional: bool) -> Declarations {
    let mut decls = Declarations::new("demo", "2.0.0");
    let mut fields = BTreeMap::new();
    fields.insert(
        "server_name".to_string(),
        FieldDecl {
            ty: TypeExpr::String,
            optional: server_name_optional,
        },
    );
    decls
        .module_mut("config")
        .types
        .insert("Settings".into(), TypeDecl::Struct { fields });
    decls
}

fn surface(with_declarations: Option<Declarations>) -> Arc<dyn Surface> {
    let mut builder = SurfaceBuilder::new("demo", "2.0.0").function(
        "config",
        "settings",
        Signature::new(ReturnKind::Value),
        |_| Invocation::value(json!({ "server_name": "demo" })),
    );
    if let Some(decls) = with_declarations {
        builder = builder.declarations(decls);
    }
    Arc::new(builder.build())
}

fn registry(with_declarations: bool) -> SurfaceRegistry {
    SurfaceRegistry::new().install("demo", move || {
        Ok(surface(with_declarations.then(|| declarations(false))))
    })
}

fn catalog() -> Catalog {
    Catalog::builder("demo", "2.0.0")
        .entry(
            ContractEntry::new(SymbolPath::new("config", "settings"), SymbolKind::Function)
                .with_shape(Shape::new().with_params(vec![]).with_returns(ReturnKind::Value))
                .with_assertion(BehaviorAssertion::new(
                    "has server name",
                    Action::call(vec![]),
                    Expectation::returns(Predicate::HasFields(vec!["server_name".into()])),
                )),
        )
        .entry(
            ContractEntry::new(SymbolPath::new("config", "Settings"), SymbolKind::Type)
                .with_shape(Shape::new().with_field(FieldExpectation::required("server_name"))),
        )
        .build()
        .unwrap()
}

fn fixtures() -> TypeFixtures {
    TypeFixtures::new(vec![TypeCheckUnit::must_compile(
        "settings-server-name-required",
        "consumers read server_name without a null check",
        Fragment::ReadField {
            target: "config:Settings".into(),
            field: "server_name".into(),
            guarded: false,
            bind: TypeExpr::String,
        },
    )])
    .unwrap()
}

fn config() -> CanaryConfig {
    CanaryConfig {
        dependency: "demo".into(),
        ..CanaryConfig::default()
    }
}

#[tokio::test]
async fn test_full_coverage_run() {
    let report = Canary::new(registry(true), catalog(), fixtures())
        .with_config(config())
        .run()
        .await
        .unwrap();

    assert!(report.is_green());
    assert!(report.has_full_coverage());
    assert_eq!(report.dependency_version(), "2.0.0");
    assert_eq!(report.metadata.baseline_version, "2.0.0");
    assert_eq!(report.metadata.catalog_fingerprint, catalog().fingerprint());
    assert_eq!(report.exit_status(true), ExitStatus::Green);
    assert!(render_text(&report).ends_with("3 passed, 0 failed, 0 skipped, dependencyVersion=2.0.0\n"));
}

#[tokio::test]
async fn test_missing_declarations_skip_but_stay_green() {
    let report = Canary::new(registry(false), catalog(), fixtures())
        .with_config(config())
        .run()
        .await
        .unwrap();

    assert_eq!(report.results.len(), 2);
    assert!(report.results[0].passed());
    assert!(report.results[1].skipped());
    assert_eq!(report.type_checks.skipped(), 1);

    assert!(report.is_green());
    assert!(!report.has_full_coverage());
    assert_eq!(report.exit_status(false), ExitStatus::Green);
    assert_eq!(report.exit_status(true), ExitStatus::Regression);

    let text = render_text(&report);
    assert!(text.contains("config:Settings  ○  skipped: no type declarations available"));
    assert!(text.contains("1 passed, 0 failed, 2 skipped, dependencyVersion=2.0.0"));
}

#[tokio::test]
async fn test_no_declarations_flag_overrides_shipped() {
    let config = CanaryConfig {
        no_declarations: true,
        ..config()
    };
    let report = Canary::new(registry(true), catalog(), fixtures())
        .with_config(config)
        .run()
        .await
        .unwrap();

    assert_eq!(report.counts().skipped, 2);
}

#[tokio::test]
async fn test_declarations_override_detects_loosened_field() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("declarations.json");
    std::fs::write(&path, serde_json::to_string(&declarations(true)).unwrap()).unwrap();

    let config = CanaryConfig {
        declarations: Some(path),
        ..config()
    };
    let report = Canary::new(registry(true), catalog(), fixtures())
        .with_config(config)
        .run()
        .await
        .unwrap();

    assert!(!report.is_green());
    assert_eq!(report.type_checks.diverged(), 1);
    assert_eq!(
        report.results[1].first_failure(),
        Some("field `server_name` expected required, declared optional")
    );
    assert_eq!(report.exit_status(false).code(), 1);
}

#[tokio::test]
async fn test_unreadable_declarations_is_infrastructure_error() {
    let config = CanaryConfig {
        declarations: Some("/nonexistent/declarations.json".into()),
        ..config()
    };
    let err = Canary::new(registry(true), catalog(), fixtures())
        .with_config(config)
        .run()
        .await
        .unwrap_err();
    assert!(err.is_infrastructure());
}

#[tokio::test]
async fn test_unknown_dependency_is_infrastructure_error() {
    let config = CanaryConfig {
        dependency: "not-installed".into(),
        ..config()
    };
    let err = Canary::new(registry(true), catalog(), fixtures())
        .with_config(config)
        .run()
        .await
        .unwrap_err();

    assert!(err.is_infrastructure());
    assert!(err.to_string().contains("not-installed"));
}

#[tokio::test]
async fn test_catalog_for_another_package_is_infrastructure_error() {
    let other = Catalog::builder("other", "1.0.0").build().unwrap();
    let err = Canary::new(registry(true), other, TypeFixtures::default())
        .with_config(config())
        .run()
        .await
        .unwrap_err();
    assert!(err.is_infrastructure());
}

#[tokio::test]
async fn test_filter_narrows_run() {
    let config = CanaryConfig {
        filter: Some("^config:settings$".into()),
        ..config()
    };
    let report = Canary::new(registry(true), catalog(), fixtures())
        .with_config(config)
        .run()
        .await
        .unwrap();

    assert_eq!(report.results.len(), 1);
    assert!(report.type_checks.outcomes.is_empty());
}

#[tokio::test]
async fn test_invalid_filter_is_usage_error() {
    let config = CanaryConfig {
        filter: Some("(unclosed".into()),
        ..config()
    };
    let err = Canary::new(registry(true), catalog(), fixtures())
        .with_config(config)
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, CanaryError::Filter(_)));
    assert!(!err.is_infrastructure());
}
