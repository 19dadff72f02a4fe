//! Unit tests for the built-in analyzer units

use super::*;

use serde_json::json;
use vine_resolver::{Severity, Verdict};
use wiremock::MockServer;

use crate::orchestrator::Orchestrator;
use crate::test_support::{app_manifest, client_at, mount_document, offline_context, project};
use crate::unit::AnalysisContext;

async fn mount_conflict_registry(server: &MockServer) {
    mount_document(
        server,
        json!({
            "name": "pkg-a",
            "dist-tags": { "latest": "2.0.0" },
            "versions": {
                "1.0.0": {
                    "name": "pkg-a",
                    "version": "1.0.0",
                    "peerDependencies": { "core": "^2.0.0" },
                    "deprecated": "pkg-a 1.x is no longer maintained"
                },
                "2.0.0": {
                    "name": "pkg-a",
                    "version": "2.0.0",
                    "peerDependencies": { "core": "^3.0.0" }
                }
            }
        }),
    )
    .await;
    mount_document(
        server,
        json!({
            "name": "pkg-b",
            "dist-tags": { "latest": "1.0.0" },
            "versions": {
                "1.0.0": {
                    "name": "pkg-b",
                    "version": "1.0.0",
                    "peerDependencies": { "core": "^3.0.0" }
                }
            }
        }),
    )
    .await;
    mount_document(
        server,
        json!({
            "name": "core",
            "dist-tags": { "latest": "3.1.0" },
            "versions": {
                "2.0.0": { "name": "core", "version": "2.0.0" },
                "2.5.0": { "name": "core", "version": "2.5.0" },
                "3.0.0": { "name": "core", "version": "3.0.0" },
                "3.1.0": { "name": "core", "version": "3.1.0" }
            }
        }),
    )
    .await;
}

fn conflict_context(server: &MockServer) -> AnalysisContext {
    let model = project(
        json!({
            "name": "app",
            "version": "1.0.0",
            "dependencies": { "pkg-a": "^1.0.0", "pkg-b": "^1.0.0" },
            "devDependencies": { "pkg-a": "^1.0.0" }
        }),
        Some(json!({ "pkg-a": "1.0.0", "pkg-b": "1.0.0" })),
    );
    AnalysisContext::new(model, client_at(&server.uri()))
}

#[tokio::test]
async fn test_compatibility_unit_reports_conflict() {
    let server = MockServer::start().await;
    mount_conflict_registry(&server).await;

    let report = CompatibilityUnit.analyze(&conflict_context(&server)).await.unwrap();

    let core = report.resolutions.iter().find(|r| r.package == "core").unwrap();
    assert_eq!(core.verdict, Verdict::Conflicting);

    let errors: Vec<_> = report
        .findings
        .iter()
        .filter(|f| f.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].package.as_deref(), Some("core"));
    assert!(errors[0].message.contains("pkg-a wants ^2.0.0"));
    assert!(report.recommendations.iter().any(|r| r.package.as_deref() == Some("core")));
    assert!(report.requirements.iter().any(|r| r.package == "core" && r.required_by == "pkg-b"));
}

#[tokio::test]
async fn test_freshness_unit() {
    let server = MockServer::start().await;
    mount_conflict_registry(&server).await;

    let report = FreshnessUnit.analyze(&conflict_context(&server)).await.unwrap();

    let pkg_a: Vec<Severity> = report
        .findings
        .iter()
        .filter(|f| f.package.as_deref() == Some("pkg-a"))
        .map(|f| f.severity)
        .collect();
    assert_eq!(pkg_a.len(), 2);
    assert!(pkg_a.contains(&Severity::Warning));
    assert!(pkg_a.contains(&Severity::Info));
    assert!(!report.findings.iter().any(|f| f.package.as_deref() == Some("pkg-b")));
}

#[tokio::test]
async fn test_freshness_without_registry_is_empty() {
    let context = offline_context(app_manifest(json!({ "left-pad": "^1.0.0" })), None);
    let report = FreshnessUnit.analyze(&context).await.unwrap();
    assert!(report.is_empty());
}

#[tokio::test]
async fn test_overlap_unit() {
    let context = offline_context(
        json!({
            "name": "app",
            "version": "1.0.0",
            "dependencies": { "react": "^18.0.0", "left-pad": "^1.0.0" },
            "devDependencies": { "react": "^18.2.0" }
        }),
        None,
    );

    let report = OverlapUnit.analyze(&context).await.unwrap();

    assert_eq!(report.findings.len(), 1);
    let finding = &report.findings[0];
    assert_eq!(finding.severity, Severity::Warning);
    assert_eq!(finding.package.as_deref(), Some("react"));
    assert!(finding.message.contains("using dependencies"));
    assert_eq!(report.recommendations.len(), 1);
}

#[tokio::test]
async fn test_unreachable_registry_is_a_warning() {
    let context = offline_context(app_manifest(json!({ "left-pad": "^1.0.0" })), None);
    let report = CompatibilityUnit.analyze(&context).await.unwrap();

    assert_eq!(report.resolutions.len(), 1);
    assert_eq!(report.resolutions[0].verdict, Verdict::Unknown);
    assert!(report.findings.iter().all(|f| f.severity == Severity::Warning));
}

#[tokio::test]
async fn test_full_run() {
    let server = MockServer::start().await;
    mount_conflict_registry(&server).await;

    let merged = Orchestrator::new(conflict_context(&server))
        .run(default_units())
        .await;

    assert!(merged.failures.is_empty());
    // core conflict, pkg-a deprecated, pkg-a overlap
    assert_eq!(merged.count(Severity::Error), 1);
    assert_eq!(merged.count(Severity::Warning), 2);
    assert_eq!(merged.score, 84);
    assert!(merged.has_errors());
}
