//! Freshness unit: deprecated installs and installs a major version behind

use async_trait::async_trait;
use futures::future::join_all;
use tracing::debug;
use vine_config::{Installed, ProjectModel};
use vine_core::{Version, VersionReq, VineError};
use vine_registry::RegistryPackage;
use vine_resolver::Severity;

use crate::report::{Finding, Recommendation, UnitReport};
use crate::unit::{AnalysisContext, AnalyzerUnit};

pub const LABEL: &str = "freshness";

#[derive(Debug, Clone, Default)]
pub struct FreshnessUnit;

#[async_trait]
impl AnalyzerUnit for FreshnessUnit {
    fn label(&self) -> &str {
        LABEL
    }

    async fn analyze(&self, context: &AnalysisContext) -> Result<UnitReport, VineError> {
        let declared: Vec<String> = context
            .model
            .declared()
            .into_iter()
            .map(|dep| dep.name)
            .filter(|name| !context.exclusions.is_excluded(name))
            .collect();

        let documents = join_all(declared.iter().map(|name| async move {
            (name.as_str(), context.registry.fetch_package(name).await)
        }))
        .await;

        let mut report = UnitReport::empty();
        for (name, document) in documents {
            let Some(document) = document else {
                debug!(package = name, "no registry data, freshness not checked");
                continue;
            };
            let Some(installed) = installed_version(&context.model, name, &document) else {
                continue;
            };
            check_package(name, &installed, &document, &mut report);
        }
        Ok(report)
    }
}

/// Concrete installed version, or the best guess for a declared range
fn installed_version(model: &ProjectModel, name: &str, document: &RegistryPackage) -> Option<Version> {
    match model.installed(name) {
        Installed::Locked(version) => Some(version),
        Installed::Declared(range) => {
            let req = VersionReq::parse(&range).ok()?;
            req.exact_version().or_else(|| document.select(&req))
        },
        Installed::Unversioned(_) | Installed::NotInstalled | Installed::Unrecorded => None,
    }
}

fn check_package(name: &str, installed: &Version, document: &RegistryPackage, report: &mut UnitReport) {
    if let Some(reason) = document.version(installed).and_then(|meta| meta.deprecation()) {
        report.findings.push(
            Finding::new(
                Severity::Warning,
                LABEL,
                format!("{}@{} is deprecated: {}", name, installed, reason),
            )
            .for_package(name),
        );
        report.recommendations.push(Recommendation::new(
            Some(name),
            format!("Replace {} or upgrade to a supported release", name),
        ));
    }

    let Some(latest) = document.latest() else {
        return;
    };
    if latest.major > installed.major && !latest.is_prerelease() {
        report.findings.push(
            Finding::new(
                Severity::Info,
                LABEL,
                format!(
                    "{} {} is {} major version(s) behind latest {}",
                    name,
                    installed,
                    latest.major - installed.major,
                    latest
                ),
            )
            .for_package(name),
        );
        report.recommendations.push(Recommendation::new(
            Some(name),
            format!("Upgrade {} to {}", name, latest),
        ));
    }
}
