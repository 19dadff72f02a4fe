//! Compatibility unit: requirement collection plus conflict classification

use async_trait::async_trait;
use tracing::debug;
use vine_core::VineError;
use vine_resolver::{
    Requirement, RequirementCollector, RequirementGraph, Resolution, Severity, Verdict,
    VersionResolver,
};

use crate::report::{Finding, Recommendation, UnitReport};
use crate::unit::{AnalysisContext, AnalyzerUnit};

pub const LABEL: &str = "compatibility";

/// Checks every requirement in the graph against what is installed
#[derive(Debug, Clone, Default)]
pub struct CompatibilityUnit;

#[async_trait]
impl AnalyzerUnit for CompatibilityUnit {
    fn label(&self) -> &str {
        LABEL
    }

    async fn analyze(&self, context: &AnalysisContext) -> Result<UnitReport, VineError> {
        let table = RequirementCollector::new(context.registry.clone())
            .with_exclusions(context.exclusions.clone())
            .collect(&context.model, context.depth)
            .await;
        let resolutions = VersionResolver::new(context.registry.clone())
            .resolve(&table, &context.model)
            .await;

        let mut report = UnitReport {
            requirements: table.requirements().cloned().collect(),
            ..UnitReport::empty()
        };

        for resolution in &resolutions {
            report.findings.extend(findings_for(resolution));
            report.recommendations.extend(recommendation_for(resolution));
        }

        for cycle in RequirementGraph::from_table(&table).cycles() {
            debug!(cycle = %cycle.display_path(), "requirement cycle");
            let first = cycle.packages.first().cloned().unwrap_or_default();
            report.findings.push(
                Finding::new(
                    Severity::Info,
                    LABEL,
                    format!("dependency cycle: {}", cycle.display_path()),
                )
                .for_package(first),
            );
        }

        report.resolutions = resolutions;
        Ok(report)
    }
}

fn findings_for(resolution: &Resolution) -> Vec<Finding> {
    let package = resolution.package.as_str();
    match resolution.verdict {
        // Satisfied packages only surface their warnings (unmet optional peers and the like)
        Verdict::Satisfied => resolution
            .notes
            .iter()
            .filter(|note| note.severity == Severity::Warning)
            .map(|note| Finding::new(Severity::Warning, LABEL, &note.message).for_package(package))
            .collect(),
        Verdict::Missing => vec![Finding::new(
            Severity::Error,
            LABEL,
            format!("{} is required by {} but not installed", package, origins(resolution)),
        )
        .for_package(package)],
        Verdict::Conflicting => {
            let wanted: Vec<String> = resolution
                .requirements
                .iter()
                .filter(|req| !req.optional)
                .map(|req| format!("{} wants {}", req.required_by, req.range))
                .collect();
            let installed = resolution
                .installed
                .version()
                .map(|version| format!(" (installed {})", version))
                .unwrap_or_default();
            vec![Finding::new(
                Severity::Error,
                LABEL,
                format!("conflicting requirements on {}{}: {}", package, installed, wanted.join(", ")),
            )
            .for_package(package)]
        },
        Verdict::Unknown => vec![Finding::new(
            Severity::Warning,
            LABEL,
            format!("could not verify {}", package),
        )
        .for_package(package)],
    }
}

fn recommendation_for(resolution: &Resolution) -> Option<Recommendation> {
    let package = resolution.package.as_str();
    match resolution.verdict {
        Verdict::Satisfied => None,
        Verdict::Missing => {
            let range = hard_ranges(&resolution.requirements).join(" ");
            Some(Recommendation::new(
                Some(package),
                format!("Install {}@\"{}\"", package, range),
            ))
        },
        Verdict::Conflicting => Some(Recommendation::new(
            Some(package),
            format!(
                "Align the packages requiring {} ({}) on one major version",
                package,
                origins(resolution)
            ),
        )),
        Verdict::Unknown => Some(Recommendation::new(
            Some(package),
            format!(
                "Re-run with registry access or a lock file to verify {}",
                package
            ),
        )),
    }
}

fn origins(resolution: &Resolution) -> String {
    resolution
        .required_by()
        .into_iter()
        .collect::<Vec<_>>()
        .join(", ")
}

fn hard_ranges(requirements: &[Requirement]) -> Vec<&str> {
    let mut ranges: Vec<&str> = requirements
        .iter()
        .filter(|req| !req.optional)
        .map(|req| req.range.as_str())
        .collect();
    ranges.sort_unstable();
    ranges.dedup();
    ranges
}
