//! Overlap unit: packages declared in more than one manifest section

use async_trait::async_trait;
use vine_core::VineError;
use vine_resolver::Severity;

use crate::report::{Finding, Recommendation, UnitReport};
use crate::unit::{AnalysisContext, AnalyzerUnit};

pub const LABEL: &str = "overlap";

#[derive(Debug, Clone, Default)]
pub struct OverlapUnit;

#[async_trait]
impl AnalyzerUnit for OverlapUnit {
    fn label(&self) -> &str {
        LABEL
    }

    async fn analyze(&self, context: &AnalysisContext) -> Result<UnitReport, VineError> {
        let mut report = UnitReport::empty();

        for overlap in context.model.overlaps() {
            if context.exclusions.is_excluded(&overlap.name) {
                continue;
            }
            let Some(winner) = overlap.declarations.first() else {
                continue;
            };
            let sections: Vec<String> = overlap
                .declarations
                .iter()
                .map(|dep| format!("{} ({})", dep.kind.manifest_field(), dep.range))
                .collect();

            report.findings.push(
                Finding::new(
                    Severity::Warning,
                    LABEL,
                    format!(
                        "{} is declared in {}; using {}",
                        overlap.name,
                        sections.join(", "),
                        winner.kind.manifest_field()
                    ),
                )
                .for_package(&overlap.name),
            );
            report.recommendations.push(Recommendation::new(
                Some(overlap.name.as_str()),
                format!("Declare {} in a single section", overlap.name),
            ));
        }

        Ok(report)
    }
}
