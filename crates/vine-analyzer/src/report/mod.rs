//! Unit reports, merged results and the health score

use serde::{Deserialize, Serialize};
use vine_resolver::{Requirement, Resolution, Severity};

/// Score of a project with no findings
pub const MAX_SCORE: u8 = 100;
const ERROR_PENALTY: i64 = 10;
const WARNING_PENALTY: i64 = 3;

/// A single observation about the project
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    /// Package the finding is about, if any
    pub package: Option<String>,
    /// Unit that produced it
    pub unit: String,
    pub message: String,
}

impl Finding {
    pub fn new(severity: Severity, unit: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            package: None,
            unit: unit.into(),
            message: message.into(),
        }
    }

    pub fn for_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }
}

/// Suggested follow-up action
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Recommendation {
    pub package: Option<String>,
    pub message: String,
}

impl Recommendation {
    pub fn new(package: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            package: package.map(str::to_string),
            message: message.into(),
        }
    }
}

/// Everything one analyzer unit produced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitReport {
    pub requirements: Vec<Requirement>,
    pub resolutions: Vec<Resolution>,
    pub findings: Vec<Finding>,
    pub recommendations: Vec<Recommendation>,
}

impl UnitReport {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
            && self.resolutions.is_empty()
            && self.findings.is_empty()
            && self.recommendations.is_empty()
    }
}

/// How a unit failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Error,
    Panic,
    Timeout,
}

/// A unit that contributed nothing because it failed
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitFailure {
    pub unit: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Combined output of every unit in a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedResult {
    pub requirements: Vec<Requirement>,
    pub resolutions: Vec<Resolution>,
    pub findings: Vec<Finding>,
    pub recommendations: Vec<Recommendation>,
    pub failures: Vec<UnitFailure>,
    pub score: u8,
}

impl MergedResult {
    /// Merge reports in any order; the result only depends on their contents
    pub fn merge(reports: impl IntoIterator<Item = UnitReport>, failures: Vec<UnitFailure>) -> Self {
        let mut merged = Self {
            failures,
            ..Self::default()
        };
        for report in reports {
            merged.requirements.extend(report.requirements);
            merged.resolutions.extend(report.resolutions);
            merged.findings.extend(report.findings);
            merged.recommendations.extend(report.recommendations);
        }

        merged.requirements.sort();
        merged.requirements.dedup();

        merged
            .resolutions
            .sort_by(|a, b| (&a.package, a.verdict).cmp(&(&b.package, b.verdict)));
        merged.resolutions.dedup();

        merged.findings.sort();
        merged.findings.dedup();

        merged.recommendations.sort();
        merged
            .recommendations
            .dedup_by(|a, b| a.message == b.message && a.package == b.package);

        merged.failures.sort();
        merged.failures.dedup();

        merged.score = health_score(&merged.findings);
        merged
    }

    /// Number of findings at `severity`
    pub fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|finding| finding.severity == severity)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }
}

/// `100 - 10 * errors - 3 * warnings`, clamped to 0..=100
pub fn health_score(findings: &[Finding]) -> u8 {
    let penalty: i64 = findings
        .iter()
        .map(|finding| match finding.severity {
            Severity::Error => ERROR_PENALTY,
            Severity::Warning => WARNING_PENALTY,
            Severity::Info => 0,
        })
        .sum();
    (i64::from(MAX_SCORE) - penalty).clamp(0, i64::from(MAX_SCORE)) as u8
}
