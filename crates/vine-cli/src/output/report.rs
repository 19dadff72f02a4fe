//! Human-readable rendering of a merged analysis result.

use std::fmt::Write;

use camino::Utf8Path;
use vine_analyzer::{MergedResult, UnitFailure};
use vine_resolver::{InstalledVersion, Resolution, Severity, Verdict};

use super::colors::ColorSupport;

/// Renders a `MergedResult` as terminal text
pub struct ReportRenderer {
    colors: ColorSupport,
}

impl ReportRenderer {
    pub fn new(colors: ColorSupport) -> Self {
        Self { colors }
    }

    pub fn render(&self, root: &Utf8Path, result: &MergedResult) -> String {
        let mut out = String::new();
        self.header(&mut out, root, result);

        for severity in [Severity::Error, Severity::Warning, Severity::Info] {
            self.findings(&mut out, result, severity);
        }

        let attention: Vec<&Resolution> = result
            .resolutions
            .iter()
            .filter(|resolution| resolution.verdict != Verdict::Satisfied)
            .collect();
        if !attention.is_empty() {
            let _ = writeln!(out, "\n{}", self.colors.bold("Needs attention"));
            for resolution in attention {
                self.resolution(&mut out, resolution);
            }
        }

        if !result.recommendations.is_empty() {
            let _ = writeln!(out, "\n{}", self.colors.bold("Recommendations"));
            for recommendation in &result.recommendations {
                let _ = writeln!(out, "  → {}", recommendation.message);
            }
        }

        if !result.failures.is_empty() {
            let _ = writeln!(out, "\n{}", self.colors.bold("Incomplete analysis"));
            for failure in &result.failures {
                self.failure(&mut out, failure);
            }
        }

        if result.findings.is_empty() && result.failures.is_empty() {
            let _ = writeln!(out, "\n{} No dependency issues found", self.colors.green("✓"));
        }

        out
    }

    fn header(&self, out: &mut String, root: &Utf8Path, result: &MergedResult) {
        let score = format!("{}/100", result.score);
        let score = match result.score {
            90..=100 => self.colors.green(&score),
            60..=89 => self.colors.yellow(&score),
            _ => self.colors.red(&score),
        };
        let _ = writeln!(out, "{} {}", self.colors.bold("vine check"), root);
        let _ = writeln!(
            out,
            "Health score: {} ({} checked, {} error(s), {} warning(s))",
            score,
            result.resolutions.len(),
            result.count(Severity::Error),
            result.count(Severity::Warning)
        );
    }

    fn findings(&self, out: &mut String, result: &MergedResult, severity: Severity) {
        let findings: Vec<_> = result
            .findings
            .iter()
            .filter(|finding| finding.severity == severity)
            .collect();
        if findings.is_empty() {
            return;
        }

        let (title, marker) = match severity {
            Severity::Error => ("Errors", "✗"),
            Severity::Warning => ("Warnings", "⚠"),
            Severity::Info => ("Info", "•"),
        };
        let _ = writeln!(out, "\n{}", self.colors.bold(title));
        for finding in findings {
            let _ = writeln!(
                out,
                "  {} {} {}",
                self.colors.severity(severity, marker),
                finding.message,
                self.colors.dim(&format!("[{}]", finding.unit))
            );
        }
    }

    fn resolution(&self, out: &mut String, resolution: &Resolution) {
        let installed = match &resolution.installed {
            InstalledVersion::Locked { version } => format!("installed {}", version),
            InstalledVersion::BestGuess { range, version } => {
                format!("probably {} from {}", version, range)
            },
            InstalledVersion::Absent => "not installed".to_string(),
            InstalledVersion::Unknown { detail } => format!("unknown: {}", detail),
        };
        let verdict = resolution.verdict.to_string();
        let _ = writeln!(
            out,
            "  {} {} ({})",
            resolution.package,
            self.colors.verdict(resolution.verdict, &verdict),
            installed
        );

        for selection in &resolution.selections {
            let picked = selection
                .version
                .as_ref()
                .map_or_else(|| "no match".to_string(), |version| version.to_string());
            let _ = writeln!(
                out,
                "    {} wants {} → {}",
                selection.required_by, selection.range, picked
            );
        }
        for note in &resolution.notes {
            let _ = writeln!(
                out,
                "    {}: {}",
                self.colors.severity(note.severity, &note.severity.to_string()),
                note.message
            );
        }
    }

    fn failure(&self, out: &mut String, failure: &UnitFailure) {
        let kind = format!("{:?}", failure.kind).to_lowercase();
        let _ = writeln!(
            out,
            "  {} {} ({}): {}",
            self.colors.yellow("!"),
            failure.unit,
            kind,
            failure.message
        );
    }
}
