//! Concurrent analysis orchestration for Vine
//!
//! Analyzer units (compatibility, freshness, overlap) run concurrently
//! against one shared `AnalysisContext`. The orchestrator isolates unit
//! failures and merges every report into a single `MergedResult` with a
//! health score.

pub mod orchestrator;
pub mod report;
pub mod unit;
pub mod units;

// Re-export main types
pub use orchestrator::{Orchestrator, ProgressEvent, DEFAULT_UNIT_CONCURRENCY};
pub use report::{
    health_score, FailureKind, Finding, MergedResult, Recommendation, UnitFailure, UnitReport,
};
pub use unit::{AnalysisContext, AnalyzerUnit};
pub use units::{default_units, CompatibilityUnit, FreshnessUnit, OverlapUnit};

#[cfg(test)]
pub(crate) mod test_support;
