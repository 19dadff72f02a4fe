//! Analyzer unit trait and the shared context units run against

use async_trait::async_trait;
use vine_config::{Depth, ProjectModel};
use vine_core::VineError;
use vine_registry::RegistryClient;
use vine_resolver::Exclusions;

use crate::report::UnitReport;

/// Read-only inputs shared by every unit in a run
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub model: ProjectModel,
    /// Shared client; all units draw from its request limiter and cache
    pub registry: RegistryClient,
    pub depth: Depth,
    pub exclusions: Exclusions,
}

impl AnalysisContext {
    pub fn new(model: ProjectModel, registry: RegistryClient) -> Self {
        Self {
            model,
            registry,
            depth: Depth::default(),
            exclusions: Exclusions::default(),
        }
    }

    pub fn with_depth(mut self, depth: Depth) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_exclusions(mut self, exclusions: Exclusions) -> Self {
        self.exclusions = exclusions;
        self
    }
}

/// One independent piece of analysis
#[async_trait]
pub trait AnalyzerUnit: Send + Sync {
    /// Short stable name used in findings, progress events and failures
    fn label(&self) -> &str;

    async fn analyze(&self, context: &AnalysisContext) -> Result<UnitReport, VineError>;
}
