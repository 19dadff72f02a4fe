//! Requirement collection and conflict classification for Vine
//!
//! The collector walks a project's dependency graph into a `RequirementTable`;
//! the resolver checks every package's requirements against what is installed
//! and classifies the outcome.

pub mod collect;
pub mod graph;
pub mod requirement;
pub mod resolve;
pub mod semver;

// Re-export main types
pub use collect::{Exclusions, RequirementCollector};
pub use graph::{Cycle, RequirementEdge, RequirementGraph};
pub use requirement::{Requirement, RequirementKind, RequirementTable};
pub use resolve::{
    classify, InstalledState, InstalledVersion, Note, PackageEvidence, Resolution, Selection,
    Severity, Verdict, VersionResolver,
};
pub use semver::VersionSelector;
pub use vine_config::Depth;

use vine_core::VineError;

/// Result type for resolver operations
pub type ResolverResult<T> = Result<T, VineError>;

#[cfg(test)]
pub(crate) mod test_support;
