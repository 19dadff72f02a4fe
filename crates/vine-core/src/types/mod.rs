//! Core data types shared by the Vine crates.
//!
//! - Version types with npm range semantics
//! - Dependency declarations

pub mod dependency;
pub mod version;

// Re-export all public types
pub use dependency::{Dependency, DependencyKind};
pub use version::{
    Comparator, ComparatorSet, Op, PartialVersion, Version, VersionError, VersionReq,
};
