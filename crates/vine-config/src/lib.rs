//! Project and settings loading for Vine
//!
//! This crate turns a project directory into a read-only `ProjectModel`
//! (package.json plus whichever lock file is present) and resolves the
//! layered analysis `Settings` (vine.toml, environment, CLI).

pub mod lockfile;
pub mod manifest;
pub mod model;
pub mod settings;

// Re-export main types
pub use lockfile::{LockEntry, LockFormat, Lockfile};
pub use manifest::{Manifest, Overlap, OverlapPolicy};
pub use model::{Installed, ProjectLoader, ProjectModel};
pub use settings::{
    AnalysisSettings, Depth, RegistrySettings, Settings, SettingsLayering, SettingsLoader,
};

use vine_core::VineError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, VineError>;
