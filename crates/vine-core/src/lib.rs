//! # vine-core
//!
//! Core types and utilities shared across all Vine crates.
//!
//! This crate provides:
//! - Version and VersionReq types following npm range semantics
//! - Dependency and DependencyKind types for manifest entries
//! - VineError enum for unified error handling
//! - Package name helpers
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (Version, VersionReq, Dependency)
//! - `error`: Error types and result aliases
//! - `utils`: Utility functions and helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{VineError, VineResult};
pub use types::{Dependency, DependencyKind, Version, VersionReq};
