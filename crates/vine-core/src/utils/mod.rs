//! Utility functions and helpers.
//!
//! Common functionality used across multiple Vine crates.

pub mod name;

// Re-export commonly used utilities
pub use name::{is_valid_package_name, split_scope, validate_package_name};
