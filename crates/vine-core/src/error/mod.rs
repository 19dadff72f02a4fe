//! Error types and result aliases for Vine operations.
//!
//! Provides a unified error type that covers every failure mode of an
//! analysis run, with actionable suggestions where one exists.

use thiserror::Error;

use crate::types::VersionError;

/// Unified error type for all Vine operations
#[derive(Error, Debug)]
pub enum VineError {
    // Project errors
    #[error("Failed to read manifest {path}: {message}")]
    Manifest { path: String, message: String },

    #[error("Manifest field '{field}' is invalid: {reason}")]
    Validation { field: String, reason: String },

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    // Registry errors
    #[error("Package '{name}' not found in registry")]
    PackageNotFound { name: String },

    #[error("Registry returned status {status} for '{name}'")]
    RegistryStatus { status: u16, name: String },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Version errors
    #[error("Invalid version: {0}")]
    InvalidVersion(#[from] VersionError),

    #[error("Invalid version range '{range}' required by {required_by}")]
    InvalidRange { range: String, required_by: String },

    // Orchestration errors
    #[error("Analyzer '{unit}' failed: {message}")]
    UnitFailed { unit: String, message: String },

    #[error("Analyzer '{unit}' did not finish before the run deadline")]
    Timeout { unit: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for Vine operations
pub type VineResult<T> = Result<T, VineError>;

impl VineError {
    /// Create a network error from any error type
    pub fn network<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Create a manifest error for a file
    pub fn manifest(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Manifest {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a validation error for a manifest field
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error may go away on retry
    pub fn is_transient(&self) -> bool {
        match self {
            VineError::Network { .. } => true,
            VineError::RegistryStatus { status, .. } => {
                *status >= 500 || *status == 429 || *status == 408
            },
            _ => false,
        }
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            VineError::Manifest { .. } => {
                Some("Run vine from a directory containing a valid package.json")
            },
            VineError::Validation { .. } => {
                Some("Add the missing \"name\" and \"version\" fields to package.json")
            },
            VineError::Config { .. } => Some("Check vine.toml and VINE_* environment variables"),
            VineError::PackageNotFound { .. } => {
                Some("Check the package name spelling or the configured registry URL")
            },
            VineError::Network { .. } => {
                Some("Check your internet connection, or re-run with --offline to use cached data")
            },
            VineError::Timeout { .. } => Some("Increase analysis.timeout_secs in vine.toml"),
            _ => None,
        }
    }
}
