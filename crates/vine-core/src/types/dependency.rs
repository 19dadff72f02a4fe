//! Dependency declarations.
//!
//! A `Dependency` is one `name -> range` entry taken from a manifest, a lock
//! entry or registry metadata. The range is kept as written; it is parsed
//! lazily because git, file and tag specifiers are legal in package.json.

use super::{VersionError, VersionReq};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared dependency entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub range: String,
    pub kind: DependencyKind,
    pub optional: bool,
}

/// Manifest section a dependency was declared in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// Runtime dependency (`dependencies`)
    Normal,
    /// Development-only dependency (`devDependencies`)
    Dev,
    /// Peer dependency (must be provided by consumer)
    Peer,
    /// Optional runtime dependency (`optionalDependencies`)
    Optional,
}

impl Dependency {
    /// Create a new normal dependency
    pub fn new(name: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            range: range.into(),
            kind: DependencyKind::Normal,
            optional: false,
        }
    }

    /// Create a development dependency
    pub fn dev(name: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            kind: DependencyKind::Dev,
            ..Self::new(name, range)
        }
    }

    /// Create a peer dependency
    pub fn peer(name: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            kind: DependencyKind::Peer,
            ..Self::new(name, range)
        }
    }

    /// Create an optional runtime dependency
    pub fn optional_runtime(name: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            kind: DependencyKind::Optional,
            optional: true,
            ..Self::new(name, range)
        }
    }

    /// Make this dependency optional
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Parse the declared range
    pub fn version_req(&self) -> Result<VersionReq, VersionError> {
        VersionReq::parse(&self.range)
    }
}

impl DependencyKind {
    /// Check if this dependency is needed at runtime
    pub fn is_runtime(&self) -> bool {
        matches!(self, DependencyKind::Normal | DependencyKind::Optional)
    }

    /// Check if this dependency is only for development
    pub fn is_dev_only(&self) -> bool {
        matches!(self, DependencyKind::Dev)
    }

    /// Check if this dependency must be provided by the consumer
    pub fn is_peer(&self) -> bool {
        matches!(self, DependencyKind::Peer)
    }

    /// The package.json field holding dependencies of this kind
    pub fn manifest_field(&self) -> &'static str {
        match self {
            DependencyKind::Normal => "dependencies",
            DependencyKind::Dev => "devDependencies",
            DependencyKind::Peer => "peerDependencies",
            DependencyKind::Optional => "optionalDependencies",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.manifest_field())
    }
}
