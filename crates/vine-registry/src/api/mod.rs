//! npm registry API response types

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vine_core::{Version, VersionReq};

/// Full package document (`GET /{name}`)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistryPackage {
    /// Package name
    pub name: String,
    /// Package description
    #[serde(default)]
    pub description: Option<String>,
    /// Named versions (`latest`, `next`, ...)
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: HashMap<String, String>,
    /// All versions metadata
    #[serde(default)]
    pub versions: HashMap<String, VersionMetadata>,
}

/// Metadata for a specific package version
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VersionMetadata {
    /// Package name
    #[serde(default)]
    pub name: String,
    /// Version string
    pub version: String,
    /// Package description
    #[serde(default)]
    pub description: Option<String>,
    /// Dependencies
    #[serde(default)]
    pub dependencies: HashMap<String, String>,
    /// Optional dependencies
    #[serde(rename = "optionalDependencies", default)]
    pub optional_dependencies: HashMap<String, String>,
    /// Peer dependencies
    #[serde(rename = "peerDependencies", default)]
    pub peer_dependencies: HashMap<String, String>,
    /// Peer dependency flags
    #[serde(rename = "peerDependenciesMeta", default)]
    pub peer_dependencies_meta: HashMap<String, PeerDependencyMeta>,
    /// Deprecation notice (a message, or `true` on some mirrors)
    #[serde(default)]
    pub deprecated: Option<Value>,
}

/// Entry of `peerDependenciesMeta`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PeerDependencyMeta {
    #[serde(default)]
    pub optional: bool,
}

impl RegistryPackage {
    /// Every published version that parses as semver, ascending
    pub fn published_versions(&self) -> Vec<Version> {
        let mut versions: Vec<Version> = self
            .versions
            .keys()
            .filter_map(|key| key.parse().ok())
            .collect();
        versions.sort();
        versions
    }

    /// Version the `latest` dist-tag points at
    pub fn latest(&self) -> Option<Version> {
        self.dist_tags.get("latest")?.parse().ok()
    }

    /// Highest published version matching `req` (prereleases follow range rules)
    pub fn select(&self, req: &VersionReq) -> Option<Version> {
        req.max_satisfying(&self.published_versions()).cloned()
    }

    /// Metadata for a concrete published version
    pub fn version(&self, version: &Version) -> Option<&VersionMetadata> {
        self.versions.get(&version.to_string()).or_else(|| {
            self.versions
                .iter()
                .find(|(key, _)| key.parse::<Version>().ok().as_ref() == Some(version))
                .map(|(_, meta)| meta)
        })
    }

    /// Resolve a dist-tag or range to the version it selects
    pub fn resolve(&self, spec: &str) -> Option<Version> {
        let spec = spec.trim();
        if let Some(tagged) = self.dist_tags.get(spec) {
            return tagged.parse().ok();
        }
        let req = VersionReq::parse(spec).ok()?;
        self.select(&req)
    }
}

impl VersionMetadata {
    /// Deprecation message, if this version is deprecated
    pub fn deprecation(&self) -> Option<String> {
        match self.deprecated.as_ref()? {
            Value::String(message) if !message.trim().is_empty() => Some(message.clone()),
            Value::Bool(true) => Some("deprecated".to_string()),
            _ => None,
        }
    }

    /// Whether the peer dependency `name` is marked optional
    pub fn is_optional_peer(&self, name: &str) -> bool {
        self.peer_dependencies_meta
            .get(name)
            .map(|meta| meta.optional)
            .unwrap_or(false)
    }
}
