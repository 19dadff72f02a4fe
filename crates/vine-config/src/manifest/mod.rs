//! package.json parsing and validation

use camino::Utf8Path;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use vine_core::utils::validate_package_name;
use vine_core::{Dependency, DependencyKind, VineError};

use crate::ConfigResult;

/// The dependency-relevant subset of a package.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Package name (required)
    pub name: String,
    /// Package version (required)
    pub version: String,
    /// Runtime dependencies
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,
    /// Development dependencies
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: IndexMap<String, String>,
    /// Peer dependencies
    #[serde(default, rename = "peerDependencies")]
    pub peer_dependencies: IndexMap<String, String>,
    /// Optional dependencies
    #[serde(default, rename = "optionalDependencies")]
    pub optional_dependencies: IndexMap<String, String>,
    /// Peer dependencies flagged optional in `peerDependenciesMeta`
    #[serde(default, rename = "optionalPeers")]
    pub optional_peers: Vec<String>,
}

/// Which manifest section wins when a name is declared in several
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapPolicy {
    /// dependencies > optionalDependencies > peerDependencies > devDependencies
    #[default]
    PreferRuntime,
    /// devDependencies > dependencies > optionalDependencies > peerDependencies
    PreferDevelopment,
}

/// A name declared in more than one manifest section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overlap {
    pub name: String,
    /// Every declaration, winner first
    pub declarations: Vec<Dependency>,
}

impl OverlapPolicy {
    /// Section order from most to least preferred
    pub fn precedence(&self) -> [DependencyKind; 4] {
        match self {
            OverlapPolicy::PreferRuntime => [
                DependencyKind::Normal,
                DependencyKind::Optional,
                DependencyKind::Peer,
                DependencyKind::Dev,
            ],
            OverlapPolicy::PreferDevelopment => [
                DependencyKind::Dev,
                DependencyKind::Normal,
                DependencyKind::Optional,
                DependencyKind::Peer,
            ],
        }
    }
}

impl std::str::FromStr for OverlapPolicy {
    type Err = VineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "prefer-runtime" | "runtime" => Ok(OverlapPolicy::PreferRuntime),
            "prefer-development" | "development" | "dev" => Ok(OverlapPolicy::PreferDevelopment),
            other => Err(VineError::Config {
                message: format!("Unknown overlap policy '{}'", other),
            }),
        }
    }
}

impl Manifest {
    /// Map of declared ranges for one section
    pub fn section(&self, kind: DependencyKind) -> &IndexMap<String, String> {
        match kind {
            DependencyKind::Normal => &self.dependencies,
            DependencyKind::Dev => &self.dev_dependencies,
            DependencyKind::Peer => &self.peer_dependencies,
            DependencyKind::Optional => &self.optional_dependencies,
        }
    }

    /// Every declaration of `name`, ordered by `policy`
    pub fn declarations(&self, name: &str, policy: OverlapPolicy) -> Vec<Dependency> {
        policy
            .precedence()
            .iter()
            .filter_map(|&kind| {
                let range = self.section(kind).get(name)?;
                Some(self.dependency(name, range, kind))
            })
            .collect()
    }

    /// One declaration per name, the winner under `policy`
    pub fn declared(&self, policy: OverlapPolicy, include_dev: bool) -> Vec<Dependency> {
        let mut seen = std::collections::HashSet::new();
        let mut declared = Vec::new();

        for kind in policy.precedence() {
            if kind == DependencyKind::Dev && !include_dev {
                continue;
            }
            for (name, range) in self.section(kind) {
                if seen.insert(name.as_str()) {
                    declared.push(self.dependency(name, range, kind));
                }
            }
        }

        declared.sort_by(|a, b| a.name.cmp(&b.name));
        declared
    }

    /// Names declared in more than one section
    pub fn overlaps(&self, policy: OverlapPolicy) -> Vec<Overlap> {
        let mut names: Vec<&String> = [
            DependencyKind::Normal,
            DependencyKind::Dev,
            DependencyKind::Peer,
            DependencyKind::Optional,
        ]
        .iter()
        .flat_map(|&kind| self.section(kind).keys())
        .collect();
        names.sort();
        names.dedup();

        names
            .into_iter()
            .filter_map(|name| {
                let declarations = self.declarations(name, policy);
                (declarations.len() > 1).then(|| Overlap {
                    name: name.clone(),
                    declarations,
                })
            })
            .collect()
    }

    fn dependency(&self, name: &str, range: &str, kind: DependencyKind) -> Dependency {
        let optional = match kind {
            DependencyKind::Optional => true,
            DependencyKind::Peer => self.optional_peers.iter().any(|peer| peer == name),
            _ => false,
        };
        Dependency {
            name: name.to_string(),
            range: range.to_string(),
            kind,
            optional,
        }
    }
}

/// Parse and validate package.json content
pub fn parse_manifest(content: &str, path: &Utf8Path) -> ConfigResult<Manifest> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| VineError::manifest(path.as_str(), format!("JSON parsing error: {}", e)))?;

    let object = value
        .as_object()
        .ok_or_else(|| VineError::manifest(path.as_str(), "expected a JSON object"))?;

    let name = required_string(object, "name")?;
    validate_package_name(&name).map_err(|reason| VineError::validation("name", reason))?;
    let version = required_string(object, "version")?;

    let optional_peers = object
        .get("peerDependenciesMeta")
        .and_then(Value::as_object)
        .map(|meta| {
            meta.iter()
                .filter(|(_, flags)| flags.get("optional").and_then(Value::as_bool) == Some(true))
                .map(|(name, _)| name.clone())
                .collect()
        })
        .unwrap_or_default();

    Ok(Manifest {
        name,
        version,
        dependencies: string_map(object, "dependencies", path),
        dev_dependencies: string_map(object, "devDependencies", path),
        peer_dependencies: string_map(object, "peerDependencies", path),
        optional_dependencies: string_map(object, "optionalDependencies", path),
        optional_peers,
    })
}

/// Load package.json from a project directory
pub async fn load_manifest(project_root: &Utf8Path) -> ConfigResult<Manifest> {
    let path = project_root.join("package.json");
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(VineError::manifest(path.as_str(), "package.json not found"));
        },
        Err(e) => return Err(VineError::manifest(path.as_str(), e.to_string())),
    };
    parse_manifest(&content, &path)
}

fn required_string(object: &Map<String, Value>, field: &str) -> ConfigResult<String> {
    match object.get(field) {
        Some(Value::String(value)) if !value.trim().is_empty() => Ok(value.clone()),
        Some(Value::String(_)) => Err(VineError::validation(field, "must not be empty")),
        Some(_) => Err(VineError::validation(field, "must be a string")),
        None => Err(VineError::validation(field, "is required")),
    }
}

fn string_map(object: &Map<String, Value>, field: &str, path: &Utf8Path) -> IndexMap<String, String> {
    let Some(section) = object.get(field) else {
        return IndexMap::new();
    };
    let Some(entries) = section.as_object() else {
        warn!(manifest = %path, field, "dependency section is not an object, ignoring it");
        return IndexMap::new();
    };

    entries
        .iter()
        .filter_map(|(name, range)| match range.as_str() {
            Some(range) => Some((name.clone(), range.trim().to_string())),
            None => {
                warn!(manifest = %path, field, package = %name, "non-string range, ignoring it");
                None
            },
        })
        .collect()
}
