//! Requirement collection
//!
//! Walks the dependency graph outward from the manifest, level by level,
//! turning every declared `dependencies` / `optionalDependencies` /
//! `peerDependencies` entry into a `Requirement`. Each level's registry
//! lookups run concurrently; the registry client's limiter bounds them.

use std::collections::{BTreeSet, HashSet};

use futures::future::join_all;
use glob::Pattern;
use indexmap::IndexMap;
use tracing::{debug, info};
use vine_config::{Depth, Installed, LockEntry, ProjectModel};
use vine_core::VineError;
use vine_registry::{RegistryClient, VersionMetadata};

use crate::requirement::{Requirement, RequirementKind, RequirementTable};
use crate::ResolverResult;

/// Package names or globs that are never analyzed
#[derive(Debug, Clone, Default)]
pub struct Exclusions {
    names: HashSet<String>,
    patterns: Vec<Pattern>,
}

impl Exclusions {
    /// Compile exclusion entries; entries containing glob syntax become patterns
    pub fn new<I, S>(entries: I) -> ResolverResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut exclusions = Self::default();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }
            if entry.contains(['*', '?', '[']) {
                let pattern = Pattern::new(entry).map_err(|e| VineError::Config {
                    message: format!("Invalid exclude pattern '{}': {}", entry, e),
                })?;
                exclusions.patterns.push(pattern);
            } else {
                exclusions.names.insert(entry.to_string());
            }
        }
        Ok(exclusions)
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.names.contains(name) || self.patterns.iter().any(|pattern| pattern.matches(name))
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.patterns.is_empty()
    }
}

/// Which declaration of a package is being expanded
#[derive(Debug, Clone)]
enum Origin {
    /// Dependencies recorded in the lock file
    Lock(LockEntry),
    /// Registry metadata for a version, range or tag
    Registry(String),
}

impl Origin {
    fn key(&self) -> String {
        match self {
            Origin::Lock(entry) => format!("lock:{}", entry.version),
            Origin::Registry(spec) => format!("registry:{}", spec),
        }
    }
}

/// Collects the requirement table for a project
#[derive(Debug, Clone)]
pub struct RequirementCollector {
    registry: RegistryClient,
    exclusions: Exclusions,
}

impl RequirementCollector {
    pub fn new(registry: RegistryClient) -> Self {
        Self {
            registry,
            exclusions: Exclusions::default(),
        }
    }

    /// Skip packages matching these exclusions
    pub fn with_exclusions(mut self, exclusions: Exclusions) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Build the requirement table for `model`, expanding up to `depth`
    pub async fn collect(&self, model: &ProjectModel, depth: Depth) -> RequirementTable {
        let mut table = RequirementTable::new();
        // (package, origin) pairs already expanded
        let mut visited: HashSet<(String, String)> = HashSet::new();
        let mut frontier: BTreeSet<String> = BTreeSet::new();

        for dep in model.declared() {
            if self.exclusions.is_excluded(&dep.name) {
                debug!(package = %dep.name, "excluded from analysis");
                continue;
            }
            frontier.insert(dep.name.clone());
            table.add(
                Requirement::new(&dep.name, &dep.range, model.name(), RequirementKind::Direct)
                    .optional(dep.optional),
            );
        }

        let mut hops = 0;
        while depth.allows(hops) && !frontier.is_empty() {
            let mut jobs = Vec::new();
            for name in &frontier {
                for origin in self.origins(model, name, &table) {
                    if visited.insert((name.clone(), origin.key())) {
                        jobs.push((name.clone(), origin));
                    }
                }
            }
            if jobs.is_empty() {
                break;
            }

            debug!(level = hops, packages = jobs.len(), "expanding requirement level");
            let expansions = join_all(
                jobs.into_iter()
                    .map(|(name, origin)| async move {
                        let requirements = self.expand(&name, origin).await;
                        (name, requirements)
                    }),
            )
            .await;

            let mut next = BTreeSet::new();
            for (name, requirements) in expansions {
                let Some(requirements) = requirements else {
                    table.mark_unverified(name);
                    continue;
                };
                for requirement in requirements {
                    if self.exclusions.is_excluded(&requirement.package) {
                        continue;
                    }
                    next.insert(requirement.package.clone());
                    table.add(requirement);
                }
            }

            frontier = next;
            hops += 1;
        }

        info!(
            packages = table.len(),
            requirements = table.requirements().count(),
            unverified = table.unverified().count(),
            depth = %depth,
            "collected requirements"
        );
        table
    }

    /// Versions of `name` whose declarations should be read
    fn origins(&self, model: &ProjectModel, name: &str, table: &RequirementTable) -> Vec<Origin> {
        let mut origins = self.hoisted_origins(model, name, table);

        // Copies installed privately under a dependent have their own declarations
        if let Some(lockfile) = &model.lockfile {
            for req in table.get(name).iter().filter(|req| req.kind == RequirementKind::Dependency) {
                if let Some(entry) = lockfile.nested_entry(name, &req.required_by) {
                    origins.push(if entry.records_dependencies {
                        Origin::Lock(entry.clone())
                    } else {
                        Origin::Registry(entry.version.clone())
                    });
                }
            }
        }
        origins
    }

    fn hoisted_origins(&self, model: &ProjectModel, name: &str, table: &RequirementTable) -> Vec<Origin> {
        if let Some(entry) = model.lock_entry(name) {
            if entry.records_dependencies {
                return vec![Origin::Lock(entry.clone())];
            }
        }

        match model.installed(name) {
            Installed::Locked(version) => vec![Origin::Registry(version.to_string())],
            Installed::Declared(range) => vec![Origin::Registry(range)],
            Installed::Unversioned(source) => {
                debug!(package = name, %source, "non-registry install, not expanded");
                Vec::new()
            },
            // Best guess: what each hard requirement would pull in
            Installed::NotInstalled | Installed::Unrecorded => {
                let ranges: BTreeSet<&str> = table
                    .get(name)
                    .iter()
                    .filter(|req| !req.optional)
                    .map(|req| req.range.as_str())
                    .collect();
                ranges
                    .into_iter()
                    .map(|range| Origin::Registry(range.to_string()))
                    .collect()
            },
        }
    }

    async fn expand(&self, name: &str, origin: Origin) -> Option<Vec<Requirement>> {
        match origin {
            Origin::Lock(entry) => Some(requirements_from(
                name,
                &entry.dependencies,
                &IndexMap::new(),
                &entry.peer_dependencies,
                |peer| entry.is_optional_peer(peer),
            )),
            Origin::Registry(spec) => {
                let meta = self.registry.fetch_version(name, &spec).await?;
                Some(requirements_from_metadata(name, &meta))
            },
        }
    }
}

fn requirements_from_metadata(name: &str, meta: &VersionMetadata) -> Vec<Requirement> {
    // Registry documents repeat optionalDependencies inside dependencies
    let dependencies: IndexMap<String, String> = meta
        .dependencies
        .iter()
        .filter(|(dep, _)| !meta.optional_dependencies.contains_key(*dep))
        .map(|(dep, range)| (dep.clone(), range.clone()))
        .collect();
    let optional: IndexMap<String, String> = meta
        .optional_dependencies
        .iter()
        .map(|(dep, range)| (dep.clone(), range.clone()))
        .collect();
    let peers: IndexMap<String, String> = meta
        .peer_dependencies
        .iter()
        .map(|(dep, range)| (dep.clone(), range.clone()))
        .collect();

    requirements_from(name, &dependencies, &optional, &peers, |peer| {
        meta.is_optional_peer(peer)
    })
}

fn requirements_from(
    required_by: &str,
    dependencies: &IndexMap<String, String>,
    optional_dependencies: &IndexMap<String, String>,
    peer_dependencies: &IndexMap<String, String>,
    is_optional_peer: impl Fn(&str) -> bool,
) -> Vec<Requirement> {
    let regular = dependencies.iter().map(|(name, range)| {
        Requirement::new(name, range, required_by, RequirementKind::Dependency)
    });
    let optional = optional_dependencies.iter().map(|(name, range)| {
        Requirement::new(name, range, required_by, RequirementKind::Dependency).optional(true)
    });
    let peers = peer_dependencies.iter().map(|(name, range)| {
        Requirement::new(name, range, required_by, RequirementKind::Peer)
            .optional(is_optional_peer(name))
    });

    regular.chain(optional).chain(peers).collect()
}

#[cfg(test)]
mod tests;
