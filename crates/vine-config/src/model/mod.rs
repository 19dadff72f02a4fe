//! Project model: manifest plus lock file, as loaded for one analysis run

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::info;
use vine_core::{Dependency, Version, VineError};

use crate::lockfile::{LockEntry, Lockfile};
use crate::manifest::{load_manifest, Manifest, Overlap, OverlapPolicy};
use crate::ConfigResult;

/// What is installed for a package name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "kebab-case")]
pub enum Installed {
    /// Concrete version from the lock file
    Locked(Version),
    /// Lock entry whose version is not semver (git, file or tarball installs)
    Unversioned(String),
    /// No lock file; the manifest's declared range
    Declared(String),
    /// Not present in the lock file, or declared nowhere in a project
    /// that has a lock file
    NotInstalled,
    /// No lock file and not declared; nothing records whether it is installed
    Unrecorded,
}

impl Installed {
    /// Concrete installed version, if known
    pub fn version(&self) -> Option<&Version> {
        match self {
            Installed::Locked(version) => Some(version),
            _ => None,
        }
    }
}

/// Read-only view of a project for one run
#[derive(Debug, Clone)]
pub struct ProjectModel {
    pub root: Utf8PathBuf,
    pub manifest: Manifest,
    pub lockfile: Option<Lockfile>,
    pub overlap: OverlapPolicy,
    pub include_dev: bool,
}

impl ProjectModel {
    /// Assemble a model from already-parsed parts
    pub fn new(root: impl Into<Utf8PathBuf>, manifest: Manifest, lockfile: Option<Lockfile>) -> Self {
        Self {
            root: root.into(),
            manifest,
            lockfile,
            overlap: OverlapPolicy::default(),
            include_dev: true,
        }
    }

    /// Project name from the manifest
    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    /// One declared dependency per name, overlap resolved by policy
    pub fn declared(&self) -> Vec<Dependency> {
        self.manifest.declared(self.overlap, self.include_dev)
    }

    /// Declaration of `name` that wins under the overlap policy
    pub fn declaration(&self, name: &str) -> Option<Dependency> {
        self.manifest
            .declarations(name, self.overlap)
            .into_iter()
            .find(|dep| self.include_dev || !dep.kind.is_dev_only())
    }

    /// Names declared in several manifest sections
    pub fn overlaps(&self) -> Vec<Overlap> {
        self.manifest.overlaps(self.overlap)
    }

    /// Top-level lock entry for `name`
    pub fn lock_entry(&self, name: &str) -> Option<&LockEntry> {
        self.lockfile.as_ref()?.entry(name)
    }

    /// What is installed for `name`
    pub fn installed(&self, name: &str) -> Installed {
        match &self.lockfile {
            Some(lockfile) => match lockfile.entry(name) {
                Some(entry) => match entry.installed_version() {
                    Some(version) => Installed::Locked(version),
                    None => Installed::Unversioned(entry.version.clone()),
                },
                None => Installed::NotInstalled,
            },
            None => match self.declaration(name) {
                Some(dep) => Installed::Declared(dep.range),
                None => Installed::Unrecorded,
            },
        }
    }

    /// Private copy of `name` that the lock file installs under `dependent`
    pub fn nested_install(&self, name: &str, dependent: &str) -> Option<Installed> {
        let entry = self.lockfile.as_ref()?.nested_entry(name, dependent)?;
        Some(match entry.installed_version() {
            Some(version) => Installed::Locked(version),
            None => Installed::Unversioned(entry.version.clone()),
        })
    }

    pub fn has_lockfile(&self) -> bool {
        self.lockfile.is_some()
    }
}

/// Loads `ProjectModel`s from disk
#[derive(Debug, Clone)]
pub struct ProjectLoader {
    overlap: OverlapPolicy,
    include_dev: bool,
}

impl ProjectLoader {
    pub fn new() -> Self {
        Self {
            overlap: OverlapPolicy::default(),
            include_dev: true,
        }
    }

    /// Set the overlap precedence
    pub fn with_overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }

    /// Include or skip devDependencies
    pub fn with_dev(mut self, include_dev: bool) -> Self {
        self.include_dev = include_dev;
        self
    }

    /// Load manifest and lock file from `project_path`
    ///
    /// Fails if package.json is missing or invalid, or if a lock file exists
    /// but cannot be parsed. A missing lock file is not an error.
    pub async fn load(&self, project_path: impl AsRef<Utf8Path>) -> ConfigResult<ProjectModel> {
        let root = project_path.as_ref();
        if !root.is_dir() {
            return Err(VineError::manifest(
                root.as_str(),
                "project path is not a directory",
            ));
        }

        let manifest = load_manifest(root).await?;
        let lockfile = Lockfile::load(root).await?;

        info!(
            project = %manifest.name,
            lockfile = lockfile.as_ref().map(|lock| lock.path.as_str()).unwrap_or("none"),
            "loaded project"
        );

        Ok(ProjectModel {
            root: root.to_path_buf(),
            manifest,
            lockfile,
            overlap: self.overlap,
            include_dev: self.include_dev,
        })
    }
}

impl Default for ProjectLoader {
    fn default() -> Self {
        Self::new()
    }
}
