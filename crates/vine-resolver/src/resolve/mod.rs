//! Version resolution and conflict classification
//!
//! Every package in the requirement table gets exactly one `Resolution`.
//! Registry data is gathered first (concurrently, through the shared
//! client); classification itself is pure and runs in parallel.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vine_config::{Installed, ProjectModel};
use vine_core::{Version, VersionReq};
use vine_registry::{RegistryClient, RegistryPackage};

use crate::requirement::{Requirement, RequirementKind, RequirementTable};
use crate::semver::VersionSelector;

/// Outcome for one package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Satisfied,
    Missing,
    Conflicting,
    /// The data needed to decide could not be obtained
    Unknown,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Satisfied => write!(f, "satisfied"),
            Verdict::Missing => write!(f, "missing"),
            Verdict::Conflicting => write!(f, "conflicting"),
            Verdict::Unknown => write!(f, "unknown"),
        }
    }
}

/// How bad a note is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A message attached to a resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Note {
    pub severity: Severity,
    pub message: String,
}

impl Note {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

/// Version the resolver compared requirements against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "kebab-case")]
pub enum InstalledVersion {
    /// Concrete version from the lock file
    Locked { version: Version },
    /// Highest published version satisfying the declared range (no lock file)
    BestGuess { range: String, version: Version },
    /// Nothing installed
    Absent,
    /// Installed, but no concrete version could be determined
    Unknown { detail: String },
}

impl InstalledVersion {
    /// Concrete version, if one is known or guessed
    pub fn version(&self) -> Option<&Version> {
        match self {
            InstalledVersion::Locked { version } | InstalledVersion::BestGuess { version, .. } => {
                Some(version)
            },
            _ => None,
        }
    }
}

/// What one requirement selected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub required_by: String,
    pub range: String,
    /// Installed version when it satisfies the range, or the highest
    /// published match when nothing is installed
    pub version: Option<Version>,
}

/// Verdict for one package and the evidence behind it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub package: String,
    pub installed: InstalledVersion,
    pub requirements: Vec<Requirement>,
    pub verdict: Verdict,
    pub selections: Vec<Selection>,
    pub notes: Vec<Note>,
}

impl Resolution {
    /// Origins of every requirement on this package
    pub fn required_by(&self) -> BTreeSet<&str> {
        self.requirements
            .iter()
            .map(|req| req.required_by.as_str())
            .collect()
    }

    /// Severity implied by the verdict
    pub fn severity(&self) -> Severity {
        match self.verdict {
            Verdict::Satisfied => Severity::Info,
            Verdict::Unknown => Severity::Warning,
            Verdict::Missing | Verdict::Conflicting => Severity::Error,
        }
    }
}

/// What is known about a package before classification
#[derive(Debug, Clone)]
pub enum InstalledState {
    Locked(Version),
    Guessed { range: String, version: Version },
    /// Lock or manifest says nothing is installed
    NotInstalled,
    /// Declared range with no way to pick a concrete version
    Undetermined(String),
    /// Non-registry install
    Unversioned(String),
    /// No lock file, and the manifest does not declare it
    Unrecorded,
}

/// Everything `classify` needs for one package
#[derive(Debug, Clone)]
pub struct PackageEvidence<'a> {
    pub package: &'a str,
    pub requirements: &'a [Requirement],
    pub installed: InstalledState,
    /// Private copies installed under a dependent, keyed by dependent;
    /// that dependent's `dependencies` requirement is checked against it
    pub nested: BTreeMap<String, InstalledState>,
    /// Every published version, when the registry document was available
    pub published: Option<Vec<Version>>,
    /// The package's own dependencies could not be read
    pub unverified: bool,
}

/// Resolves requirement tables against a project
#[derive(Debug, Clone)]
pub struct VersionResolver {
    registry: RegistryClient,
}

impl VersionResolver {
    pub fn new(registry: RegistryClient) -> Self {
        Self { registry }
    }

    /// One resolution per package with requirements, sorted by package name
    pub async fn resolve(&self, table: &RequirementTable, model: &ProjectModel) -> Vec<Resolution> {
        // Registry documents are only needed where no concrete version is locked
        let wanted: Vec<&str> = table
            .packages()
            .filter(|name| needs_published_versions(&model.installed(name)))
            .collect();

        let documents: HashMap<&str, Option<Arc<RegistryPackage>>> = join_all(
            wanted
                .into_iter()
                .map(|name| async move { (name, self.registry.fetch_package(name).await) }),
        )
        .await
        .into_iter()
        .collect();

        let evidence: Vec<PackageEvidence<'_>> = table
            .iter()
            .map(|(package, requirements)| {
                let document = documents.get(package).cloned().flatten();
                let published = document.as_ref().map(|doc| doc.published_versions());
                PackageEvidence {
                    package,
                    requirements,
                    installed: installed_state(&model.installed(package), document.as_deref()),
                    nested: nested_installs(model, package, requirements),
                    published,
                    unverified: table.is_unverified(package),
                }
            })
            .collect();

        let mut resolutions: Vec<Resolution> = evidence.into_par_iter().map(classify).collect();
        resolutions.sort_by(|a, b| a.package.cmp(&b.package));

        info!(
            resolutions = resolutions.len(),
            conflicting = resolutions.iter().filter(|r| r.verdict == Verdict::Conflicting).count(),
            missing = resolutions.iter().filter(|r| r.verdict == Verdict::Missing).count(),
            unknown = resolutions.iter().filter(|r| r.verdict == Verdict::Unknown).count(),
            "resolved requirements"
        );
        resolutions
    }
}

fn needs_published_versions(installed: &Installed) -> bool {
    match installed {
        Installed::Locked(_) | Installed::Unversioned(_) | Installed::Unrecorded => false,
        Installed::Declared(range) => VersionReq::parse(range)
            .ok()
            .and_then(|req| req.exact_version())
            .is_none(),
        Installed::NotInstalled => true,
    }
}

fn installed_state(installed: &Installed, document: Option<&RegistryPackage>) -> InstalledState {
    match installed {
        Installed::Locked(version) => InstalledState::Locked(version.clone()),
        Installed::Unversioned(source) => InstalledState::Unversioned(source.clone()),
        Installed::NotInstalled => InstalledState::NotInstalled,
        Installed::Unrecorded => InstalledState::Unrecorded,
        Installed::Declared(range) => {
            let req = match VersionReq::parse(range) {
                Ok(req) => req,
                Err(_) => return InstalledState::Undetermined(range.clone()),
            };
            if let Some(exact) = req.exact_version() {
                return InstalledState::Guessed {
                    range: range.clone(),
                    version: exact,
                };
            }
            match document {
                Some(document) => match document.select(&req) {
                    Some(version) => InstalledState::Guessed {
                        range: range.clone(),
                        version,
                    },
                    // Declared range matches nothing that was ever published
                    None => InstalledState::NotInstalled,
                },
                None => InstalledState::Undetermined(range.clone()),
            }
        },
    }
}

fn nested_installs(
    model: &ProjectModel,
    package: &str,
    requirements: &[Requirement],
) -> BTreeMap<String, InstalledState> {
    requirements
        .iter()
        .filter(|req| req.kind == RequirementKind::Dependency)
        .filter_map(|req| {
            let state = match model.nested_install(package, &req.required_by)? {
                Installed::Locked(version) => InstalledState::Locked(version),
                Installed::Unversioned(source) => InstalledState::Unversioned(source),
                _ => return None,
            };
            Some((req.required_by.clone(), state))
        })
        .collect()
}

fn reported_version(installed: InstalledState) -> InstalledVersion {
    match installed {
        InstalledState::Locked(version) => InstalledVersion::Locked { version },
        InstalledState::Guessed { range, version } => InstalledVersion::BestGuess { range, version },
        InstalledState::NotInstalled => InstalledVersion::Absent,
        InstalledState::Undetermined(detail) | InstalledState::Unversioned(detail) => {
            InstalledVersion::Unknown { detail }
        },
        InstalledState::Unrecorded => InstalledVersion::Unknown {
            detail: "no lock file".to_string(),
        },
    }
}

/// Classify one package
pub fn classify(evidence: PackageEvidence<'_>) -> Resolution {
    let PackageEvidence {
        package,
        requirements,
        installed,
        nested,
        published,
        unverified,
    } = evidence;

    let mut notes = Vec::new();
    let mut hard: Vec<(&Requirement, VersionReq)> = Vec::new();
    let mut soft: Vec<(&Requirement, VersionReq)> = Vec::new();
    let mut unverifiable_hard = 0;
    let mut nested_selections = Vec::new();
    let mut nested_unmet = 0;

    for requirement in requirements {
        let own_copy = match requirement.kind {
            RequirementKind::Dependency => nested.get(&requirement.required_by),
            _ => None,
        };
        match VersionReq::parse(&requirement.range) {
            Ok(req) if own_copy.is_some() => {
                match own_copy {
                    Some(InstalledState::Locked(version)) => {
                        if !check_nested(requirement, &req, version, &mut nested_selections, &mut notes) {
                            nested_unmet += 1;
                        }
                    },
                    _ => {
                        if !requirement.optional {
                            unverifiable_hard += 1;
                        }
                        notes.push(Note::new(
                            Severity::Warning,
                            format!(
                                "{} installs its own non-registry copy; '{}' cannot be verified",
                                requirement.required_by, requirement.range
                            ),
                        ));
                    },
                }
            },
            Ok(req) if requirement.optional => soft.push((requirement, req)),
            Ok(req) => hard.push((requirement, req)),
            Err(_) => {
                if !requirement.optional {
                    unverifiable_hard += 1;
                }
                notes.push(Note::new(
                    Severity::Warning,
                    format!(
                        "range '{}' required by {} cannot be verified",
                        requirement.range, requirement.required_by
                    ),
                ));
            },
        }
    }

    if unverified {
        notes.push(Note::new(
            Severity::Warning,
            "registry metadata was unavailable; this package's own requirements were not checked",
        ));
    }

    let mut selections = Vec::new();
    let (installed, verdict) = match installed {
        // Every requirement is met by dependents' own copies
        installed
            if hard.is_empty()
                && soft.is_empty()
                && unverifiable_hard == 0
                && !nested_selections.is_empty() =>
        {
            (reported_version(installed), Verdict::Satisfied)
        },
        InstalledState::Unversioned(source) => {
            notes.push(Note::new(
                Severity::Warning,
                format!("installed from '{}', which has no semver version", source),
            ));
            (InstalledVersion::Unknown { detail: source }, Verdict::Unknown)
        },
        InstalledState::Undetermined(range) => {
            notes.push(Note::new(
                Severity::Warning,
                format!(
                    "no concrete version could be determined for declared range '{}'",
                    range
                ),
            ));
            (InstalledVersion::Unknown { detail: range }, Verdict::Unknown)
        },
        InstalledState::Unrecorded if !hard.is_empty() || unverifiable_hard > 0 => {
            notes.push(Note::new(
                Severity::Warning,
                format!("no lock file records whether {} is installed", package),
            ));
            (reported_version(InstalledState::Unrecorded), Verdict::Unknown)
        },
        // Only optional requirements, none of which can be checked
        InstalledState::Unrecorded => (reported_version(InstalledState::Unrecorded), Verdict::Satisfied),
        installed if hard.is_empty() && unverifiable_hard > 0 => {
            (reported_version(installed), Verdict::Unknown)
        },
        InstalledState::Locked(version) => {
            let verdict = check_installed(&version, &hard, &soft, &mut selections, &mut notes);
            (InstalledVersion::Locked { version }, verdict)
        },
        InstalledState::Guessed { range, version } => {
            let verdict = check_installed(&version, &hard, &soft, &mut selections, &mut notes);
            (InstalledVersion::BestGuess { range, version }, verdict)
        },
        InstalledState::NotInstalled => {
            let verdict = check_absent(published.as_deref(), &hard, &soft, &mut selections, &mut notes);
            (InstalledVersion::Absent, verdict)
        },
    };

    let verdict = if nested_unmet > 0 {
        Verdict::Conflicting
    } else {
        verdict
    };
    selections.append(&mut nested_selections);

    notes.sort();
    notes.dedup();
    debug!(package, %verdict, "classified package");

    Resolution {
        package: package.to_string(),
        installed,
        requirements: requirements.to_vec(),
        verdict,
        selections,
        notes,
    }
}

/// Check a dependent's own copy; false when a hard requirement is unmet
fn check_nested(
    requirement: &Requirement,
    req: &VersionReq,
    version: &Version,
    selections: &mut Vec<Selection>,
    notes: &mut Vec<Note>,
) -> bool {
    let satisfied = req.matches(version);
    selections.push(Selection {
        required_by: requirement.required_by.clone(),
        range: requirement.range.clone(),
        version: satisfied.then(|| version.clone()),
    });
    if satisfied {
        return true;
    }

    let severity = if requirement.optional {
        Severity::Warning
    } else {
        Severity::Error
    };
    notes.push(Note::new(
        severity,
        format!(
            "copy {} installed under {} does not satisfy '{}'",
            version, requirement.required_by, requirement.range
        ),
    ));
    requirement.optional
}

fn check_installed(
    version: &Version,
    hard: &[(&Requirement, VersionReq)],
    soft: &[(&Requirement, VersionReq)],
    selections: &mut Vec<Selection>,
    notes: &mut Vec<Note>,
) -> Verdict {
    let mut unmet = 0;

    for (requirement, req) in hard.iter().chain(soft) {
        let satisfied = req.matches(version);
        selections.push(Selection {
            required_by: requirement.required_by.clone(),
            range: requirement.range.clone(),
            version: satisfied.then(|| version.clone()),
        });
        if satisfied {
            continue;
        }

        if requirement.optional {
            notes.push(Note::new(
                Severity::Warning,
                format!(
                    "installed {} does not satisfy optional '{}' from {}",
                    version, requirement.range, requirement.required_by
                ),
            ));
        } else {
            unmet += 1;
            notes.push(Note::new(
                Severity::Error,
                format!(
                    "installed {} does not satisfy '{}' required by {}",
                    version, requirement.range, requirement.required_by
                ),
            ));
        }
    }

    if unmet == 0 {
        Verdict::Satisfied
    } else {
        Verdict::Conflicting
    }
}

fn check_absent(
    published: Option<&[Version]>,
    hard: &[(&Requirement, VersionReq)],
    soft: &[(&Requirement, VersionReq)],
    selections: &mut Vec<Selection>,
    notes: &mut Vec<Note>,
) -> Verdict {
    for (requirement, _) in soft {
        notes.push(Note::new(
            Severity::Warning,
            format!(
                "optional '{}' from {} is not installed",
                requirement.range, requirement.required_by
            ),
        ));
    }

    if hard.is_empty() {
        return Verdict::Satisfied;
    }

    let Some(published) = published else {
        notes.push(Note::new(
            Severity::Error,
            format!("not installed but required by {}", origins(hard)),
        ));
        notes.push(Note::new(
            Severity::Info,
            "registry data unavailable; conflicts between requirements were not checked",
        ));
        return Verdict::Missing;
    };

    let selector = VersionSelector::new(published.iter().cloned());
    let mut distinct = BTreeSet::new();
    for (requirement, req) in hard {
        let selected = selector.select(req);
        match selected {
            Some(ref version) => {
                distinct.insert(version.clone());
            },
            None => notes.push(Note::new(
                Severity::Warning,
                format!(
                    "no published version satisfies '{}' required by {}",
                    requirement.range, requirement.required_by
                ),
            )),
        }
        selections.push(Selection {
            required_by: requirement.required_by.clone(),
            range: requirement.range.clone(),
            version: selected,
        });
    }

    if distinct.len() >= 2 {
        let wanted: Vec<String> = selections
            .iter()
            .filter_map(|s| {
                let version = s.version.as_ref()?;
                Some(format!("{} wants {} ({})", s.required_by, version, s.range))
            })
            .collect();
        notes.push(Note::new(
            Severity::Error,
            format!("requirements select different versions: {}", wanted.join(", ")),
        ));
        let constraints: Vec<VersionReq> = hard.iter().map(|(_, req)| req.clone()).collect();
        if let Some(common) = selector.select_all(&constraints) {
            notes.push(Note::new(
                Severity::Info,
                format!("{} satisfies every requirement", common),
            ));
        }
        return Verdict::Conflicting;
    }

    notes.push(Note::new(
        Severity::Error,
        format!("not installed but required by {}", origins(hard)),
    ));
    Verdict::Missing
}

fn origins(requirements: &[(&Requirement, VersionReq)]) -> String {
    let origins: BTreeSet<&str> = requirements
        .iter()
        .map(|(req, _)| req.required_by.as_str())
        .collect();
    origins.into_iter().collect::<Vec<_>>().join(", ")
}
