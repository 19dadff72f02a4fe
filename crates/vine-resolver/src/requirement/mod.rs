//! Requirement edges and the per-package requirement table

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a requirement comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementKind {
    /// Declared in the project manifest
    Direct,
    /// `dependencies` / `optionalDependencies` of another package
    Dependency,
    /// `peerDependencies` of another package
    Peer,
}

/// One version constraint placed on a package
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Requirement {
    /// Package the constraint applies to
    pub package: String,
    /// Project or package that declared it
    pub required_by: String,
    /// Range as written
    pub range: String,
    pub kind: RequirementKind,
    pub optional: bool,
}

impl Requirement {
    pub fn new(
        package: impl Into<String>,
        range: impl Into<String>,
        required_by: impl Into<String>,
        kind: RequirementKind,
    ) -> Self {
        Self {
            package: package.into(),
            required_by: required_by.into(),
            range: range.into(),
            kind,
            optional: false,
        }
    }

    /// Mark this requirement optional
    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }
}

impl fmt::Display for RequirementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequirementKind::Direct => write!(f, "direct"),
            RequirementKind::Dependency => write!(f, "dependency"),
            RequirementKind::Peer => write!(f, "peer"),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} ({} of {}", self.package, self.range, self.kind, self.required_by)?;
        if self.optional {
            write!(f, ", optional")?;
        }
        write!(f, ")")
    }
}

/// package -> requirements, kept sorted and free of duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementTable {
    entries: BTreeMap<String, Vec<Requirement>>,
    /// Packages whose own metadata could not be fetched
    unverified: BTreeSet<String>,
}

impl RequirementTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a requirement; returns false if it was already present
    pub fn add(&mut self, requirement: Requirement) -> bool {
        let list = self.entries.entry(requirement.package.clone()).or_default();
        match list.binary_search(&requirement) {
            Ok(_) => false,
            Err(pos) => {
                list.insert(pos, requirement);
                true
            },
        }
    }

    /// Requirements targeting `package`
    pub fn get(&self, package: &str) -> &[Requirement] {
        self.entries.get(package).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Packages with at least one requirement, in name order
    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// `(package, requirements)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Requirement])> {
        self.entries
            .iter()
            .map(|(package, list)| (package.as_str(), list.as_slice()))
    }

    /// Every requirement, grouped by package
    pub fn requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.entries.values().flatten()
    }

    /// Number of packages
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record that `package`'s own requirements could not be read
    pub fn mark_unverified(&mut self, package: impl Into<String>) {
        self.unverified.insert(package.into());
    }

    pub fn is_unverified(&self, package: &str) -> bool {
        self.unverified.contains(package)
    }

    pub fn unverified(&self) -> impl Iterator<Item = &str> {
        self.unverified.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted_and_deduplicated() {
        let mut table = RequirementTable::new();
        assert!(table.add(Requirement::new("core", "^3.0.0", "pkg-b", RequirementKind::Peer)));
        assert!(table.add(Requirement::new("core", "^2.0.0", "pkg-a", RequirementKind::Peer)));
        assert!(!table.add(Requirement::new("core", "^2.0.0", "pkg-a", RequirementKind::Peer)));
        assert!(table.add(Requirement::new("app", "*", "root", RequirementKind::Direct)));

        assert_eq!(table.len(), 2);
        assert_eq!(table.packages().collect::<Vec<_>>(), vec!["app", "core"]);

        let core = table.get("core");
        assert_eq!(core.len(), 2);
        assert_eq!(core[0].required_by, "pkg-a");
        assert_eq!(core[1].required_by, "pkg-b");

        assert!(table.get("missing").is_empty());
        assert_eq!(table.requirements().count(), 3);
    }

    #[test]
    fn test_unverified() {
        let mut table = RequirementTable::new();
        table.mark_unverified("left-pad");
        assert!(table.is_unverified("left-pad"));
        assert!(!table.is_unverified("react"));
        assert_eq!(table.unverified().collect::<Vec<_>>(), vec!["left-pad"]);
    }

    #[test]
    fn test_requirement_display() {
        let req = Requirement::new("react", "^18.0.0", "react-dom", RequirementKind::Peer).optional(true);
        assert_eq!(req.to_string(), "react@^18.0.0 (peer of react-dom, optional)");
    }
}
