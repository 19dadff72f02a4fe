//! Semantic version types with npm range semantics.
//!
//! Provides Version and VersionReq types. `Version` follows semver 2.0
//! precedence rules. `VersionReq` understands the range grammar found in
//! package.json files: caret, tilde, x-ranges, hyphen ranges, whitespace
//! separated comparator sets and `||` alternatives.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Semantic version (major.minor.patch-prerelease+build)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
    pub build: Option<String>,
}

/// Version requirement (^1.0.0, ~2.3.0, >=1.0.0 <2.0.0 || 3.x)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionReq {
    /// Alternatives joined by `||`; a version matches if any set matches
    pub sets: Vec<ComparatorSet>,
}

/// Comparators that must all hold (whitespace separated in the range)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparatorSet {
    pub comparators: Vec<Comparator>,
}

/// Individual version comparator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparator {
    pub op: Op,
    pub version: PartialVersion,
}

/// Comparison operator for version requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Exact,     // =1.0.0, 1.x
    Greater,   // >1.0.0
    GreaterEq, // >=1.0.0
    Less,      // <1.0.0
    LessEq,    // <=1.0.0
    Tilde,     // ~1.0.0
    Caret,     // ^1.0.0
    Wildcard,  // *
}

/// Partial version for comparisons (may have missing components)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialVersion {
    pub major: u64,
    pub minor: Option<u64>,
    pub patch: Option<u64>,
    pub prerelease: Option<String>,
}

/// Version parsing and validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version format: {input}")]
    InvalidFormat { input: String },

    #[error("Invalid number in version: {component}")]
    InvalidNumber { component: String },

    #[error("Invalid prerelease identifier: {prerelease}")]
    InvalidPrerelease { prerelease: String },

    #[error("Invalid build metadata: {build}")]
    InvalidBuild { build: String },

    #[error("Invalid version range: {input}")]
    InvalidRange { input: String },
}

impl Version {
    /// Create a new version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
            build: None,
        }
    }

    /// Check if this is a prerelease version
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// The `major.minor.patch` triple
    pub fn core(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }

    /// Get the precedence for comparison (ignores build metadata)
    fn precedence_cmp(&self, other: &Self) -> Ordering {
        match self.core().cmp(&other.core()) {
            Ordering::Equal => match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,    // prerelease < normal
                (None, Some(_)) => Ordering::Greater, // normal > prerelease
                (Some(a), Some(b)) => compare_prerelease(a, b),
            },
            other => other,
        }
    }
}

/// Compare dot-separated prerelease identifiers per semver 2.0 §11
fn compare_prerelease(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(nx), Ok(ny)) => nx.cmp(&ny),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => x.cmp(y),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            },
        }
    }
}

fn valid_identifiers(s: &str) -> bool {
    !s.is_empty()
        && s.split('.').all(|part| {
            !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

fn parse_number(component: &str) -> Result<u64, VersionError> {
    component.parse().map_err(|_| VersionError::InvalidNumber {
        component: component.to_string(),
    })
}

/// Strip the loose prefixes npm tolerates (`v1.2.3`, `=1.2.3`)
fn strip_loose_prefix(input: &str) -> &str {
    let input = input.trim();
    let input = input.strip_prefix('=').unwrap_or(input).trim_start();
    input
        .strip_prefix('v')
        .or_else(|| input.strip_prefix('V'))
        .unwrap_or(input)
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = strip_loose_prefix(s);

        // Split on '+' for build metadata
        let (version_part, build) = match input.split_once('+') {
            Some((v, b)) => {
                if !valid_identifiers(b) {
                    return Err(VersionError::InvalidBuild {
                        build: b.to_string(),
                    });
                }
                (v, Some(b.to_string()))
            },
            None => (input, None),
        };

        // Split on the first '-' for prerelease
        let (core_part, prerelease) = match version_part.split_once('-') {
            Some((c, p)) => {
                if !valid_identifiers(p) {
                    return Err(VersionError::InvalidPrerelease {
                        prerelease: p.to_string(),
                    });
                }
                (c, Some(p.to_string()))
            },
            None => (version_part, None),
        };

        // Parse major.minor.patch
        let parts: Vec<&str> = core_part.split('.').collect();
        if parts.len() != 3 {
            return Err(VersionError::InvalidFormat {
                input: s.trim().to_string(),
            });
        }

        Ok(Version {
            major: parse_number(parts[0])?,
            minor: parse_number(parts[1])?,
            patch: parse_number(parts[2])?,
            prerelease,
            build,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;

        if let Some(ref pre) = self.prerelease {
            write!(f, "-{}", pre)?;
        }

        if let Some(ref build) = self.build {
            write!(f, "+{}", build)?;
        }

        Ok(())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.precedence_cmp(other)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl VersionReq {
    /// A requirement matched by every stable version
    pub fn any() -> Self {
        Self {
            sets: vec![ComparatorSet::wildcard()],
        }
    }

    /// Parse a version requirement string
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let input = input.trim();

        let sets = input
            .split("||")
            .map(|alternative| ComparatorSet::parse(alternative.trim(), input))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(VersionReq { sets })
    }

    /// Check if a version matches this requirement
    pub fn matches(&self, version: &Version) -> bool {
        self.sets.iter().any(|set| set.matches(version))
    }

    /// The pinned version when this requirement names exactly one version
    pub fn exact_version(&self) -> Option<Version> {
        match self.sets.as_slice() {
            [set] => match set.comparators.as_slice() {
                [Comparator {
                    op: Op::Exact,
                    version,
                }] if version.minor.is_some() && version.patch.is_some() => {
                    Some(version.to_version())
                },
                _ => None,
            },
            _ => None,
        }
    }

    /// Highest version from `candidates` that matches this requirement
    pub fn max_satisfying<'a, I>(&self, candidates: I) -> Option<&'a Version>
    where
        I: IntoIterator<Item = &'a Version>,
    {
        candidates.into_iter().filter(|v| self.matches(v)).max()
    }
}

impl FromStr for VersionReq {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionReq::parse(s)
    }
}

impl fmt::Display for VersionReq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, set) in self.sets.iter().enumerate() {
            if i > 0 {
                write!(f, " || ")?;
            }
            write!(f, "{}", set)?;
        }
        Ok(())
    }
}

impl ComparatorSet {
    fn wildcard() -> Self {
        Self {
            comparators: vec![Comparator::wildcard()],
        }
    }

    /// Parse one `||` alternative
    fn parse(input: &str, whole: &str) -> Result<Self, VersionError> {
        if input.is_empty() {
            return Ok(Self::wildcard());
        }

        // Hyphen range: "1.2.3 - 2.3.4"
        if let Some((lower, upper)) = input.split_once(" - ") {
            let mut comparators = Vec::new();
            if let Some(version) = PartialVersion::parse(lower.trim(), whole)? {
                comparators.push(Comparator {
                    op: Op::GreaterEq,
                    version,
                });
            }
            if let Some(version) = PartialVersion::parse(upper.trim(), whole)? {
                comparators.push(Comparator {
                    op: Op::LessEq,
                    version,
                });
            }
            if comparators.is_empty() {
                comparators.push(Comparator::wildcard());
            }
            return Ok(Self { comparators });
        }

        // Re-attach operators separated from their version by whitespace (">= 1.2.3")
        let mut tokens: Vec<String> = Vec::new();
        let mut pending_op: Option<&str> = None;
        for token in input.split_whitespace() {
            if is_bare_operator(token) {
                pending_op = Some(token);
                continue;
            }
            match pending_op.take() {
                Some(op) => tokens.push(format!("{}{}", op, token)),
                None => tokens.push(token.to_string()),
            }
        }
        if pending_op.is_some() {
            return Err(VersionError::InvalidRange {
                input: whole.to_string(),
            });
        }

        let comparators = tokens
            .iter()
            .map(|token| Comparator::parse(token, whole))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { comparators })
    }

    /// Check if a version satisfies every comparator of this set
    pub fn matches(&self, version: &Version) -> bool {
        if !self.comparators.iter().all(|comp| comp.matches(version)) {
            return false;
        }

        if !version.is_prerelease() {
            return true;
        }

        // Prereleases only match when a comparator opts into the same release line
        self.comparators.iter().any(|comp| {
            comp.version.prerelease.is_some()
                && comp.version.major == version.major
                && comp.version.minor == Some(version.minor)
                && comp.version.patch == Some(version.patch)
        })
    }
}

impl fmt::Display for ComparatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, comp) in self.comparators.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", comp)?;
        }
        Ok(())
    }
}

fn is_bare_operator(token: &str) -> bool {
    matches!(token, ">=" | "<=" | ">" | "<" | "=" | "^" | "~" | "~>")
}

impl Comparator {
    fn wildcard() -> Self {
        Self {
            op: Op::Wildcard,
            version: PartialVersion {
                major: 0,
                minor: None,
                patch: None,
                prerelease: None,
            },
        }
    }

    fn parse(token: &str, whole: &str) -> Result<Self, VersionError> {
        // Parse operator prefix
        let (op, version_str) = if let Some(stripped) = token.strip_prefix(">=") {
            (Op::GreaterEq, stripped)
        } else if let Some(stripped) = token.strip_prefix("<=") {
            (Op::LessEq, stripped)
        } else if let Some(stripped) = token.strip_prefix("~>") {
            (Op::Tilde, stripped)
        } else if let Some(stripped) = token.strip_prefix('>') {
            (Op::Greater, stripped)
        } else if let Some(stripped) = token.strip_prefix('<') {
            (Op::Less, stripped)
        } else if let Some(stripped) = token.strip_prefix('=') {
            (Op::Exact, stripped)
        } else if let Some(stripped) = token.strip_prefix('^') {
            (Op::Caret, stripped)
        } else if let Some(stripped) = token.strip_prefix('~') {
            (Op::Tilde, stripped)
        } else {
            (Op::Exact, token)
        };

        match PartialVersion::parse(version_str, whole)? {
            Some(version) => Ok(Comparator { op, version }),
            None => match op {
                // "<*" and ">*" can never be satisfied
                Op::Less | Op::Greater => Err(VersionError::InvalidRange {
                    input: whole.to_string(),
                }),
                _ => Ok(Comparator::wildcard()),
            },
        }
    }

    /// Check if a version matches this comparator
    pub fn matches(&self, version: &Version) -> bool {
        let base = &self.version;
        match self.op {
            Op::Wildcard => true,
            Op::Exact => base.matches_exact(version),
            Op::GreaterEq => version >= &base.to_version(),
            Op::Greater => match (base.minor, base.patch) {
                (Some(_), Some(_)) => version > &base.to_version(),
                (Some(minor), None) => (version.major, version.minor) > (base.major, minor),
                _ => version.major > base.major,
            },
            Op::Less => version < &base.to_version(),
            Op::LessEq => match (base.minor, base.patch) {
                (Some(_), Some(_)) => version <= &base.to_version(),
                (Some(minor), None) => (version.major, version.minor) <= (base.major, minor),
                _ => version.major <= base.major,
            },
            Op::Tilde => version >= &base.to_version() && version < &base.tilde_upper(),
            Op::Caret => version >= &base.to_version() && version < &base.caret_upper(),
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.op {
            Op::Wildcard => return write!(f, "*"),
            Op::Exact => "",
            Op::Greater => ">",
            Op::GreaterEq => ">=",
            Op::Less => "<",
            Op::LessEq => "<=",
            Op::Tilde => "~",
            Op::Caret => "^",
        };
        write!(f, "{}{}", prefix, self.version)
    }
}

impl PartialVersion {
    /// Parse "1", "1.2", "1.2.3-beta", "1.x", "v1.2.*"; `None` means fully wild
    fn parse(input: &str, whole: &str) -> Result<Option<Self>, VersionError> {
        let input = strip_loose_prefix(input);
        let input = input.split_once('+').map_or(input, |(v, _)| v);

        if input.is_empty() || is_wild(input) {
            return Ok(None);
        }

        let (core_part, prerelease) = match input.split_once('-') {
            Some((c, p)) => {
                if !valid_identifiers(p) {
                    return Err(VersionError::InvalidPrerelease {
                        prerelease: p.to_string(),
                    });
                }
                (c, Some(p.to_string()))
            },
            None => (input, None),
        };

        let parts: Vec<&str> = core_part.split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(VersionError::InvalidRange {
                input: whole.to_string(),
            });
        }

        let mut numbers: [Option<u64>; 3] = [None, None, None];
        for (slot, part) in parts.iter().enumerate() {
            if is_wild(part) {
                break;
            }
            numbers[slot] = Some(parse_number(part)?);
        }

        let major = match numbers[0] {
            Some(major) => major,
            None => return Ok(None),
        };
        let minor = numbers[1];
        let patch = if minor.is_some() { numbers[2] } else { None };

        // A prerelease tag only makes sense on a full version
        let prerelease = if patch.is_some() { prerelease } else { None };

        Ok(Some(PartialVersion {
            major,
            minor,
            patch,
            prerelease,
        }))
    }

    /// Convert to a full version (filling missing parts with 0)
    pub fn to_version(&self) -> Version {
        Version {
            major: self.major,
            minor: self.minor.unwrap_or(0),
            patch: self.patch.unwrap_or(0),
            prerelease: self.prerelease.clone(),
            build: None,
        }
    }

    /// Check exact match (missing components match anything)
    fn matches_exact(&self, version: &Version) -> bool {
        version.major == self.major
            && self.minor.map_or(true, |m| version.minor == m)
            && match self.patch {
                Some(p) => version.patch == p && version.prerelease == self.prerelease,
                None => true,
            }
    }

    /// Exclusive upper bound of a tilde range (~1.2.3 allows >=1.2.3 <1.3.0)
    fn tilde_upper(&self) -> Version {
        match self.minor {
            Some(minor) => Version::new(self.major, minor + 1, 0),
            None => Version::new(self.major + 1, 0, 0),
        }
    }

    /// Exclusive upper bound of a caret range (^1.2.3 <2.0.0, ^0.2.3 <0.3.0, ^0.0.3 <0.0.4)
    fn caret_upper(&self) -> Version {
        if self.major > 0 {
            return Version::new(self.major + 1, 0, 0);
        }
        match (self.minor, self.patch) {
            (None, _) => Version::new(1, 0, 0),
            (Some(minor), _) if minor > 0 => Version::new(0, minor + 1, 0),
            (Some(_), None) => Version::new(0, 1, 0),
            (Some(_), Some(patch)) => Version::new(0, 0, patch + 1),
        }
    }
}

impl fmt::Display for PartialVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.major)?;
        if let Some(minor) = self.minor {
            write!(f, ".{}", minor)?;
            if let Some(patch) = self.patch {
                write!(f, ".{}", patch)?;
                if let Some(ref pre) = self.prerelease {
                    write!(f, "-{}", pre)?;
                }
            }
        }
        Ok(())
    }
}

fn is_wild(part: &str) -> bool {
    matches!(part, "*" | "x" | "X")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::from_str(s).unwrap()
    }

    fn req(s: &str) -> VersionReq {
        VersionReq::parse(s).unwrap()
    }

    #[test]
    fn test_version_parsing() {
        let v = Version::from_str("1.2.3").unwrap();
        assert_eq!(v.major, 1);
        assert_eq!(v.minor, 2);
        assert_eq!(v.patch, 3);
        assert_eq!(v.prerelease, None);
        assert_eq!(v.build, None);
    }

    #[test]
    fn test_version_with_prerelease() {
        let v = Version::from_str("1.2.3-alpha.1").unwrap();
        assert_eq!(v.core(), (1, 2, 3));
        assert_eq!(v.prerelease, Some("alpha.1".to_string()));
        assert_eq!(v.build, None);
    }

    #[test]
    fn test_version_with_build() {
        let v = Version::from_str("1.2.3+build.1").unwrap();
        assert_eq!(v.core(), (1, 2, 3));
        assert_eq!(v.prerelease, None);
        assert_eq!(v.build, Some("build.1".to_string()));
    }

    #[test]
    fn test_loose_prefixes() {
        assert_eq!(v("v1.2.3"), Version::new(1, 2, 3));
        assert_eq!(v("=1.2.3"), Version::new(1, 2, 3));
        assert!(Version::from_str("1.2").is_err());
        assert!(Version::from_str("1.2.3-").is_err());
        assert!(Version::from_str("latest").is_err());
    }

    #[test]
    fn test_version_display() {
        let v = Version::new(1, 2, 3);
        assert_eq!(v.to_string(), "1.2.3");

        let v = Version {
            major: 1,
            minor: 2,
            patch: 3,
            prerelease: Some("alpha".to_string()),
            build: Some("build".to_string()),
        };
        assert_eq!(v.to_string(), "1.2.3-alpha+build");
    }

    #[test]
    fn test_version_comparison() {
        let v1 = Version::new(1, 0, 0);
        let v2 = Version::new(2, 0, 0);
        let v3 = Version::new(1, 1, 0);

        assert!(v1 < v2);
        assert!(v1 < v3);
        assert!(v3 < v2);
    }

    #[test]
    fn test_prerelease_precedence() {
        // Ordering from the semver 2.0 specification
        let ordered = [
            "1.0.0-alpha",
            "1.0.0-alpha.1",
            "1.0.0-alpha.beta",
            "1.0.0-beta",
            "1.0.0-beta.2",
            "1.0.0-beta.11",
            "1.0.0-rc.1",
            "1.0.0",
        ];
        for pair in ordered.windows(2) {
            assert!(v(pair[0]) < v(pair[1]), "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_version_serde_as_string() {
        let json = serde_json::to_string(&Version::new(4, 17, 21)).unwrap();
        assert_eq!(json, "\"4.17.21\"");
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Version::new(4, 17, 21));
    }

    #[test]
    fn test_version_req_exact() {
        let req = req("1.2.3");
        assert!(req.matches(&Version::new(1, 2, 3)));
        assert!(!req.matches(&Version::new(1, 2, 4)));
        assert_eq!(req.exact_version(), Some(Version::new(1, 2, 3)));
    }

    #[test]
    fn test_version_req_wildcard() {
        for input in ["*", "", "x", "X.x"] {
            let req = VersionReq::parse(input).unwrap();
            assert!(req.matches(&Version::new(1, 2, 3)));
            assert!(req.matches(&Version::new(999, 999, 999)));
            assert_eq!(req.exact_version(), None);
        }
    }

    #[test]
    fn test_version_req_caret() {
        let r = req("^1.2.3");
        assert!(r.matches(&v("1.2.3")));
        assert!(r.matches(&v("1.2.4")));
        assert!(r.matches(&v("1.3.0")));
        assert!(!r.matches(&v("2.0.0")));
        assert!(!r.matches(&v("1.2.2")));
        assert!(!r.matches(&v("0.9.9")));
    }

    #[test]
    fn test_version_req_caret_zero_major() {
        let r = req("^0.2.3");
        assert!(r.matches(&v("0.2.3")));
        assert!(r.matches(&v("0.2.9")));
        assert!(!r.matches(&v("0.3.0")));

        let r = req("^0.0.3");
        assert!(r.matches(&v("0.0.3")));
        assert!(!r.matches(&v("0.0.4")));

        let r = req("^0.0");
        assert!(r.matches(&v("0.0.9")));
        assert!(!r.matches(&v("0.1.0")));

        let r = req("^0.x");
        assert!(r.matches(&v("0.9.0")));
        assert!(!r.matches(&v("1.0.0")));

        let r = req("^1.x");
        assert!(r.matches(&v("1.0.0")));
        assert!(r.matches(&v("1.9.9")));
        assert!(!r.matches(&v("2.0.0")));
    }

    #[test]
    fn test_version_req_tilde() {
        let r = req("~1.2.3");
        assert!(r.matches(&v("1.2.3")));
        assert!(r.matches(&v("1.2.9")));
        assert!(!r.matches(&v("1.3.0")));

        let r = req("~1.2");
        assert!(r.matches(&v("1.2.0")));
        assert!(!r.matches(&v("1.3.0")));

        let r = req("~1");
        assert!(r.matches(&v("1.9.0")));
        assert!(!r.matches(&v("2.0.0")));
    }

    #[test]
    fn test_version_req_operators() {
        let v1_2_3 = Version::new(1, 2, 3);
        let v1_2_4 = Version::new(1, 2, 4);
        let v1_3_0 = Version::new(1, 3, 0);

        // Greater than
        let r = req(">1.2.3");
        assert!(!r.matches(&v1_2_3));
        assert!(r.matches(&v1_2_4));
        assert!(r.matches(&v1_3_0));

        // Greater than or equal
        let r = req(">=1.2.3");
        assert!(r.matches(&v1_2_3));
        assert!(r.matches(&v1_2_4));
        assert!(r.matches(&v1_3_0));

        // Less than
        let r = req("<1.2.4");
        assert!(r.matches(&v1_2_3));
        assert!(!r.matches(&v1_2_4));
        assert!(!r.matches(&v1_3_0));
    }

    #[test]
    fn test_version_req_partial_operators() {
        assert!(req(">1.2").matches(&v("1.3.0")));
        assert!(!req(">1.2").matches(&v("1.2.9")));
        assert!(req("<=1.2").matches(&v("1.2.9")));
        assert!(!req("<=1.2").matches(&v("1.3.0")));
        assert!(req(">=1.2").matches(&v("1.2.0")));
        assert!(req(">1").matches(&v("2.0.0")));
        assert!(!req(">1").matches(&v("1.9.9")));
    }

    #[test]
    fn test_version_req_x_ranges() {
        let r = req("1.x");
        assert!(r.matches(&v("1.0.0")));
        assert!(r.matches(&v("1.9.9")));
        assert!(!r.matches(&v("2.0.0")));

        let r = req("1.2.*");
        assert!(r.matches(&v("1.2.7")));
        assert!(!r.matches(&v("1.3.0")));

        let r = req("2");
        assert!(r.matches(&v("2.5.0")));
        assert!(!r.matches(&v("3.0.0")));
    }

    #[test]
    fn test_version_req_comparator_set() {
        let r = req(">=1.0.0 <2.0.0");
        assert!(r.matches(&v("1.5.0")));
        assert!(!r.matches(&v("2.0.0")));
        assert!(!r.matches(&v("0.9.0")));

        let spaced = req(">= 1.0.0 < 2.0.0");
        assert_eq!(spaced, r);
    }

    #[test]
    fn test_version_req_hyphen() {
        let r = req("1.2.3 - 2.3.4");
        assert!(r.matches(&v("1.2.3")));
        assert!(r.matches(&v("2.3.4")));
        assert!(!r.matches(&v("2.3.5")));

        let r = req("1.2 - 2.3");
        assert!(r.matches(&v("1.2.0")));
        assert!(r.matches(&v("2.3.9")));
        assert!(!r.matches(&v("2.4.0")));
    }

    #[test]
    fn test_version_req_union() {
        let r = req("^1.0.0 || ^3.0.0");
        assert!(r.matches(&v("1.4.0")));
        assert!(r.matches(&v("3.1.0")));
        assert!(!r.matches(&v("2.0.0")));
    }

    #[test]
    fn test_prerelease_excluded_by_default() {
        assert!(!req("^1.0.0").matches(&v("1.5.0-beta.1")));
        assert!(!req("*").matches(&v("1.0.0-rc.1")));
        assert!(!req(">=1.0.0").matches(&v("2.0.0-alpha")));

        // Opting in on the same release line
        let r = req("^1.5.0-beta.0");
        assert!(r.matches(&v("1.5.0-beta.1")));
        assert!(r.matches(&v("1.6.0")));
        assert!(!r.matches(&v("1.6.0-beta.1")));
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(VersionReq::parse("latest").is_err());
        assert!(VersionReq::parse("git+https://github.com/a/b.git").is_err());
        assert!(VersionReq::parse("file:../lib").is_err());
        assert!(VersionReq::parse(">=").is_err());
        assert!(VersionReq::parse("<*").is_err());
    }

    #[test]
    fn test_max_satisfying() {
        let versions = vec![v("1.0.0"), v("1.3.0"), v("2.0.0"), v("1.4.0-beta.1")];
        assert_eq!(req("^1.0.0").max_satisfying(&versions), Some(&v("1.3.0")));
        assert_eq!(req("^3.0.0").max_satisfying(&versions), None);
    }

    #[test]
    fn test_version_req_display() {
        assert_eq!(req("^1.2.3").to_string(), "^1.2.3");
        assert_eq!(req(">= 1.0.0 <2").to_string(), ">=1.0.0 <2");
        assert_eq!(req("1.x || ~2.1").to_string(), "1 || ~2.1");
        assert_eq!(req("*").to_string(), "*");
    }
}
