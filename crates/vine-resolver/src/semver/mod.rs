//! Version selection over a package's published versions
//!
//! Selection always picks the highest version satisfying a range. Range
//! matching applies npm prerelease rules, so prereleases are only chosen
//! when the range opts into that release line.

use std::collections::BTreeSet;

use vine_core::{Version, VersionReq};

/// Version selector for finding best matching versions
#[derive(Debug, Clone, Default)]
pub struct VersionSelector {
    /// Published versions, ascending
    available_versions: BTreeSet<Version>,
}

impl VersionSelector {
    /// Create new version selector with available versions
    pub fn new(versions: impl IntoIterator<Item = Version>) -> Self {
        Self {
            available_versions: versions.into_iter().collect(),
        }
    }

    /// Highest version matching `req`
    pub fn select(&self, req: &VersionReq) -> Option<Version> {
        self.available_versions
            .iter()
            .rev() // Start with highest versions
            .find(|version| req.matches(version))
            .cloned()
    }

    /// Highest version matching every constraint at once
    pub fn select_all(&self, constraints: &[VersionReq]) -> Option<Version> {
        self.available_versions
            .iter()
            .rev()
            .find(|version| constraints.iter().all(|req| req.matches(version)))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn create_versions() -> Vec<Version> {
        ["1.0.0", "1.1.0", "1.2.0", "2.0.0-alpha.1", "2.0.0", "2.1.0", "3.0.0-rc.1"]
            .iter()
            .map(|v| Version::from_str(v).unwrap())
            .collect()
    }

    fn req(s: &str) -> VersionReq {
        VersionReq::parse(s).unwrap()
    }

    #[test]
    fn test_select_highest_match() {
        let selector = VersionSelector::new(create_versions());
        // Should select highest 1.x version
        assert_eq!(selector.select(&req("^1.0.0")), Some(Version::new(1, 2, 0)));

        // Should select 2.1.0, never a prerelease
        assert_eq!(selector.select(&req(">=2.0.0")), Some(Version::new(2, 1, 0)));
        assert_eq!(selector.select(&req("^4.0.0")), None);
    }

    #[test]
    fn test_select_prerelease_when_opted_in() {
        let selector = VersionSelector::new(create_versions());
        assert_eq!(
            selector.select(&req(">=3.0.0-beta.0")),
            Some(Version::from_str("3.0.0-rc.1").unwrap())
        );
    }

    #[test]
    fn test_select_all() {
        let selector = VersionSelector::new(create_versions());
        assert_eq!(
            selector.select_all(&[req(">=1.0.0"), req("<2.0.0")]),
            Some(Version::new(1, 2, 0))
        );
        assert_eq!(selector.select_all(&[req("^1.0.0"), req("^2.0.0")]), None);
    }
}
