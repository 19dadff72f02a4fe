//! Lock file parsing
//!
//! Three shapes are understood:
//! - a flat `name -> version` map, either at the top level or under
//!   `dependencies`
//! - npm v1 (`dependencies` of `{ version, requires, dependencies }` objects)
//! - npm v2/v3 (`packages` keyed by install path)

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use vine_core::{Version, VineError};

use crate::ConfigResult;

/// Lock file names, in search order
pub const LOCKFILE_NAMES: [&str; 3] = ["package-lock.json", "npm-shrinkwrap.json", "vine.lock.json"];

/// Top-level keys of a flat lock map that are not packages
const RESERVED_KEYS: [&str; 4] = ["name", "version", "lockfileVersion", "requires"];

/// Detected lock file shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LockFormat {
    Flat,
    NpmV1,
    NpmV2,
}

/// Installed package recorded in a lock file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    pub name: String,
    /// Installed version as written (may be a URL for non-registry installs)
    pub version: String,
    /// Whether the lock records this version's own dependencies
    pub records_dependencies: bool,
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,
    #[serde(default)]
    pub peer_dependencies: IndexMap<String, String>,
    #[serde(default)]
    pub optional_peers: Vec<String>,
}

/// Parsed lock file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lockfile {
    pub path: Utf8PathBuf,
    pub format: LockFormat,
    /// Entries keyed exactly as the file keys them
    entries: BTreeMap<String, LockEntry>,
}

impl LockEntry {
    /// Installed version, if it is valid semver
    pub fn installed_version(&self) -> Option<Version> {
        self.version.parse().ok()
    }

    /// Whether the peer dependency `name` is marked optional
    pub fn is_optional_peer(&self, name: &str) -> bool {
        self.optional_peers.iter().any(|peer| peer == name)
    }
}

impl Lockfile {
    /// Parse lock file content
    pub fn parse(content: &str, path: &Utf8Path) -> ConfigResult<Self> {
        let value: Value = serde_json::from_str(content).map_err(|e| {
            VineError::manifest(path.as_str(), format!("Lock file parsing error: {}", e))
        })?;
        let root = value
            .as_object()
            .ok_or_else(|| VineError::manifest(path.as_str(), "lock file must be a JSON object"))?;

        let (format, entries) = if let Some(packages) = root.get("packages").and_then(Value::as_object) {
            (LockFormat::NpmV2, parse_packages(packages))
        } else if let Some(deps) = root.get("dependencies").and_then(Value::as_object) {
            if deps.values().any(Value::is_object) {
                (LockFormat::NpmV1, parse_v1(deps))
            } else {
                (LockFormat::Flat, parse_flat(deps, &[]))
            }
        } else {
            (LockFormat::Flat, parse_flat(root, &RESERVED_KEYS))
        };

        debug!(lockfile = %path, ?format, entries = entries.len(), "parsed lock file");
        Ok(Self {
            path: path.to_path_buf(),
            format,
            entries,
        })
    }

    /// First existing lock file in `project_root`, by search order
    pub fn find(project_root: &Utf8Path) -> Option<Utf8PathBuf> {
        LOCKFILE_NAMES
            .iter()
            .map(|name| project_root.join(name))
            .find(|path| path.is_file())
    }

    /// Load the project's lock file, if it has one
    pub async fn load(project_root: &Utf8Path) -> ConfigResult<Option<Self>> {
        let Some(path) = Self::find(project_root) else {
            debug!(project = %project_root, "no lock file found");
            return Ok(None);
        };
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| VineError::manifest(path.as_str(), e.to_string()))?;
        Self::parse(&content, &path).map(Some)
    }

    /// Top-level installed entry for a package name
    ///
    /// Lookup is by exact key: `node_modules/<name>` for v2/v3 files and the
    /// bare name otherwise. Nested installs never shadow the top level.
    pub fn entry(&self, name: &str) -> Option<&LockEntry> {
        match self.format {
            LockFormat::NpmV2 => self.entries.get(&format!("node_modules/{}", name)),
            LockFormat::NpmV1 | LockFormat::Flat => self.entries.get(name),
        }
    }

    /// Copy of `name` installed privately under the top-level `dependent`
    pub fn nested_entry(&self, name: &str, dependent: &str) -> Option<&LockEntry> {
        match self.format {
            LockFormat::NpmV2 => self
                .entries
                .get(&format!("node_modules/{}/node_modules/{}", dependent, name)),
            LockFormat::NpmV1 => self.entries.get(&format!("{}/node_modules/{}", dependent, name)),
            LockFormat::Flat => None,
        }
    }

    /// Entry `dependent` loads when it requires `name`, following Node's
    /// lookup: its own `node_modules` first, then the top level
    pub fn entry_for(&self, name: &str, dependent: &str) -> Option<&LockEntry> {
        self.nested_entry(name, dependent).or_else(|| self.entry(name))
    }

    /// Every recorded entry, keyed as in the file
    pub fn entries(&self) -> impl Iterator<Item = (&str, &LockEntry)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_flat(map: &Map<String, Value>, reserved: &[&str]) -> BTreeMap<String, LockEntry> {
    map.iter()
        .filter(|(name, _)| !reserved.contains(&name.as_str()))
        .filter_map(|(name, version)| {
            let version = version.as_str()?;
            Some((
                name.clone(),
                LockEntry {
                    name: name.clone(),
                    version: version.to_string(),
                    records_dependencies: false,
                    dependencies: IndexMap::new(),
                    peer_dependencies: IndexMap::new(),
                    optional_peers: Vec::new(),
                },
            ))
        })
        .collect()
}

fn parse_v1(deps: &Map<String, Value>) -> BTreeMap<String, LockEntry> {
    let mut entries = BTreeMap::new();
    collect_v1(deps, None, &mut entries);
    entries
}

/// Nested v1 installs are keyed `parent/node_modules/name`
fn collect_v1(deps: &Map<String, Value>, parent: Option<&str>, entries: &mut BTreeMap<String, LockEntry>) {
    for (name, entry) in deps {
        let Some(version) = entry.get("version").and_then(Value::as_str) else {
            continue;
        };
        let key = match parent {
            Some(parent) => format!("{}/node_modules/{}", parent, name),
            None => name.clone(),
        };
        if let Some(nested) = entry.get("dependencies").and_then(Value::as_object) {
            collect_v1(nested, Some(&key), entries);
        }
        entries.insert(
            key,
            LockEntry {
                name: name.clone(),
                version: version.to_string(),
                records_dependencies: true,
                dependencies: string_map(entry.get("requires")),
                peer_dependencies: string_map(entry.get("peerDependencies")),
                optional_peers: optional_peers(entry),
            },
        );
    }
}

fn parse_packages(packages: &Map<String, Value>) -> BTreeMap<String, LockEntry> {
    packages
        .iter()
        // The "" key is the project itself
        .filter(|(key, _)| !key.is_empty())
        .filter_map(|(key, entry)| {
            let version = entry.get("version")?.as_str()?;
            let name = entry
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| install_path_name(key))?;
            Some((
                key.clone(),
                LockEntry {
                    name,
                    version: version.to_string(),
                    records_dependencies: true,
                    dependencies: string_map(entry.get("dependencies")),
                    peer_dependencies: string_map(entry.get("peerDependencies")),
                    optional_peers: optional_peers(entry),
                },
            ))
        })
        .collect()
}

/// Package name from an install path (`a/node_modules/@s/b` -> `@s/b`)
fn install_path_name(key: &str) -> Option<String> {
    let (_, tail) = key.rsplit_once("node_modules/")?;
    (!tail.is_empty()).then(|| tail.to_string())
}

fn string_map(value: Option<&Value>) -> IndexMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(name, range)| Some((name.clone(), range.as_str()?.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

fn optional_peers(entry: &Value) -> Vec<String> {
    entry
        .get("peerDependenciesMeta")
        .and_then(Value::as_object)
        .map(|meta| {
            meta.iter()
                .filter(|(_, flags)| flags.get("optional").and_then(Value::as_bool) == Some(true))
                .map(|(name, _)| name.clone())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Lockfile {
        Lockfile::parse(content, Utf8Path::new("package-lock.json")).unwrap()
    }

    #[test]
    fn test_flat_top_level() {
        let lock = parse(r#"{ "lockfileVersion": 1, "name": "app", "left-pad": "1.3.0", "react": "18.2.0" }"#);
        assert_eq!(lock.format, LockFormat::Flat);
        assert_eq!(lock.len(), 2);
        assert_eq!(lock.entry("left-pad").unwrap().version, "1.3.0");
        assert!(lock.entry("name").is_none());
        assert!(!lock.entry("react").unwrap().records_dependencies);
    }

    #[test]
    fn test_flat_dependencies_map() {
        let lock = parse(r#"{ "dependencies": { "left-pad": "1.3.0" } }"#);
        assert_eq!(lock.format, LockFormat::Flat);
        assert_eq!(
            lock.entry("left-pad").unwrap().installed_version(),
            Some(Version::new(1, 3, 0))
        );
    }

    #[test]
    fn test_npm_v1() {
        let lock = parse(
            r#"{
                "lockfileVersion": 1,
                "dependencies": {
                    "pkg-a": {
                        "version": "1.0.0",
                        "requires": { "core": "^1.0.0" },
                        "dependencies": {
                            "core": { "version": "1.5.0" }
                        }
                    },
                    "core": { "version": "2.1.0" }
                }
            }"#,
        );
        assert_eq!(lock.format, LockFormat::NpmV1);
        let a = lock.entry("pkg-a").unwrap();
        assert!(a.records_dependencies);
        assert_eq!(a.dependencies["core"], "^1.0.0");

        // Nested install does not shadow the top-level one
        assert_eq!(lock.entry("core").unwrap().version, "2.1.0");
        assert_eq!(lock.entry_for("core", "pkg-a").unwrap().version, "1.5.0");
        assert_eq!(lock.entry_for("core", "pkg-b").unwrap().version, "2.1.0");
        assert!(lock.nested_entry("core", "pkg-b").is_none());
    }

    #[test]
    fn test_npm_v2_exact_key_lookup() {
        let lock = parse(
            r#"{
                "lockfileVersion": 3,
                "packages": {
                    "": { "name": "app", "version": "1.0.0" },
                    "node_modules/react-dom": {
                        "version": "18.2.0",
                        "dependencies": { "scheduler": "^0.23.0" },
                        "peerDependencies": { "react": "^18.2.0" }
                    },
                    "node_modules/@types/react": { "version": "18.2.7" },
                    "node_modules/other/node_modules/@types/react": { "version": "17.0.0" },
                    "node_modules/not-react": {
                        "version": "0.1.0",
                        "peerDependencies": { "x": "*" },
                        "peerDependenciesMeta": { "x": { "optional": true } }
                    }
                }
            }"#,
        );
        assert_eq!(lock.format, LockFormat::NpmV2);
        assert_eq!(lock.len(), 4);

        assert_eq!(lock.entry("@types/react").unwrap().version, "18.2.7");
        assert!(lock.entry("react").is_none());

        let dom = lock.entry("react-dom").unwrap();
        assert_eq!(dom.name, "react-dom");
        assert_eq!(dom.peer_dependencies["react"], "^18.2.0");
        assert!(lock.entry("not-react").unwrap().is_optional_peer("x"));

        let nested = lock
            .entries()
            .find(|(key, _)| key.starts_with("node_modules/other/"))
            .map(|(_, entry)| entry)
            .unwrap();
        assert_eq!(nested.name, "@types/react");

        assert_eq!(lock.entry_for("@types/react", "other").unwrap().version, "17.0.0");
        assert_eq!(lock.entry_for("@types/react", "react-dom").unwrap().version, "18.2.7");
        assert!(lock.entry_for("react", "other").is_none());
    }

    #[test]
    fn test_flat_locks_have_no_nested_installs() {
        let lock = parse(r#"{ "core": "2.1.0" }"#);
        assert!(lock.nested_entry("core", "pkg-a").is_none());
        assert_eq!(lock.entry_for("core", "pkg-a").unwrap().version, "2.1.0");
    }

    #[test]
    fn test_invalid_lockfiles() {
        let path = Utf8Path::new("package-lock.json");
        assert!(matches!(
            Lockfile::parse("{ oops", path),
            Err(VineError::Manifest { .. })
        ));
        assert!(matches!(
            Lockfile::parse("\"1.0.0\"", path),
            Err(VineError::Manifest { .. })
        ));
    }

    #[tokio::test]
    async fn test_search_order() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let root = Utf8Path::from_path(temp_dir.path()).unwrap();

        assert!(Lockfile::load(root).await.unwrap().is_none());

        tokio::fs::write(root.join("vine.lock.json"), r#"{ "a": "1.0.0" }"#)
            .await
            .unwrap();
        tokio::fs::write(root.join("npm-shrinkwrap.json"), r#"{ "a": "2.0.0" }"#)
            .await
            .unwrap();

        let lock = Lockfile::load(root).await.unwrap().unwrap();
        assert_eq!(lock.path.file_name(), Some("npm-shrinkwrap.json"));
        assert_eq!(lock.entry("a").unwrap().version, "2.0.0");
    }
}
