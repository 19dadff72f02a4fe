//! Analysis settings: vine.toml, environment overrides and CLI flags
//!
//! Layers are applied in order: defaults, `vine.toml` (nearest one walking up
//! from the project), `VINE_*` environment variables, CLI overrides.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tracing::debug;
use vine_core::VineError;

use crate::manifest::OverlapPolicy;
use crate::ConfigResult;

/// Settings file name
pub const SETTINGS_FILE: &str = "vine.toml";

/// How far the requirement collector follows dependencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DepthRepr", into = "DepthRepr")]
pub enum Depth {
    /// Manifest entries only
    Direct,
    /// Up to n hops beyond the manifest
    Transitive(u32),
    /// Follow the whole graph
    Unbounded,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum DepthRepr {
    Hops(u32),
    Word(String),
}

impl Depth {
    /// Whether packages found `hops` levels below the manifest are expanded
    pub fn allows(&self, hops: u32) -> bool {
        match self {
            Depth::Direct => false,
            Depth::Transitive(max) => hops < *max,
            Depth::Unbounded => true,
        }
    }
}

impl Default for Depth {
    fn default() -> Self {
        Depth::Transitive(1)
    }
}

impl FromStr for Depth {
    type Err = VineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" | "0" => Ok(Depth::Direct),
            "unbounded" | "deep" | "all" => Ok(Depth::Unbounded),
            other => other
                .parse::<u32>()
                .map(Depth::Transitive)
                .map_err(|_| VineError::Config {
                    message: format!("Invalid depth '{}': expected a number or \"unbounded\"", s),
                }),
        }
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Depth::Direct => write!(f, "direct"),
            Depth::Transitive(hops) => write!(f, "{}", hops),
            Depth::Unbounded => write!(f, "unbounded"),
        }
    }
}

impl TryFrom<DepthRepr> for Depth {
    type Error = VineError;

    fn try_from(repr: DepthRepr) -> Result<Self, Self::Error> {
        match repr {
            DepthRepr::Hops(0) => Ok(Depth::Direct),
            DepthRepr::Hops(hops) => Ok(Depth::Transitive(hops)),
            DepthRepr::Word(word) => word.parse(),
        }
    }
}

impl From<Depth> for DepthRepr {
    fn from(depth: Depth) -> Self {
        match depth {
            Depth::Direct => DepthRepr::Hops(0),
            Depth::Transitive(hops) => DepthRepr::Hops(hops),
            Depth::Unbounded => DepthRepr::Word("unbounded".to_string()),
        }
    }
}

/// Complete settings for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub registry: RegistrySettings,
    pub analysis: AnalysisSettings,
}

/// `[registry]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistrySettings {
    /// Registry base URL
    pub url: String,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Retries after the first attempt
    pub retries: u32,
    /// Maximum in-flight registry requests
    pub concurrency: usize,
    /// HTTP(S) proxy
    pub proxy: Option<String>,
    /// Bearer token
    pub token: Option<String>,
    /// Serve from cache only
    pub offline: bool,
    /// Cache entry lifetime
    pub cache_ttl_secs: u64,
    /// Explicit cache file location
    pub cache_file: Option<Utf8PathBuf>,
    /// Keep the cache on disk between runs
    pub persist_cache: bool,
}

/// `[analysis]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisSettings {
    pub depth: Depth,
    /// Package names or globs to skip
    pub exclude: Vec<String>,
    pub include_dev: bool,
    /// Analyzer units running at once
    pub unit_concurrency: usize,
    /// Deadline for the whole run
    pub timeout_secs: Option<u64>,
    pub overlap: OverlapPolicy,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            url: "https://registry.npmjs.org".to_string(),
            timeout_secs: 30,
            retries: 3,
            concurrency: 8,
            proxy: None,
            token: None,
            offline: false,
            cache_ttl_secs: 3600,
            cache_file: None,
            persist_cache: true,
        }
    }
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            depth: Depth::default(),
            exclude: Vec::new(),
            include_dev: true,
            unit_concurrency: 3,
            timeout_secs: None,
            overlap: OverlapPolicy::default(),
        }
    }
}

impl Settings {
    /// Parse a vine.toml document
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let settings: Settings = toml::from_str(content).map_err(|e| VineError::Config {
            message: format!("TOML parsing error: {}", e),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check value ranges
    pub fn validate(&self) -> ConfigResult<()> {
        if self.registry.concurrency == 0 {
            return Err(VineError::Config {
                message: "registry.concurrency must be at least 1".to_string(),
            });
        }
        if self.analysis.unit_concurrency == 0 {
            return Err(VineError::Config {
                message: "analysis.unit_concurrency must be at least 1".to_string(),
            });
        }
        if self.registry.url.trim().is_empty() {
            return Err(VineError::Config {
                message: "registry.url must not be empty".to_string(),
            });
        }
        for pattern in &self.analysis.exclude {
            glob::Pattern::new(pattern).map_err(|e| VineError::Config {
                message: format!("Invalid exclude pattern '{}': {}", pattern, e),
            })?;
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.registry.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.registry.cache_ttl_secs)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.analysis.timeout_secs.map(Duration::from_secs)
    }

    /// Where the registry cache is persisted, if persistence is on
    pub fn cache_path(&self) -> Option<Utf8PathBuf> {
        if !self.registry.persist_cache {
            return None;
        }
        if let Some(ref path) = self.registry.cache_file {
            return Some(path.clone());
        }
        let cache_dir = dirs::cache_dir()?;
        let cache_dir = Utf8PathBuf::try_from(cache_dir).ok()?;
        Some(cache_dir.join("vine").join("registry-cache.json"))
    }
}

/// Locates vine.toml
pub struct SettingsLoader {
    /// Directory the search starts from
    cwd: Utf8PathBuf,
}

impl SettingsLoader {
    pub fn new(cwd: impl Into<Utf8PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    /// Find a file in the directory or any of its parents
    pub fn resolve_config_path(&self, filename: &str) -> Option<Utf8PathBuf> {
        let mut current = Some(self.cwd.as_path());

        while let Some(dir) = current {
            let config_path = dir.join(filename);
            if config_path.is_file() {
                return Some(config_path);
            }
            // Move up one directory
            current = dir.parent();
        }

        None
    }

    /// Load vine.toml if one exists, otherwise defaults
    pub async fn load(&self) -> ConfigResult<Settings> {
        match self.resolve_config_path(SETTINGS_FILE) {
            Some(path) => load_from_file(&path).await,
            None => {
                debug!(cwd = %self.cwd, "no vine.toml found, using defaults");
                Ok(Settings::default())
            },
        }
    }
}

/// Load settings from a TOML file
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<Settings> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| VineError::io(format!("Failed to read {}", path), e))?;
    let settings = Settings::parse(&content).map_err(|e| match e {
        VineError::Config { message } => VineError::Config {
            message: format!("{}: {}", path, message),
        },
        other => other,
    })?;
    debug!(path = %path, "loaded settings");
    Ok(settings)
}

/// Environment and CLI override layering
pub struct SettingsLayering;

impl SettingsLayering {
    /// Apply environment and CLI overrides on top of file settings
    pub fn merge(
        base: Settings,
        env_overrides: &HashMap<String, String>,
        cli_overrides: &HashMap<String, String>,
    ) -> ConfigResult<Settings> {
        let mut merged = base;

        // Apply environment variable overrides
        for (key, value) in env_overrides {
            Self::apply_env_override(&mut merged, key, value)?;
        }

        // Apply CLI flag overrides (highest priority)
        for (key, value) in cli_overrides {
            Self::apply_cli_override(&mut merged, key, value)?;
        }

        merged.validate()?;
        Ok(merged)
    }

    fn apply_env_override(settings: &mut Settings, key: &str, value: &str) -> ConfigResult<()> {
        match key {
            "VINE_REGISTRY" => settings.registry.url = value.to_string(),
            "VINE_OFFLINE" => settings.registry.offline = parse_value(key, value)?,
            "VINE_CONCURRENCY" => settings.registry.concurrency = parse_value(key, value)?,
            "VINE_RETRIES" => settings.registry.retries = parse_value(key, value)?,
            "VINE_TIMEOUT" => settings.registry.timeout_secs = parse_value(key, value)?,
            "VINE_DEPTH" => settings.analysis.depth = parse_value(key, value)?,
            "VINE_PROXY" => settings.registry.proxy = Some(value.to_string()),
            "VINE_CACHE_TTL" => settings.registry.cache_ttl_secs = parse_value(key, value)?,
            "VINE_TOKEN" => settings.registry.token = Some(value.to_string()),
            _ => {
                // Unknown environment variable, ignore
            },
        }
        Ok(())
    }

    fn apply_cli_override(settings: &mut Settings, key: &str, value: &str) -> ConfigResult<()> {
        match key {
            "registry" => settings.registry.url = value.to_string(),
            "offline" => settings.registry.offline = parse_value(key, value)?,
            "no-cache" => settings.registry.persist_cache = !parse_value::<bool>(key, value)?,
            "depth" => settings.analysis.depth = parse_value(key, value)?,
            "exclude" => settings.analysis.exclude.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|pattern| !pattern.is_empty())
                    .map(str::to_string),
            ),
            "concurrency" => settings.registry.concurrency = parse_value(key, value)?,
            "timeout" => settings.analysis.timeout_secs = Some(parse_value(key, value)?),
            "overlap" => settings.analysis.overlap = parse_value(key, value)?,
            "include-dev" => settings.analysis.include_dev = parse_value(key, value)?,
            _ => {
                // Unknown CLI override, ignore
            },
        }
        Ok(())
    }

    /// Collect environment variable overrides
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with("VINE_"))
            .collect()
    }
}

fn parse_value<T>(key: &str, value: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|e| VineError::Config {
        message: format!("Invalid value '{}' for {}: {}", value, key, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.registry.concurrency, 8);
        assert_eq!(settings.registry.retries, 3);
        assert_eq!(settings.analysis.depth, Depth::Transitive(1));
        assert_eq!(settings.analysis.unit_concurrency, 3);
        assert_eq!(settings.analysis.overlap, OverlapPolicy::PreferRuntime);
        assert_eq!(settings.run_timeout(), None);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_parse_settings() {
        let settings = Settings::parse(
            r#"
[registry]
url = "http://localhost:4873"
concurrency = 4
offline = true
cache_file = "/tmp/vine-cache.json"

[analysis]
depth = "unbounded"
exclude = ["@types/*", "left-pad"]
timeout_secs = 60
overlap = "prefer-development"
"#,
        )
        .unwrap();

        assert_eq!(settings.registry.url, "http://localhost:4873");
        assert_eq!(settings.registry.concurrency, 4);
        assert!(settings.registry.offline);
        assert_eq!(settings.registry.retries, 3);
        assert_eq!(settings.analysis.depth, Depth::Unbounded);
        assert_eq!(settings.analysis.exclude.len(), 2);
        assert_eq!(settings.run_timeout(), Some(Duration::from_secs(60)));
        assert_eq!(settings.analysis.overlap, OverlapPolicy::PreferDevelopment);
        assert_eq!(
            settings.cache_path(),
            Some(Utf8PathBuf::from("/tmp/vine-cache.json"))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Settings::parse("[registry]\nconcurrency = 0"),
            Err(VineError::Config { .. })
        ));
        assert!(Settings::parse("[registry]\nunknown_key = 1").is_err());
        assert!(Settings::parse("[analysis]\ndepth = \"sideways\"").is_err());
        assert!(Settings::parse("[analysis]\nexclude = [\"[\"]").is_err());
    }

    #[test]
    fn test_depth() {
        assert_eq!("0".parse::<Depth>().unwrap(), Depth::Direct);
        assert_eq!("3".parse::<Depth>().unwrap(), Depth::Transitive(3));
        assert_eq!("deep".parse::<Depth>().unwrap(), Depth::Unbounded);
        assert!("-1".parse::<Depth>().is_err());

        assert!(!Depth::Direct.allows(0));
        assert!(Depth::Transitive(1).allows(0));
        assert!(!Depth::Transitive(1).allows(1));
        assert!(Depth::Unbounded.allows(100));

        let settings = Settings::parse("[analysis]\ndepth = 2").unwrap();
        assert_eq!(settings.analysis.depth, Depth::Transitive(2));
    }

    #[test]
    fn test_merge_layers() {
        let mut base = Settings::default();
        base.analysis.exclude.push("@types/*".to_string());

        let env = HashMap::from([
            ("VINE_REGISTRY".to_string(), "http://env-registry".to_string()),
            ("VINE_CONCURRENCY".to_string(), "2".to_string()),
            ("VINE_DEPTH".to_string(), "unbounded".to_string()),
        ]);
        let cli = HashMap::from([
            ("registry".to_string(), "http://cli-registry".to_string()),
            ("exclude".to_string(), "left-pad, lodash.*".to_string()),
            ("no-cache".to_string(), "true".to_string()),
        ]);

        let merged = SettingsLayering::merge(base, &env, &cli).unwrap();

        // CLI wins over environment
        assert_eq!(merged.registry.url, "http://cli-registry");
        assert_eq!(merged.registry.concurrency, 2);
        assert_eq!(merged.analysis.depth, Depth::Unbounded);
        assert_eq!(
            merged.analysis.exclude,
            vec!["@types/*".to_string(), "left-pad".to_string(), "lodash.*".to_string()]
        );
        assert!(!merged.registry.persist_cache);
        assert_eq!(merged.cache_path(), None);
    }

    #[test]
    fn test_invalid_override() {
        let env = HashMap::from([("VINE_OFFLINE".to_string(), "maybe".to_string())]);
        assert!(matches!(
            SettingsLayering::merge(Settings::default(), &env, &HashMap::new()),
            Err(VineError::Config { .. })
        ));
    }

    #[test]
    fn test_collect_env_overrides() {
        std::env::set_var("VINE_TEST_COLLECT", "1");
        std::env::set_var("NOT_VINE_TEST_COLLECT", "ignored");

        let overrides = SettingsLayering::collect_env_overrides();

        assert!(overrides.contains_key("VINE_TEST_COLLECT"));
        assert!(!overrides.contains_key("NOT_VINE_TEST_COLLECT"));

        std::env::remove_var("VINE_TEST_COLLECT");
        std::env::remove_var("NOT_VINE_TEST_COLLECT");
    }

    #[tokio::test]
    async fn test_loader_walks_up() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let nested = root.join("packages").join("web");
        tokio::fs::create_dir_all(&nested).await.unwrap();
        tokio::fs::write(root.join(SETTINGS_FILE), "[registry]\nretries = 5\n")
            .await
            .unwrap();

        let loader = SettingsLoader::new(nested);
        assert_eq!(
            loader.resolve_config_path(SETTINGS_FILE),
            Some(root.join(SETTINGS_FILE))
        );
        let settings = loader.load().await.unwrap();
        assert_eq!(settings.registry.retries, 5);
    }

    #[tokio::test]
    async fn test_loader_defaults_without_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let settings = SettingsLoader::new(root).load().await.unwrap();
        assert_eq!(settings, Settings::default());
    }
}
