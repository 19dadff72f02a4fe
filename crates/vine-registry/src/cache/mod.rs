//! Metadata caching with TTL support

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vine_core::{Version, VineError};

use crate::api::{RegistryPackage, VersionMetadata};
use crate::RegistryResult;

/// Default time-to-live for cached metadata (1 hour)
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Cache key for a full package document
pub fn package_key(name: &str) -> String {
    format!("package:{}", name)
}

/// Cache key for a single version document
pub fn version_key(name: &str, version: &Version) -> String {
    format!("version:{}@{}", name, version)
}

/// Cached registry document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum CachedPayload {
    Package(Arc<RegistryPackage>),
    Version(Arc<VersionMetadata>),
}

/// Cache entry with TTL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Cached document
    pub payload: CachedPayload,
    /// When the document was fetched
    pub fetched_at: DateTime<Utc>,
    /// Time-to-live duration
    pub ttl: Duration,
}

impl CacheEntry {
    /// Create new cache entry with default TTL (1 hour)
    pub fn new(payload: CachedPayload) -> Self {
        Self::with_ttl(payload, DEFAULT_TTL)
    }

    /// Create cache entry with custom TTL
    pub fn with_ttl(payload: CachedPayload, ttl: Duration) -> Self {
        Self {
            payload,
            fetched_at: Utc::now(),
            ttl,
        }
    }

    /// Check if cache entry is still fresh
    pub fn is_fresh(&self) -> bool {
        match self.age() {
            Some(age) => age <= self.ttl,
            None => false, // Fetched in the future, consider stale
        }
    }

    /// Get age of cache entry
    pub fn age(&self) -> Option<Duration> {
        Utc::now().signed_duration_since(self.fetched_at).to_std().ok()
    }
}

/// In-memory metadata cache with TTL
///
/// Writes replace whole entries, so concurrent fetches of the same key
/// resolve to whichever response landed last.
#[derive(Debug)]
pub struct MetadataCache {
    /// Cache storage
    entries: DashMap<String, CacheEntry>,
    /// TTL applied by `insert`
    ttl: Duration,
}

impl MetadataCache {
    /// Create new metadata cache
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Create a cache whose entries expire after `ttl`
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Load a persisted cache; missing or unreadable files yield an empty cache
    pub async fn load(path: impl AsRef<Path>, ttl: Duration) -> Self {
        let path = path.as_ref();
        let cache = Self::with_ttl(ttl);

        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no persisted registry cache");
                return cache;
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read registry cache, starting empty");
                return cache;
            },
        };

        match serde_json::from_str::<Vec<(String, CacheEntry)>>(&content) {
            Ok(loaded) => {
                let mut dropped = 0;
                for (key, entry) in loaded {
                    if entry.is_fresh() {
                        cache.entries.insert(key, entry);
                    } else {
                        dropped += 1;
                    }
                }
                debug!(
                    path = %path.display(),
                    entries = cache.len(),
                    stale = dropped,
                    "loaded registry cache"
                );
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "registry cache is corrupt, starting empty");
            },
        }

        cache
    }

    /// Write fresh entries to `path` atomically (temp file + rename)
    pub async fn persist(&self, path: impl AsRef<Path>) -> RegistryResult<()> {
        let path = path.as_ref();
        let mut entries: Vec<(String, CacheEntry)> = self
            .entries
            .iter()
            .filter(|entry| entry.is_fresh())
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let content = serde_json::to_string(&entries).map_err(|e| {
            VineError::io(
                "Failed to serialize registry cache".to_string(),
                std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            )
        })?;

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| VineError::io("Failed to create cache directory".to_string(), e))?;
        }

        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, content)
            .await
            .map_err(|e| VineError::io("Failed to write registry cache".to_string(), e))?;
        tokio::fs::rename(&tmp_path, path)
            .await
            .map_err(|e| VineError::io("Failed to replace registry cache".to_string(), e))?;

        debug!(path = %path.display(), entries = entries.len(), "persisted registry cache");
        Ok(())
    }

    /// Get a cached payload if fresh
    pub fn get(&self, key: &str) -> Option<CachedPayload> {
        let fresh = {
            let entry = self.entries.get(key)?;
            entry.is_fresh().then(|| entry.payload.clone())
        };
        if fresh.is_none() {
            // Remove stale entry
            self.entries.remove_if(key, |_, entry| !entry.is_fresh());
        }
        fresh
    }

    /// Cached full document for `name`
    pub fn get_package(&self, name: &str) -> Option<Arc<RegistryPackage>> {
        match self.get(&package_key(name))? {
            CachedPayload::Package(package) => Some(package),
            CachedPayload::Version(_) => None,
        }
    }

    /// Cached version document for `name@version`
    pub fn get_version(&self, name: &str, version: &Version) -> Option<Arc<VersionMetadata>> {
        match self.get(&version_key(name, version))? {
            CachedPayload::Version(meta) => Some(meta),
            CachedPayload::Package(_) => None,
        }
    }

    /// Store a payload with the cache TTL
    pub fn insert(&self, key: String, payload: CachedPayload) {
        self.insert_with_ttl(key, payload, self.ttl);
    }

    /// Store a payload with custom TTL
    pub fn insert_with_ttl(&self, key: String, payload: CachedPayload, ttl: Duration) {
        self.entries.insert(key, CacheEntry::with_ttl(payload, ttl));
    }

    /// Store an already-built entry as is
    pub fn insert_entry(&self, key: String, entry: CacheEntry) {
        self.entries.insert(key, entry);
    }

    /// Store a full package document
    pub fn insert_package(&self, package: Arc<RegistryPackage>) {
        self.insert(package_key(&package.name), CachedPayload::Package(package));
    }

    /// Store a version document
    pub fn insert_version(&self, name: &str, version: &Version, meta: Arc<VersionMetadata>) {
        self.insert(version_key(name, version), CachedPayload::Version(meta));
    }

    /// Number of stored entries (fresh or not)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// TTL applied to new entries
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new()
    }
}
