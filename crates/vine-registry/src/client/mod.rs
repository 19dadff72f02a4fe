//! HTTP client implementation with a shared request limiter and retry logic

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;
use vine_core::{Version, VersionReq, VineError};

use crate::api::{RegistryPackage, VersionMetadata};
use crate::cache::MetadataCache;
use crate::RegistryResult;

/// Public npm registry
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";

/// Configuration for exponential backoff retry logic
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay to wait after `delay` has been used once
    fn next_delay(&self, delay: Duration) -> Duration {
        std::cmp::min(
            Duration::from_millis((delay.as_millis() as f64 * self.multiplier) as u64),
            self.max_delay,
        )
    }
}

/// Authentication configuration for registry access
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Bearer token for authentication
    pub token: Option<String>,
    /// Basic auth username
    pub username: Option<String>,
    /// Basic auth password
    pub password: Option<String>,
}

/// Everything needed to build a `RegistryClient`
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// Registry base URL
    pub base_url: String,
    /// Maximum in-flight requests across every clone of the client
    pub concurrency: usize,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
    /// Serve from cache only
    pub offline: bool,
    /// Registry credentials
    pub auth: Option<AuthConfig>,
    /// HTTP(S) proxy URL
    pub proxy: Option<String>,
    /// User agent header
    pub user_agent: String,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_REGISTRY.to_string(),
            concurrency: 8,
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            offline: false,
            auth: None,
            proxy: None,
            user_agent: concat!("vine/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// npm registry client
///
/// Clones share the HTTP connection pool, the request limiter, the cache and
/// the request counter.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    /// Underlying HTTP client with connection pooling
    client: Client,
    /// Retry configuration
    retry_config: RetryConfig,
    /// Base registry URL, without trailing slash
    base_url: String,
    /// Never touch the network
    offline: bool,
    /// Global in-flight request budget
    limiter: Arc<Semaphore>,
    /// Shared metadata cache
    cache: Arc<MetadataCache>,
    /// Network attempts issued
    requests: Arc<AtomicUsize>,
}

impl RegistryClient {
    /// Create a client for the public registry with default options
    pub fn new() -> RegistryResult<Self> {
        Self::with_options(RegistryOptions::default())
    }

    /// Create a client with its own empty cache
    pub fn with_options(options: RegistryOptions) -> RegistryResult<Self> {
        Self::with_cache(options, Arc::new(MetadataCache::new()))
    }

    /// Create a client over an existing cache
    pub fn with_cache(options: RegistryOptions, cache: Arc<MetadataCache>) -> RegistryResult<Self> {
        let base_url = Url::parse(&options.base_url).map_err(|e| VineError::Config {
            message: format!("Invalid registry URL '{}': {}", options.base_url, e),
        })?;

        let mut builder = ClientBuilder::new()
            // Connection pooling configuration
            .pool_max_idle_per_host(options.concurrency.max(1))
            .pool_idle_timeout(Duration::from_secs(90))
            // Request timeout
            .timeout(options.timeout)
            .gzip(true)
            .user_agent(options.user_agent.as_str());

        if let Some(ref proxy) = options.proxy {
            let proxy = reqwest::Proxy::all(proxy).map_err(|e| VineError::Config {
                message: format!("Invalid proxy '{}': {}", proxy, e),
            })?;
            builder = builder.proxy(proxy);
        }

        if let Some(ref auth) = options.auth {
            if let Some(value) = authorization_header(auth)? {
                let mut headers = HeaderMap::new();
                headers.insert(AUTHORIZATION, value);
                builder = builder.default_headers(headers);
            }
        }

        let client = builder
            .build()
            .map_err(|e| VineError::network(format!("Failed to create HTTP client: {}", e), e))?;

        Ok(Self {
            client,
            retry_config: options.retry,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            offline: options.offline,
            limiter: Arc::new(Semaphore::new(options.concurrency.max(1))),
            cache,
            requests: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Shared metadata cache
    pub fn cache(&self) -> &Arc<MetadataCache> {
        &self.cache
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Number of network attempts issued so far (retries included)
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    /// Fetch the full package document
    ///
    /// Returns `None` when the package does not exist, when the registry could
    /// not be reached after retries, or on a cache miss in offline mode.
    pub async fn fetch_package(&self, name: &str) -> Option<Arc<RegistryPackage>> {
        if let Some(package) = self.cache.get_package(name) {
            debug!(package = name, "registry cache hit");
            return Some(package);
        }
        if self.offline {
            debug!(package = name, "offline cache miss");
            return None;
        }

        debug!(package = name, "registry cache miss");
        let url = format!("{}/{}", self.base_url, encode_package_name(name));
        match self.with_retry(|| self.get_json::<RegistryPackage>(&url, name)).await {
            Ok(package) => {
                let package = Arc::new(package);
                self.cache.insert_package(package.clone());
                Some(package)
            },
            Err(error) => {
                self.report_failure(name, &error);
                None
            },
        }
    }

    /// Fetch the metadata of the version `range` selects
    ///
    /// `range` may be an exact version, any npm range or a dist-tag.
    pub async fn fetch_version(&self, name: &str, range: &str) -> Option<Arc<VersionMetadata>> {
        let range = range.trim();
        if let Some(exact) = VersionReq::parse(range).ok().and_then(|req| req.exact_version()) {
            return self.fetch_exact(name, &exact).await;
        }

        let package = self.fetch_package(name).await?;
        let version = match package.resolve(range) {
            Some(version) => version,
            None => {
                debug!(package = name, range, "no published version matches");
                return None;
            },
        };

        if let Some(meta) = self.cache.get_version(name, &version) {
            return Some(meta);
        }
        let meta = Arc::new(package.version(&version)?.clone());
        self.cache.insert_version(name, &version, meta.clone());
        Some(meta)
    }

    async fn fetch_exact(&self, name: &str, version: &Version) -> Option<Arc<VersionMetadata>> {
        if let Some(meta) = self.cache.get_version(name, version) {
            debug!(package = name, %version, "registry cache hit");
            return Some(meta);
        }

        // A cached full document already knows every version
        if let Some(package) = self.cache.get_package(name) {
            let meta = Arc::new(package.version(version)?.clone());
            self.cache.insert_version(name, version, meta.clone());
            return Some(meta);
        }

        if self.offline {
            debug!(package = name, %version, "offline cache miss");
            return None;
        }

        let url = format!(
            "{}/{}/{}",
            self.base_url,
            encode_package_name(name),
            version
        );
        match self.with_retry(|| self.get_json::<VersionMetadata>(&url, name)).await {
            Ok(meta) => {
                let meta = Arc::new(meta);
                self.cache.insert_version(name, version, meta.clone());
                Some(meta)
            },
            Err(error) => {
                self.report_failure(name, &error);
                None
            },
        }
    }

    fn report_failure(&self, name: &str, error: &VineError) {
        match error {
            VineError::PackageNotFound { .. } => {
                debug!(package = name, "package not found in registry");
            },
            _ => warn!(package = name, error = %error, "registry lookup failed"),
        }
    }

    /// Execute HTTP request with exponential backoff retry logic
    ///
    /// A limiter permit is held only while an attempt is in flight, never
    /// during the backoff sleep.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> RegistryResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = RegistryResult<T>>,
    {
        let mut delay = self.retry_config.initial_delay;
        let mut attempt = 0;

        loop {
            let result = {
                let _permit = self.limiter.acquire().await.map_err(|e| {
                    VineError::network("Registry request limiter closed".to_string(), e)
                })?;
                self.requests.fetch_add(1, Ordering::Relaxed);
                operation().await
            };

            match result {
                Ok(value) => return Ok(value),
                Err(error) => {
                    // Don't retry on final attempt or on permanent failures
                    if attempt >= self.retry_config.max_retries || !error.is_transient() {
                        return Err(error);
                    }
                    attempt += 1;
                    debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying registry request"
                    );

                    tokio::time::sleep(delay).await;
                    delay = self.retry_config.next_delay(delay);
                },
            }
        }
    }

    /// Single GET decoded as JSON
    async fn get_json<T: DeserializeOwned>(&self, url: &str, name: &str) -> RegistryResult<T> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| VineError::network(format!("Failed to fetch {}: {}", name, e), e))?;

        match response.status() {
            StatusCode::OK => response.json::<T>().await.map_err(|e| {
                VineError::network(format!("Failed to parse metadata for {}: {}", name, e), e)
            }),
            StatusCode::NOT_FOUND => Err(VineError::PackageNotFound {
                name: name.to_string(),
            }),
            status => Err(VineError::RegistryStatus {
                status: status.as_u16(),
                name: name.to_string(),
            }),
        }
    }
}

fn authorization_header(auth: &AuthConfig) -> RegistryResult<Option<HeaderValue>> {
    let value = if let Some(ref token) = auth.token {
        format!("Bearer {}", token)
    } else if let (Some(username), Some(password)) = (&auth.username, &auth.password) {
        use base64::{engine::general_purpose, Engine as _};
        format!(
            "Basic {}",
            general_purpose::STANDARD.encode(format!("{}:{}", username, password))
        )
    } else {
        return Ok(None);
    };

    let mut header = HeaderValue::from_str(&value).map_err(|e| VineError::Config {
        message: format!("Invalid registry credentials: {}", e),
    })?;
    header.set_sensitive(true);
    Ok(Some(header))
}

/// Encode package name for URL (handle scoped packages)
pub fn encode_package_name(name: &str) -> String {
    if name.starts_with('@') {
        // Scoped package: @org/pkg -> @org%2fpkg
        name.replace('/', "%2f")
    } else {
        name.to_string()
    }
}
