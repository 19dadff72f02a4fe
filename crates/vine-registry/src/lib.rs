//! npm registry client for Vine
//!
//! This crate fetches package and version metadata from an npm-compatible
//! registry. Every clone of a `RegistryClient` shares one request limiter,
//! one retry policy and one TTL cache, so concurrent analyses never exceed
//! the configured request budget and never fetch the same document twice
//! while it is fresh.

pub mod api;
pub mod cache;
pub mod client;

// Re-export main types
pub use api::{PeerDependencyMeta, RegistryPackage, VersionMetadata};
pub use cache::{CacheEntry, CachedPayload, MetadataCache, DEFAULT_TTL};
pub use client::{AuthConfig, RegistryClient, RegistryOptions, RetryConfig, DEFAULT_REGISTRY};

use vine_core::VineError;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, VineError>;
