//! Shared fixtures for resolver tests

use std::time::Duration;

use camino::Utf8Path;
use serde_json::{json, Map, Value};
use vine_config::manifest::parse_manifest;
use vine_config::{Lockfile, ProjectModel};
use vine_registry::{RegistryClient, RegistryOptions, RetryConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Client against `server` with near-instant retries
pub fn client_for(server: &MockServer) -> RegistryClient {
    client_at(&server.uri())
}

pub fn client_at(base_url: &str) -> RegistryClient {
    RegistryClient::with_options(RegistryOptions {
        base_url: base_url.to_string(),
        retry: RetryConfig {
            max_retries: 1,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            multiplier: 2.0,
        },
        timeout: Duration::from_secs(2),
        ..RegistryOptions::default()
    })
    .unwrap()
}

/// One published version: `(version, dependencies, peerDependencies)`
pub struct Published<'a> {
    pub version: &'a str,
    pub dependencies: &'a [(&'a str, &'a str)],
    pub peers: &'a [(&'a str, &'a str)],
    pub optional_peers: &'a [&'a str],
}

impl<'a> Published<'a> {
    pub fn bare(version: &'a str) -> Self {
        Self {
            version,
            dependencies: &[],
            peers: &[],
            optional_peers: &[],
        }
    }
}

fn pairs(entries: &[(&str, &str)]) -> Value {
    let map: Map<String, Value> = entries
        .iter()
        .map(|(name, range)| (name.to_string(), json!(range)))
        .collect();
    Value::Object(map)
}

/// Registry document for `name` with the given versions
pub fn package_document(name: &str, versions: &[Published<'_>]) -> Value {
    let mut documents = Map::new();
    for published in versions {
        let meta: Map<String, Value> = published
            .optional_peers
            .iter()
            .map(|peer| (peer.to_string(), json!({ "optional": true })))
            .collect();
        documents.insert(
            published.version.to_string(),
            json!({
                "name": name,
                "version": published.version,
                "dependencies": pairs(published.dependencies),
                "peerDependencies": pairs(published.peers),
                "peerDependenciesMeta": meta,
            }),
        );
    }
    let latest = versions.last().map(|v| v.version).unwrap_or("0.0.0");
    json!({
        "name": name,
        "dist-tags": { "latest": latest },
        "versions": documents,
    })
}

/// Serve the full document at `GET /{name}` and each version at `GET /{name}/{version}`
pub async fn mount_package(server: &MockServer, name: &str, versions: &[Published<'_>]) {
    let document = package_document(name, versions);
    for published in versions {
        Mock::given(method("GET"))
            .and(path(format!("/{}/{}", name, published.version)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(document["versions"][published.version].clone()),
            )
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path(format!("/{}", name)))
        .respond_with(ResponseTemplate::new(200).set_body_json(document))
        .mount(server)
        .await;
}

/// Project model from inline manifest and lock file JSON
pub fn project(manifest: Value, lockfile: Option<Value>) -> ProjectModel {
    let root = Utf8Path::new("/projects/app");
    let manifest = parse_manifest(&manifest.to_string(), &root.join("package.json")).unwrap();
    let lockfile = lockfile.map(|lock| {
        Lockfile::parse(&lock.to_string(), &root.join("package-lock.json")).unwrap()
    });
    ProjectModel::new(root, manifest, lockfile)
}
