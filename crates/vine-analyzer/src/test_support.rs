//! Shared fixtures for analyzer tests

use std::time::Duration;

use camino::Utf8Path;
use serde_json::{json, Value};
use vine_config::manifest::parse_manifest;
use vine_config::{Lockfile, ProjectModel};
use vine_registry::{RegistryClient, RegistryOptions, RetryConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::unit::AnalysisContext;

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

pub fn project(manifest: Value, lockfile: Option<Value>) -> ProjectModel {
    let root = Utf8Path::new("/projects/app");
    let manifest = parse_manifest(&manifest.to_string(), &root.join("package.json")).unwrap();
    let lockfile = lockfile.map(|lock| {
        Lockfile::parse(&lock.to_string(), &root.join("package-lock.json")).unwrap()
    });
    ProjectModel::new(root, manifest, lockfile)
}

/// Context with no reachable registry
pub fn offline_context(manifest: Value, lockfile: Option<Value>) -> AnalysisContext {
    AnalysisContext::new(project(manifest, lockfile), client_at("http://127.0.0.1:9"))
}

/// Serve a registry document and each of its versions
pub async fn mount_document(server: &MockServer, document: Value) {
    let name = document["name"].as_str().unwrap().to_string();
    if let Some(versions) = document["versions"].as_object() {
        for (version, meta) in versions {
            Mock::given(method("GET"))
                .and(path(format!("/{}/{}", name, version)))
                .respond_with(ResponseTemplate::new(200).set_body_json(meta.clone()))
                .mount(server)
                .await;
        }
    }
    Mock::given(method("GET"))
        .and(path(format!("/{}", name)))
        .respond_with(ResponseTemplate::new(200).set_body_json(document))
        .mount(server)
        .await;
}

pub fn app_manifest(dependencies: Value) -> Value {
    json!({ "name": "app", "version": "1.0.0", "dependencies": dependencies })
}
