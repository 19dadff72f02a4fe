//! Unit tests for requirement collection

use super::*;

use serde_json::json;
use wiremock::MockServer;

use crate::test_support::{client_at, client_for, mount_package, project, Published};

fn app(dependencies: serde_json::Value) -> serde_json::Value {
    json!({ "name": "app", "version": "1.0.0", "dependencies": dependencies })
}

#[test]
fn test_exclusions() {
    let exclusions = Exclusions::new(["left-pad", "@types/*", "  "]).unwrap();
    assert!(!exclusions.is_empty());
    assert!(exclusions.is_excluded("left-pad"));
    assert!(exclusions.is_excluded("@types/node"));
    assert!(!exclusions.is_excluded("left-pad-extra"));
    assert!(!exclusions.is_excluded("react"));

    assert!(Exclusions::new(Vec::<String>::new()).unwrap().is_empty());
    assert!(Exclusions::new(["pkg-["]).is_err());
}

#[tokio::test]
async fn test_direct_depth_makes_no_requests() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    let model = project(app(json!({ "left-pad": "^1.0.0", "react": "^18.0.0" })), None);

    let table = RequirementCollector::new(client.clone())
        .collect(&model, Depth::Direct)
        .await;

    assert_eq!(table.packages().collect::<Vec<_>>(), vec!["left-pad", "react"]);
    let left_pad = &table.get("left-pad")[0];
    assert_eq!(left_pad.required_by, "app");
    assert_eq!(left_pad.kind, RequirementKind::Direct);
    assert_eq!(client.request_count(), 0);
}

#[tokio::test]
async fn test_one_hop_reads_peer_requirements() {
    let server = MockServer::start().await;
    mount_package(
        &server,
        "pkg-a",
        &[Published {
            version: "1.0.0",
            dependencies: &[],
            peers: &[("core", "^2.0.0")],
            optional_peers: &[],
        }],
    )
    .await;
    mount_package(
        &server,
        "core",
        &[Published {
            version: "2.0.0",
            dependencies: &[("tslib", "^2.0.0")],
            peers: &[],
            optional_peers: &[],
        }],
    )
    .await;

    let model = project(
        app(json!({ "pkg-a": "^1.0.0" })),
        Some(json!({ "pkg-a": "1.0.0", "core": "2.0.0" })),
    );
    let table = RequirementCollector::new(client_for(&server))
        .collect(&model, Depth::default())
        .await;

    let core = table.get("core");
    assert_eq!(core.len(), 1);
    assert_eq!(core[0].required_by, "pkg-a");
    assert_eq!(core[0].kind, RequirementKind::Peer);
    assert_eq!(core[0].range, "^2.0.0");
    // core is two hops away from the manifest, so its own dependencies are not read
    assert!(table.get("tslib").is_empty());

    let deep = RequirementCollector::new(client_for(&server))
        .collect(&model, Depth::Unbounded)
        .await;
    assert_eq!(deep.get("tslib")[0].required_by, "core");
}

#[tokio::test]
async fn test_circular_peers_terminate() {
    let server = MockServer::start().await;
    mount_package(
        &server,
        "a",
        &[Published {
            version: "1.0.0",
            dependencies: &[],
            peers: &[("b", "^1.0.0")],
            optional_peers: &[],
        }],
    )
    .await;
    mount_package(
        &server,
        "b",
        &[Published {
            version: "1.0.0",
            dependencies: &[],
            peers: &[("a", "^1.0.0")],
            optional_peers: &[],
        }],
    )
    .await;

    let client = client_for(&server);
    let model = project(app(json!({ "a": "^1.0.0" })), Some(json!({ "a": "1.0.0", "b": "1.0.0" })));
    let table = RequirementCollector::new(client.clone())
        .collect(&model, Depth::Unbounded)
        .await;

    assert_eq!(table.packages().collect::<Vec<_>>(), vec!["a", "b"]);
    let required_by_a: Vec<&str> = table.get("a").iter().map(|r| r.required_by.as_str()).collect();
    assert_eq!(required_by_a, vec!["app", "b"]);
    assert_eq!(table.get("b")[0].required_by, "a");
    // One version lookup per package, never repeated
    assert_eq!(client.request_count(), 2);
}

#[tokio::test]
async fn test_lock_recorded_dependencies_need_no_registry() {
    let client = client_at("http://127.0.0.1:9");
    let model = project(
        app(json!({ "react-dom": "^18.0.0" })),
        Some(json!({
            "name": "app",
            "lockfileVersion": 3,
            "packages": {
                "": { "name": "app", "version": "1.0.0" },
                "node_modules/react-dom": {
                    "version": "18.2.0",
                    "dependencies": { "scheduler": "^0.23.0" },
                    "peerDependencies": { "react": "^18.2.0", "react-native": "*" },
                    "peerDependenciesMeta": { "react-native": { "optional": true } }
                },
                "node_modules/react": { "version": "18.2.0" },
                "node_modules/scheduler": { "version": "0.23.0" }
            }
        })),
    );

    let table = RequirementCollector::new(client.clone())
        .collect(&model, Depth::default())
        .await;

    assert_eq!(
        table.packages().collect::<Vec<_>>(),
        vec!["react", "react-dom", "react-native", "scheduler"]
    );
    assert_eq!(table.get("scheduler")[0].kind, RequirementKind::Dependency);
    assert!(!table.get("react")[0].optional);
    assert!(table.get("react-native")[0].optional);
    assert_eq!(client.request_count(), 0);
}

#[tokio::test]
async fn test_excluded_packages_are_not_expanded() {
    let server = MockServer::start().await;
    mount_package(
        &server,
        "pkg-a",
        &[Published {
            version: "1.0.0",
            dependencies: &[("@types/node", "*"), ("left-pad", "^1.0.0")],
            peers: &[],
            optional_peers: &[],
        }],
    )
    .await;

    let client = client_for(&server);
    let model = project(
        app(json!({ "pkg-a": "^1.0.0", "@types/react": "^18.0.0" })),
        Some(json!({ "pkg-a": "1.0.0" })),
    );
    let table = RequirementCollector::new(client.clone())
        .with_exclusions(Exclusions::new(["@types/*"]).unwrap())
        .collect(&model, Depth::default())
        .await;

    assert_eq!(table.packages().collect::<Vec<_>>(), vec!["left-pad", "pkg-a"]);
    assert_eq!(client.request_count(), 1);
}

#[tokio::test]
async fn test_unreachable_registry_marks_unverified() {
    let client = client_at("http://127.0.0.1:9");
    let model = project(app(json!({ "left-pad": "^1.0.0" })), Some(json!({ "left-pad": "1.3.0" })));

    let table = RequirementCollector::new(client)
        .collect(&model, Depth::default())
        .await;

    assert_eq!(table.len(), 1);
    assert!(table.is_unverified("left-pad"));
}

#[tokio::test]
async fn test_not_installed_uses_requirement_ranges() {
    let server = MockServer::start().await;
    mount_package(
        &server,
        "pkg-a",
        &[
            Published::bare("1.0.0"),
            Published {
                version: "1.4.0",
                dependencies: &[("ms", "^2.1.0")],
                peers: &[],
                optional_peers: &[],
            },
        ],
    )
    .await;

    // Lock file present but without pkg-a: guess from the declared range
    let model = project(app(json!({ "pkg-a": "^1.0.0" })), Some(json!({ "other": "1.0.0" })));
    let table = RequirementCollector::new(client_for(&server))
        .collect(&model, Depth::default())
        .await;

    assert_eq!(table.get("ms")[0].required_by, "pkg-a");
    assert!(!table.is_unverified("pkg-a"));
}
