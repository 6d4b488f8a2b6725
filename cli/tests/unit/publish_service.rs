//! Publish and fetch use-cases against a mocked manifest registry.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;

use agentport_cli::application::ports::PublishReceipt;
use agentport_cli::application::services::publish_service::{fetch_manifest, publish_manifest};
use agentport_cli::domain::SchemaRegistry;
use mockall::predicate::eq;

use crate::helpers::{MINIMAL, MemoryReader, NO_SCHEMA_VERSION, RecordingReporter};
use crate::mocks::MockRegistry;

#[test]
fn test_publish_sends_dns_name_version_and_verbatim_source() {
    let reader = MemoryReader::default().with("agent.yaml", MINIMAL);
    let mut registry = MockRegistry::new();
    registry
        .expect_publish()
        .with(eq("content-moderator"), eq("1.0.0"), eq(MINIMAL))
        .times(1)
        .returning(|name, version, _| {
            Ok(PublishReceipt {
                id: name.to_string(),
                version: version.to_string(),
                url: format!("https://registry.example.com/manifests/{name}/{version}"),
            })
        });

    let reporter = RecordingReporter::default();
    let receipt = publish_manifest(
        &reader,
        &SchemaRegistry::with_builtin_schemas(),
        &registry,
        &reporter,
        Path::new("agent.yaml"),
    )
    .unwrap();

    assert_eq!(receipt.id, "content-moderator");
    assert!(reporter.lines.borrow().iter().any(|l| l.contains("published content-moderator@1.0.0")));
}

#[test]
fn test_publish_refuses_invalid_manifest() {
    let reader = MemoryReader::default().with("agent.yaml", NO_SCHEMA_VERSION);
    let mut registry = MockRegistry::new();
    registry.expect_publish().never();

    let err = publish_manifest(
        &reader,
        &SchemaRegistry::with_builtin_schemas(),
        &registry,
        &RecordingReporter::default(),
        Path::new("agent.yaml"),
    )
    .unwrap_err();

    let message = format!("{err:#}");
    assert!(message.contains("refusing to publish"), "got: {message}");
    assert!(message.contains("schemaVersion"), "got: {message}");
}

#[test]
fn test_publish_surfaces_registry_failure() {
    let reader = MemoryReader::default().with("agent.yaml", MINIMAL);
    let mut registry = MockRegistry::new();
    registry
        .expect_publish()
        .returning(|_, _, _| Err(anyhow::anyhow!("registry returned 409: version exists")));

    let err = publish_manifest(
        &reader,
        &SchemaRegistry::with_builtin_schemas(),
        &registry,
        &RecordingReporter::default(),
        Path::new("agent.yaml"),
    )
    .unwrap_err();
    assert!(format!("{err:#}").contains("version exists"));
}

#[test]
fn test_fetch_accepts_name_and_name_version() {
    let mut registry = MockRegistry::new();
    registry
        .expect_fetch()
        .times(2)
        .returning(|id| Ok(format!("# {id}\n")));

    assert_eq!(fetch_manifest(&registry, "content-moderator").unwrap(), "# content-moderator\n");
    assert_eq!(
        fetch_manifest(&registry, "content-moderator/1.0.0").unwrap(),
        "# content-moderator/1.0.0\n"
    );
}

#[test]
fn test_fetch_rejects_traversal_ids_without_calling_registry() {
    let mut registry = MockRegistry::new();
    registry.expect_fetch().never();

    for id in ["", "../secrets", "a/b/c", "a/..", "a\\b", "a//b"] {
        assert!(fetch_manifest(&registry, id).is_err(), "accepted {id:?}");
    }
}
