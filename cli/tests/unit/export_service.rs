//! Export use-case: option collection, dry runs, writes and cancellation.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::{Path, PathBuf};

use agentport_cli::application::ports::{CancelFlag, WriteOutcome, WriteStatus};
use agentport_cli::application::services::export_service::{
    ExportRequest, collect_options, export_manifests,
};
use agentport_cli::domain::error::ExportError;
use agentport_cli::infra::fs::FsArtifactWriter;

use crate::helpers::{MINIMAL, MemoryReader, NO_SCHEMA_VERSION, RecordingReporter, named, orchestrator};
use crate::mocks::MockWriter;

fn request(manifests: &[&str], platforms: &[&str]) -> ExportRequest {
    ExportRequest {
        manifests: manifests.iter().map(PathBuf::from).collect(),
        platforms: platforms.iter().map(|p| (*p).to_string()).collect(),
        output_root: PathBuf::from("dist"),
        ..ExportRequest::default()
    }
}

#[test]
fn test_collect_options_applies_assignments_over_file() {
    let reader = MemoryReader::default().with("opts.yaml", "replicas: 2\nnamespace: agents\n");
    let options = collect_options(
        &reader,
        Some(Path::new("opts.yaml")),
        &["replicas=4".to_string(), "debug=true".to_string()],
    )
    .unwrap();

    assert_eq!(options.get("replicas"), Some(&serde_json::json!(4)));
    assert_eq!(options.get("namespace"), Some(&serde_json::json!("agents")));
    assert_eq!(options.get("debug"), Some(&serde_json::json!(true)));
}

#[test]
fn test_collect_options_rejects_assignment_without_equals() {
    let err = collect_options(&MemoryReader::default(), None, &["replicas".to_string()]).unwrap_err();
    assert!(
        matches!(err.downcast_ref::<ExportError>(), Some(ExportError::MalformedOption(o)) if o == "replicas"),
        "got: {err:#}"
    );
}

#[tokio::test]
async fn test_dry_run_never_touches_writer() {
    let reader = MemoryReader::default().with("agent.yaml", MINIMAL);
    let mut writer = MockWriter::new();
    writer.expect_write().never();

    let report = export_manifests(
        &reader,
        &writer,
        &orchestrator(),
        &RecordingReporter::default(),
        &CancelFlag::new(),
        ExportRequest {
            dry_run: true,
            ..request(&["agent.yaml"], &["npm-package"])
        },
    )
    .await
    .unwrap();

    assert!(report.is_success());
    assert!(report.dry_run);
    assert!(report.exports[0].write.is_none());
    assert!(!report.exports[0].result.artifacts.is_empty());
}

#[tokio::test]
async fn test_failed_export_is_not_written() {
    let reader = MemoryReader::default()
        .with("good.yaml", MINIMAL)
        .with("bad.yaml", &NO_SCHEMA_VERSION.replace("Content Moderator", "Other"));
    let mut writer = MockWriter::new();
    writer
        .expect_write()
        .withf(|root, _, _| root == Path::new("dist/content-moderator/npm-package"))
        .times(1)
        .returning(|root, artifacts, _| WriteOutcome {
            status: WriteStatus::Completed,
            written: artifacts.iter().map(|a| root.join(&a.relative_path)).collect(),
        });

    let report = export_manifests(
        &reader,
        &writer,
        &orchestrator(),
        &RecordingReporter::default(),
        &CancelFlag::new(),
        request(&["good.yaml", "bad.yaml"], &["npm-package"]),
    )
    .await
    .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.error_count(), 1);
    assert!(report.exports[0].write.is_some());
    assert!(report.exports[1].write.is_none());
    assert!(report.exports[1].result.artifacts.is_empty());
}

#[tokio::test]
async fn test_cancel_raised_before_write_records_cancelled() {
    let reader = MemoryReader::default().with("agent.yaml", MINIMAL);
    let mut writer = MockWriter::new();
    writer.expect_write().never();
    let cancel = CancelFlag::new();
    cancel.cancel();

    let report = export_manifests(
        &reader,
        &writer,
        &orchestrator(),
        &RecordingReporter::default(),
        &cancel,
        request(&["agent.yaml"], &["kubernetes"]),
    )
    .await
    .unwrap();

    assert!(report.was_cancelled());
    assert!(!report.is_success());
    assert_eq!(report.files_written(), 0);
}

#[tokio::test]
async fn test_writes_to_disk_and_reports_progress() {
    let dir = tempfile::TempDir::new().unwrap();
    let reader = MemoryReader::default()
        .with("a.yaml", &named("Alpha Agent"))
        .with("b.yaml", &named("Beta Agent"));
    let reporter = RecordingReporter::default();

    let report = export_manifests(
        &reader,
        &FsArtifactWriter,
        &orchestrator(),
        &reporter,
        &CancelFlag::new(),
        ExportRequest {
            output_root: dir.path().to_path_buf(),
            ..request(&["a.yaml", "b.yaml"], &["langgraph"])
        },
    )
    .await
    .unwrap();

    assert!(report.is_success());
    assert!(dir.path().join("alpha-agent/langgraph/agent_graph.py").is_file());
    assert!(dir.path().join("beta-agent/langgraph/agent_graph.py").is_file());
    let lines = reporter.lines.borrow();
    assert!(lines[0].starts_with("step: exporting 2 manifest(s)"));
    assert_eq!(lines.iter().filter(|l| l.starts_with("success:")).count(), 2);
}

#[tokio::test]
async fn test_missing_manifest_is_an_error() {
    let writer = MockWriter::new();
    let err = export_manifests(
        &MemoryReader::default(),
        &writer,
        &orchestrator(),
        &RecordingReporter::default(),
        &CancelFlag::new(),
        request(&["missing.yaml"], &["npm-package"]),
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("Manifest not found: missing.yaml"));
}

#[tokio::test]
async fn test_options_reach_converter() {
    let reader = MemoryReader::default().with("agent.yaml", MINIMAL);
    let mut writer = MockWriter::new();
    writer
        .expect_write()
        .withf(|root, _, _| root == Path::new("dist"))
        .returning(|_, _, _| WriteOutcome {
            status: WriteStatus::Completed,
            written: Vec::new(),
        });

    let report = export_manifests(
        &reader,
        &writer,
        &orchestrator(),
        &RecordingReporter::default(),
        &CancelFlag::new(),
        ExportRequest {
            assignments: vec!["scope=acme".to_string()],
            ..request(&["agent.yaml"], &["npm-package"])
        },
    )
    .await
    .unwrap();

    let package = &report.exports[0].result.artifacts.get("package.json").unwrap().content;
    assert!(package.contains("@acme/content-moderator"));
}
