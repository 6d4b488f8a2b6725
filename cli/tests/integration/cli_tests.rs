//! Integration tests for the CLI surface: help, version, global flags,
//! `platforms` and `validate`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use predicates::prelude::*;

use crate::support::{MINIMAL, NO_SCHEMA_VERSION, Workspace, agentport, stdout_json};

// --- Help and version tests ---

#[test]
fn test_cli_no_args_shows_help_and_exits_two() {
    agentport().assert().code(2).stderr(predicate::str::contains(
        "Validate agent manifests and export them to deployment platforms",
    ));
}

#[test]
fn test_cli_help_lists_commands() {
    let output = agentport().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["export", "validate", "platforms", "publish", "fetch", "config", "version"] {
        assert!(stdout.contains(command), "help is missing {command}");
    }
}

#[test]
fn test_cli_version_flag_shows_version() {
    agentport()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("agentport"));
}

#[test]
fn test_version_command_shows_version() {
    agentport()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("agentport {}", env!("CARGO_PKG_VERSION"))));
}

#[test]
fn test_version_command_json_outputs_valid_json() {
    let output = agentport().args(["--json", "version"]).output().unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["version"], env!("CARGO_PKG_VERSION"));
}

// --- Global flags tests ---

#[test]
fn test_global_quiet_flag_suppresses_version() {
    agentport()
        .args(["--quiet", "version"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_no_color_env_accepts_conventional_values() {
    for value in ["1", "yes", "true", "0"] {
        agentport()
            .env("NO_COLOR", value)
            .arg("version")
            .assert()
            .success()
            .stdout(predicate::str::contains("agentport"));
    }
}

#[test]
fn test_no_color_flag_without_env() {
    agentport()
        .env_remove("NO_COLOR")
        .args(["--no-color", "platforms"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\x1b[").not());
}

#[test]
fn test_unknown_command_exits_with_error() {
    agentport()
        .arg("nonexistent")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

// --- platforms ---

#[test]
fn test_platforms_lists_builtins() {
    let output = agentport().arg("platforms").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for id in ["container-image", "drupal-module", "kubernetes", "langgraph", "npm-package"] {
        assert!(stdout.contains(id), "missing platform {id}");
    }
}

#[test]
fn test_platforms_json_has_descriptions() {
    let output = agentport().args(["--json", "platforms"]).output().unwrap();
    let json = stdout_json(&output);
    let platforms = json["platforms"].as_array().expect("array");
    assert_eq!(platforms.len(), 5);
    assert!(platforms.iter().all(|p| p["description"].is_string()));
}

// --- validate ---

#[test]
fn test_validate_valid_manifest_exits_zero() {
    let ws = Workspace::new();
    let manifest = ws.file("agent.yaml", MINIMAL);
    agentport()
        .arg("validate")
        .arg(&manifest)
        .assert()
        .success()
        .stdout(predicate::str::contains("Content Moderator is valid (schema v1)"));
}

#[test]
fn test_validate_missing_schema_version_exits_one_with_path() {
    let ws = Workspace::new();
    let manifest = ws.file("agent.yaml", NO_SCHEMA_VERSION);
    agentport()
        .arg("validate")
        .arg(&manifest)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("schemaVersion"))
        .stderr(predicate::str::contains("missing-schema-version"));
}

#[test]
fn test_validate_json_reports_valid_flag_and_errors() {
    let ws = Workspace::new();
    let good = ws.file("good.yaml", MINIMAL);
    let bad = ws.file("bad.json", r#"{"metadata": {"name": "Other", "version": "1.0.0"}}"#);
    let output = agentport()
        .args(["--json", "validate"])
        .arg(&good)
        .arg(&bad)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let json = stdout_json(&output);
    assert_eq!(json["manifests"][0]["valid"], true);
    assert_eq!(json["manifests"][1]["valid"], false);
    assert_eq!(json["manifests"][1]["errors"][0]["path"], "schemaVersion");
}

#[test]
fn test_validate_flags_duplicate_names() {
    let ws = Workspace::new();
    let a = ws.file("a.yaml", MINIMAL);
    let b = ws.file("b.yaml", &MINIMAL.replace("Content Moderator", "content-moderator"));
    agentport()
        .arg("validate")
        .arg(&a)
        .arg(&b)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("duplicate-identity"));
}

#[test]
fn test_validate_missing_file_json_error_object() {
    let output = agentport()
        .args(["--json", "validate", "/nonexistent/agent.yaml"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let json = stdout_json(&output);
    assert_eq!(json["error"], true);
    assert_eq!(json["code"], "manifest_not_found");
    assert!(json["message"].as_str().unwrap().contains("/nonexistent/agent.yaml"));
}

// --- publish / fetch without a registry ---

#[test]
fn test_fetch_without_registry_url_fails() {
    agentport()
        .args(["fetch", "content-moderator"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("registry"));
}
