//! Integration tests for `agentport export`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use predicates::prelude::*;

use crate::support::{MINIMAL, NO_SCHEMA_VERSION, SCALED, Workspace, agentport, stdout_json};

// ── Writing ──────────────────────────────────────────────────────────────────

#[test]
fn test_export_single_pair_writes_into_output_root() {
    let ws = Workspace::new();
    let manifest = ws.file("agent.yaml", MINIMAL);
    let out = ws.path().join("out");

    agentport()
        .args(["export", "--platform", "container-image", "--output"])
        .arg(&out)
        .arg(&manifest)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 export(s) complete"));

    let dockerfile = std::fs::read_to_string(out.join("Dockerfile")).unwrap();
    assert!(dockerfile.contains("FROM "));
    assert!(out.join("entrypoint.sh").exists());
    assert!(out.join("compose.yaml").exists());
}

#[cfg(unix)]
#[test]
fn test_export_marks_entrypoint_executable() {
    use std::os::unix::fs::PermissionsExt;

    let ws = Workspace::new();
    let manifest = ws.file("agent.yaml", MINIMAL);
    let out = ws.path().join("out");

    agentport()
        .args(["export", "-p", "container-image", "-o"])
        .arg(&out)
        .arg(&manifest)
        .assert()
        .success();

    let mode = std::fs::metadata(out.join("entrypoint.sh")).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o755);
}

#[test]
fn test_export_several_pairs_use_name_and_platform_directories() {
    let ws = Workspace::new();
    let first = ws.file("a.yaml", MINIMAL);
    let second = ws.file("b.yaml", &MINIMAL.replace("Content Moderator", "Triage Bot"));
    let out = ws.path().join("out");

    agentport()
        .args(["export", "-p", "npm-package", "-p", "kubernetes", "-o"])
        .arg(&out)
        .arg(&first)
        .arg(&second)
        .assert()
        .success()
        .stdout(predicate::str::contains("4 export(s) complete"));

    for name in ["content-moderator", "triage-bot"] {
        assert!(out.join(name).join("npm-package").join("package.json").exists());
        assert!(out.join(name).join("kubernetes").join("deployment.yaml").exists());
    }
}

#[test]
fn test_export_platform_from_config_file() {
    let ws = Workspace::new();
    let manifest = ws.file("agent.yaml", MINIMAL);
    let config = ws.file("config.yaml", "export:\n  platform: langgraph\n");
    let out = ws.path().join("out");

    agentport()
        .env("AGENTPORT_CONFIG", &config)
        .args(["export", "-o"])
        .arg(&out)
        .arg(&manifest)
        .assert()
        .success();

    assert!(out.join("agent_graph.py").exists());
}

// ── Options ──────────────────────────────────────────────────────────────────

#[test]
fn test_export_set_option_reaches_artifact() {
    let ws = Workspace::new();
    let manifest = ws.file("agent.yaml", MINIMAL);
    let out = ws.path().join("out");

    agentport()
        .args(["export", "-p", "npm-package", "--set", "scope=acme", "-o"])
        .arg(&out)
        .arg(&manifest)
        .assert()
        .success();

    let pkg: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("package.json")).unwrap()).unwrap();
    assert_eq!(pkg["name"], "@acme/content-moderator");
}

#[test]
fn test_export_set_overrides_options_file() {
    let ws = Workspace::new();
    let manifest = ws.file("agent.yaml", MINIMAL);
    let options = ws.file("options.yaml", "replicas: 2\nnamespace: agents\n");
    let out = ws.path().join("out");

    agentport()
        .args(["export", "-p", "kubernetes", "--set", "replicas=5", "--options"])
        .arg(&options)
        .arg("-o")
        .arg(&out)
        .arg(&manifest)
        .assert()
        .success();

    let deployment = std::fs::read_to_string(out.join("deployment.yaml")).unwrap();
    assert!(deployment.contains("replicas: 5"));
    assert!(deployment.contains("namespace: agents"));
}

#[test]
fn test_export_invalid_option_fails_without_writing() {
    let ws = Workspace::new();
    let manifest = ws.file("agent.yaml", MINIMAL);
    let out = ws.path().join("out");

    agentport()
        .args(["export", "-p", "kubernetes", "--set", "replicas=100000", "-o"])
        .arg(&out)
        .arg(&manifest)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("options.replicas"));

    assert!(!out.exists());
}

#[test]
fn test_export_malformed_set_json_error_code() {
    let ws = Workspace::new();
    let manifest = ws.file("agent.yaml", MINIMAL);

    let output = agentport()
        .args(["--json", "export", "-p", "npm-package", "--set", "noequals"])
        .arg(&manifest)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout_json(&output)["code"], "malformed_option");
}

// ── Failures and warnings ────────────────────────────────────────────────────

#[test]
fn test_export_invalid_manifest_fails_in_validation() {
    let ws = Workspace::new();
    let manifest = ws.file("agent.yaml", NO_SCHEMA_VERSION);
    let out = ws.path().join("out");

    agentport()
        .args(["export", "-p", "container-image", "-o"])
        .arg(&out)
        .arg(&manifest)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed while validating"))
        .stderr(predicate::str::contains("1 of 1 export(s) failed"));

    assert!(!out.exists());
}

#[test]
fn test_export_unknown_platform_lists_supported() {
    let ws = Workspace::new();
    let manifest = ws.file("agent.yaml", MINIMAL);

    agentport()
        .args(["export", "-p", "serverless", "--dry-run"])
        .arg(&manifest)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("serverless"))
        .stderr(predicate::str::contains("npm-package"));
}

#[test]
fn test_export_without_platform_json_error_code() {
    let ws = Workspace::new();
    let manifest = ws.file("agent.yaml", MINIMAL);

    let output = agentport().args(["--json", "export"]).arg(&manifest).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    let json = stdout_json(&output);
    assert_eq!(json["error"], true);
    assert_eq!(json["code"], "no_platform");
}

#[test]
fn test_export_dropped_field_warns_but_succeeds() {
    let ws = Workspace::new();
    let manifest = ws.file("agent.yaml", SCALED);
    let out = ws.path().join("out");

    agentport()
        .args(["export", "-p", "container-image", "-o"])
        .arg(&out)
        .arg(&manifest)
        .assert()
        .success()
        .stdout(predicate::str::contains("spec.runtime.scaling"))
        .stdout(predicate::str::contains("field-dropped"));

    assert!(out.join("Dockerfile").exists());
}

// ── Enrichment and dry run ───────────────────────────────────────────────────

#[test]
fn test_export_enrich_adds_trigger_document() {
    let ws = Workspace::new();
    let manifest = ws.file("agent.yaml", MINIMAL);
    let out = ws.path().join("out");

    agentport()
        .args(["export", "-p", "langgraph", "--enrich", "-o"])
        .arg(&out)
        .arg(&manifest)
        .assert()
        .success();

    let skill = std::fs::read_to_string(out.join("SKILL.md")).unwrap();
    assert!(skill.contains("content-moderation"));
}

#[test]
fn test_export_dry_run_writes_nothing() {
    let ws = Workspace::new();
    let manifest = ws.file("agent.yaml", MINIMAL);
    let out = ws.path().join("out");

    agentport()
        .args(["export", "-p", "kubernetes", "--dry-run", "-o"])
        .arg(&out)
        .arg(&manifest)
        .assert()
        .success()
        .stdout(predicate::str::contains("deployment.yaml"))
        .stdout(predicate::str::contains("Dry run: 1 export(s) validated, nothing written"));

    assert!(!out.exists());
}

#[test]
fn test_export_json_report_shape() {
    let ws = Workspace::new();
    let manifest = ws.file("agent.yaml", MINIMAL);
    let out = ws.path().join("out");

    let output = agentport()
        .args(["--json", "export", "-p", "npm-package", "-o"])
        .arg(&out)
        .arg(&manifest)
        .output()
        .unwrap();

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["dry_run"], false);
    let export = &json["exports"][0];
    assert_eq!(export["platform"], "npm-package");
    assert_eq!(export["success"], true);
    assert!(export["digest"].is_string());
    let paths: Vec<&str> = export["artifacts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["path"].as_str().unwrap())
        .collect();
    assert!(paths.contains(&"package.json"));
}

#[test]
fn test_export_is_deterministic_across_runs() {
    let ws = Workspace::new();
    let manifest = ws.file("agent.yaml", MINIMAL);
    let digest = |dir: &str| {
        let output = agentport()
            .args(["--json", "export", "-p", "drupal-module", "-o"])
            .arg(ws.path().join(dir))
            .arg(&manifest)
            .output()
            .unwrap();
        stdout_json(&output)["exports"][0]["digest"].clone()
    };

    let first = digest("one");
    assert!(first.is_string());
    assert_eq!(first, digest("two"));
}
