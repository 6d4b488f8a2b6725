//! Integration tests for `agentport config` command.
//!
//! All filesystem-touching tests set `AGENTPORT_CONFIG` to a temp path so they
//! never read or write `~/.agentport/config.yaml`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use predicates::prelude::*;
use tempfile::TempDir;

use crate::support::{agentport, stdout_json};

/// Returns a `TempDir` and the path string for a config file inside it.
fn temp_config_path() -> (TempDir, String) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir
        .path()
        .join("config.yaml")
        .to_string_lossy()
        .into_owned();
    (dir, path)
}

// ---------------------------------------------------------------------------
// Subcommand registration
// ---------------------------------------------------------------------------

#[test]
fn test_config_help_shows_subcommands() {
    agentport()
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("set"))
        .stdout(predicate::str::contains("path"));
}

// ---------------------------------------------------------------------------
// `agentport config show`
// ---------------------------------------------------------------------------

#[test]
fn test_config_show_no_config_file_uses_defaults() {
    let (_dir, path) = temp_config_path();
    agentport()
        .args(["config", "show"])
        .env("AGENTPORT_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("export.output_root"))
        .stdout(predicate::str::contains("dist"))
        .stdout(predicate::str::contains("(not set)"));
}

#[test]
fn test_config_show_displays_env_var_labels() {
    let (_dir, path) = temp_config_path();
    agentport()
        .args(["config", "show"])
        .env("AGENTPORT_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("AGENTPORT_CONFIG"))
        .stdout(predicate::str::contains("AGENTPORT_LOG"))
        .stdout(predicate::str::contains("NO_COLOR"));
}

#[test]
fn test_config_show_does_not_create_file() {
    let (dir, path) = temp_config_path();
    agentport()
        .args(["config", "show"])
        .env("AGENTPORT_CONFIG", &path)
        .assert()
        .success();
    assert!(
        !dir.path().join("config.yaml").exists(),
        "config show must not create the config file"
    );
}

#[test]
fn test_config_show_json_has_path_and_defaults() {
    let (_dir, path) = temp_config_path();
    let output = agentport()
        .args(["--json", "config", "show"])
        .env("AGENTPORT_CONFIG", &path)
        .output()
        .unwrap();

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["path"], path.as_str());
    assert_eq!(json["config"]["export"]["output_root"], "dist");
    assert_eq!(json["config"]["export"]["enrichment"], false);
}

#[test]
fn test_config_show_corrupt_yaml_returns_error() {
    let (_dir, path) = temp_config_path();
    std::fs::write(&path, "export: [not, a, map").unwrap();
    agentport()
        .args(["config", "show"])
        .env("AGENTPORT_CONFIG", &path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot parse"));
}

// ---------------------------------------------------------------------------
// `agentport config set`
// ---------------------------------------------------------------------------

#[test]
fn test_config_set_platform_succeeds() {
    let (_dir, path) = temp_config_path();
    agentport()
        .args(["config", "set", "export.platform", "kubernetes"])
        .env("AGENTPORT_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Set export.platform = kubernetes"));
}

#[test]
fn test_config_set_unknown_key_returns_error_with_valid_keys() {
    let (_dir, path) = temp_config_path();
    agentport()
        .args(["config", "set", "export.color", "blue"])
        .env("AGENTPORT_CONFIG", &path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown setting"))
        .stderr(predicate::str::contains("export.output_root"));
}

#[test]
fn test_config_set_invalid_value_returns_error_with_valid_values() {
    let (dir, path) = temp_config_path();
    agentport()
        .args(["config", "set", "export.enrichment", "maybe"])
        .env("AGENTPORT_CONFIG", &path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid value"))
        .stderr(predicate::str::contains("true, false"));
    assert!(!dir.path().join("config.yaml").exists());
}

#[test]
fn test_config_set_rejects_non_http_registry() {
    let (_dir, path) = temp_config_path();
    agentport()
        .args(["config", "set", "registry.url", "ftp://registry.example"])
        .env("AGENTPORT_CONFIG", &path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("http(s) URL"));
}

#[test]
fn test_config_set_persists_value_readable_by_show() {
    let (_dir, path) = temp_config_path();
    agentport()
        .args(["config", "set", "registry.url", "https://registry.example/"])
        .env("AGENTPORT_CONFIG", &path)
        .assert()
        .success();

    agentport()
        .args(["config", "show"])
        .env("AGENTPORT_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("https://registry.example"))
        .stdout(predicate::str::contains("https://registry.example/").not());
}

#[test]
fn test_config_set_creates_missing_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.yaml");
    agentport()
        .args(["config", "set", "export.output_root", "build/agents"])
        .env("AGENTPORT_CONFIG", &path)
        .assert()
        .success();
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("build/agents"));
}

#[cfg(unix)]
#[test]
fn test_config_set_creates_file_with_0o600_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let (_dir, path) = temp_config_path();
    agentport()
        .args(["config", "set", "export.enrichment", "true"])
        .env("AGENTPORT_CONFIG", &path)
        .assert()
        .success();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600, "config file should be 0600");
}

#[test]
fn test_config_set_corrupt_yaml_returns_error() {
    let (_dir, path) = temp_config_path();
    std::fs::write(&path, "export: [not, a, map").unwrap();
    agentport()
        .args(["config", "set", "export.platform", "langgraph"])
        .env("AGENTPORT_CONFIG", &path)
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// `agentport config path`
// ---------------------------------------------------------------------------

#[test]
fn test_config_path_prints_env_override() {
    let (_dir, path) = temp_config_path();
    agentport()
        .args(["config", "path"])
        .env("AGENTPORT_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains(path.as_str()));
}

#[test]
fn test_config_path_json() {
    let (_dir, path) = temp_config_path();
    let output = agentport()
        .args(["--json", "config", "path"])
        .env("AGENTPORT_CONFIG", &path)
        .output()
        .unwrap();
    assert_eq!(stdout_json(&output)["path"], path.as_str());
}
