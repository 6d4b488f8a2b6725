//! Binary launcher and manifest fixtures shared by the integration tests.

#![allow(clippy::expect_used, dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

pub const MINIMAL: &str = "\
schemaVersion: v1
metadata:
  name: Content Moderator
  version: 1.0.0
spec:
  capabilities: [content-moderation]
";

pub const SCALED: &str = "\
schemaVersion: v1
metadata:
  name: Content Moderator
  version: 1.0.0
spec:
  capabilities: [content-moderation]
  runtime:
    scaling: { minReplicas: 1, maxReplicas: 3 }
";

pub const NO_SCHEMA_VERSION: &str = "\
metadata:
  name: Content Moderator
  version: 1.0.0
spec:
  capabilities: [content-moderation]
";

/// The binary with colors off and the config file pointed at a path that
/// does not exist, so a developer's own configuration never leaks in.
pub fn agentport() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("agentport"));
    cmd.env("NO_COLOR", "1")
        .env("AGENTPORT_CONFIG", "/nonexistent/agentport/config.yaml")
        .env_remove("AGENTPORT_LOG")
        .env_remove("RUST_LOG");
    cmd
}

/// A temp directory holding named manifest files.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temp dir"),
        }
    }

    pub fn file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).expect("write fixture");
        path
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

pub fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}
