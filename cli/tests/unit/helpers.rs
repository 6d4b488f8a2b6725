//! Shared test helpers: manifest fixtures, an in-memory reader and a
//! recording progress reporter.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use agentport_cli::application::ports::{ManifestReader, ProgressReporter};
use agentport_cli::application::{AdapterRegistry, ExportOptions, ExportOrchestrator};
use agentport_cli::domain::error::ExportError;
use agentport_cli::domain::manifest::{DocumentFormat, RawManifest};
use agentport_cli::domain::options::PlatformOptions;
use agentport_cli::domain::{SchemaRegistry, TriggerDocumentEnricher};

// ── Fixtures ─────────────────────────────────────────────────────────────────

pub const MINIMAL: &str = "\
schemaVersion: v1
metadata:
  name: Content Moderator
  version: 1.0.0
spec:
  capabilities: [content-moderation]
";

pub const FULL: &str = r#"
schemaVersion: v1
metadata:
  name: Content Moderator
  version: 1.2.0
  description: Flags unsafe posts
  license: Apache-2.0
spec:
  capabilities: [content-moderation, escalate]
  runtime:
    memory: 512Mi
    cpu: 500m
    timeoutSeconds: 30
    env: [OPENAI_API_KEY]
  credentials:
    - { name: moderation-key, type: apiKey }
  toolBindings:
    - name: moderation-api
      endpoint: https://api.example.com/v1
      auth: { type: apiKey, credential: moderation-key }
    - name: drupal-only
      endpoint: https://cms.example.com
      when: "platform == 'drupal-module'"
"#;

pub const NO_SCHEMA_VERSION: &str = "\
metadata:
  name: Content Moderator
  version: 1.0.0
spec:
  capabilities: [content-moderation]
";

/// `MINIMAL` with a scaling bound, which the container family cannot express.
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

pub const PLATFORMS: [&str; 5] = [
    "container-image",
    "drupal-module",
    "kubernetes",
    "langgraph",
    "npm-package",
];

pub fn raw(yaml: &str) -> RawManifest {
    RawManifest::parse("agent.yaml", yaml, DocumentFormat::Yaml)
}

pub fn named(name: &str) -> String {
    MINIMAL.replace("Content Moderator", name)
}

// ── Orchestrator builders ────────────────────────────────────────────────────

pub fn orchestrator() -> ExportOrchestrator {
    orchestrator_with(AdapterRegistry::with_builtin().expect("built-ins register"))
}

pub fn orchestrator_with(adapters: AdapterRegistry) -> ExportOrchestrator {
    ExportOrchestrator::new(
        Arc::new(SchemaRegistry::with_builtin_schemas()),
        Arc::new(adapters),
    )
    .with_enricher(Arc::new(TriggerDocumentEnricher))
}

pub fn opts(platform: &str) -> ExportOptions {
    ExportOptions {
        platform: platform.to_string(),
        output_root: PathBuf::from("dist"),
        include_enrichment: false,
        options: PlatformOptions::new(),
    }
}

// ── In-memory manifest reader ────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryReader {
    files: HashMap<PathBuf, String>,
}

impl MemoryReader {
    pub fn with(mut self, path: &str, text: &str) -> Self {
        self.files.insert(PathBuf::from(path), text.to_string());
        self
    }
}

impl ManifestReader for MemoryReader {
    fn read(&self, path: &Path) -> Result<RawManifest> {
        let text = self
            .files
            .get(path)
            .ok_or_else(|| ExportError::ManifestNotFound(path.display().to_string()))?;
        Ok(RawManifest::parse(
            path.display().to_string(),
            text.clone(),
            DocumentFormat::from_path(path),
        ))
    }

    fn read_options(&self, path: &Path) -> Result<PlatformOptions> {
        let text = self
            .files
            .get(path)
            .ok_or_else(|| ExportError::ManifestNotFound(path.display().to_string()))?;
        Ok(serde_yaml::from_str(text)?)
    }
}

// ── Recording reporter ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingReporter {
    pub lines: RefCell<Vec<String>>,
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.lines.borrow_mut().push(format!("step: {message}"));
    }
    fn success(&self, message: &str) {
        self.lines.borrow_mut().push(format!("success: {message}"));
    }
    fn warn(&self, message: &str) {
        self.lines.borrow_mut().push(format!("warn: {message}"));
    }
}
