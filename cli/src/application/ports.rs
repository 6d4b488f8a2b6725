//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`: never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::artifact::ArtifactSet;
use crate::domain::config::AgentportConfig;
use crate::domain::manifest::RawManifest;
use crate::domain::options::PlatformOptions;

// ── Manifest Source Port ──────────────────────────────────────────────────────

/// Loads manifest documents. Parsing failures are carried inside the
/// returned `RawManifest`; only an unreadable source is an `Err`.
pub trait ManifestReader {
    /// Read the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    fn read(&self, path: &Path) -> Result<RawManifest>;

    /// Read a platform option bag from a YAML or JSON mapping.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a mapping.
    fn read_options(&self, path: &Path) -> Result<PlatformOptions>;
}

// ── Artifact Writer Port ──────────────────────────────────────────────────────

/// Shared cancellation signal, checked by the writer before each file.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a write pass ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteStatus {
    Completed,
    Cancelled,
    Failed(String),
}

/// Result of materializing one artifact set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    pub status: WriteStatus,
    /// Files that remain on disk from this pass.
    pub written: Vec<PathBuf>,
}

impl WriteOutcome {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == WriteStatus::Completed
    }
}

/// Persists artifacts under an output root.
///
/// On cancellation or failure the writer removes only the files it newly
/// created during this call; anything that existed before is left alone.
pub trait ArtifactWriter: Send + Sync {
    fn write(&self, root: &Path, artifacts: &ArtifactSet, cancel: &CancelFlag) -> WriteOutcome;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait: no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── Configuration Port ────────────────────────────────────────────────────────

/// Abstracts configuration persistence.
pub trait ConfigStore {
    /// Load the configuration, falling back to defaults when none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    fn load(&self) -> Result<AgentportConfig>;

    /// Persist the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    fn save(&self, config: &AgentportConfig) -> Result<()>;

    /// Location of the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    fn path(&self) -> Result<PathBuf>;
}

// ── Manifest Registry Port ────────────────────────────────────────────────────

/// Acknowledgement returned by a successful publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub id: String,
    pub version: String,
    pub url: String,
}

/// Remote store for manifests, addressed by identifier.
pub trait ManifestRegistry {
    /// Upload a manifest document.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success response.
    fn publish(&self, name: &str, version: &str, document: &str) -> Result<PublishReceipt>;

    /// Download a manifest document by `<name>` or `<name>/<version>`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or when the id is unknown.
    fn fetch(&self, id: &str) -> Result<String>;
}
