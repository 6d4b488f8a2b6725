//! Application layer: port trait definitions, the adapter registry, the
//! export orchestrator and use-case services.
//!
//! This module depends only on `crate::domain`: never on `crate::infra`,
//! `crate::commands`, or `crate::output`.

pub mod orchestrator;
pub mod ports;
pub mod registry;
pub mod services;

pub use orchestrator::{ExportOptions, ExportOrchestrator, ExportResult, ExportStage};
pub use ports::{
    ArtifactWriter, CancelFlag, ConfigStore, ManifestReader, ManifestRegistry, ProgressReporter,
    PublishReceipt, WriteOutcome, WriteStatus,
};
pub use registry::{AdapterRegistry, PlatformInfo};
