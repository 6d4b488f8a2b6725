//! Application service: export use-case.
//!
//! Imports only from `crate::domain` and `crate::application`.
//! All I/O is routed through injected port traits.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::application::orchestrator::{ExportOptions, ExportOrchestrator, ExportResult};
use crate::application::ports::{
    ArtifactWriter, CancelFlag, ManifestReader, ProgressReporter, WriteOutcome, WriteStatus,
};
use crate::domain::error::ExportError;
use crate::domain::options::PlatformOptions;

/// Everything the export command collected from flags and configuration.
#[derive(Debug, Clone, Default)]
pub struct ExportRequest {
    pub manifests: Vec<PathBuf>,
    pub platforms: Vec<String>,
    pub output_root: PathBuf,
    pub dry_run: bool,
    pub include_enrichment: bool,
    /// `--options FILE`, applied first.
    pub options_file: Option<PathBuf>,
    /// `--set key=value`, applied over the file in order.
    pub assignments: Vec<String>,
}

/// One export plus what happened when it was written.
#[derive(Debug, Clone, Serialize)]
pub struct ExportedPair {
    #[serde(flatten)]
    pub result: ExportResult,
    /// `None` for dry runs and for failed exports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write: Option<WriteOutcome>,
}

/// Outcome of an export command.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub dry_run: bool,
    pub exports: Vec<ExportedPair>,
}

impl ExportReport {
    /// Total number of errors across all exports.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.exports.iter().map(|p| p.result.errors.len()).sum()
    }

    /// `true` when some write stopped because of cancellation.
    #[must_use]
    pub fn was_cancelled(&self) -> bool {
        self.exports
            .iter()
            .any(|p| matches!(p.write.as_ref().map(|w| &w.status), Some(WriteStatus::Cancelled)))
    }

    /// `true` when every export succeeded and every write completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exports
            .iter()
            .all(|p| p.result.success && p.write.as_ref().is_none_or(WriteOutcome::is_completed))
    }

    /// Number of files that remain on disk.
    #[must_use]
    pub fn files_written(&self) -> usize {
        self.exports
            .iter()
            .filter_map(|p| p.write.as_ref())
            .map(|w| w.written.len())
            .sum()
    }
}

/// Builds the option bag: the options file first, then each `--set`.
///
/// # Errors
///
/// Returns an error if the options file cannot be read or an assignment is
/// not `key=value`.
pub fn collect_options(
    reader: &impl ManifestReader,
    options_file: Option<&std::path::Path>,
    assignments: &[String],
) -> Result<PlatformOptions> {
    let mut options = match options_file {
        Some(path) => reader
            .read_options(path)
            .with_context(|| format!("reading options from {}", path.display()))?,
        None => PlatformOptions::new(),
    };
    for assignment in assignments {
        let (key, value) = PlatformOptions::parse_assignment(assignment)
            .ok_or_else(|| ExportError::MalformedOption(assignment.clone()))?;
        options.insert(key, value);
    }
    Ok(options)
}

/// Reads every manifest, runs the batch through the orchestrator, then
/// writes each successful artifact set unless this is a dry run.
///
/// Once `cancel` is raised no further export is written; exports already
/// written stay on disk.
///
/// # Errors
///
/// Returns an error if a manifest or the options file cannot be read, or an
/// option assignment is malformed. Export failures are reported inside the
/// returned `ExportReport`.
pub async fn export_manifests(
    reader: &impl ManifestReader,
    writer: &dyn ArtifactWriter,
    orchestrator: &ExportOrchestrator,
    reporter: &impl ProgressReporter,
    cancel: &CancelFlag,
    request: ExportRequest,
) -> Result<ExportReport> {
    let options = collect_options(reader, request.options_file.as_deref(), &request.assignments)?;

    let mut raws = Vec::with_capacity(request.manifests.len());
    for path in &request.manifests {
        raws.push(reader.read(path)?);
    }

    reporter.step(&format!(
        "exporting {} manifest(s) to {}...",
        raws.len(),
        request.platforms.join(", ")
    ));
    let base = ExportOptions {
        platform: String::new(),
        output_root: request.output_root.clone(),
        include_enrichment: request.include_enrichment,
        options,
    };
    let results = orchestrator
        .export_batch(raws, &request.platforms, &base)
        .await;

    let mut exports = Vec::with_capacity(results.len());
    for result in results {
        let write = if request.dry_run || !result.success {
            None
        } else if cancel.is_cancelled() {
            Some(WriteOutcome {
                status: WriteStatus::Cancelled,
                written: Vec::new(),
            })
        } else {
            let outcome = writer.write(&result.output_root, &result.artifacts, cancel);
            report_write(reporter, &result, &outcome);
            Some(outcome)
        };
        exports.push(ExportedPair { result, write });
    }

    Ok(ExportReport {
        dry_run: request.dry_run,
        exports,
    })
}

fn report_write(reporter: &impl ProgressReporter, result: &ExportResult, outcome: &WriteOutcome) {
    let target = result.output_root.display();
    match &outcome.status {
        WriteStatus::Completed => reporter.success(&format!(
            "{} → {} ({} file(s) in {target})",
            result.manifest,
            result.platform,
            outcome.written.len()
        )),
        WriteStatus::Cancelled => reporter.warn(&format!(
            "{} → {}: cancelled, partial output removed from {target}",
            result.manifest, result.platform
        )),
        WriteStatus::Failed(reason) => reporter.warn(&format!(
            "{} → {}: write failed: {reason}",
            result.manifest, result.platform
        )),
    }
}
