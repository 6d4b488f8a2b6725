//! Application service: publish to and fetch from a manifest registry.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::application::ports::{ManifestReader, ManifestRegistry, ProgressReporter, PublishReceipt};
use crate::domain::manifest::Manifest;
use crate::domain::schema::SchemaRegistry;

/// Validates the manifest at `path` and uploads its source text verbatim.
///
/// # Errors
///
/// Returns an error if the manifest cannot be read, fails validation, or
/// the registry rejects the upload.
pub fn publish_manifest(
    reader: &impl ManifestReader,
    schemas: &SchemaRegistry,
    registry: &impl ManifestRegistry,
    reporter: &impl ProgressReporter,
    path: &Path,
) -> Result<PublishReceipt> {
    let raw = reader.read(path)?;
    let check = schemas.validate(&raw);
    if !check.result.is_valid() {
        let lines: Vec<String> = check.result.errors().iter().map(|d| format!("  {d}")).collect();
        bail!(
            "{} is not a valid manifest; refusing to publish:\n{}",
            raw.origin(),
            lines.join("\n")
        );
    }
    let version = check.version.as_deref().unwrap_or_default();
    let manifest = Manifest::from_validated(&raw, version, &check.result)
        .map_err(|d| anyhow::anyhow!("{d}"))?;

    reporter.step(&format!(
        "publishing {} {}...",
        manifest.dns_name(),
        manifest.version()
    ));
    let receipt = registry
        .publish(&manifest.dns_name(), manifest.version(), raw.source())
        .with_context(|| format!("publishing {}", raw.origin()))?;
    reporter.success(&format!("published {}@{}", receipt.id, receipt.version));
    Ok(receipt)
}

/// A downloaded manifest and, when saved, where it went.
#[derive(Debug, Clone, Serialize)]
pub struct FetchedManifest {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
}

/// Downloads a manifest by `<name>` or `<name>/<version>`.
///
/// # Errors
///
/// Returns an error if the id is malformed or the registry request fails.
pub fn fetch_manifest(registry: &impl ManifestRegistry, id: &str) -> Result<String> {
    let valid = !id.is_empty()
        && id.split('/').count() <= 2
        && id
            .split('/')
            .all(|part| !part.is_empty() && part != "." && part != ".." && !part.contains('\\'));
    if !valid {
        bail!("invalid manifest id '{id}': expected <name> or <name>/<version>");
    }
    registry.fetch(id).with_context(|| format!("fetching {id}"))
}
