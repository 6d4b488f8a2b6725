//! JSON renderer and the error-object formatter used by all `--json` code
//! paths when a command fails.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::application::PlatformInfo;
use crate::application::ports::PublishReceipt;
use crate::application::services::export_service::ExportReport;
use crate::application::services::publish_service::FetchedManifest;
use crate::application::services::validate_service::ManifestReport;
use crate::domain::config::AgentportConfig;

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Renders command results as pretty-printed JSON on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    fn print(value: &impl Serialize) -> Result<()> {
        println!(
            "{}",
            serde_json::to_string_pretty(value).context("JSON serialization failed")?
        );
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_export(report: &ExportReport) -> Result<()> {
        Self::print(report)
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_validation(reports: &[ManifestReport]) -> Result<()> {
        Self::print(&serde_json::json!({ "manifests": reports }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_platforms(platforms: &[PlatformInfo]) -> Result<()> {
        Self::print(&serde_json::json!({ "platforms": platforms }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_publish(receipt: &PublishReceipt) -> Result<()> {
        Self::print(receipt)
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_fetch(fetched: &FetchedManifest) -> Result<()> {
        Self::print(fetched)
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_config(config: &AgentportConfig, path: &std::path::Path) -> Result<()> {
        Self::print(&serde_json::json!({
            "path": path.display().to_string(),
            "config": config,
        }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_config_path(path: &std::path::Path) -> Result<()> {
        Self::print(&serde_json::json!({ "path": path.display().to_string() }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_version(version: &str) -> Result<()> {
        Self::print(&serde_json::json!({ "version": version }))
    }
}
