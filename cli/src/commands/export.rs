//! `agentport export`: convert manifests into platform artifacts.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::CancelFlag;
use crate::application::services::export_service::{self, ExportRequest};
use crate::domain::error::ExportError;

/// Arguments for the export command.
#[derive(Args)]
pub struct ExportArgs {
    /// Manifest files (YAML or JSON)
    #[arg(required = true, value_name = "MANIFEST")]
    pub manifests: Vec<PathBuf>,

    /// Target platform; repeat to export to several
    #[arg(short = 'p', long = "platform", value_name = "ID")]
    pub platforms: Vec<String>,

    /// Output directory [default: export.output_root]
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Convert and report without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Add the SKILL.md trigger document
    #[arg(long)]
    pub enrich: bool,

    /// Platform option, e.g. --set replicas=3
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// YAML or JSON file of platform options, applied before --set
    #[arg(long, value_name = "FILE")]
    pub options: Option<PathBuf>,
}

/// Run the export command.
///
/// # Errors
///
/// Returns an error if no platform is given, a manifest cannot be read, or
/// the converter registry is misconfigured.
pub async fn run(app: &AppContext, args: ExportArgs) -> Result<ExitCode> {
    let platforms = if args.platforms.is_empty() {
        app.config.export.platform.iter().cloned().collect()
    } else {
        args.platforms
    };
    if platforms.is_empty() {
        return Err(ExportError::NoPlatform.into());
    }
    let orchestrator = app.orchestrator()?;

    let request = ExportRequest {
        manifests: args.manifests,
        platforms,
        output_root: args
            .output
            .unwrap_or_else(|| PathBuf::from(&app.config.export.output_root)),
        dry_run: args.dry_run,
        include_enrichment: args.enrich || app.config.export.enrichment,
        options_file: args.options,
        assignments: args.set,
    };

    let cancel = CancelFlag::new();
    let watcher = tokio::spawn(cancel_on_interrupt(cancel.clone()));
    let report = export_service::export_manifests(
        &app.reader,
        &app.writer,
        &orchestrator,
        &app.reporter(),
        &cancel,
        request,
    )
    .await;
    watcher.abort();
    let report = report?;

    app.renderer().render_export(&report)?;
    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

async fn cancel_on_interrupt(cancel: CancelFlag) {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::warn!("interrupt received, no further files will be written");
        cancel.cancel();
    }
}
