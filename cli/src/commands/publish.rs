//! `agentport publish`: validate a manifest and upload it to a registry.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::publish_service;
use crate::domain::schema::SchemaRegistry;
use crate::infra::registry_client::HttpManifestRegistry;

/// Arguments for the publish command.
#[derive(Args)]
pub struct PublishArgs {
    /// Manifest file (YAML or JSON)
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,

    /// Registry base URL [default: registry.url]
    #[arg(long, value_name = "URL")]
    pub registry: Option<String>,
}

/// Run the publish command.
///
/// # Errors
///
/// Returns an error if no registry is configured, the manifest is invalid,
/// or the upload fails.
pub fn run(app: &AppContext, args: PublishArgs) -> Result<ExitCode> {
    let url = super::registry_url(app, args.registry)?;
    let registry = HttpManifestRegistry::new(&url);
    let receipt = publish_service::publish_manifest(
        &app.reader,
        &SchemaRegistry::with_builtin_schemas(),
        &registry,
        &app.reporter(),
        &args.manifest,
    )?;
    app.renderer().render_publish(&receipt)?;
    Ok(ExitCode::SUCCESS)
}
