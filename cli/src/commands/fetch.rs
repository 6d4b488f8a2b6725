//! `agentport fetch`: download a manifest from a registry.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::publish_service::{self, FetchedManifest};
use crate::infra::fs::write_document;
use crate::infra::registry_client::HttpManifestRegistry;

/// Arguments for the fetch command.
#[derive(Args)]
pub struct FetchArgs {
    /// Manifest id: <name> or <name>/<version>
    #[arg(value_name = "ID")]
    pub id: String,

    /// Registry base URL [default: registry.url]
    #[arg(long, value_name = "URL")]
    pub registry: Option<String>,

    /// Save to this file instead of printing
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Run the fetch command.
///
/// # Errors
///
/// Returns an error if no registry is configured, the download fails, or
/// the output file cannot be written.
pub fn run(app: &AppContext, args: FetchArgs) -> Result<ExitCode> {
    let url = super::registry_url(app, args.registry)?;
    let registry = HttpManifestRegistry::new(&url);
    let document = publish_service::fetch_manifest(&registry, &args.id)?;

    let fetched = match args.output {
        Some(path) => {
            write_document(&path, &document)?;
            FetchedManifest {
                id: args.id,
                path: Some(path),
                document: None,
            }
        }
        None => FetchedManifest {
            id: args.id,
            path: None,
            document: Some(document),
        },
    };
    app.renderer().render_fetch(&fetched)?;
    Ok(ExitCode::SUCCESS)
}
