//! `agentport validate`: check manifests against their schema.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::validate_service;
use crate::domain::schema::SchemaRegistry;

/// Arguments for the validate command.
#[derive(Args)]
pub struct ValidateArgs {
    /// Manifest files (YAML or JSON)
    #[arg(required = true, value_name = "MANIFEST")]
    pub manifests: Vec<PathBuf>,
}

/// Run the validate command.
///
/// # Errors
///
/// Returns an error if a manifest cannot be read.
pub fn run(app: &AppContext, args: &ValidateArgs) -> Result<ExitCode> {
    let schemas = SchemaRegistry::with_builtin_schemas();
    let reports = validate_service::validate_manifests(&app.reader, &schemas, &args.manifests)?;
    app.renderer().render_validation(&reports)?;
    if reports.iter().all(|r| r.result.is_valid()) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
