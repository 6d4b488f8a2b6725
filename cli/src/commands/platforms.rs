//! `agentport platforms`: list the registered converters.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;

/// Run the platforms command.
///
/// # Errors
///
/// Returns an error if the converter registry is misconfigured.
pub fn run(app: &AppContext) -> Result<ExitCode> {
    let orchestrator = app.orchestrator()?;
    app.renderer()
        .render_platforms(&orchestrator.adapters().describe())?;
    Ok(ExitCode::SUCCESS)
}
