//! agentport - validate agent manifests and export them to deployment platforms

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use agentport_cli::cli::Cli;
use agentport_cli::domain::error::ExportError;
use agentport_cli::output::json::format_error;

/// Log filter: `AGENTPORT_LOG`, then `RUST_LOG`, else `warn`; `-v` forces
/// `debug`.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        std::env::var("AGENTPORT_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .ok()
            .and_then(|s| EnvFilter::try_new(s).ok())
            .unwrap_or_else(|| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn error_code(e: &anyhow::Error) -> &'static str {
    match e.downcast_ref::<ExportError>() {
        Some(ExportError::ManifestNotFound(_)) => "manifest_not_found",
        Some(ExportError::NoPlatform) => "no_platform",
        Some(ExportError::MalformedOption(_)) => "malformed_option",
        None => "error",
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let json = cli.json;
    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            let message = format!("{e:#}");
            match format_error(&message, error_code(&e)) {
                Ok(body) if json => println!("{body}"),
                _ => eprintln!("Error: {message}"),
            }
            ExitCode::FAILURE
        }
    }
}
