//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, OutputFlags};
use crate::commands;

/// Validate agent manifests and export them to deployment platforms
#[derive(Parser)]
#[command(
    name = "agentport",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert manifests into platform artifacts
    Export(commands::export::ExportArgs),

    /// Check manifests without converting them
    Validate(commands::validate::ValidateArgs),

    /// List supported platforms
    Platforms,

    /// Upload a manifest to a registry
    Publish(commands::publish::PublishArgs),

    /// Download a manifest from a registry
    Fetch(commands::fetch::FetchArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            command,
            ..
        } = self;
        let app = AppContext::new(&AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
        })?;
        match command {
            Command::Export(args) => commands::export::run(&app, args).await,
            Command::Validate(args) => commands::validate::run(&app, &args),
            Command::Platforms => commands::platforms::run(&app),
            Command::Publish(args) => commands::publish::run(&app, args),
            Command::Fetch(args) => commands::fetch::run(&app, args),
            Command::Config(cmd) => commands::config::run(&app, cmd),
            Command::Version => commands::version::run(&app),
        }
    }
}
