//! Application context: unified state passed to every command handler.
//!
//! `AppContext` is built once per invocation. It owns the output context,
//! the loaded configuration and the production port implementations, so
//! command handlers never construct infrastructure themselves.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::application::orchestrator::ExportOrchestrator;
use crate::application::registry::AdapterRegistry;
use crate::application::services::config_service;
use crate::domain::config::AgentportConfig;
use crate::domain::enrichment::TriggerDocumentEnricher;
use crate::domain::schema::SchemaRegistry;
use crate::infra::config::YamlConfigStore;
use crate::infra::fs::{FsArtifactWriter, FsManifestReader};
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer, TerminalReporter};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Configuration persistence.
    pub config_store: YamlConfigStore,
    /// Configuration as loaded at start-up.
    pub config: AgentportConfig,
    /// Manifest and option file reader.
    pub reader: FsManifestReader,
    /// Artifact writer used by `export`.
    pub writer: FsArtifactWriter,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        let config_store = YamlConfigStore;
        let config = config_service::load_config(&config_store)?;

        Ok(Self {
            output: OutputContext::new(flags.output.no_color, flags.output.quiet),
            mode,
            config_store,
            config,
            reader: FsManifestReader,
            writer: FsArtifactWriter,
        })
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }

    /// Progress reporter for application services.
    #[must_use]
    pub fn reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output)
    }

    /// Builds the schema and adapter registries and the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when two converters claim one platform;
    /// no export may run in that case.
    pub fn orchestrator(&self) -> Result<ExportOrchestrator> {
        let adapters = AdapterRegistry::with_builtin().context("converter registry is misconfigured")?;
        Ok(ExportOrchestrator::new(
            Arc::new(SchemaRegistry::with_builtin_schemas()),
            Arc::new(adapters),
        )
        .with_enricher(Arc::new(TriggerDocumentEnricher)))
    }
}
