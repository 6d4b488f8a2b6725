//! Human-readable terminal renderer.

use agentport_common::Diagnostic;
use owo_colors::OwoColorize as _;

use crate::application::PlatformInfo;
use crate::application::ports::{PublishReceipt, WriteStatus};
use crate::application::services::export_service::{ExportReport, ExportedPair};
use crate::application::services::publish_service::FetchedManifest;
use crate::application::services::validate_service::ManifestReport;
use crate::domain::config::AgentportConfig;
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        if self.ctx.quiet {
            return;
        }
        println!("agentport {version}");
    }

    fn diagnostics(&self, warnings: &[Diagnostic], errors: &[Diagnostic]) {
        for d in warnings {
            self.ctx.warn(&d.to_string());
        }
        for d in errors {
            self.ctx.error(&d.to_string());
        }
    }

    /// Render the outcome of an export run.
    pub fn render_export(&self, report: &ExportReport) {
        for pair in &report.exports {
            self.render_pair(pair, report.dry_run);
        }
        let failed = report.exports.iter().filter(|p| !p.result.success).count();
        let total = report.exports.len();
        if failed > 0 {
            self.ctx
                .error(&format!("{failed} of {total} export(s) failed"));
        } else if report.dry_run {
            self.ctx.info(&format!("Dry run: {total} export(s) validated, nothing written"));
        } else if report.was_cancelled() {
            self.ctx.warn(&format!(
                "Cancelled: {} file(s) from earlier exports kept",
                report.files_written()
            ));
        } else {
            self.ctx.success(&format!(
                "{total} export(s) complete, {} file(s) written",
                report.files_written()
            ));
        }
    }

    fn render_pair(&self, pair: &ExportedPair, dry_run: bool) {
        let r = &pair.result;
        let label = format!(
            "{} → {}",
            r.name.as_deref().unwrap_or(&r.manifest),
            r.platform.style(self.ctx.styles.platform)
        );
        if !r.success {
            let stage = r.failed_stage.map_or("export", |s| s.as_str());
            self.ctx.error(&format!("{label}: failed while {stage}"));
            self.diagnostics(&r.warnings, &r.errors);
            return;
        }
        self.ctx.header(&label);
        if dry_run && !self.ctx.quiet {
            for artifact in r.artifacts.iter() {
                let marker = if artifact.is_executable_hint { " (x)" } else { "" };
                self.ctx.kv(
                    &format!("{:<40}", r.output_root.join(&artifact.relative_path).display()),
                    &format!("{} bytes{marker}", artifact.content.len()),
                );
            }
        }
        if let Some(write) = &pair.write
            && let WriteStatus::Failed(reason) = &write.status
        {
            self.ctx.error(&format!("write failed: {reason}"));
        }
        self.diagnostics(&r.warnings, &[]);
    }

    /// Render validation reports, one block per manifest.
    pub fn render_validation(&self, reports: &[ManifestReport]) {
        for report in reports {
            let label = report.name.as_deref().unwrap_or(&report.manifest);
            if report.result.is_valid() {
                let version = report.schema_version.as_deref().unwrap_or("?");
                self.ctx.success(&format!("{label} is valid (schema {version})"));
            } else {
                self.ctx.error(&format!("{label} is invalid"));
            }
            self.diagnostics(report.result.warnings(), report.result.errors());
        }
    }

    /// Render the registered platforms.
    pub fn render_platforms(&self, platforms: &[PlatformInfo]) {
        if platforms.is_empty() {
            println!("No platforms registered.");
            return;
        }
        println!("Available platforms:\n");
        for p in platforms {
            println!(
                "  {:<18} {}",
                p.platform.style(self.ctx.styles.platform),
                p.description
            );
        }
        println!("\nExport with: agentport export <manifest> --platform <id>");
    }

    /// Render a publish receipt.
    pub fn render_publish(&self, receipt: &PublishReceipt) {
        self.ctx.kv("Id:", &receipt.id);
        self.ctx.kv("Version:", &receipt.version);
        self.ctx.kv("URL:", &receipt.url);
    }

    /// Render a fetched manifest: the document itself, or where it was saved.
    pub fn render_fetch(&self, fetched: &FetchedManifest) {
        match (&fetched.path, &fetched.document) {
            (Some(path), _) => self
                .ctx
                .success(&format!("Saved {} to {}", fetched.id, path.display())),
            (None, Some(document)) => print!("{document}"),
            (None, None) => {}
        }
    }

    /// Render the current agentport configuration.
    pub fn render_config(&self, config: &AgentportConfig, path: &std::path::Path) {
        println!();
        println!(
            "  {}",
            format!("Configuration ({})", path.display()).style(self.ctx.styles.header)
        );
        println!();
        println!(
            "  {:<22} {}",
            "export.platform:",
            config.export.platform.as_deref().unwrap_or("(not set)")
        );
        println!("  {:<22} {}", "export.output_root:", config.export.output_root);
        println!("  {:<22} {}", "export.enrichment:", config.export.enrichment);
        println!(
            "  {:<22} {}",
            "registry.url:",
            config.registry.url.as_deref().unwrap_or("(not set)")
        );
        println!();
        println!("  {}", "Environment:".style(self.ctx.styles.bold));
        for var in ["AGENTPORT_CONFIG", "AGENTPORT_LOG", "NO_COLOR"] {
            println!(
                "    {:<20} {}",
                format!("{var}:"),
                std::env::var(var).unwrap_or_else(|_| "(not set)".to_string())
            );
        }
    }
}
