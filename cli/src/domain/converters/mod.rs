//! Platform converters: pure `Manifest -> ArtifactSet` transforms.
//!
//! Converters are stateless and independent of one another. None of them
//! touch the filesystem or network; everything is returned in memory.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.

pub mod container;
pub mod drupal;
pub mod kubernetes;
pub mod langgraph;
pub mod npm;
pub mod runtime;

use std::sync::Arc;

use agentport_common::{Diagnostic, DiagnosticCode, ValidationResult};

use crate::domain::artifact::ArtifactSet;
use crate::domain::error::ConvertError;
use crate::domain::expression::{Bindings, Value};
use crate::domain::manifest::{Manifest, ToolBinding};
use crate::domain::options::PlatformOptions;
use crate::domain::quote::markdown_text;

pub use container::ContainerImageConverter;
pub use drupal::DrupalModuleConverter;
pub use kubernetes::KubernetesConverter;
pub use langgraph::LangGraphConverter;
pub use npm::NpmPackageConverter;

/// Artifacts plus the degradations noted while producing them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversion {
    pub artifacts: ArtifactSet,
    pub warnings: Vec<Diagnostic>,
}

/// A converter for one target platform.
pub trait PlatformConverter: Send + Sync {
    /// Platform identifier this converter answers to.
    fn platform(&self) -> &str;

    /// Name of the implementation, used to tell a re-registration of the
    /// same converter from a conflicting one.
    fn implementation(&self) -> &str;

    /// One-line description for listings.
    fn description(&self) -> &str;

    /// Checks the option bag (and any manifest constraints specific to this
    /// platform) without converting.
    fn validate_options(&self, manifest: &Manifest, options: &PlatformOptions) -> ValidationResult;

    /// Produces the artifact set.
    ///
    /// # Errors
    ///
    /// `ConvertError::InvalidOptions` when the options are rejected;
    /// `ConvertError::Artifact` when two artifacts collide.
    fn convert(&self, manifest: &Manifest, options: &PlatformOptions) -> Result<Conversion, ConvertError>;
}

/// The five built-in converters.
#[must_use]
pub fn builtin_converters() -> Vec<Arc<dyn PlatformConverter>> {
    vec![
        Arc::new(ContainerImageConverter),
        Arc::new(KubernetesConverter),
        Arc::new(NpmPackageConverter),
        Arc::new(DrupalModuleConverter),
        Arc::new(LangGraphConverter),
    ]
}

/// Turns a typed option read into the `validate_options` report.
pub(crate) fn option_report<T>(read: Result<T, Vec<Diagnostic>>) -> ValidationResult {
    match read {
        Ok(_) => ValidationResult::default(),
        Err(errors) => ValidationResult::new(errors, Vec::new()),
    }
}

/// Variables a tool-binding condition can see during one export.
#[must_use]
pub fn condition_bindings(platform: &str, manifest: &Manifest, options: &PlatformOptions) -> Bindings {
    let mut bindings = Bindings::new()
        .with("platform", Value::Str(platform.to_string()))
        .with("schema", Value::Str(manifest.schema_version().to_string()))
        .with_optional_namespace("options");
    for (key, value) in options.iter() {
        bindings = bindings.with(format!("options.{key}"), Value::from(value));
    }
    bindings
}

/// Tool bindings whose `when` condition holds for this export, in
/// declaration order.
///
/// # Errors
///
/// Returns `InvalidOptions` with an `invalid-expression` diagnostic when a
/// condition fails to evaluate against these options.
pub fn active_tool_bindings<'m>(
    platform: &str,
    manifest: &'m Manifest,
    options: &PlatformOptions,
) -> Result<Vec<&'m ToolBinding>, ConvertError> {
    let bindings = condition_bindings(platform, manifest, options);
    let mut active = Vec::new();
    let mut errors = Vec::new();
    for (i, binding) in manifest.tool_bindings().iter().enumerate() {
        let keep = match &binding.when {
            None => true,
            Some(expr) => match expr.matches(&bindings) {
                Ok(keep) => keep,
                Err(e) => {
                    errors.push(Diagnostic::new(
                        DiagnosticCode::InvalidExpression,
                        format!("spec.toolBindings[{i}].when"),
                        e.to_string(),
                    ));
                    false
                }
            },
        };
        if keep {
            active.push(binding);
        }
    }
    if errors.is_empty() {
        Ok(active)
    } else {
        Err(ConvertError::InvalidOptions(errors))
    }
}

/// Client library for the declared LLM provider, if it has a known one.
#[must_use]
pub fn provider_requirement(manifest: &Manifest) -> Option<&'static str> {
    match manifest.llm()?.provider.as_str() {
        "openai" | "azure-openai" => Some("openai>=1.40"),
        "anthropic" => Some("anthropic>=0.34"),
        "google" | "gemini" => Some("google-genai>=0.3"),
        "mistral" => Some("mistralai>=1.0"),
        _ => None,
    }
}

/// `requirements.txt` body: `base` entries followed by the provider client.
#[must_use]
pub fn python_requirements(manifest: &Manifest, base: &[&str]) -> String {
    let mut out = String::new();
    for line in base.iter().copied().chain(provider_requirement(manifest)) {
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Opening lines shared by every generated `README.md`.
#[must_use]
pub fn readme_header(manifest: &Manifest, platform_title: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "# {} ({platform_title})\n\n",
        markdown_text(manifest.name())
    ));
    out.push_str(&format!("{}\n\n", markdown_text(&manifest.description_or_default())));
    out.push_str(&format!(
        "Generated by agentport from `{}` version {}.\n\n",
        manifest.dns_name(),
        markdown_text(manifest.version())
    ));
    out.push_str("## Capabilities\n\n");
    for cap in manifest.unique_capabilities() {
        out.push_str(&format!("- `{cap}`\n"));
    }
    out.push('\n');
    out
}

/// Markdown list of tool bindings, or nothing when there are none.
#[must_use]
pub fn readme_tool_bindings(bindings: &[&ToolBinding]) -> String {
    if bindings.is_empty() {
        return String::new();
    }
    let mut out = String::from("## Tool bindings\n\n");
    for b in bindings {
        out.push_str(&format!(
            "- `{}`: {} (auth: {})\n",
            b.name,
            markdown_text(&b.endpoint),
            b.auth.kind.as_str()
        ));
    }
    out.push('\n');
    out
}

/// Markdown list of required environment variables.
#[must_use]
pub fn readme_env(manifest: &Manifest) -> String {
    let env = &manifest.runtime().env;
    if env.is_empty() {
        return String::new();
    }
    let mut out = String::from("## Environment\n\nThe agent refuses to start unless these are set:\n\n");
    for var in env {
        out.push_str(&format!("- `{var}`\n"));
    }
    out.push('\n');
    out
}
