//! Export orchestrator: `Validating -> Converting -> Enriching -> Completed`,
//! or `Failed` from any of the first three.
//!
//! The orchestrator performs no I/O. It never retries, and expected failures
//! come back inside the `ExportResult` rather than as `Err`. A failed export
//! always carries zero artifacts.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use agentport_common::{Diagnostic, DiagnosticCode};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::application::registry::AdapterRegistry;
use crate::domain::artifact::ArtifactSet;
use crate::domain::converters::{Conversion, PlatformConverter};
use crate::domain::enrichment::Enricher;
use crate::domain::error::ConvertError;
use crate::domain::manifest::{Manifest, RawManifest};
use crate::domain::naming::dns_label;
use crate::domain::options::PlatformOptions;
use crate::domain::schema::SchemaRegistry;

// ── Types ─────────────────────────────────────────────────────────────────────

/// Per-invocation settings. Threaded explicitly through every call so that
/// concurrent exports with different settings cannot interfere.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportOptions {
    pub platform: String,
    /// Where the caller intends to write the artifacts.
    pub output_root: PathBuf,
    pub include_enrichment: bool,
    /// Opaque bag handed to the selected converter.
    pub options: PlatformOptions,
}

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStage {
    Validating,
    Converting,
    Enriching,
    Completed,
    Failed,
}

impl ExportStage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Converting => "converting",
            Self::Enriching => "enriching",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Outcome of one `(manifest, platform)` export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    /// Where the manifest came from, usually its path.
    pub manifest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub platform: String,
    pub output_root: PathBuf,
    pub success: bool,
    pub stage: ExportStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<ExportStage>,
    #[serde(serialize_with = "artifact_summary")]
    pub artifacts: ArtifactSet,
    pub warnings: Vec<Diagnostic>,
    pub errors: Vec<Diagnostic>,
    /// SHA-256 over the artifact set; absent on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ExportResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success
    }
}

#[derive(Serialize)]
struct ArtifactEntry<'a> {
    path: &'a str,
    bytes: usize,
    executable: bool,
}

fn artifact_summary<S: Serializer>(set: &ArtifactSet, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(set.iter().map(|a| ArtifactEntry {
        path: &a.relative_path,
        bytes: a.content.len(),
        executable: a.is_executable_hint,
    }))
}

// ── Run state ─────────────────────────────────────────────────────────────────

struct Run<'a> {
    raw: &'a RawManifest,
    opts: &'a ExportOptions,
    name: Option<String>,
    stage: ExportStage,
    warnings: Vec<Diagnostic>,
    started_at: DateTime<Utc>,
    clock: Instant,
}

impl<'a> Run<'a> {
    fn start(raw: &'a RawManifest, opts: &'a ExportOptions) -> Self {
        Self {
            raw,
            opts,
            name: raw.declared_name().map(str::to_string),
            stage: ExportStage::Validating,
            warnings: Vec::new(),
            started_at: Utc::now(),
            clock: Instant::now(),
        }
    }

    fn enter(&mut self, stage: ExportStage) {
        tracing::debug!(
            manifest = self.raw.origin(),
            platform = %self.opts.platform,
            stage = stage.as_str(),
            "export stage"
        );
        self.stage = stage;
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.clock.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn fail(self, errors: Vec<Diagnostic>) -> ExportResult {
        tracing::warn!(
            manifest = self.raw.origin(),
            platform = %self.opts.platform,
            stage = self.stage.as_str(),
            errors = errors.len(),
            "export failed"
        );
        let duration_ms = self.elapsed_ms();
        ExportResult {
            manifest: self.raw.origin().to_string(),
            name: self.name,
            platform: self.opts.platform.clone(),
            output_root: self.opts.output_root.clone(),
            success: false,
            stage: ExportStage::Failed,
            failed_stage: Some(self.stage),
            artifacts: ArtifactSet::new(),
            warnings: self.warnings,
            errors,
            digest: None,
            started_at: self.started_at,
            duration_ms,
        }
    }

    fn complete(self, artifacts: ArtifactSet) -> ExportResult {
        tracing::info!(
            manifest = self.raw.origin(),
            platform = %self.opts.platform,
            artifacts = artifacts.len(),
            warnings = self.warnings.len(),
            "export completed"
        );
        let duration_ms = self.elapsed_ms();
        ExportResult {
            manifest: self.raw.origin().to_string(),
            name: self.name,
            platform: self.opts.platform.clone(),
            output_root: self.opts.output_root.clone(),
            success: true,
            stage: ExportStage::Completed,
            failed_stage: None,
            digest: Some(artifacts.digest()),
            artifacts,
            warnings: self.warnings,
            errors: Vec::new(),
            started_at: self.started_at,
            duration_ms,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic with a non-string payload".to_string())
}

fn defect(message: String) -> Vec<Diagnostic> {
    ConvertError::Defect(message).into_diagnostics()
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

/// Runs exports against injected registries. Cheap to clone.
#[derive(Clone)]
pub struct ExportOrchestrator {
    schemas: Arc<SchemaRegistry>,
    adapters: Arc<AdapterRegistry>,
    enricher: Option<Arc<dyn Enricher>>,
}

impl std::fmt::Debug for ExportOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportOrchestrator")
            .field("schemas", &self.schemas)
            .field("adapters", &self.adapters)
            .field("enricher", &self.enricher.as_ref().map(|e| e.name().to_string()))
            .finish()
    }
}

impl ExportOrchestrator {
    #[must_use]
    pub fn new(schemas: Arc<SchemaRegistry>, adapters: Arc<AdapterRegistry>) -> Self {
        Self {
            schemas,
            adapters,
            enricher: None,
        }
    }

    /// Injects the enricher used when `include_enrichment` is set.
    #[must_use]
    pub fn with_enricher(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    #[must_use]
    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    /// Exports one manifest to one platform.
    #[must_use]
    pub fn export(&self, raw: &RawManifest, opts: &ExportOptions) -> ExportResult {
        let mut run = Run::start(raw, opts);

        // Validating
        let check = self.schemas.validate(raw);
        let (errors, warnings) = check.result.clone().into_parts();
        run.warnings.extend(warnings);
        if !errors.is_empty() {
            return run.fail(errors);
        }
        let Some(version) = check.version.as_deref() else {
            return run.fail(vec![Diagnostic::new(
                DiagnosticCode::InternalInvariant,
                "",
                "validation passed without resolving a schema version",
            )]);
        };
        let manifest = match Manifest::from_validated(raw, version, &check.result) {
            Ok(m) => m,
            Err(diag) => return run.fail(vec![diag]),
        };
        run.name = Some(manifest.name().to_string());

        // Converting
        run.enter(ExportStage::Converting);
        let converter = match self.adapters.resolve(&opts.platform) {
            Ok(c) => c,
            Err(e) => return run.fail(vec![e.to_diagnostic()]),
        };
        tracing::debug!(
            platform = converter.platform(),
            implementation = converter.implementation(),
            "converter selected"
        );
        let conversion = match convert_guarded(converter.as_ref(), &manifest, &opts.options) {
            Ok((conversion, option_warnings)) => {
                run.warnings.extend(option_warnings);
                conversion
            }
            Err(errors) => return run.fail(errors),
        };
        for w in &conversion.warnings {
            tracing::warn!(platform = %opts.platform, path = %w.path, "{}", w.message);
        }
        run.warnings.extend(conversion.warnings);
        let mut artifacts = conversion.artifacts;

        // Enriching
        if opts.include_enrichment
            && let Some(enricher) = &self.enricher
        {
            run.enter(ExportStage::Enriching);
            match catch_unwind(AssertUnwindSafe(|| enricher.augment(&manifest))) {
                Ok(Some(extra)) => {
                    if let Err(e) = artifacts.push(extra) {
                        return run.fail(vec![e.to_diagnostic()]);
                    }
                }
                Ok(None) => {}
                Err(payload) => {
                    return run.fail(defect(format!(
                        "enricher '{}' panicked: {}",
                        enricher.name(),
                        panic_message(payload.as_ref())
                    )));
                }
            }
        }

        run.enter(ExportStage::Completed);
        run.complete(artifacts)
    }

    /// Exports every manifest to every platform, running the pairs on the
    /// blocking pool. Results come back manifest-major, in input order.
    ///
    /// Manifests whose names derive the same identifier are all rejected
    /// with `duplicate-identity`; their output directories would collide.
    pub async fn export_batch(
        &self,
        manifests: Vec<RawManifest>,
        platforms: &[String],
        base: &ExportOptions,
    ) -> Vec<ExportResult> {
        let single = manifests.len() == 1 && platforms.len() == 1;
        let duplicates = duplicate_identities(&manifests);

        let mut handles = Vec::with_capacity(manifests.len() * platforms.len());
        for raw in manifests {
            let raw = Arc::new(raw);
            let key = identity_key(&raw);
            for platform in platforms {
                let opts = ExportOptions {
                    platform: platform.clone(),
                    output_root: if single {
                        base.output_root.clone()
                    } else {
                        pair_root(&base.output_root, &key, platform)
                    },
                    ..base.clone()
                };
                if let Some(count) = duplicates.get(&key) {
                    let run = Run::start(&raw, &opts);
                    let message = format!(
                        "'{}' appears {count} times in this export; every manifest needs a distinct name",
                        raw.declared_name().unwrap_or_default(),
                    );
                    let result = run.fail(vec![Diagnostic::new(
                        DiagnosticCode::DuplicateIdentity,
                        "metadata.name",
                        message,
                    )]);
                    handles.push(Pending::Ready(Box::new(result)));
                    continue;
                }
                let this = self.clone();
                let raw = Arc::clone(&raw);
                let fallback = (raw.origin().to_string(), opts.clone());
                let handle = tokio::task::spawn_blocking(move || this.export(&raw, &opts));
                handles.push(Pending::Running(handle, Box::new(fallback)));
            }
        }

        let mut results = Vec::with_capacity(handles.len());
        for pending in handles {
            match pending {
                Pending::Ready(result) => results.push(*result),
                Pending::Running(handle, fallback) => match handle.await {
                    Ok(result) => results.push(result),
                    Err(e) => {
                        let (origin, opts) = *fallback;
                        let raw = RawManifest::from_value(origin, serde_json::Value::Null);
                        results.push(
                            Run::start(&raw, &opts)
                                .fail(defect(format!("export task did not finish: {e}"))),
                        );
                    }
                },
            }
        }
        results
    }
}

enum Pending {
    Ready(Box<ExportResult>),
    Running(
        tokio::task::JoinHandle<ExportResult>,
        Box<(String, ExportOptions)>,
    ),
}

/// Runs option validation, then the converter, with panics contained.
/// On success returns the conversion plus option-level warnings.
fn convert_guarded(
    converter: &dyn PlatformConverter,
    manifest: &Manifest,
    options: &PlatformOptions,
) -> Result<(Conversion, Vec<Diagnostic>), Vec<Diagnostic>> {
    let guarded = catch_unwind(AssertUnwindSafe(|| {
        let (errors, warnings) = converter.validate_options(manifest, options).into_parts();
        if !errors.is_empty() {
            return Err(errors);
        }
        converter
            .convert(manifest, options)
            .map(|c| (c, warnings))
            .map_err(ConvertError::into_diagnostics)
    }));
    match guarded {
        Ok(outcome) => outcome,
        Err(payload) => Err(defect(format!(
            "converter '{}' panicked: {}",
            converter.implementation(),
            panic_message(payload.as_ref())
        ))),
    }
}

fn identity_key(raw: &RawManifest) -> String {
    dns_label(raw.declared_name().unwrap_or_default())
}

fn duplicate_identities(manifests: &[RawManifest]) -> HashMap<String, usize> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for raw in manifests.iter().filter(|r| r.declared_name().is_some()) {
        *counts.entry(identity_key(raw)).or_default() += 1;
    }
    counts.retain(|_, n| *n > 1);
    counts
}

fn pair_root(root: &Path, key: &str, platform: &str) -> PathBuf {
    root.join(key).join(platform)
}
