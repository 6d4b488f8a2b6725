//! Export orchestrator behaviour through the public API: the acceptance
//! scenarios plus the short-circuit and all-or-nothing guarantees.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use agentport_cli::application::{AdapterRegistry, ExportOptions, ExportStage};
use agentport_cli::domain::artifact::{Artifact, ArtifactSet};
use agentport_cli::domain::converters::{Conversion, PlatformConverter};
use agentport_cli::domain::enrichment::TRIGGER_DOCUMENT;
use agentport_cli::domain::error::ConvertError;
use agentport_cli::domain::manifest::Manifest;
use agentport_cli::domain::naming::dns_label;
use agentport_cli::domain::options::PlatformOptions;
use agentport_common::{Diagnostic, DiagnosticCode, ErrorClass, ValidationResult};

use crate::helpers::{MINIMAL, NO_SCHEMA_VERSION, SCALED, opts, orchestrator, orchestrator_with, raw};
use crate::mocks::{MockConverter, converter, shared};

// ── Scenario A: container export of a minimal manifest ───────────────────────

#[test]
fn test_container_export_succeeds_with_non_root_user() {
    let result = orchestrator().export(&raw(MINIMAL), &opts("container-image"));

    assert!(result.is_success(), "errors: {:?}", result.errors);
    assert_eq!(result.stage, ExportStage::Completed);
    let dockerfile = &result.artifacts.get("Dockerfile").expect("Dockerfile").content;
    let user = dockerfile
        .lines()
        .find_map(|l| l.strip_prefix("USER "))
        .expect("USER directive");
    assert_ne!(user, "root");
    assert_ne!(user, "0");
    assert_eq!(dns_label("Content Moderator"), "content-moderator");
    assert!(result.artifacts.get("compose.yaml").unwrap().content.contains("content-moderator"));
}

// ── Scenario B: missing schema version never reaches a converter ─────────────

#[test]
fn test_missing_schema_version_short_circuits_before_convert() {
    let mut mock = MockConverter::new();
    mock.expect_platform().return_const("mock-platform".to_string());
    mock.expect_implementation().return_const("mock-platform-v1".to_string());
    mock.expect_description().return_const("mock-platform".to_string());
    mock.expect_validate_options().never();
    mock.expect_convert().never();

    let adapters = AdapterRegistry::new();
    adapters.register(shared(mock), false).unwrap();
    let result = orchestrator_with(adapters).export(&raw(NO_SCHEMA_VERSION), &opts("mock-platform"));

    assert!(!result.success);
    assert_eq!(result.failed_stage, Some(ExportStage::Validating));
    assert_eq!(result.errors[0].path, "schemaVersion");
    assert_eq!(result.errors[0].code, DiagnosticCode::MissingSchemaVersion);
    assert!(result.artifacts.is_empty());
    assert!(result.digest.is_none());
}

// ── Scenario C: unknown platform ─────────────────────────────────────────────

#[test]
fn test_unknown_platform_reports_one_unsupported_error() {
    let result = orchestrator().export(&raw(MINIMAL), &opts("unknown-platform"));

    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].class(), ErrorClass::UnsupportedPlatform);
    assert!(result.errors[0].message.contains("npm-package"));
    assert!(result.artifacts.is_empty());
    assert_eq!(result.failed_stage, Some(ExportStage::Converting));
}

// ── Scenario D: deterministic package output ─────────────────────────────────

#[test]
fn test_npm_export_is_byte_identical_across_runs() {
    let orch = orchestrator();
    let options = ExportOptions {
        options: PlatformOptions::new().with("scope", "acme"),
        ..opts("npm-package")
    };
    let first = orch.export(&raw(MINIMAL), &options);
    let second = orch.export(&raw(MINIMAL), &options);

    assert!(first.success && second.success);
    assert_eq!(first.artifacts, second.artifacts);
    assert_eq!(first.digest, second.digest);
}

// ── Scenario E: unsupported runtime field degrades, does not fail ────────────

#[test]
fn test_scaling_on_container_yields_exactly_one_warning() {
    let result = orchestrator().export(&raw(SCALED), &opts("container-image"));

    assert!(result.success, "errors: {:?}", result.errors);
    assert!(!result.artifacts.is_empty());
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].code, DiagnosticCode::FieldDropped);
    assert_eq!(result.warnings[0].path, "spec.runtime.scaling");
}

#[test]
fn test_scaling_on_kubernetes_is_not_dropped() {
    let result = orchestrator().export(&raw(SCALED), &opts("kubernetes"));
    assert!(result.success);
    assert!(result.warnings.is_empty());
    assert!(result.artifacts.contains("hpa.yaml"));
}

// ── All-or-nothing ───────────────────────────────────────────────────────────

#[test]
fn test_enrichment_colliding_with_converter_output_fails_with_zero_artifacts() {
    let mut mock = converter("skills", "skills-v1");
    mock.expect_convert().times(1).returning(|_, _| {
        Ok(Conversion {
            artifacts: ArtifactSet::from_artifacts([
                Artifact::new("index.md", "# index\n"),
                Artifact::new(TRIGGER_DOCUMENT, "taken\n"),
            ])
            .unwrap(),
            warnings: Vec::new(),
        })
    });
    let adapters = AdapterRegistry::new();
    adapters.register(shared(mock), false).unwrap();

    let result = orchestrator_with(adapters).export(
        &raw(MINIMAL),
        &ExportOptions {
            include_enrichment: true,
            ..opts("skills")
        },
    );

    assert!(!result.success);
    assert_eq!(result.failed_stage, Some(ExportStage::Enriching));
    assert_eq!(result.errors[0].code, DiagnosticCode::ArtifactCollision);
    assert_eq!(result.errors[0].class(), ErrorClass::ArtifactCollision);
    assert!(result.artifacts.is_empty());
}

#[test]
fn test_converter_option_error_is_captured_not_raised() {
    let mut mock = MockConverter::new();
    mock.expect_platform().return_const("strict".to_string());
    mock.expect_implementation().return_const("strict-v1".to_string());
    mock.expect_description().return_const("strict".to_string());
    mock.expect_validate_options().returning(|_, _| {
        ValidationResult::failure(Diagnostic::new(
            DiagnosticCode::InvalidOption,
            "options.mode",
            "unknown option 'mode'",
        ))
    });
    mock.expect_convert().never();
    let adapters = AdapterRegistry::new();
    adapters.register(shared(mock), false).unwrap();

    let result = orchestrator_with(adapters).export(&raw(MINIMAL), &opts("strict"));

    assert!(!result.success);
    assert_eq!(result.errors[0].class(), ErrorClass::OptionValidation);
    assert_eq!(result.failed_stage, Some(ExportStage::Converting));
}

#[test]
fn test_converter_warnings_are_carried_into_result() {
    let mut mock = converter("noisy", "noisy-v1");
    mock.expect_convert().returning(|_, _| {
        Ok(Conversion {
            artifacts: ArtifactSet::from_artifacts([Artifact::new("out.txt", "x")]).unwrap(),
            warnings: vec![Diagnostic::new(
                DiagnosticCode::FieldDropped,
                "spec.runtime.cpu",
                "cpu is not supported",
            )],
        })
    });
    let adapters = AdapterRegistry::new();
    adapters.register(shared(mock), false).unwrap();

    let result = orchestrator_with(adapters).export(&raw(MINIMAL), &opts("noisy"));
    assert!(result.success);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.artifacts.paths(), vec!["out.txt"]);
}

struct Panicking;

impl PlatformConverter for Panicking {
    fn platform(&self) -> &str {
        "fragile"
    }
    fn implementation(&self) -> &str {
        "fragile-v1"
    }
    fn description(&self) -> &str {
        "panics on convert"
    }
    fn validate_options(&self, _: &Manifest, _: &PlatformOptions) -> ValidationResult {
        ValidationResult::default()
    }
    fn convert(&self, _: &Manifest, _: &PlatformOptions) -> Result<Conversion, ConvertError> {
        panic!("template index out of bounds")
    }
}

#[test]
fn test_converter_panic_becomes_converter_defect() {
    let adapters = AdapterRegistry::new();
    adapters.register(std::sync::Arc::new(Panicking), false).unwrap();

    let result = orchestrator_with(adapters).export(&raw(MINIMAL), &opts("fragile"));

    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].code, DiagnosticCode::ConverterDefect);
    assert!(result.errors[0].message.contains("template index out of bounds"));
    assert!(result.artifacts.is_empty());
}

// ── Batch ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_batch_runs_every_builtin_platform() {
    let platforms: Vec<String> = crate::helpers::PLATFORMS.iter().map(|p| (*p).to_string()).collect();
    let results = orchestrator()
        .export_batch(vec![raw(MINIMAL)], &platforms, &opts(""))
        .await;

    assert_eq!(results.len(), 5);
    for (result, platform) in results.iter().zip(&platforms) {
        assert!(result.success, "{platform}: {:?}", result.errors);
        assert_eq!(&result.platform, platform);
        assert!(result.output_root.ends_with(format!("content-moderator/{platform}")));
    }
}
