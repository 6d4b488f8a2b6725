//! Adapter registry: registration rules and their effect on exports.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use agentport_cli::application::AdapterRegistry;
use agentport_cli::domain::artifact::{Artifact, ArtifactSet};
use agentport_cli::domain::converters::{Conversion, builtin_converters};
use agentport_cli::domain::error::RegistryError;
use agentport_common::ErrorClass;

use crate::helpers::{MINIMAL, PLATFORMS, opts, orchestrator_with, raw};
use crate::mocks::{converter, shared};

#[test]
fn test_builtin_registry_describes_every_platform() {
    let registry = AdapterRegistry::with_builtin().unwrap();
    let info = registry.describe();
    let ids: Vec<&str> = info.iter().map(|p| p.platform.as_str()).collect();
    assert_eq!(ids, PLATFORMS);
    assert!(info.iter().all(|p| !p.description.is_empty()));
}

#[test]
fn test_registering_builtins_twice_is_idempotent() {
    let registry = AdapterRegistry::with_builtin().unwrap();
    for c in builtin_converters() {
        registry.register(c, false).unwrap();
    }
    assert_eq!(registry.list().len(), 5);
}

#[test]
fn test_conflicting_registration_is_a_configuration_error() {
    let registry = AdapterRegistry::with_builtin().unwrap();
    let err = registry
        .register(shared(converter("kubernetes", "helm-chart")), false)
        .unwrap_err();

    assert!(matches!(err, RegistryError::Conflict { .. }), "got: {err:?}");
    assert_eq!(err.to_diagnostic().class(), ErrorClass::Configuration);
    assert!(err.to_string().contains("helm-chart"));
}

#[test]
fn test_replaced_converter_serves_later_exports() {
    let registry = AdapterRegistry::with_builtin().unwrap();
    let mut mock = converter("npm-package", "npm-lite");
    mock.expect_convert().times(1).returning(|_, _| {
        Ok(Conversion {
            artifacts: ArtifactSet::from_artifacts([Artifact::new("package.json", "{}\n")]).unwrap(),
            warnings: Vec::new(),
        })
    });
    registry.register(shared(mock), true).unwrap();

    let result = orchestrator_with(registry).export(&raw(MINIMAL), &opts("npm-package"));
    assert!(result.success);
    assert_eq!(result.artifacts.paths(), vec!["package.json"]);
}

#[test]
fn test_registration_after_startup_is_visible_to_resolve() {
    let registry = Arc::new(AdapterRegistry::new());
    let writer = Arc::clone(&registry);
    std::thread::spawn(move || {
        writer
            .register(shared(converter("late", "late-v1")), false)
            .unwrap();
    })
    .join()
    .unwrap();
    assert_eq!(registry.resolve("late").unwrap().implementation(), "late-v1");
}

#[test]
fn test_uppercase_platform_id_is_refused() {
    let registry = AdapterRegistry::new();
    let err = registry
        .register(shared(converter("NPM", "npm")), false)
        .unwrap_err();
    assert_eq!(err, RegistryError::InvalidPlatformId("NPM".to_string()));
    assert!(registry.list().is_empty());
}
