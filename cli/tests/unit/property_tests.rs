//! Property-based tests for naming, artifact paths and the condition grammar.
//!
//! Uses `proptest` to verify invariants across many random inputs.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashSet;

use agentport_cli::application::ExportOptions;
use agentport_cli::domain::expression;
use agentport_cli::domain::manifest::RawManifest;
use agentport_cli::domain::naming::{
    class_name, dns_label, is_dns_label, machine_name, python_identifier,
};
use proptest::prelude::*;
use serde_json::json;

use crate::helpers::{PLATFORMS, opts, orchestrator};

// ============================================================================
// Naming transforms
// ============================================================================

proptest! {
    /// Every transform is idempotent.
    #[test]
    fn prop_naming_transforms_are_idempotent(name in "\\PC{0,80}") {
        let dns = dns_label(&name);
        prop_assert_eq!(dns_label(&dns), dns.clone());
        let machine = machine_name(&name);
        prop_assert_eq!(machine_name(&machine), machine.clone());
        let ident = python_identifier(&name);
        prop_assert_eq!(python_identifier(&ident), ident.clone());
        let class = class_name(&name);
        prop_assert_eq!(class_name(&class), class.clone());
    }

    /// DNS labels are always well-formed and never empty.
    #[test]
    fn prop_dns_label_is_valid(name in "\\PC{0,120}") {
        let label = dns_label(&name);
        prop_assert!(is_dns_label(&label), "not a label: {label:?}");
        prop_assert!(label.len() <= 63);
        prop_assert!(!label.starts_with('-') && !label.ends_with('-'));
    }

    /// Machine names start with a letter and use only `[a-z0-9_]`.
    #[test]
    fn prop_machine_name_shape(name in "\\PC{0,120}") {
        let m = machine_name(&name);
        prop_assert!(m.starts_with(|c: char| c.is_ascii_lowercase()), "bad start: {m:?}");
        prop_assert!(m.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
        prop_assert!(m.len() <= 64);
    }
}

// ============================================================================
// Artifact path uniqueness across every converter
// ============================================================================

fn arb_manifest() -> impl Strategy<Value = RawManifest> {
    (
        "[A-Za-z0-9][A-Za-z0-9 ._-]{0,40}",
        prop::collection::vec("[a-z][a-z0-9_-]{0,15}", 1..4),
        prop::option::of("[A-Za-z ,.]{1,60}"),
    )
        .prop_map(|(name, capabilities, description)| {
            let mut metadata = json!({"name": name, "version": "1.0.0"});
            if let Some(d) = description {
                metadata["description"] = json!(d);
            }
            RawManifest::from_value(
                "generated.yaml",
                json!({
                    "schemaVersion": "v1",
                    "metadata": metadata,
                    "spec": {"capabilities": capabilities},
                }),
            )
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Every converter yields distinct, relative, non-traversing paths,
    /// including the enrichment document.
    #[test]
    fn prop_artifact_paths_are_unique_and_contained(raw in arb_manifest()) {
        let orch = orchestrator();
        for platform in PLATFORMS {
            let result = orch.export(
                &raw,
                &ExportOptions { include_enrichment: true, ..opts(platform) },
            );
            prop_assert!(result.success, "{platform}: {:?}", result.errors);
            let paths = result.artifacts.paths();
            let unique: HashSet<&str> = paths.iter().copied().collect();
            prop_assert_eq!(unique.len(), paths.len());
            for path in paths {
                prop_assert!(!path.starts_with('/'), "absolute: {path}");
                prop_assert!(path.split('/').all(|seg| seg != ".." && seg != "." && !seg.is_empty()), "escapes: {path}");
            }
        }
    }

    /// Failed exports never leak artifacts.
    #[test]
    fn prop_failed_export_has_no_artifacts(raw in arb_manifest(), replicas in 1001u64..100_000) {
        let result = orchestrator().export(
            &raw,
            &ExportOptions {
                options: agentport_cli::domain::options::PlatformOptions::new().with("replicas", replicas),
                ..opts("kubernetes")
            },
        );
        prop_assert!(!result.success);
        prop_assert!(result.artifacts.is_empty());
        prop_assert!(result.digest.is_none());
    }
}

// ============================================================================
// Condition grammar
// ============================================================================

proptest! {
    /// The parser returns for any input; it never panics.
    #[test]
    fn prop_parse_is_total(src in "\\PC{0,600}") {
        let _ = expression::parse(&src);
    }

    /// Anything that parses prints back to an equivalent expression.
    #[test]
    fn prop_parse_display_round_trips(src in "[a-z0-9 .'\"=!<>&|()-]{1,40}") {
        if let Ok(expr) = expression::parse(&src) {
            let printed = expr.to_string();
            let reparsed = expression::parse(&printed);
            prop_assert!(reparsed.is_ok(), "{printed:?} from {src:?}: {reparsed:?}");
            prop_assert_eq!(reparsed.unwrap(), expr);
        }
    }
}
