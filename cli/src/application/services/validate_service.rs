//! Application service: manifest validation use-case.

use std::collections::HashMap;
use std::path::PathBuf;

use agentport_common::{Diagnostic, DiagnosticCode, ValidationResult};
use anyhow::Result;
use serde::Serialize;

use crate::application::ports::ManifestReader;
use crate::domain::naming::dns_label;
use crate::domain::schema::SchemaRegistry;

/// Validation outcome for one document.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestReport {
    pub manifest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    #[serde(flatten)]
    pub result: ValidationResult,
}

/// Validates each manifest. Documents that derive the same identifier are
/// additionally flagged with `duplicate-identity`.
///
/// # Errors
///
/// Returns an error if a manifest cannot be read.
pub fn validate_manifests(
    reader: &impl ManifestReader,
    schemas: &SchemaRegistry,
    paths: &[PathBuf],
) -> Result<Vec<ManifestReport>> {
    let mut reports = Vec::with_capacity(paths.len());
    for path in paths {
        let raw = reader.read(path)?;
        let check = schemas.validate(&raw);
        tracing::debug!(
            manifest = raw.origin(),
            valid = check.result.is_valid(),
            "validated"
        );
        reports.push(ManifestReport {
            manifest: raw.origin().to_string(),
            name: raw.declared_name().map(str::to_string),
            schema_version: check.version,
            result: check.result,
        });
    }
    flag_duplicates(&mut reports);
    Ok(reports)
}

fn flag_duplicates(reports: &mut [ManifestReport]) {
    let mut seen: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, r) in reports.iter().enumerate() {
        if let Some(name) = &r.name {
            seen.entry(dns_label(name)).or_default().push(i);
        }
    }
    for indices in seen.values().filter(|v| v.len() > 1) {
        for &i in indices {
            let report = &mut reports[i];
            let diag = Diagnostic::new(
                DiagnosticCode::DuplicateIdentity,
                "metadata.name",
                format!(
                    "'{}' is shared by {} manifests in this run",
                    report.name.as_deref().unwrap_or_default(),
                    indices.len()
                ),
            );
            report.result = std::mem::take(&mut report.result).merge(ValidationResult::failure(diag));
        }
    }
}
