//! Runtime-hint support tables and dropped-field warnings.

use agentport_common::{Diagnostic, DiagnosticCode};

use crate::domain::manifest::Manifest;

/// Which `spec.runtime` fields a platform can express.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct RuntimeSupport {
    pub memory: bool,
    pub cpu: bool,
    pub timeout_seconds: bool,
    pub env: bool,
    pub scaling: bool,
}

impl RuntimeSupport {
    pub const ALL: Self = Self {
        memory: true,
        cpu: true,
        timeout_seconds: true,
        env: true,
        scaling: true,
    };

    /// Timeout and environment only.
    pub const PROCESS_ONLY: Self = Self {
        memory: false,
        cpu: false,
        timeout_seconds: true,
        env: true,
        scaling: false,
    };
}

/// One `field-dropped` warning per runtime field that is present in the
/// manifest but has no equivalent on `platform`.
#[must_use]
pub fn dropped_fields(manifest: &Manifest, support: RuntimeSupport, platform: &str) -> Vec<Diagnostic> {
    let rt = manifest.runtime();
    let present = [
        ("memory", rt.memory.is_some(), support.memory),
        ("cpu", rt.cpu.is_some(), support.cpu),
        ("timeoutSeconds", rt.timeout_seconds.is_some(), support.timeout_seconds),
        ("env", !rt.env.is_empty(), support.env),
        ("scaling", rt.scaling.is_some(), support.scaling),
    ];
    present
        .into_iter()
        .filter(|(_, is_present, supported)| *is_present && !supported)
        .map(|(field, _, _)| {
            Diagnostic::new(
                DiagnosticCode::FieldDropped,
                format!("spec.runtime.{field}"),
                format!("'{field}' has no equivalent on {platform} and was dropped"),
            )
        })
        .collect()
}

/// Converts a Kubernetes-style memory quantity to the Compose form.
///
/// Compose units are binary, so `512Mi` -> `512m` and `1Gi` -> `1g`, while
/// decimal units are spelled out in bytes (`2G` -> `2000000000b`). Bare
/// numbers are bytes.
#[must_use]
pub fn compose_memory(quantity: &str) -> String {
    let split = quantity
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(quantity.len());
    let (digits, unit) = quantity.split_at(split);
    match unit {
        "Ki" => format!("{digits}k"),
        "Mi" => format!("{digits}m"),
        "Gi" => format!("{digits}g"),
        "K" => format!("{digits}000b"),
        "M" => format!("{digits}000000b"),
        "G" => format!("{digits}000000000b"),
        _ => digits.to_string(),
    }
}

/// Converts a CPU quantity to a decimal core count (`500m` -> `0.5`).
#[must_use]
pub fn cpu_cores(quantity: &str) -> String {
    if let Some(milli) = quantity.strip_suffix('m') {
        if let Ok(m) = milli.parse::<f64>() {
            return format!("{}", m / 1000.0);
        }
        return milli.to_string();
    }
    quantity.to_string()
}
