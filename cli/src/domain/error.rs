//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use agentport_common::{Diagnostic, DiagnosticCode};
use thiserror::Error;

// ── Expression errors ─────────────────────────────────────────────────────────

/// Errors raised while parsing or evaluating a condition expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    #[error("expression is {len} characters long, the limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error("expression nests deeper than {max} levels")]
    TooDeep { max: usize },

    #[error("expression is empty")]
    Empty,

    #[error("unexpected character '{ch}' at offset {pos}")]
    UnexpectedChar { pos: usize, ch: char },

    #[error("unterminated string starting at offset {pos}")]
    UnterminatedString { pos: usize },

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("unexpected {found} at offset {pos}")]
    UnexpectedToken { pos: usize, found: String },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("identifier '{name}' is not allowed here (allowed: {allowed})")]
    ForbiddenIdentifier { name: String, allowed: String },

    #[error("cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("'{op}' expects a boolean, found {found}")]
    NotBoolean { op: &'static str, found: &'static str },
}

// ── Artifact errors ───────────────────────────────────────────────────────────

/// Errors raised while assembling an `ArtifactSet`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtifactError {
    #[error("two artifacts claim the path '{0}'")]
    DuplicatePath(String),

    #[error("artifact path '{path}' is invalid: {reason}")]
    InvalidPath { path: String, reason: &'static str },
}

impl ArtifactError {
    /// Diagnostic form, reported at the artifact's path.
    #[must_use]
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::DuplicatePath(path) => {
                Diagnostic::new(DiagnosticCode::ArtifactCollision, path, self.to_string())
            }
            Self::InvalidPath { path, .. } => {
                Diagnostic::new(DiagnosticCode::InvalidArtifactPath, path, self.to_string())
            }
        }
    }
}

// ── Converter errors ──────────────────────────────────────────────────────────

/// Failure modes a converter may report from `convert`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    /// The option bag or manifest failed the converter's own checks.
    #[error("platform options rejected ({} problem(s))", .0.len())]
    InvalidOptions(Vec<Diagnostic>),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// Anything outside the converter's declared contract.
    #[error("converter defect: {0}")]
    Defect(String),
}

impl ConvertError {
    #[must_use]
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        match self {
            Self::InvalidOptions(diags) => diags,
            Self::Artifact(e) => vec![e.to_diagnostic()],
            Self::Defect(msg) => vec![Diagnostic::new(
                DiagnosticCode::ConverterDefect,
                "",
                format!("converter defect: {msg}"),
            )],
        }
    }
}

// ── Registry errors ───────────────────────────────────────────────────────────

/// Errors raised by the adapter registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error(
        "platform '{platform}' is already registered to '{existing}'; refusing to register '{incoming}' without replace"
    )]
    Conflict {
        platform: String,
        existing: String,
        incoming: String,
    },

    #[error("invalid platform id '{0}': must match ^[a-z0-9][a-z0-9-]*$")]
    InvalidPlatformId(String),

    #[error("platform '{platform}' is not supported (available: {})", available.join(", "))]
    UnsupportedPlatform {
        platform: String,
        available: Vec<String>,
    },
}

impl RegistryError {
    #[must_use]
    pub fn to_diagnostic(&self) -> Diagnostic {
        let code = match self {
            Self::UnsupportedPlatform { .. } => DiagnosticCode::UnsupportedPlatform,
            Self::Conflict { .. } | Self::InvalidPlatformId(_) => DiagnosticCode::RegistryConflict,
        };
        Diagnostic::new(code, "platform", self.to_string())
    }
}

// ── Export errors ─────────────────────────────────────────────────────────────

/// Errors raised before a manifest reaches the orchestrator.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Manifest not found: {0}")]
    ManifestNotFound(String),

    #[error("No platform given. Pass --platform or set export.platform in the config.")]
    NoPlatform,

    #[error("Invalid option '{0}': expected key=value")]
    MalformedOption(String),
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration key/value validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown setting: {key}\n\nValid settings: {valid}")]
    UnknownKey { key: String, valid: String },

    #[error("Invalid value for {key}: {value}\n\nValid values: {valid}")]
    InvalidValue {
        key: String,
        value: String,
        valid: String,
    },
}
