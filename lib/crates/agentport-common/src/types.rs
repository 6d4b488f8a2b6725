use std::fmt;

use serde::{Deserialize, Serialize};

/// Error class a diagnostic belongs to.
///
/// Every class except `Degradation` means the export produced no artifacts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorClass {
    SchemaValidation,
    UnsupportedPlatform,
    OptionValidation,
    ArtifactCollision,
    ConverterDefect,
    Configuration,
    Degradation,
}

impl ErrorClass {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SchemaValidation => "schema-validation",
            Self::UnsupportedPlatform => "unsupported-platform",
            Self::OptionValidation => "option-validation",
            Self::ArtifactCollision => "artifact-collision",
            Self::ConverterDefect => "converter-defect",
            Self::Configuration => "configuration",
            Self::Degradation => "degradation",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable diagnostic code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticCode {
    MissingSchemaVersion,
    UnknownSchemaVersion,
    ParseError,
    MissingField,
    TypeMismatch,
    PatternMismatch,
    EmptyArray,
    OutOfRange,
    UnknownField,
    CrossField,
    DuplicateValue,
    InvalidExpression,
    UnsupportedPlatform,
    InvalidOption,
    ArtifactCollision,
    InvalidArtifactPath,
    ConverterDefect,
    FieldDropped,
    DuplicateIdentity,
    InternalInvariant,
    RegistryConflict,
}

impl DiagnosticCode {
    /// Class of the failure when this code is reported as an error.
    ///
    /// Codes that are only ever reported as warnings map to `Degradation`.
    #[must_use]
    pub fn class(self) -> ErrorClass {
        match self {
            Self::MissingSchemaVersion
            | Self::UnknownSchemaVersion
            | Self::ParseError
            | Self::MissingField
            | Self::TypeMismatch
            | Self::PatternMismatch
            | Self::EmptyArray
            | Self::OutOfRange
            | Self::UnknownField
            | Self::CrossField
            | Self::DuplicateValue
            | Self::InvalidExpression
            | Self::DuplicateIdentity => ErrorClass::SchemaValidation,
            Self::UnsupportedPlatform => ErrorClass::UnsupportedPlatform,
            Self::InvalidOption => ErrorClass::OptionValidation,
            Self::ArtifactCollision => ErrorClass::ArtifactCollision,
            Self::InvalidArtifactPath | Self::ConverterDefect | Self::InternalInvariant => {
                ErrorClass::ConverterDefect
            }
            Self::RegistryConflict => ErrorClass::Configuration,
            Self::FieldDropped => ErrorClass::Degradation,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingSchemaVersion => "missing-schema-version",
            Self::UnknownSchemaVersion => "unknown-schema-version",
            Self::ParseError => "parse-error",
            Self::MissingField => "missing-field",
            Self::TypeMismatch => "type-mismatch",
            Self::PatternMismatch => "pattern-mismatch",
            Self::EmptyArray => "empty-array",
            Self::OutOfRange => "out-of-range",
            Self::UnknownField => "unknown-field",
            Self::CrossField => "cross-field",
            Self::DuplicateValue => "duplicate-value",
            Self::InvalidExpression => "invalid-expression",
            Self::UnsupportedPlatform => "unsupported-platform",
            Self::InvalidOption => "invalid-option",
            Self::ArtifactCollision => "artifact-collision",
            Self::InvalidArtifactPath => "invalid-artifact-path",
            Self::ConverterDefect => "converter-defect",
            Self::FieldDropped => "field-dropped",
            Self::DuplicateIdentity => "duplicate-identity",
            Self::InternalInvariant => "internal-invariant",
            Self::RegistryConflict => "registry-conflict",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single error or warning, anchored at a dotted document path.
///
/// The empty path denotes the document root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Diagnostic {
    pub path: String,
    pub message: String,
    pub code: DiagnosticCode,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            code,
        }
    }

    #[must_use]
    pub fn class(&self) -> ErrorClass {
        self.code.class()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() {
            "(root)"
        } else {
            &self.path
        };
        write!(f, "{path}: {} [{}]", self.message, self.code)
    }
}

/// Outcome of validating a raw manifest.
///
/// `valid` is derived from `errors` at construction and cannot drift: the
/// fields are private and there is no mutable access.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ValidationResult {
    valid: bool,
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl ValidationResult {
    #[must_use]
    pub fn new(errors: Vec<Diagnostic>, warnings: Vec<Diagnostic>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Convenience for a failed result carrying a single error.
    #[must_use]
    pub fn failure(error: Diagnostic) -> Self {
        Self::new(vec![error], Vec::new())
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    #[must_use]
    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    #[must_use]
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    /// Appends `other`'s diagnostics after this result's, preserving order.
    #[must_use]
    pub fn merge(mut self, other: ValidationResult) -> Self {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        Self::new(self.errors, self.warnings)
    }

    #[must_use]
    pub fn into_parts(self) -> (Vec<Diagnostic>, Vec<Diagnostic>) {
        (self.errors, self.warnings)
    }
}
