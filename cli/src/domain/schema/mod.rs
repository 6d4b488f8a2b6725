//! Schema registry: one validator per manifest schema version.
//!
//! `validate` is the trust boundary. It reads `schemaVersion` (or
//! `apiVersion`) before anything else and fails closed when no validator is
//! registered for the requested version.
//!
//! Pure functions: no I/O, no async.

pub mod checks;
pub mod profile;

use std::collections::BTreeMap;

use agentport_common::{Diagnostic, DiagnosticCode, ValidationResult};
use serde_json::{Map, Value};

pub use profile::ManifestSchema;

/// API family accepted in `apiVersion`.
pub const API_FAMILY: &str = "agentport.dev";

/// Validator for one schema version.
pub trait SchemaValidator: Send + Sync {
    /// Version string this validator answers to, e.g. `v1`.
    fn version(&self) -> &str;

    /// Checks a document whose version has already been resolved.
    fn validate(&self, doc: &Map<String, Value>) -> ValidationResult;
}

/// Outcome of validating a raw document: the report plus the schema
/// version it was checked against, when one was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaCheck {
    pub version: Option<String>,
    pub result: ValidationResult,
}

/// Maps schema versions to validators.
pub struct SchemaRegistry {
    validators: BTreeMap<String, Box<dyn SchemaValidator>>,
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("versions", &self.versions())
            .finish()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::with_builtin_schemas()
    }
}

impl SchemaRegistry {
    /// A registry with no versions; every document fails closed.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            validators: BTreeMap::new(),
        }
    }

    /// A registry with `v1` and `v2`.
    #[must_use]
    pub fn with_builtin_schemas() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(ManifestSchema::v1()));
        registry.register(Box::new(ManifestSchema::v2()));
        registry
    }

    /// Adds or replaces the validator for its version.
    pub fn register(&mut self, validator: Box<dyn SchemaValidator>) {
        self.validators
            .insert(validator.version().to_string(), validator);
    }

    #[must_use]
    pub fn versions(&self) -> Vec<&str> {
        self.validators.keys().map(String::as_str).collect()
    }

    /// Validates an already-parsed document.
    #[must_use]
    pub fn validate_value(&self, doc: &Value) -> SchemaCheck {
        let Some(obj) = doc.as_object() else {
            return SchemaCheck {
                version: None,
                result: ValidationResult::failure(Diagnostic::new(
                    DiagnosticCode::TypeMismatch,
                    "",
                    "manifest must be a mapping at the top level",
                )),
            };
        };
        let (version, path) = match resolve_version(obj) {
            Ok(found) => found,
            Err(diag) => {
                return SchemaCheck {
                    version: None,
                    result: ValidationResult::failure(diag),
                };
            }
        };
        let Some(validator) = self.validators.get(&version) else {
            let known = self.versions().join(", ");
            return SchemaCheck {
                version: None,
                result: ValidationResult::failure(Diagnostic::new(
                    DiagnosticCode::UnknownSchemaVersion,
                    path,
                    format!("schema version '{version}' is not supported (known: {known})"),
                )),
            };
        };
        SchemaCheck {
            result: validator.validate(obj),
            version: Some(version),
        }
    }

    /// Validates a raw document; parse failures become `parse-error`.
    #[must_use]
    pub fn validate(&self, raw: &crate::domain::manifest::RawManifest) -> SchemaCheck {
        match raw.value() {
            Ok(value) => self.validate_value(value),
            Err(message) => SchemaCheck {
                version: None,
                result: ValidationResult::failure(Diagnostic::new(
                    DiagnosticCode::ParseError,
                    "",
                    message,
                )),
            },
        }
    }
}

/// Reads the requested schema version and the path it came from.
///
/// `schemaVersion` wins; `apiVersion` must be `agentport.dev/<version>`.
fn resolve_version(obj: &Map<String, Value>) -> Result<(String, &'static str), Diagnostic> {
    let string_at = |key: &'static str| -> Result<Option<&str>, Diagnostic> {
        match obj.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(Diagnostic::new(
                DiagnosticCode::TypeMismatch,
                key,
                format!("'{key}' must be a string"),
            )),
        }
    };

    let schema_version = string_at("schemaVersion")?;
    let api_version = match string_at("apiVersion")? {
        None => None,
        Some(api) => {
            let version = api
                .split_once('/')
                .filter(|(family, v)| *family == API_FAMILY && !v.is_empty())
                .map(|(_, v)| v);
            match version {
                Some(v) => Some(v),
                None => {
                    return Err(Diagnostic::new(
                        DiagnosticCode::UnknownSchemaVersion,
                        "apiVersion",
                        format!("apiVersion '{api}' must look like {API_FAMILY}/<version>"),
                    ));
                }
            }
        }
    };

    match (schema_version, api_version) {
        (Some(s), Some(a)) if s != a => Err(Diagnostic::new(
            DiagnosticCode::CrossField,
            "schemaVersion",
            format!("schemaVersion '{s}' disagrees with apiVersion version '{a}'"),
        )),
        (Some(s), _) => Ok((s.to_string(), "schemaVersion")),
        (None, Some(a)) => Ok((a.to_string(), "apiVersion")),
        (None, None) => Err(Diagnostic::new(
            DiagnosticCode::MissingSchemaVersion,
            "schemaVersion",
            "schemaVersion is required",
        )),
    }
}
