//! Raw manifest documents and the validated, immutable `Manifest` model.
//!
//! Pure functions only: no I/O. Reading files is the job of the
//! `ManifestReader` port; this module only parses text it is handed.

use std::collections::BTreeMap;
use std::path::Path;

use agentport_common::{
    AuthSection, CredentialSection, Diagnostic, DiagnosticCode, LlmSection, ManifestDocument,
    RuntimeSection, ValidationResult,
};
use serde_json::Value;

use crate::domain::expression::{self, Expr};
use crate::domain::naming;

// ── Raw documents ────────────────────────────────────────────────────────────

/// Markup format of a manifest source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
    /// Try YAML, then JSON.
    Auto,
}

impl DocumentFormat {
    /// Picks the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => Self::Json,
            Some("yaml" | "yml") => Self::Yaml,
            _ => Self::Auto,
        }
    }
}

/// An untrusted manifest: source text plus its structural parse.
///
/// Parse failures are kept rather than raised so that the schema registry
/// can report them as an ordinary `parse-error` diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct RawManifest {
    origin: String,
    source: String,
    parsed: Result<Value, String>,
}

impl RawManifest {
    /// Parses `source`. `origin` labels the document in reports, usually its
    /// path.
    #[must_use]
    pub fn parse(origin: impl Into<String>, source: impl Into<String>, format: DocumentFormat) -> Self {
        let source = source.into();
        let parsed = match format {
            DocumentFormat::Yaml => parse_yaml(&source),
            DocumentFormat::Json => parse_json(&source),
            DocumentFormat::Auto => parse_yaml(&source).or_else(|yaml_err| {
                parse_json(&source).map_err(|_| yaml_err)
            }),
        };
        Self {
            origin: origin.into(),
            source,
            parsed,
        }
    }

    /// Wraps inline structured data. The canonical YAML rendering becomes the
    /// source text.
    #[must_use]
    pub fn from_value(origin: impl Into<String>, value: Value) -> Self {
        let source = serde_yaml::to_string(&value).unwrap_or_default();
        Self {
            origin: origin.into(),
            source,
            parsed: Ok(value),
        }
    }

    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parsed document, or the parser's message.
    pub fn value(&self) -> Result<&Value, &str> {
        self.parsed.as_ref().map_err(String::as_str)
    }

    /// `metadata.name` if it is present and a string, without any other
    /// validation. Used to label reports for documents that fail validation.
    #[must_use]
    pub fn declared_name(&self) -> Option<&str> {
        self.parsed.as_ref().ok()?.get("metadata")?.get("name")?.as_str()
    }
}

fn parse_yaml(source: &str) -> Result<Value, String> {
    serde_yaml::from_str::<Value>(source).map_err(|e| format!("invalid YAML: {e}"))
}

fn parse_json(source: &str) -> Result<Value, String> {
    serde_json::from_str::<Value>(source).map_err(|e| format!("invalid JSON: {e}"))
}

// ── Validated model ──────────────────────────────────────────────────────────

/// Tool binding with its condition parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolBinding {
    pub name: String,
    pub endpoint: String,
    pub auth: AuthSection,
    pub when: Option<Expr>,
}

/// Workflow edge between two capabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: String,
    pub to: String,
    pub when: Option<Expr>,
}

/// Agent identity, from `metadata`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub license: Option<String>,
    pub labels: BTreeMap<String, String>,
}

/// A validated manifest. Immutable once built: all fields are private and
/// only shared references are handed out.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    schema_version: String,
    identity: Identity,
    capabilities: Vec<String>,
    runtime: RuntimeSection,
    llm: Option<LlmSection>,
    credentials: Vec<CredentialSection>,
    tool_bindings: Vec<ToolBinding>,
    transitions: Vec<Transition>,
    source: String,
}

fn invariant(message: impl Into<String>) -> Diagnostic {
    Diagnostic::new(DiagnosticCode::InternalInvariant, "", message)
}

impl Manifest {
    /// Builds the model from a document that `validation` accepted.
    ///
    /// # Errors
    ///
    /// Any failure here means the validator let through something it should
    /// not have; it is reported as an `internal-invariant` diagnostic.
    pub fn from_validated(
        raw: &RawManifest,
        schema_version: &str,
        validation: &ValidationResult,
    ) -> Result<Self, Diagnostic> {
        if !validation.is_valid() {
            return Err(invariant("manifest model requested for an invalid document"));
        }
        let value = raw
            .value()
            .map_err(|e| invariant(format!("validated document does not parse: {e}")))?;
        let doc: ManifestDocument = serde_json::from_value(value.clone())
            .map_err(|e| invariant(format!("validated document does not fit the model: {e}")))?;

        let parse_condition = |text: Option<&str>, path: String| {
            text.map(|t| {
                expression::parse(t).map_err(|e| {
                    invariant(format!("{path}: validated condition does not parse: {e}"))
                })
            })
            .transpose()
        };

        let mut tool_bindings = Vec::with_capacity(doc.spec.tool_bindings.len());
        for (i, b) in doc.spec.tool_bindings.into_iter().enumerate() {
            let when = parse_condition(b.when.as_deref(), format!("spec.toolBindings[{i}].when"))?;
            tool_bindings.push(ToolBinding {
                name: b.name,
                endpoint: b.endpoint,
                auth: b.auth,
                when,
            });
        }

        let mut transitions = Vec::new();
        for (i, t) in doc
            .spec
            .workflow
            .map(|w| w.transitions)
            .unwrap_or_default()
            .into_iter()
            .enumerate()
        {
            let when = parse_condition(t.when.as_deref(), format!("spec.workflow.transitions[{i}].when"))?;
            transitions.push(Transition {
                from: t.from,
                to: t.to,
                when,
            });
        }

        Ok(Self {
            schema_version: schema_version.to_string(),
            identity: Identity {
                name: doc.metadata.name,
                version: doc.metadata.version,
                description: doc.metadata.description,
                author: doc.metadata.author,
                license: doc.metadata.license,
                labels: doc.metadata.labels,
            },
            capabilities: doc.spec.capabilities,
            runtime: doc.spec.runtime.unwrap_or_default(),
            llm: doc.spec.llm,
            credentials: doc.spec.credentials,
            tool_bindings,
            transitions,
            source: raw.source().to_string(),
        })
    }

    #[must_use]
    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.identity.version
    }

    /// Description, or a generated one-liner when the manifest has none.
    #[must_use]
    pub fn description_or_default(&self) -> String {
        self.identity
            .description
            .clone()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| format!("{} agent", self.identity.name))
    }

    /// Capabilities in declaration order, duplicates included.
    #[must_use]
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    /// Capabilities with duplicates removed, first occurrence wins.
    #[must_use]
    pub fn unique_capabilities(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for c in &self.capabilities {
            if !seen.contains(&c.as_str()) {
                seen.push(c.as_str());
            }
        }
        seen
    }

    /// Runtime hints; all fields empty when the manifest declares none.
    #[must_use]
    pub fn runtime(&self) -> &RuntimeSection {
        &self.runtime
    }

    #[must_use]
    pub fn llm(&self) -> Option<&LlmSection> {
        self.llm.as_ref()
    }

    #[must_use]
    pub fn credentials(&self) -> &[CredentialSection] {
        &self.credentials
    }

    #[must_use]
    pub fn tool_bindings(&self) -> &[ToolBinding] {
        &self.tool_bindings
    }

    #[must_use]
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// The document exactly as it was read.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// DNS-label form of the name, the identity used across platforms.
    #[must_use]
    pub fn dns_name(&self) -> String {
        naming::dns_label(&self.identity.name)
    }
}
