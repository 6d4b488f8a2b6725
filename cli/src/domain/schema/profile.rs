//! Rules of one manifest schema version.
//!
//! Checks run in two passes: structure (required fields, types, patterns,
//! unknown fields) and then, only when the structure is sound, cross-field
//! constraints.

use std::sync::LazyLock;

use agentport_common::{DiagnosticCode, ValidationResult};
use regex::Regex;
use serde_json::{Map, Value};

use super::SchemaValidator;
use super::checks::{Checker, index, join};
use crate::domain::expression;

// ── Patterns ─────────────────────────────────────────────────────────────────

pub static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Safety: a constant pattern, it cannot fail to compile.
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 ._-]*$").expect("valid regex")
});

pub static CAPABILITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("valid regex")
});

pub static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("valid regex")
});

static MEMORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[0-9]+(Ki|Mi|Gi|K|M|G)?$").expect("valid regex")
});

static CPU_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[0-9]+(\.[0-9]+)?m?$").expect("valid regex")
});

pub static ENV_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Z_][A-Z0-9_]*$").expect("valid regex")
});

static ENDPOINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^https?://[^\s/?#]+[^\s]*$").expect("valid regex")
});

pub const NAME_MAX_LEN: usize = 63;

const CREDENTIAL_TYPES: &[&str] = &["apiKey", "bearer", "oauth2", "basic"];
const AUTH_TYPES: &[&str] = &["none", "apiKey", "bearer", "oauth2", "basic"];

/// Identifiers a tool-binding condition may read.
pub const TOOL_CONDITION_VARS: &[&str] = &["platform", "schema"];
pub const TOOL_CONDITION_NAMESPACES: &[&str] = &["options"];
/// Namespace a workflow condition may read.
pub const WORKFLOW_CONDITION_NAMESPACES: &[&str] = &["state"];

const TOP_LEVEL_KEYS: &[&str] = &["schemaVersion", "apiVersion", "kind", "metadata", "spec"];
const METADATA_KEYS: &[&str] = &["name", "version", "description", "author", "license", "labels"];
const RUNTIME_KEYS: &[&str] = &["memory", "cpu", "timeoutSeconds", "env", "scaling"];
const SCALING_KEYS: &[&str] = &["minReplicas", "maxReplicas", "targetCpuPercent"];
const LLM_KEYS: &[&str] = &["provider", "model", "temperature", "maxTokens"];
const CREDENTIAL_KEYS: &[&str] = &["name", "type"];
const BINDING_KEYS: &[&str] = &["name", "endpoint", "auth", "when"];
const AUTH_KEYS: &[&str] = &["type", "credential"];
const WORKFLOW_KEYS: &[&str] = &["transitions"];
const TRANSITION_KEYS: &[&str] = &["from", "to", "when"];

// ── Schema profile ───────────────────────────────────────────────────────────

/// Validator for one schema version.
#[derive(Debug, Clone)]
pub struct ManifestSchema {
    version: &'static str,
    description_required: bool,
    workflow_allowed: bool,
}

impl ManifestSchema {
    /// The original schema.
    #[must_use]
    pub fn v1() -> Self {
        Self {
            version: "v1",
            description_required: false,
            workflow_allowed: false,
        }
    }

    /// v1 plus a mandatory description and explicit workflow transitions.
    #[must_use]
    pub fn v2() -> Self {
        Self {
            version: "v2",
            description_required: true,
            workflow_allowed: true,
        }
    }

    fn spec_keys(&self) -> Vec<&'static str> {
        let mut keys = vec!["capabilities", "runtime", "llm", "credentials", "toolBindings"];
        if self.workflow_allowed {
            keys.push("workflow");
        }
        keys
    }
}

impl SchemaValidator for ManifestSchema {
    fn version(&self) -> &str {
        self.version
    }

    fn validate(&self, doc: &Map<String, Value>) -> ValidationResult {
        let mut c = Checker::new();
        c.unknown_fields(doc, "", TOP_LEVEL_KEYS, false);

        if let Some(kind) = doc.get("kind")
            && let Some(k) = c.string(kind, "kind")
            && k != "Agent"
        {
            c.error(
                DiagnosticCode::PatternMismatch,
                "kind",
                format!("kind '{k}' is not supported, expected 'Agent'"),
            );
        }

        if let Some(metadata) = c.required(doc, "", "metadata")
            && let Some(obj) = c.object(metadata, "metadata")
        {
            self.check_metadata(&mut c, obj);
        }

        let spec = c
            .required(doc, "", "spec")
            .and_then(|s| c.object(s, "spec"));
        if let Some(obj) = spec {
            self.check_spec(&mut c, obj);
        }

        if !c.has_errors()
            && let Some(obj) = spec
        {
            check_cross_fields(&mut c, obj);
        }
        c.finish()
    }
}

impl ManifestSchema {
    fn check_metadata(&self, c: &mut Checker, obj: &Map<String, Value>) {
        c.unknown_fields(obj, "metadata", METADATA_KEYS, true);

        if let Some(name) = c.required(obj, "metadata", "name")
            && let Some(n) = c.pattern(
                name,
                "metadata.name",
                &NAME_RE,
                "letters, digits, spaces, '.', '_' or '-', starting with a letter or digit",
            )
            && n.chars().count() > NAME_MAX_LEN
        {
            c.error(
                DiagnosticCode::OutOfRange,
                "metadata.name",
                format!("name is longer than {NAME_MAX_LEN} characters"),
            );
        }

        if let Some(version) = c.required(obj, "metadata", "version")
            && let Some(v) = c.string(version, "metadata.version")
            && semver::Version::parse(v).is_err()
        {
            c.error(
                DiagnosticCode::PatternMismatch,
                "metadata.version",
                format!("'{v}' is not a semantic version (e.g. 1.0.0)"),
            );
        }

        match obj.get("description") {
            Some(d) => {
                if let Some(text) = c.string(d, "metadata.description")
                    && self.description_required
                    && text.trim().is_empty()
                {
                    c.error(
                        DiagnosticCode::MissingField,
                        "metadata.description",
                        format!("description must not be empty in schema {}", self.version),
                    );
                }
            }
            None if self.description_required => {
                c.error(
                    DiagnosticCode::MissingField,
                    "metadata.description",
                    format!("'description' is required in schema {}", self.version),
                );
            }
            None => {}
        }

        for key in ["author", "license"] {
            if let Some(v) = obj.get(key) {
                c.string(v, &join("metadata", key));
            }
        }

        if let Some(labels) = obj.get("labels")
            && let Some(map) = c.object(labels, "metadata.labels")
        {
            for (k, v) in map {
                c.string(v, &join("metadata.labels", k));
            }
        }
    }

    fn check_spec(&self, c: &mut Checker, obj: &Map<String, Value>) {
        c.unknown_fields(obj, "spec", &self.spec_keys(), true);

        if let Some(caps) = c.required(obj, "spec", "capabilities")
            && let Some(items) = c.non_empty_array(caps, "spec.capabilities")
        {
            let mut seen: Vec<&str> = Vec::new();
            for (i, item) in items.iter().enumerate() {
                let path = index("spec.capabilities", i);
                if let Some(cap) = c.pattern(
                    item,
                    &path,
                    &CAPABILITY_RE,
                    "lowercase letters, digits, '_' or '-'",
                ) {
                    if seen.contains(&cap) {
                        c.warn(
                            DiagnosticCode::DuplicateValue,
                            path,
                            format!("capability '{cap}' is listed more than once"),
                        );
                    } else {
                        seen.push(cap);
                    }
                }
            }
        }

        if let Some(runtime) = obj.get("runtime")
            && let Some(rt) = c.object(runtime, "spec.runtime")
        {
            check_runtime(c, rt);
        }

        if let Some(llm) = obj.get("llm")
            && let Some(l) = c.object(llm, "spec.llm")
        {
            check_llm(c, l);
        }

        if let Some(creds) = obj.get("credentials")
            && let Some(items) = c.array(creds, "spec.credentials")
        {
            check_credentials(c, items);
        }

        if let Some(bindings) = obj.get("toolBindings")
            && let Some(items) = c.array(bindings, "spec.toolBindings")
        {
            check_tool_bindings(c, items);
        }

        if self.workflow_allowed
            && let Some(workflow) = obj.get("workflow")
            && let Some(w) = c.object(workflow, "spec.workflow")
        {
            check_workflow(c, w);
        }
    }
}

fn check_runtime(c: &mut Checker, rt: &Map<String, Value>) {
    c.unknown_fields(rt, "spec.runtime", RUNTIME_KEYS, true);

    if let Some(v) = rt.get("memory") {
        c.pattern(v, "spec.runtime.memory", &MEMORY_RE, "a quantity like 512Mi or 1G");
    }
    if let Some(v) = rt.get("cpu") {
        c.pattern(v, "spec.runtime.cpu", &CPU_RE, "a quantity like 500m or 1.5");
    }
    if let Some(v) = rt.get("timeoutSeconds") {
        c.integer(v, "spec.runtime.timeoutSeconds", 1, u64::from(u32::MAX));
    }
    if let Some(v) = rt.get("env")
        && let Some(items) = c.array(v, "spec.runtime.env")
    {
        let mut seen: Vec<&str> = Vec::new();
        for (i, item) in items.iter().enumerate() {
            let path = index("spec.runtime.env", i);
            if let Some(name) = c.pattern(item, &path, &ENV_RE, "an upper-case variable name") {
                if seen.contains(&name) {
                    c.warn(
                        DiagnosticCode::DuplicateValue,
                        path,
                        format!("environment variable '{name}' is listed more than once"),
                    );
                } else {
                    seen.push(name);
                }
            }
        }
    }
    if let Some(v) = rt.get("scaling")
        && let Some(s) = c.object(v, "spec.runtime.scaling")
    {
        c.unknown_fields(s, "spec.runtime.scaling", SCALING_KEYS, true);
        let max_u32 = u64::from(u32::MAX);
        if let Some(min) = c.required(s, "spec.runtime.scaling", "minReplicas") {
            c.integer(min, "spec.runtime.scaling.minReplicas", 0, max_u32);
        }
        if let Some(max) = c.required(s, "spec.runtime.scaling", "maxReplicas") {
            c.integer(max, "spec.runtime.scaling.maxReplicas", 1, max_u32);
        }
        if let Some(cpu) = s.get("targetCpuPercent") {
            c.integer(cpu, "spec.runtime.scaling.targetCpuPercent", 1, 100);
        }
    }
}

fn check_llm(c: &mut Checker, l: &Map<String, Value>) {
    c.unknown_fields(l, "spec.llm", LLM_KEYS, true);
    for key in ["provider", "model"] {
        if let Some(v) = c.required(l, "spec.llm", key)
            && let Some(s) = c.string(v, &join("spec.llm", key))
            && s.trim().is_empty()
        {
            c.error(DiagnosticCode::MissingField, join("spec.llm", key), "must not be empty");
        }
    }
    if let Some(v) = l.get("temperature") {
        c.number(v, "spec.llm.temperature", 0.0, 2.0);
    }
    if let Some(v) = l.get("maxTokens") {
        c.integer(v, "spec.llm.maxTokens", 1, u64::from(u32::MAX));
    }
}

fn check_credentials(c: &mut Checker, items: &[Value]) {
    let mut seen: Vec<&str> = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let path = index("spec.credentials", i);
        let Some(cred) = c.object(item, &path) else {
            continue;
        };
        c.unknown_fields(cred, &path, CREDENTIAL_KEYS, true);
        if let Some(name) = c.required(cred, &path, "name")
            && let Some(n) = c.pattern(name, &join(&path, "name"), &REFERENCE_RE, "an identifier")
        {
            if seen.contains(&n) {
                c.error(
                    DiagnosticCode::DuplicateValue,
                    join(&path, "name"),
                    format!("credential '{n}' is declared more than once"),
                );
            } else {
                seen.push(n);
            }
        }
        if let Some(kind) = c.required(cred, &path, "type") {
            c.one_of(kind, &join(&path, "type"), CREDENTIAL_TYPES);
        }
    }
}

fn check_condition(c: &mut Checker, v: &Value, path: &str, exact: &[&str], namespaces: &[&str]) {
    let Some(text) = c.string(v, path) else {
        return;
    };
    let checked = expression::parse(text).and_then(|expr| expr.check_identifiers(exact, namespaces));
    if let Err(e) = checked {
        c.error(DiagnosticCode::InvalidExpression, path, e.to_string());
    }
}

fn check_tool_bindings(c: &mut Checker, items: &[Value]) {
    let mut seen: Vec<&str> = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let path = index("spec.toolBindings", i);
        let Some(binding) = c.object(item, &path) else {
            continue;
        };
        c.unknown_fields(binding, &path, BINDING_KEYS, true);

        if let Some(name) = c.required(binding, &path, "name")
            && let Some(n) = c.pattern(name, &join(&path, "name"), &REFERENCE_RE, "an identifier")
        {
            if seen.contains(&n) {
                c.error(
                    DiagnosticCode::DuplicateValue,
                    join(&path, "name"),
                    format!("tool binding '{n}' is declared more than once"),
                );
            } else {
                seen.push(n);
            }
        }
        if let Some(endpoint) = c.required(binding, &path, "endpoint") {
            c.pattern(endpoint, &join(&path, "endpoint"), &ENDPOINT_RE, "an http(s) URL");
        }
        if let Some(auth) = binding.get("auth") {
            let auth_path = join(&path, "auth");
            if let Some(a) = c.object(auth, &auth_path) {
                c.unknown_fields(a, &auth_path, AUTH_KEYS, true);
                if let Some(kind) = a.get("type") {
                    c.one_of(kind, &join(&auth_path, "type"), AUTH_TYPES);
                }
                if let Some(cred) = a.get("credential") {
                    c.string(cred, &join(&auth_path, "credential"));
                }
            }
        }
        if let Some(when) = binding.get("when") {
            check_condition(
                c,
                when,
                &join(&path, "when"),
                TOOL_CONDITION_VARS,
                TOOL_CONDITION_NAMESPACES,
            );
        }
    }
}

fn check_workflow(c: &mut Checker, w: &Map<String, Value>) {
    c.unknown_fields(w, "spec.workflow", WORKFLOW_KEYS, true);
    let Some(transitions) = w.get("transitions") else {
        return;
    };
    let Some(items) = c.array(transitions, "spec.workflow.transitions") else {
        return;
    };
    for (i, item) in items.iter().enumerate() {
        let path = index("spec.workflow.transitions", i);
        let Some(t) = c.object(item, &path) else {
            continue;
        };
        c.unknown_fields(t, &path, TRANSITION_KEYS, true);
        for key in ["from", "to"] {
            if let Some(v) = c.required(t, &path, key) {
                c.string(v, &join(&path, key));
            }
        }
        if let Some(when) = t.get("when") {
            check_condition(c, when, &join(&path, "when"), &[], WORKFLOW_CONDITION_NAMESPACES);
        }
    }
}

/// Constraints between fields. Only runs on structurally valid documents, so
/// shapes can be assumed and lookups that fail are simply skipped.
fn check_cross_fields(c: &mut Checker, spec: &Map<String, Value>) {
    if let Some(scaling) = spec
        .get("runtime")
        .and_then(|r| r.get("scaling"))
    {
        let min = scaling.get("minReplicas").and_then(Value::as_u64);
        let max = scaling.get("maxReplicas").and_then(Value::as_u64);
        if let (Some(min), Some(max)) = (min, max)
            && min > max
        {
            c.error(
                DiagnosticCode::CrossField,
                "spec.runtime.scaling",
                format!("minReplicas ({min}) is greater than maxReplicas ({max})"),
            );
        }
    }

    let credentials: Vec<(&str, &str)> = spec
        .get("credentials")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|c| Some((c.get("name")?.as_str()?, c.get("type")?.as_str()?)))
                .collect()
        })
        .unwrap_or_default();

    let bindings = spec.get("toolBindings").and_then(Value::as_array);
    for (i, binding) in bindings.into_iter().flatten().enumerate() {
        let path = join(&index("spec.toolBindings", i), "auth");
        let auth = binding.get("auth");
        let kind = auth
            .and_then(|a| a.get("type"))
            .and_then(Value::as_str)
            .unwrap_or("none");
        let credential = auth.and_then(|a| a.get("credential")).and_then(Value::as_str);

        match (kind, credential) {
            ("none", Some(name)) => c.error(
                DiagnosticCode::CrossField,
                join(&path, "credential"),
                format!("auth type 'none' must not reference a credential (got '{name}')"),
            ),
            ("none", None) => {}
            (kind, None) => c.error(
                DiagnosticCode::CrossField,
                join(&path, "credential"),
                format!("auth type '{kind}' requires a credential"),
            ),
            (kind, Some(name)) => match credentials.iter().find(|(n, _)| *n == name) {
                None => c.error(
                    DiagnosticCode::CrossField,
                    join(&path, "credential"),
                    format!("credential '{name}' is not declared in spec.credentials"),
                ),
                Some((_, declared)) if *declared != kind => c.error(
                    DiagnosticCode::CrossField,
                    join(&path, "type"),
                    format!("auth type '{kind}' does not match credential '{name}' of type '{declared}'"),
                ),
                Some(_) => {}
            },
        }
    }

    let capabilities: Vec<&str> = spec
        .get("capabilities")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let transitions = spec
        .get("workflow")
        .and_then(|w| w.get("transitions"))
        .and_then(Value::as_array);
    for (i, t) in transitions.into_iter().flatten().enumerate() {
        let path = index("spec.workflow.transitions", i);
        for key in ["from", "to"] {
            if let Some(name) = t.get(key).and_then(Value::as_str)
                && !capabilities.contains(&name)
            {
                c.error(
                    DiagnosticCode::CrossField,
                    join(&path, key),
                    format!("'{name}' is not a declared capability"),
                );
            }
        }
    }
}
