//! Path-aware structural checks over an untyped JSON value.
//!
//! `Checker` accumulates diagnostics rather than stopping at the first
//! problem, so a single validation run reports everything wrong with a
//! document.

use agentport_common::{Diagnostic, DiagnosticCode, ValidationResult};
use regex::Regex;
use serde_json::{Map, Value};

/// Joins a dotted path with a key. The root path is empty.
#[must_use]
pub fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

#[must_use]
pub fn index(path: &str, i: usize) -> String {
    format!("{path}[{i}]")
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Default)]
pub struct Checker {
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
}

impl Checker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, code: DiagnosticCode, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(Diagnostic::new(code, path, message));
    }

    pub fn warn(&mut self, code: DiagnosticCode, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(Diagnostic::new(code, path, message));
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn finish(self) -> ValidationResult {
        ValidationResult::new(self.errors, self.warnings)
    }

    fn mismatch(&mut self, path: &str, expected: &str, found: &Value) {
        self.error(
            DiagnosticCode::TypeMismatch,
            path,
            format!("expected {expected}, found {}", type_name(found)),
        );
    }

    /// Required key of `obj`.
    pub fn required<'v>(&mut self, obj: &'v Map<String, Value>, path: &str, key: &str) -> Option<&'v Value> {
        let v = obj.get(key);
        if v.is_none() {
            self.error(
                DiagnosticCode::MissingField,
                join(path, key),
                format!("'{key}' is required"),
            );
        }
        v
    }

    pub fn object<'v>(&mut self, v: &'v Value, path: &str) -> Option<&'v Map<String, Value>> {
        let obj = v.as_object();
        if obj.is_none() {
            self.mismatch(path, "an object", v);
        }
        obj
    }

    pub fn array<'v>(&mut self, v: &'v Value, path: &str) -> Option<&'v Vec<Value>> {
        let arr = v.as_array();
        if arr.is_none() {
            self.mismatch(path, "an array", v);
        }
        arr
    }

    pub fn non_empty_array<'v>(&mut self, v: &'v Value, path: &str) -> Option<&'v Vec<Value>> {
        let arr = self.array(v, path)?;
        if arr.is_empty() {
            self.error(DiagnosticCode::EmptyArray, path, "must contain at least one entry");
            return None;
        }
        Some(arr)
    }

    pub fn string<'v>(&mut self, v: &'v Value, path: &str) -> Option<&'v str> {
        let s = v.as_str();
        if s.is_none() {
            self.mismatch(path, "a string", v);
        }
        s
    }

    /// String that must match `re`; `shape` describes the pattern to humans.
    pub fn pattern<'v>(&mut self, v: &'v Value, path: &str, re: &Regex, shape: &str) -> Option<&'v str> {
        let s = self.string(v, path)?;
        if re.is_match(s) {
            Some(s)
        } else {
            self.error(
                DiagnosticCode::PatternMismatch,
                path,
                format!("'{s}' must be {shape}"),
            );
            None
        }
    }

    /// String that must be one of `allowed`.
    pub fn one_of<'v>(&mut self, v: &'v Value, path: &str, allowed: &[&str]) -> Option<&'v str> {
        let s = self.string(v, path)?;
        if allowed.contains(&s) {
            Some(s)
        } else {
            self.error(
                DiagnosticCode::PatternMismatch,
                path,
                format!("'{s}' must be one of: {}", allowed.join(", ")),
            );
            None
        }
    }

    /// Non-negative integer within `min..=max`.
    pub fn integer(&mut self, v: &Value, path: &str, min: u64, max: u64) -> Option<u64> {
        let Some(n) = v.as_u64() else {
            if v.is_number() {
                self.error(
                    DiagnosticCode::OutOfRange,
                    path,
                    format!("must be an integer between {min} and {max}"),
                );
            } else {
                self.mismatch(path, "an integer", v);
            }
            return None;
        };
        if (min..=max).contains(&n) {
            Some(n)
        } else {
            self.error(
                DiagnosticCode::OutOfRange,
                path,
                format!("{n} is outside {min}..={max}"),
            );
            None
        }
    }

    pub fn number(&mut self, v: &Value, path: &str, min: f64, max: f64) -> Option<f64> {
        let Some(n) = v.as_f64() else {
            self.mismatch(path, "a number", v);
            return None;
        };
        if n >= min && n <= max {
            Some(n)
        } else {
            self.error(
                DiagnosticCode::OutOfRange,
                path,
                format!("{n} is outside {min}..={max}"),
            );
            None
        }
    }

    /// Reports keys of `obj` not in `allowed`. Strict objects reject them,
    /// lenient ones only warn.
    pub fn unknown_fields(&mut self, obj: &Map<String, Value>, path: &str, allowed: &[&str], strict: bool) {
        for key in obj.keys() {
            if allowed.contains(&key.as_str()) {
                continue;
            }
            let at = join(path, key);
            if strict {
                self.error(
                    DiagnosticCode::UnknownField,
                    at,
                    format!("unknown field '{key}' (expected one of: {})", allowed.join(", ")),
                );
            } else {
                self.warn(
                    DiagnosticCode::UnknownField,
                    at,
                    format!("unknown field '{key}' is ignored"),
                );
            }
        }
    }
}
