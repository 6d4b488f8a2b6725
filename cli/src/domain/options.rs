//! Platform option bag.
//!
//! The orchestrator treats options as opaque; each converter reads the keys
//! it understands through an [`OptionReader`], which also rejects keys it
//! does not.

use std::collections::BTreeMap;

use agentport_common::{Diagnostic, DiagnosticCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque `key -> value` bag passed through to the selected converter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformOptions(BTreeMap<String, Value>);

impl PlatformOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merges `other` over `self`; keys in `other` win.
    pub fn merge(&mut self, other: PlatformOptions) {
        self.0.extend(other.0);
    }

    /// Parses a `key=value` assignment. The value is read as a YAML scalar,
    /// so `8080` becomes a number and `true` a boolean.
    #[must_use]
    pub fn parse_assignment(assignment: &str) -> Option<(String, Value)> {
        let (key, raw) = assignment.split_once('=')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        let value = match serde_yaml::from_str::<Value>(raw) {
            Ok(v @ (Value::Bool(_) | Value::Number(_) | Value::String(_))) => v,
            _ => Value::String(raw.to_string()),
        };
        Some((key.to_string(), value))
    }
}

/// Typed access to a converter's options that records every problem as an
/// `invalid-option` diagnostic instead of stopping at the first.
pub struct OptionReader<'a> {
    options: &'a PlatformOptions,
    errors: Vec<Diagnostic>,
}

impl<'a> OptionReader<'a> {
    /// Creates a reader and reports every key not listed in `known`.
    #[must_use]
    pub fn new(options: &'a PlatformOptions, known: &[&str]) -> Self {
        let mut errors = Vec::new();
        for key in options.0.keys() {
            if !known.contains(&key.as_str()) {
                errors.push(Diagnostic::new(
                    DiagnosticCode::InvalidOption,
                    option_path(key),
                    format!("unknown option '{key}' (known: {})", known.join(", ")),
                ));
            }
        }
        Self { options, errors }
    }

    /// Records an additional option error.
    pub fn reject(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors
            .push(Diagnostic::new(DiagnosticCode::InvalidOption, path, message));
    }

    pub fn optional_string(&mut self, key: &str) -> Option<String> {
        match self.options.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => {
                self.reject(option_path(key), format!("expected a string, found {other}"));
                None
            }
        }
    }

    pub fn string(&mut self, key: &str, default: &str) -> String {
        self.optional_string(key)
            .unwrap_or_else(|| default.to_string())
    }

    pub fn bool(&mut self, key: &str, default: bool) -> bool {
        match self.options.get(key) {
            None => default,
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) if s == "true" => true,
            Some(Value::String(s)) if s == "false" => false,
            Some(other) => {
                self.reject(option_path(key), format!("expected true or false, found {other}"));
                default
            }
        }
    }

    /// Reads an integer in `min..=max`.
    pub fn integer(&mut self, key: &str, default: u64, min: u64, max: u64) -> u64 {
        let parsed = match self.options.get(key) {
            None => return default,
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.parse::<u64>().ok(),
            Some(_) => None,
        };
        match parsed {
            Some(n) if (min..=max).contains(&n) => n,
            _ => {
                self.reject(
                    option_path(key),
                    format!("expected an integer between {min} and {max}"),
                );
                default
            }
        }
    }

    /// Ends reading.
    ///
    /// # Errors
    ///
    /// Returns every recorded diagnostic when at least one problem was found.
    pub fn finish(self) -> Result<(), Vec<Diagnostic>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

#[must_use]
pub fn option_path(key: &str) -> String {
    format!("options.{key}")
}
