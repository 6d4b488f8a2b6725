//! Domain types and validators for agentport configuration.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;
use crate::domain::naming::is_dns_label;

// ── Constants ────────────────────────────────────────────────────────────────

pub const VALID_CONFIG_KEYS: &[&str] = &[
    "export.platform",
    "export.output_root",
    "export.enrichment",
    "registry.url",
];
pub const VALID_BOOLEANS: &[&str] = &["true", "false"];
pub const DEFAULT_OUTPUT_ROOT: &str = "dist";

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.agentport/config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AgentportConfig {
    /// Defaults for `agentport export`.
    pub export: ExportConfig,
    /// Remote manifest registry.
    pub registry: RegistryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Platform used when `--platform` is not given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// Directory exports are written under.
    pub output_root: String,
    /// Whether to add the trigger document by default.
    pub enrichment: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            platform: None,
            output_root: DEFAULT_OUTPUT_ROOT.to_string(),
            enrichment: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RegistryConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl AgentportConfig {
    /// Applies an already-validated `key = value`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value invalid.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_config_key(key)?;
        validate_config_value(key, value)?;
        match key {
            "export.platform" => self.export.platform = Some(value.to_string()),
            "export.output_root" => self.export.output_root = value.to_string(),
            "export.enrichment" => self.export.enrichment = value == "true",
            "registry.url" => self.registry.url = Some(value.trim_end_matches('/').to_string()),
            _ => unreachable_key(key)?,
        }
        Ok(())
    }
}

fn unreachable_key(key: &str) -> Result<()> {
    Err(ConfigError::UnknownKey {
        key: key.to_string(),
        valid: VALID_CONFIG_KEYS.join(", "),
    }
    .into())
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a configuration key against the whitelist.
///
/// # Errors
///
/// Returns an error if the key is not in the allowed list.
pub fn validate_config_key(key: &str) -> Result<()> {
    if !VALID_CONFIG_KEYS.contains(&key) {
        return unreachable_key(key);
    }
    Ok(())
}

/// Validates a configuration value for the given key.
///
/// # Errors
///
/// Returns an error if the value is not valid for the key.
pub fn validate_config_value(key: &str, value: &str) -> Result<()> {
    let invalid = |valid: &str| -> Result<()> {
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            valid: valid.to_string(),
        }
        .into())
    };
    match key {
        "export.platform" if !is_dns_label(value) => {
            invalid("a platform id such as container-image or kubernetes")
        }
        "export.output_root" if value.trim().is_empty() => invalid("a non-empty directory path"),
        "export.enrichment" if !VALID_BOOLEANS.contains(&value) => {
            invalid(&VALID_BOOLEANS.join(", "))
        }
        "registry.url" if !(value.starts_with("https://") || value.starts_with("http://")) => {
            invalid("an http(s) URL")
        }
        _ => Ok(()),
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
