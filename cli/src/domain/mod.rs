//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod artifact;
pub mod config;
pub mod converters;
pub mod enrichment;
pub mod error;
pub mod expression;
pub mod manifest;
pub mod naming;
pub mod options;
pub mod quote;
pub mod schema;

pub use artifact::{Artifact, ArtifactSet};
pub use config::{AgentportConfig, validate_config_key, validate_config_value};
pub use converters::{Conversion, PlatformConverter, builtin_converters};
pub use enrichment::{Enricher, TriggerDocumentEnricher};
pub use error::{ArtifactError, ConfigError, ConvertError, ExportError, RegistryError};
pub use manifest::{DocumentFormat, Manifest, RawManifest};
pub use options::PlatformOptions;
pub use schema::SchemaRegistry;
