//! Types shared between the agentport CLI and anything that consumes its
//! reports: the typed manifest document and the diagnostic vocabulary.

pub mod document;
pub mod types;

pub use document::{
    AuthKind, AuthSection, CredentialKind, CredentialSection, LlmSection, ManifestDocument,
    ManifestMetadata, ManifestSpec, RuntimeSection, ScalingSection, ToolBindingSection,
    TransitionSection, WorkflowSection,
};
pub use types::{Diagnostic, DiagnosticCode, ErrorClass, ValidationResult};
