//! In-memory artifact sets produced by converters and enrichers.
//!
//! An `ArtifactSet` can only be built through `push`, which enforces the two
//! set invariants: every path is a safe relative path, and no two artifacts
//! share a path. Pure types, no I/O.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::domain::error::ArtifactError;

/// One output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub relative_path: String,
    pub content: String,
    /// The writer should mark this file executable.
    pub is_executable_hint: bool,
}

impl Artifact {
    pub fn new(relative_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            content: content.into(),
            is_executable_hint: false,
        }
    }

    pub fn executable(relative_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            is_executable_hint: true,
            ..Self::new(relative_path, content)
        }
    }
}

/// Checks that `path` is relative, `/`-separated and cannot leave the
/// output root.
///
/// # Errors
///
/// Returns `ArtifactError::InvalidPath` naming the first rule broken.
pub fn validate_relative_path(path: &str) -> Result<(), ArtifactError> {
    let invalid = |reason: &'static str| ArtifactError::InvalidPath {
        path: path.to_string(),
        reason,
    };
    if path.is_empty() {
        return Err(invalid("empty path"));
    }
    if path.contains('\0') {
        return Err(invalid("contains a NUL byte"));
    }
    if path.contains('\\') {
        return Err(invalid("backslash separators are not allowed"));
    }
    let bytes = path.as_bytes();
    if path.starts_with('/') || (bytes.len() >= 2 && bytes[1] == b':') {
        return Err(invalid("absolute paths are not allowed"));
    }
    for segment in path.split('/') {
        match segment {
            ".." => return Err(invalid("parent-directory segments are not allowed")),
            "." | "" => return Err(invalid("empty or '.' segments are not allowed")),
            _ => {}
        }
    }
    Ok(())
}

/// Ordered collection of artifacts with unique, safe paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ArtifactSet {
    artifacts: Vec<Artifact>,
}

impl ArtifactSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is unsafe or already taken.
    pub fn push(&mut self, artifact: Artifact) -> Result<(), ArtifactError> {
        validate_relative_path(&artifact.relative_path)?;
        if self.contains(&artifact.relative_path) {
            return Err(ArtifactError::DuplicatePath(artifact.relative_path));
        }
        self.artifacts.push(artifact);
        Ok(())
    }

    /// Builds a set from artifacts in order.
    ///
    /// # Errors
    ///
    /// Returns the first path violation encountered.
    pub fn from_artifacts(
        artifacts: impl IntoIterator<Item = Artifact>,
    ) -> Result<Self, ArtifactError> {
        let mut set = Self::new();
        for artifact in artifacts {
            set.push(artifact)?;
        }
        Ok(set)
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.artifacts.iter().any(|a| a.relative_path == path)
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.relative_path == path)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Artifact> {
        self.artifacts.iter()
    }

    #[must_use]
    pub fn paths(&self) -> Vec<&str> {
        self.artifacts
            .iter()
            .map(|a| a.relative_path.as_str())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// SHA-256 over paths, executable flags and contents, in order.
    ///
    /// Fields are length-prefixed so distinct sets cannot hash alike by
    /// shifting bytes between a path and its content.
    #[must_use]
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for a in &self.artifacts {
            hasher.update((a.relative_path.len() as u64).to_le_bytes());
            hasher.update(a.relative_path.as_bytes());
            hasher.update([u8::from(a.is_executable_hint)]);
            hasher.update((a.content.len() as u64).to_le_bytes());
            hasher.update(a.content.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

impl<'a> IntoIterator for &'a ArtifactSet {
    type Item = &'a Artifact;
    type IntoIter = std::slice::Iter<'a, Artifact>;

    fn into_iter(self) -> Self::IntoIter {
        self.artifacts.iter()
    }
}

impl IntoIterator for ArtifactSet {
    type Item = Artifact;
    type IntoIter = std::vec::IntoIter<Artifact>;

    fn into_iter(self) -> Self::IntoIter {
        self.artifacts.into_iter()
    }
}
