//! Adapter registry: platform id → converter.
//!
//! The registry is an explicit object passed into the orchestrator; there is
//! no global instance. Mutation is copy-on-write: writers build a new map and
//! swap the snapshot under a short write lock, so a concurrent `resolve`
//! always sees either the old or the new mapping, never a half-updated one.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

use crate::domain::converters::{PlatformConverter, builtin_converters};
use crate::domain::error::RegistryError;
use crate::domain::naming::is_dns_label;

type Snapshot = Arc<BTreeMap<String, Arc<dyn PlatformConverter>>>;

/// Listing entry for `agentport platforms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformInfo {
    pub platform: String,
    pub implementation: String,
    pub description: String,
}

/// Maps platform identifiers to converters.
#[derive(Default)]
pub struct AdapterRegistry {
    entries: RwLock<Snapshot>,
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("platforms", &self.list())
            .finish()
    }
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the five built-in converters.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Conflict` if two built-ins claim one platform.
    pub fn with_builtin() -> Result<Self, RegistryError> {
        let registry = Self::new();
        for converter in builtin_converters() {
            registry.register(converter, false)?;
        }
        Ok(registry)
    }

    /// Registers `converter` under its own platform id.
    ///
    /// Registering the same implementation again is a no-op that refreshes
    /// the entry. A different implementation under a taken id is refused
    /// unless `replace` is set.
    ///
    /// # Errors
    ///
    /// `InvalidPlatformId` when the id is not a lowercase label;
    /// `Conflict` when the id is taken by another implementation.
    pub fn register(
        &self,
        converter: Arc<dyn PlatformConverter>,
        replace: bool,
    ) -> Result<(), RegistryError> {
        let platform = converter.platform().to_string();
        if !is_dns_label(&platform) {
            return Err(RegistryError::InvalidPlatformId(platform));
        }

        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = guard.get(&platform)
            && existing.implementation() != converter.implementation()
            && !replace
        {
            return Err(RegistryError::Conflict {
                platform,
                existing: existing.implementation().to_string(),
                incoming: converter.implementation().to_string(),
            });
        }

        let mut next = BTreeMap::clone(&guard);
        tracing::debug!(
            platform = %platform,
            implementation = converter.implementation(),
            "registering converter"
        );
        next.insert(platform, converter);
        *guard = Arc::new(next);
        Ok(())
    }

    /// Looks up the converter for `platform`.
    ///
    /// # Errors
    ///
    /// `UnsupportedPlatform`, carrying the ids that are available.
    pub fn resolve(&self, platform: &str) -> Result<Arc<dyn PlatformConverter>, RegistryError> {
        let snapshot = self.snapshot();
        snapshot
            .get(platform)
            .cloned()
            .ok_or_else(|| RegistryError::UnsupportedPlatform {
                platform: platform.to_string(),
                available: snapshot.keys().cloned().collect(),
            })
    }

    /// Registered platform ids, sorted.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.snapshot().keys().cloned().collect()
    }

    /// One listing entry per registered converter, sorted by platform id.
    #[must_use]
    pub fn describe(&self) -> Vec<PlatformInfo> {
        self.snapshot()
            .values()
            .map(|c| PlatformInfo {
                platform: c.platform().to_string(),
                implementation: c.implementation().to_string(),
                description: c.description().to_string(),
            })
            .collect()
    }

    fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.entries.read().unwrap_or_else(PoisonError::into_inner))
    }
}
