//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: manifest and option file
//! reading, artifact writing, configuration persistence and the manifest
//! registry HTTP client.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod config;
pub mod fs;
pub mod registry_client;
