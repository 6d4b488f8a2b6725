//! Unit tests for the agentport CLI library.
//!
//! These tests use in-memory or mocked collaborators and temp directories;
//! they never spawn the binary or touch the network.

mod architecture;
mod export_service;
mod helpers;
mod orchestrator;
mod property_tests;
mod publish_service;
mod registry;
