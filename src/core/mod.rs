//! core
//!
//! Core domain types and operations on stack state.
//!
//! # Modules
//!
//! - [`types`] - Strong types: Urn, ProviderReference, ResourceId
//! - [`resource`] - Resource state and pending operations
//! - [`snapshot`] - Snapshot and manifest
//! - [`graph`] - Dependency graph over a snapshot's resources
//! - [`verify`] - Snapshot integrity verification
//! - [`repair`] - Explicit prune and alias normalization
//! - [`edit`] - Delete, unprotect, locate and rename
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid identifiers from entering the model
//! - Resources are addressed by slot; URNs can repeat
//! - All verification is deterministic

pub mod config;
pub mod edit;
pub mod graph;
pub mod repair;
pub mod resource;
pub mod snapshot;
pub mod types;
pub mod verify;
