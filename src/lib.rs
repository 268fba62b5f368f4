//! stackstate - persisted deployment state for infrastructure stacks
//!
//! A stack's state is a snapshot of every resource it manages: identity,
//! inputs and outputs, and the references between resources. This crate
//! models that snapshot, keeps it consistent under destructive edits, and
//! reads and writes it across every persisted schema version.
//!
//! # Architecture
//!
//! - [`core`] - Domain types, the snapshot, its dependency graph, integrity
//!   verification and edit operations
//! - [`apitype`] - Frozen wire types, one per schema version
//! - [`migrate`] - Pure upgrades between adjacent wire versions
//! - [`stack`] - Checkpoint decoding, encoding and file I/O
//!
//! # Correctness Invariants
//!
//! 1. A snapshot lists every resource after everything it references
//! 2. Edits either fully succeed or leave the snapshot untouched
//! 3. A URN may repeat only while a delete-before-replace is in flight
//! 4. Checkpoints newer than the newest understood version are rejected,
//!    never guessed at

pub mod apitype;
pub mod core;
pub mod migrate;
pub mod stack;
