//! core::snapshot
//!
//! The in-memory record of a stack's resources after its latest deployment.
//!
//! # Ordering
//!
//! `resources` is kept in dependency order: a resource never appears before
//! anything it references. [`crate::core::verify::verify_integrity`] checks
//! this; [`Snapshot::toposort`] restores it when a caller explicitly asks.
//! [`Snapshot::prune`] and [`Snapshot::normalize_urn_references`] are the
//! other explicit repairs.
//!
//! # Identity
//!
//! A resource instance is identified by its *slot*, its index in
//! `resources`. URNs are not unique while a delete-before-replace is in
//! flight.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::graph::{CycleError, DependencyGraph};
use super::repair::{self, PruneResult};
use super::resource::{Operation, ResourceState};
use super::types::TypeError;
use super::verify::{verify_integrity, IntegrityError};

/// Version info for a plugin used to produce a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub version: String,
}

/// Metadata about the deployment that produced a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Time of the update
    pub time: DateTime<Utc>,
    /// Integrity magic derived from `version`
    pub magic: String,
    /// Engine version that wrote the snapshot
    pub version: String,
    /// Plugins used
    pub plugins: Vec<PluginInfo>,
}

impl Manifest {
    /// Create a manifest stamped now, with a magic value for `version`.
    ///
    /// # Example
    ///
    /// ```
    /// use stackstate::core::snapshot::Manifest;
    ///
    /// let manifest = Manifest::new("3.0.0");
    /// assert!(manifest.magic_matches());
    /// assert_eq!(manifest.magic.len(), 64);
    /// ```
    pub fn new(version: impl Into<String>) -> Self {
        let version = version.into();
        Self {
            time: Utc::now(),
            magic: Self::magic_for(&version),
            version,
            plugins: Vec::new(),
        }
    }

    /// The magic value for an engine version: hex SHA-256 of the version string.
    pub fn magic_for(version: &str) -> String {
        hex::encode(Sha256::digest(version.as_bytes()))
    }

    /// Whether the stored magic is absent or agrees with the version.
    pub fn magic_matches(&self) -> bool {
        self.magic.is_empty() || self.magic == Self::magic_for(&self.version)
    }
}

/// Secrets provider configuration, carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretsProviders {
    #[serde(rename = "type")]
    pub provider_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<serde_json::Value>,
}

/// All resources that are part of a stack, plus in-flight operations.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub manifest: Manifest,
    pub secrets_providers: Option<SecretsProviders>,
    /// Resources in dependency order
    pub resources: Vec<ResourceState>,
    /// Operations that were executing when the snapshot was written
    pub pending_operations: Vec<Operation>,
}

impl Snapshot {
    /// Create a snapshot from its parts.
    pub fn new(
        manifest: Manifest,
        resources: Vec<ResourceState>,
        pending_operations: Vec<Operation>,
    ) -> Self {
        Self {
            manifest,
            secrets_providers: None,
            resources,
            pending_operations,
        }
    }

    /// Check structural invariants. See [`verify_integrity`].
    pub fn verify_integrity(&self) -> Result<(), IntegrityError> {
        verify_integrity(self)
    }

    /// Reorder `resources` so that every resource follows its dependencies.
    ///
    /// Already-ordered snapshots are left as they are. On a cycle the
    /// snapshot is not modified.
    pub fn toposort(&mut self) -> Result<(), CycleError> {
        let order = DependencyGraph::new(&self.resources).topological_order()?;
        if order.iter().enumerate().all(|(i, &slot)| i == slot) {
            return Ok(());
        }

        let mut slots: Vec<Option<ResourceState>> =
            std::mem::take(&mut self.resources).into_iter().map(Some).collect();
        self.resources = order
            .into_iter()
            .filter_map(|slot| slots[slot].take())
            .collect();
        Ok(())
    }

    /// Drop dangling references. See [`repair::prune`].
    pub fn prune(&mut self) -> Result<Vec<PruneResult>, TypeError> {
        repair::prune(self)
    }

    /// Rewrite references made through aliases. See
    /// [`repair::normalize_urn_references`].
    pub fn normalize_urn_references(&mut self) -> Result<bool, TypeError> {
        repair::normalize_urn_references(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Urn;

    fn res(name: &str) -> ResourceState {
        ResourceState::new(
            "t:m:R",
            Urn::parse(format!("urn:pulumi:s::p::t:m:R::{name}")).unwrap(),
            true,
        )
    }

    mod manifest {
        use super::*;

        #[test]
        fn magic_is_sha256_of_version() {
            assert_eq!(
                Manifest::magic_for(""),
                "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
            );
        }

        #[test]
        fn empty_magic_matches() {
            let mut manifest = Manifest::new("1.0.0");
            manifest.magic.clear();
            assert!(manifest.magic_matches());
        }

        #[test]
        fn tampered_magic_does_not_match() {
            let mut manifest = Manifest::new("1.0.0");
            manifest.version = "2.0.0".into();
            assert!(!manifest.magic_matches());
        }
    }

    mod toposort {
        use super::*;

        #[test]
        fn ordered_snapshot_unchanged() {
            let a = res("a");
            let mut b = res("b");
            b.dependencies = vec![a.urn.clone()];
            let mut snap = Snapshot::new(Manifest::new("v"), vec![a, b], vec![]);
            let before = snap.clone();

            snap.toposort().unwrap();
            assert_eq!(snap, before);
        }

        #[test]
        fn fixes_out_of_order_snapshot() {
            let a = res("a");
            let mut b = res("b");
            b.dependencies = vec![a.urn.clone()];
            let c = res("c");
            let mut snap = Snapshot::new(Manifest::new("v"), vec![b, c, a], vec![]);
            assert!(snap.verify_integrity().is_err());

            snap.toposort().unwrap();
            let names: Vec<_> = snap.resources.iter().map(|r| r.urn.name()).collect();
            assert_eq!(names, vec!["c", "a", "b"]);
            assert!(snap.verify_integrity().is_ok());
        }

        #[test]
        fn cycle_leaves_snapshot_alone() {
            let mut a = res("a");
            let mut b = res("b");
            a.dependencies = vec![b.urn.clone()];
            b.dependencies = vec![a.urn.clone()];
            let mut snap = Snapshot::new(Manifest::new("v"), vec![a, b], vec![]);
            let before = snap.clone();

            assert!(snap.toposort().is_err());
            assert_eq!(snap, before);
        }
    }
}
