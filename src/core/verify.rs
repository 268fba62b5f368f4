//! core::verify
//!
//! Snapshot integrity verification.
//!
//! # Checks
//!
//! Walking resources in snapshot order:
//! - Every `parent`, `dependencies`, `property_dependencies` and `provider`
//!   reference resolves to a resource in the snapshot
//! - That resource appears earlier (dependency order)
//! - Provider references parse and name an earlier provider with the same ID
//! - At most one instance per URN is live (`delete == false`)
//!
//! # Invariants
//!
//! - Never mutates the snapshot
//! - Must be deterministic: the first violation in snapshot order is reported
//! - Failures are never auto-repaired

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use super::resource::DependencyKind;
use super::snapshot::Snapshot;
use super::types::{TypeError, Urn};

/// A structural invariant violated by a snapshot.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("resource {urn} refers to missing {kind} {target}")]
    DanglingReference {
        urn: Urn,
        kind: DependencyKind,
        target: Urn,
    },

    #[error("resource {urn}'s {kind} {target} comes after it")]
    ReferenceOutOfOrder {
        urn: Urn,
        kind: DependencyKind,
        target: Urn,
    },

    #[error("resource {urn} has an invalid provider reference: {source}")]
    InvalidProviderReference { urn: Urn, source: TypeError },

    #[error("resource {urn} refers to provider {reference}, which has a different ID")]
    ProviderMismatch { urn: Urn, reference: String },

    #[error("duplicate resource {urn} (not marked for deletion)")]
    DuplicateUrn { urn: Urn },
}

/// Verify the structural integrity of a snapshot.
///
/// # Errors
///
/// Returns the first [`IntegrityError`] found, in snapshot order.
pub fn verify_integrity(snapshot: &Snapshot) -> Result<(), IntegrityError> {
    let everywhere: HashSet<&Urn> = snapshot.resources.iter().map(|r| &r.urn).collect();
    let mut earlier: HashMap<&Urn, Vec<usize>> = HashMap::new();

    let check = |urn: &Urn,
                 kind: DependencyKind,
                 target: &Urn,
                 earlier: &HashMap<&Urn, Vec<usize>>|
     -> Result<(), IntegrityError> {
        if earlier.contains_key(target) {
            return Ok(());
        }
        let (urn, target) = (urn.clone(), target.clone());
        if everywhere.contains(&target) {
            Err(IntegrityError::ReferenceOutOfOrder { urn, kind, target })
        } else {
            Err(IntegrityError::DanglingReference { urn, kind, target })
        }
    };

    for (slot, res) in snapshot.resources.iter().enumerate() {
        for (kind, target) in res.urn_references() {
            check(&res.urn, kind, target, &earlier)?;
        }

        let reference =
            res.provider_reference()
                .map_err(|source| IntegrityError::InvalidProviderReference {
                    urn: res.urn.clone(),
                    source,
                })?;
        if let Some(reference) = reference {
            check(&res.urn, DependencyKind::Provider, reference.urn(), &earlier)?;

            let id_matches = earlier[reference.urn()].iter().any(|&p| {
                snapshot.resources[p].id.as_ref().map_or("", |id| id.as_str())
                    == reference.id().as_str()
            });
            if !id_matches {
                return Err(IntegrityError::ProviderMismatch {
                    urn: res.urn.clone(),
                    reference: res.provider.clone(),
                });
            }
        }

        let instances = earlier.entry(&res.urn).or_default();
        if !res.delete
            && instances
                .iter()
                .any(|&other| !snapshot.resources[other].delete)
        {
            return Err(IntegrityError::DuplicateUrn {
                urn: res.urn.clone(),
            });
        }
        instances.push(slot);
    }

    Ok(())
}
