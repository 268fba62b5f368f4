//! core::edit
//!
//! Graph-aware edits of a [`Snapshot`].
//!
//! # Operations
//!
//! - [`delete_resource`] - Remove one resource instance, optionally with its dependents
//! - [`unprotect_resource`] - Clear the deletion guard on one instance
//! - [`locate_resource`] - Find every instance carrying a URN
//! - [`rename_stack`] - Rewrite the stack (and project) in every URN
//!
//! # Integrity Contract
//!
//! - Resource instances are addressed by slot, never by URN alone
//! - Every operation stages its changes on a copy and commits only on
//!   success; a failed call leaves the snapshot exactly as it was
//! - Edits touch recorded state only; no provider is ever contacted

use std::collections::HashSet;

use thiserror::Error;

use super::graph::DependencyGraph;
use super::resource::{DependencyKind, Operation, ResourceState};
use super::snapshot::Snapshot;
use super::types::{validate_name, TypeError, Urn};
use super::verify::IntegrityError;

/// Errors from edit operations.
#[derive(Debug, Error)]
pub enum EditError {
    #[error("resource {condemned} cannot be deleted because it is protected")]
    ResourceProtected { condemned: Urn },

    #[error(
        "resource {condemned} cannot be deleted because {} other resource(s) depend on it",
        .dependencies.len()
    )]
    ResourceHasDependencies {
        condemned: Urn,
        /// Dependents, in snapshot order
        dependencies: Vec<Urn>,
    },

    #[error("snapshot integrity check failed: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("no resource in slot {0}")]
    ResourceNotFound(usize),

    #[error(transparent)]
    InvalidValue(#[from] TypeError),

    /// An `on_protected` callback refused to proceed.
    #[error("{0}")]
    Callback(String),
}

/// Called when a protected resource is about to be deleted.
///
/// The callback may clear `protect` to allow the deletion. Returning an
/// error aborts the whole edit.
pub type OnProtected<'a> = &'a mut dyn FnMut(&mut ResourceState) -> Result<(), EditError>;

fn handle_protected(
    res: &mut ResourceState,
    on_protected: &mut Option<OnProtected<'_>>,
) -> Result<(), EditError> {
    if !res.protect {
        return Ok(());
    }
    if let Some(callback) = on_protected {
        callback(res)?;
    }
    if res.protect {
        return Err(EditError::ResourceProtected {
            condemned: res.urn.clone(),
        });
    }
    Ok(())
}

/// Delete the resource in `condemned` from the snapshot.
///
/// When the condemned URN is unique, every resource that transitively
/// depends on it (children included) is found first. If there are any and
/// `target_dependents` is false the deletion is refused; otherwise they are
/// deleted too, each subject to the same protection check.
///
/// When several instances share the URN (a delete-before-replace in
/// flight), dependents cannot be attributed to one instance, so no closure
/// is computed and only the exact condemned slot is removed.
///
/// # Errors
///
/// - [`EditError::ResourceNotFound`] if `condemned` is out of range
/// - [`EditError::ResourceProtected`] if a resource to delete is still
///   protected after `on_protected` ran
/// - [`EditError::ResourceHasDependencies`] if dependents exist and
///   `target_dependents` is false
/// - [`EditError::Integrity`] if a remaining resource would still name the
///   condemned resource as its parent
///
/// On error the snapshot is unchanged, including any `protect` flags the
/// callback cleared.
pub fn delete_resource(
    snapshot: &mut Snapshot,
    condemned: usize,
    mut on_protected: Option<OnProtected<'_>>,
    target_dependents: bool,
) -> Result<(), EditError> {
    if condemned >= snapshot.resources.len() {
        return Err(EditError::ResourceNotFound(condemned));
    }

    let mut working = snapshot.resources.clone();
    handle_protected(&mut working[condemned], &mut on_protected)?;

    let condemned_urn = working[condemned].urn.clone();
    let sharing = working.iter().filter(|r| r.urn == condemned_urn).count();
    let unique = sharing == 1;

    let mut removed = HashSet::from([condemned]);
    if unique {
        let dependents =
            DependencyGraph::new(&working).depending_on(condemned, &HashSet::new(), true);
        if !dependents.is_empty() {
            if !target_dependents {
                return Err(EditError::ResourceHasDependencies {
                    condemned: condemned_urn,
                    dependencies: dependents
                        .iter()
                        .map(|&slot| working[slot].urn.clone())
                        .collect(),
                });
            }
            for &slot in &dependents {
                handle_protected(&mut working[slot], &mut on_protected)?;
            }
            removed.extend(dependents);
        }
    } else {
        tracing::debug!(
            urn = %condemned_urn,
            instances = sharing,
            "URN is shared; removing only the condemned instance"
        );
    }

    let remaining: Vec<ResourceState> = working
        .into_iter()
        .enumerate()
        .filter(|(slot, _)| !removed.contains(slot))
        .map(|(_, res)| res)
        .collect();

    if unique {
        if let Some(orphan) = remaining
            .iter()
            .find(|r| r.parent.as_ref() == Some(&condemned_urn))
        {
            return Err(IntegrityError::DanglingReference {
                urn: orphan.urn.clone(),
                kind: DependencyKind::Parent,
                target: condemned_urn,
            }
            .into());
        }
    }

    tracing::debug!(
        urn = %condemned_urn,
        removed = removed.len(),
        "deleted resource from snapshot"
    );
    snapshot.resources = remaining;
    Ok(())
}

/// Clear the deletion guard on a resource instance.
///
/// Idempotent; never fails.
pub fn unprotect_resource(res: &mut ResourceState) {
    res.protect = false;
}

/// Find the slot of every resource whose URN is `urn`, in snapshot order.
///
/// More than one slot is returned while a delete-before-replace is in
/// flight; callers disambiguate. No match yields an empty list.
pub fn locate_resource(snapshot: &Snapshot, urn: &Urn) -> Vec<usize> {
    snapshot
        .resources
        .iter()
        .enumerate()
        .filter(|(_, res)| &res.urn == urn)
        .map(|(slot, _)| slot)
        .collect()
}

/// Rewrites URNs into a new stack and, optionally, a new project.
struct StackRenamer<'a> {
    stack: &'a str,
    project: Option<&'a str>,
}

impl StackRenamer<'_> {
    fn urn(&self, urn: &Urn) -> Result<Urn, TypeError> {
        let project = self.project.unwrap_or(urn.project()).to_string();
        let renamed = urn.with_stack(self.stack)?.with_project(&project)?;
        if urn.is_root_stack() {
            // The root stack resource is named after its project and stack.
            return renamed.with_name(&format!("{project}-{}", self.stack));
        }
        Ok(renamed)
    }

    fn urns(&self, urns: &[Urn]) -> Result<Vec<Urn>, TypeError> {
        urns.iter().map(|u| self.urn(u)).collect()
    }

    fn state(&self, res: &ResourceState) -> Result<ResourceState, TypeError> {
        let mut out = res.clone();
        out.urn = self.urn(&res.urn)?;
        out.parent = res.parent.as_ref().map(|p| self.urn(p)).transpose()?;
        out.dependencies = self.urns(&res.dependencies)?;
        out.property_dependencies = res
            .property_dependencies
            .iter()
            .map(|(key, deps)| Ok((key.clone(), self.urns(deps)?)))
            .collect::<Result<_, TypeError>>()?;
        if let Some(reference) = res.provider_reference()? {
            let renamed = reference.with_urn(self.urn(reference.urn())?)?;
            out.provider = renamed.to_string();
        }
        Ok(out)
    }
}

/// Move every resource in the snapshot to a new stack name, and optionally
/// a new project.
///
/// Rewrites each resource's URN, parent, dependencies, property
/// dependencies and provider reference, for both `resources` and
/// `pending_operations`. The root stack resource is renamed to
/// `<project>-<stack>`. Aliases keep their historical URNs.
///
/// # Errors
///
/// - [`EditError::InvalidValue`] if a new name is invalid or some reference
///   cannot be parsed
/// - [`EditError::Integrity`] if the snapshot fails verification
///
/// Nothing is modified unless every rewrite succeeds.
pub fn rename_stack(
    snapshot: &mut Snapshot,
    new_stack: &str,
    new_project: Option<&str>,
) -> Result<(), EditError> {
    validate_name("stack", new_stack)?;
    if let Some(project) = new_project {
        validate_name("project", project)?;
    }
    snapshot.verify_integrity()?;

    let renamer = StackRenamer {
        stack: new_stack,
        project: new_project,
    };
    let resources = snapshot
        .resources
        .iter()
        .map(|res| renamer.state(res))
        .collect::<Result<Vec<_>, _>>()?;
    let pending_operations = snapshot
        .pending_operations
        .iter()
        .map(|op| Ok(Operation::new(renamer.state(&op.resource)?, op.op_type)))
        .collect::<Result<Vec<_>, TypeError>>()?;

    tracing::debug!(
        stack = new_stack,
        project = new_project.unwrap_or("<unchanged>"),
        resources = resources.len(),
        "renamed stack"
    );
    snapshot.resources = resources;
    snapshot.pending_operations = pending_operations;
    Ok(())
}
