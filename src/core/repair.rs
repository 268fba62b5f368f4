//! core::repair
//!
//! Explicit repairs for snapshots that fail integrity checks.
//!
//! Nothing here runs on its own: loading and editing never repair. A caller
//! that has decided a broken snapshot should be salvaged invokes these, the
//! same way it would invoke [`Snapshot::toposort`].
//!
//! - [`prune`] drops references to resources that are not in the snapshot
//! - [`normalize_urn_references`] rewrites references made through aliases

use std::collections::{HashMap, HashSet};

use super::resource::{DependencyKind, ResourceState};
use super::snapshot::Snapshot;
use super::types::{TypeError, Urn, URN_TYPE_DELIMITER};

/// A reference that [`prune`] removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedDependency {
    pub kind: DependencyKind,
    /// Property name, for property dependencies
    pub key: Option<String>,
    pub urn: Urn,
}

/// What [`prune`] changed on one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneResult {
    pub old_urn: Urn,
    pub new_urn: Urn,
    /// Whether the resource is pending deletion
    pub delete: bool,
    pub removed_dependencies: Vec<RemovedDependency>,
}

/// Remove dangling `parent`, `dependencies` and `property_dependencies`
/// references.
///
/// A resource that loses its parent, or whose parent's URN changed, gets a
/// URN whose qualified type matches its new parentage, and references to
/// the old URN are rewritten. Dangling provider references are left alone.
///
/// Returns one result per resource whose URN changed or that lost a
/// reference, in snapshot order. On error the snapshot is not modified.
pub fn prune(snapshot: &mut Snapshot) -> Result<Vec<PruneResult>, TypeError> {
    let present: HashSet<Urn> = snapshot.resources.iter().map(|r| r.urn.clone()).collect();
    let mut resources = snapshot.resources.clone();
    let mut renamed: HashMap<Urn, Urn> = HashMap::new();
    let mut removed: Vec<Vec<RemovedDependency>> = vec![Vec::new(); resources.len()];

    // Parents first, in order, so a child sees its parent's new URN.
    for (slot, res) in resources.iter_mut().enumerate() {
        let Some(parent) = res.parent.clone() else {
            continue;
        };
        let parent_type = if let Some(new_parent) = renamed.get(&parent) {
            res.parent = Some(new_parent.clone());
            Some(new_parent.qualified_type().to_string())
        } else if !present.contains(&parent) {
            res.parent = None;
            removed[slot].push(RemovedDependency {
                kind: DependencyKind::Parent,
                key: None,
                urn: parent,
            });
            None
        } else {
            continue;
        };

        let qualified_type = match parent_type {
            Some(parent_type) => {
                format!("{parent_type}{URN_TYPE_DELIMITER}{}", res.urn.type_token())
            }
            None => res.urn.type_token().to_string(),
        };
        if qualified_type != res.urn.qualified_type() {
            let new_urn = res.urn.with_qualified_type(&qualified_type)?;
            renamed.insert(res.urn.clone(), new_urn.clone());
            res.urn = new_urn;
        }
    }

    for (slot, res) in resources.iter_mut().enumerate() {
        if let Some(new_parent) = res.parent.as_ref().and_then(|p| renamed.get(p)) {
            res.parent = Some(new_parent.clone());
        }

        let mut kept = Vec::with_capacity(res.dependencies.len());
        for dep in std::mem::take(&mut res.dependencies) {
            match renamed.get(&dep) {
                Some(new_dep) => kept.push(new_dep.clone()),
                None if present.contains(&dep) => kept.push(dep),
                None => removed[slot].push(RemovedDependency {
                    kind: DependencyKind::Dependency,
                    key: None,
                    urn: dep,
                }),
            }
        }
        res.dependencies = kept;

        let mut emptied = Vec::new();
        for (key, deps) in res.property_dependencies.iter_mut() {
            let before = deps.len();
            let mut kept = Vec::with_capacity(before);
            for dep in std::mem::take(deps) {
                match renamed.get(&dep) {
                    Some(new_dep) => kept.push(new_dep.clone()),
                    None if present.contains(&dep) => kept.push(dep),
                    None => removed[slot].push(RemovedDependency {
                        kind: DependencyKind::PropertyDependency,
                        key: Some(key.clone()),
                        urn: dep,
                    }),
                }
            }
            if kept.is_empty() && before > 0 {
                emptied.push(key.clone());
            }
            *deps = kept;
        }
        for key in emptied {
            res.property_dependencies.remove(&key);
        }

        if let Ok(Some(reference)) = res.provider_reference() {
            if let Some(new_provider) = renamed.get(reference.urn()) {
                res.provider = reference.with_urn(new_provider.clone())?.to_string();
            }
        }
    }

    let results: Vec<PruneResult> = snapshot
        .resources
        .iter()
        .zip(&resources)
        .zip(removed)
        .filter(|((old, new), removed)| old.urn != new.urn || !removed.is_empty())
        .map(|((old, new), removed_dependencies)| PruneResult {
            old_urn: old.urn.clone(),
            new_urn: new.urn.clone(),
            delete: new.delete,
            removed_dependencies,
        })
        .collect();

    tracing::debug!(changed = results.len(), "pruned snapshot");
    snapshot.resources = resources;
    Ok(results)
}

/// Rewrite references that name a resource by one of its aliases so they
/// use the resource's current URN.
///
/// Walks resources in order; a reference is rewritten only through aliases
/// of resources that come before it. Returns whether anything changed. On
/// error the snapshot is not modified.
///
/// # Errors
///
/// Returns [`TypeError`] if, once any alias is known, a later resource's
/// provider reference does not parse.
pub fn normalize_urn_references(snapshot: &mut Snapshot) -> Result<bool, TypeError> {
    let mut aliases: HashMap<Urn, Urn> = HashMap::new();
    let mut resources = snapshot.resources.clone();
    let mut changed = false;

    for res in resources.iter_mut() {
        changed |= normalize_resource(res, &aliases)?;
        for alias in &res.aliases {
            aliases.insert(alias.clone(), res.urn.clone());
        }
    }

    if changed {
        snapshot.resources = resources;
    }
    Ok(changed)
}

fn normalize_resource(
    res: &mut ResourceState,
    aliases: &HashMap<Urn, Urn>,
) -> Result<bool, TypeError> {
    if aliases.is_empty() {
        return Ok(false);
    }

    let mut changed = false;
    let mut fix = |urn: &mut Urn| {
        if let Some(current) = aliases.get(&*urn) {
            *urn = current.clone();
            changed = true;
        }
    };

    if let Some(parent) = res.parent.as_mut() {
        fix(parent);
    }
    res.dependencies.iter_mut().for_each(&mut fix);
    res.property_dependencies
        .values_mut()
        .flatten()
        .for_each(&mut fix);

    if let Some(reference) = res.provider_reference()? {
        if let Some(current) = aliases.get(reference.urn()) {
            res.provider = reference.with_urn(current.clone())?.to_string();
            changed = true;
        }
    }
    Ok(changed)
}
