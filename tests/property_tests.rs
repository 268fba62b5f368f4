//! Property-based tests for identifiers, the dependency graph and edits.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;

use stackstate::apitype::ResourceV1;
use stackstate::core::edit::{delete_resource, locate_resource, rename_stack};
use stackstate::core::graph::DependencyGraph;
use stackstate::core::resource::ResourceState;
use stackstate::core::snapshot::{Manifest, Snapshot};
use stackstate::core::types::{ProviderReference, ResourceId, Urn};
use stackstate::migrate::{up_to_resource_v2, up_to_resource_v3};

/// Strategy for stack and project names.
fn valid_name() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9_.-]{0,15}"
}

/// Strategy for type tokens like `aws:s3/bucket:Bucket`.
fn type_token() -> impl Strategy<Value = String> {
    "[a-z]{1,8}:[a-z0-9/]{1,10}:[A-Z][a-zA-Z]{0,10}"
}

/// Strategy for resource names, which may contain `::`.
fn resource_name() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9_.-]{1,20}",
        "[a-z]{1,5}::[a-z]{1,5}",
    ]
}

proptest! {
    /// URNs print exactly as parsed, and components read back.
    #[test]
    fn urn_roundtrip(
        stack in valid_name(),
        project in valid_name(),
        parent in prop::option::of(type_token()),
        base in type_token(),
        name in resource_name(),
    ) {
        let urn = Urn::new(&stack, &project, parent.as_deref().unwrap_or(""), &base, &name).unwrap();
        let reparsed = Urn::parse(urn.to_string()).unwrap();
        prop_assert_eq!(&reparsed, &urn);
        prop_assert_eq!(urn.stack(), stack.as_str());
        prop_assert_eq!(urn.project(), project.as_str());
        prop_assert_eq!(urn.type_token(), base.as_str());
        prop_assert_eq!(urn.parent_type(), parent.as_deref());
        prop_assert_eq!(urn.name(), name.as_str());

        let json = serde_json::to_string(&urn).unwrap();
        let from_json: Urn = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(from_json, urn);
    }

    /// Provider references split at the last `::`, so names containing
    /// `::` survive.
    #[test]
    fn provider_reference_roundtrip(
        stack in valid_name(),
        package in "[a-z]{1,10}",
        name in resource_name(),
        id in "[a-zA-Z0-9-]{0,20}",
    ) {
        let urn = Urn::new(&stack, "proj", "", &format!("pulumi:providers:{package}"), &name).unwrap();
        let reference = ProviderReference::new(urn.clone(), ResourceId::new(id.clone())).unwrap();
        let parsed = ProviderReference::parse(&reference.to_string()).unwrap();
        prop_assert_eq!(parsed.urn(), &urn);
        prop_assert_eq!(parsed.id().as_str(), id.as_str());
        prop_assert_eq!(parsed.to_string(), reference.to_string());
    }

    /// Renaming never changes the name or type of a URN.
    #[test]
    fn urn_with_stack_keeps_identity(
        stack in valid_name(),
        new_stack in valid_name(),
        base in type_token(),
        name in resource_name(),
    ) {
        let urn = Urn::new(&stack, "proj", "", &base, &name).unwrap();
        let moved = urn.with_stack(&new_stack).unwrap();
        prop_assert_eq!(moved.stack(), new_stack.as_str());
        prop_assert_eq!(moved.project(), "proj");
        prop_assert_eq!(moved.qualified_type(), urn.qualified_type());
        prop_assert_eq!(moved.name(), urn.name());
    }
}

// =============================================================================
// Snapshot Property Tests
// =============================================================================

/// How one generated resource refers to earlier ones.
#[derive(Debug, Clone)]
struct Shape {
    parent: Option<prop::sample::Index>,
    dependencies: Vec<prop::sample::Index>,
    protect: bool,
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    (
        prop::option::weighted(0.4, any::<prop::sample::Index>()),
        prop::collection::vec(any::<prop::sample::Index>(), 0..3),
        prop::bool::weighted(0.1),
    )
        .prop_map(|(parent, dependencies, protect)| Shape {
            parent,
            dependencies,
            protect,
        })
}

/// Strategy for valid snapshots.
///
/// Each resource references only resources created before it, so the
/// result is acyclic and in dependency order by construction.
fn snapshot_strategy() -> impl Strategy<Value = Snapshot> {
    prop::collection::vec(shape_strategy(), 1..12).prop_map(|shapes| {
        let mut resources: Vec<ResourceState> = Vec::new();
        for (i, shape) in shapes.into_iter().enumerate() {
            let urn = Urn::new("dev", "proj", "", "t:m:R", &format!("r{i}")).unwrap();
            let mut res = ResourceState::new("t:m:R", urn, true);
            if i > 0 {
                res.parent = shape.parent.map(|p| resources[p.index(i)].urn.clone());
                let mut deps: Vec<Urn> = shape
                    .dependencies
                    .iter()
                    .map(|d| resources[d.index(i)].urn.clone())
                    .collect();
                deps.dedup();
                res.dependencies = deps;
            }
            res.protect = shape.protect;
            resources.push(res);
        }
        Snapshot::new(Manifest::new("3.0.0"), resources, vec![])
    })
}

fn urns(snapshot: &Snapshot) -> HashSet<Urn> {
    snapshot.resources.iter().map(|r| r.urn.clone()).collect()
}

proptest! {
    /// Generated snapshots are valid (validates the strategy).
    #[test]
    fn generated_snapshot_is_valid(snap in snapshot_strategy()) {
        prop_assert!(snap.verify_integrity().is_ok());
    }

    /// Every dependent comes after the resource it depends on.
    #[test]
    fn dependents_follow_their_dependency(snap in snapshot_strategy()) {
        let graph = DependencyGraph::new(&snap.resources);
        for slot in 0..snap.resources.len() {
            for dependent in graph.depending_on(slot, &HashSet::new(), true) {
                prop_assert!(dependent > slot);
                prop_assert!(graph.transitive_dependencies_of(dependent).contains(&slot));
            }
        }
    }

    /// Topological order of a valid snapshot is the identity.
    #[test]
    fn topological_order_of_valid_snapshot_is_identity(snap in snapshot_strategy()) {
        let order = DependencyGraph::new(&snap.resources).topological_order().unwrap();
        let identity: Vec<usize> = (0..snap.resources.len()).collect();
        prop_assert_eq!(order, identity);
    }

    /// Toposort repairs any reordering of a valid snapshot.
    #[test]
    fn toposort_repairs_reversal(snap in snapshot_strategy()) {
        let mut reversed = snap.clone();
        reversed.resources.reverse();
        reversed.toposort().unwrap();
        prop_assert!(reversed.verify_integrity().is_ok());
        prop_assert_eq!(urns(&reversed), urns(&snap));
    }

    /// Deleting with dependents either succeeds and leaves a valid snapshot,
    /// or fails and leaves the snapshot untouched.
    #[test]
    fn delete_is_all_or_nothing(
        snap in snapshot_strategy(),
        target in any::<prop::sample::Index>(),
        target_dependents in any::<bool>(),
    ) {
        let slot = target.index(snap.resources.len());
        let condemned = snap.resources[slot].urn.clone();
        let mut edited = snap.clone();

        match delete_resource(&mut edited, slot, None, target_dependents) {
            Ok(()) => {
                prop_assert!(edited.verify_integrity().is_ok());
                prop_assert!(locate_resource(&edited, &condemned).is_empty());
                prop_assert!(edited
                    .resources
                    .iter()
                    .all(|r| r.parent.as_ref() != Some(&condemned)));
            }
            Err(_) => prop_assert_eq!(edited, snap),
        }
    }

    /// Survivors keep their relative order.
    #[test]
    fn delete_preserves_order(
        snap in snapshot_strategy(),
        target in any::<prop::sample::Index>(),
    ) {
        let slot = target.index(snap.resources.len());
        let mut edited = snap.clone();
        if delete_resource(&mut edited, slot, None, true).is_ok() {
            let position: HashMap<&Urn, usize> = snap
                .resources
                .iter()
                .enumerate()
                .map(|(i, r)| (&r.urn, i))
                .collect();
            let positions: Vec<usize> = edited.resources.iter().map(|r| position[&r.urn]).collect();
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
    }

    /// Renaming keeps the snapshot valid and moves every URN.
    #[test]
    fn rename_keeps_integrity(snap in snapshot_strategy(), new_stack in valid_name()) {
        let mut renamed = snap.clone();
        rename_stack(&mut renamed, &new_stack, None).unwrap();
        prop_assert!(renamed.verify_integrity().is_ok());
        prop_assert_eq!(renamed.resources.len(), snap.resources.len());
        for (before, after) in snap.resources.iter().zip(&renamed.resources) {
            prop_assert_eq!(after.urn.stack(), new_stack.as_str());
            prop_assert_eq!(after.urn.name(), before.urn.name());
        }
    }

    /// Pruning after a raw removal always restores integrity.
    #[test]
    fn prune_repairs_raw_removal(
        snap in snapshot_strategy(),
        target in any::<prop::sample::Index>(),
    ) {
        let mut broken = snap.clone();
        let gone = broken.resources.remove(target.index(snap.resources.len())).urn;

        let results = broken.prune().unwrap();
        prop_assert!(broken.verify_integrity().is_ok());
        prop_assert_eq!(broken.resources.len(), snap.resources.len() - 1);
        for result in &results {
            prop_assert_eq!(&result.old_urn, &result.new_urn);
            prop_assert!(result.removed_dependencies.iter().all(|d| d.urn == gone));
        }
    }

    /// Migration carries every V1 field that still exists in V3.
    #[test]
    fn resource_migration_preserves_shared_fields(
        name in resource_name(),
        id in "[a-z0-9-]{0,12}",
        protect in any::<bool>(),
        delete in any::<bool>(),
        deps in prop::collection::vec(resource_name(), 0..4),
    ) {
        let v1 = ResourceV1 {
            urn: format!("urn:pulumi:dev::proj::t:m:R::{name}"),
            custom: true,
            delete,
            id: id.clone(),
            type_token: "t:m:R".to_string(),
            inputs: Default::default(),
            defaults: Default::default(),
            outputs: Default::default(),
            parent: String::new(),
            protect,
            dependencies: deps
                .iter()
                .map(|d| format!("urn:pulumi:dev::proj::t:m:R::{d}"))
                .collect(),
            init_errors: vec![],
        };
        let v3 = up_to_resource_v3(up_to_resource_v2(v1.clone()));
        prop_assert_eq!(v3.urn, v1.urn);
        prop_assert_eq!(v3.id, id);
        prop_assert_eq!(v3.protect, protect);
        prop_assert_eq!(v3.delete, delete);
        prop_assert_eq!(v3.dependencies, v1.dependencies);
        prop_assert!(!v3.external);
        prop_assert!(v3.provider.is_empty());
    }
}
