//! core::graph
//!
//! Dependency graph over a snapshot's resources.
//!
//! # Architecture
//!
//! The graph is an adjacency structure keyed by slot (index into the
//! resource list it was built from). Edges point from a resource to the
//! resources it depends on, through any of:
//! - `dependencies`
//! - `property_dependencies`
//! - `parent`
//! - `provider`
//!
//! A URN reference resolves to *every* slot carrying that URN, so both
//! instances of a resource mid-replacement are reachable.
//!
//! # Invariants
//!
//! - Built fresh per operation; never cached across mutations
//! - Valid snapshots are acyclic. Traversals are visited-guarded, so they
//!   terminate on cyclic input, but only [`DependencyGraph::topological_order`]
//!   reports cycles.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use thiserror::Error;

use super::resource::{DependencyKind, ResourceState};
use super::types::Urn;

/// A cycle was found while ordering resources.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("snapshot has cyclic dependencies involving {urn}")]
pub struct CycleError {
    /// A resource on the cycle
    pub urn: Urn,
}

/// The dependency graph derived from a resource list.
#[derive(Debug)]
pub struct DependencyGraph<'a> {
    resources: &'a [ResourceState],
    /// Slot -> the slots it depends on
    dependencies: Vec<Vec<(usize, DependencyKind)>>,
    /// Slot -> the slots that depend on it
    dependents: Vec<Vec<(usize, DependencyKind)>>,
}

impl<'a> DependencyGraph<'a> {
    /// Build the graph for a resource list.
    ///
    /// References to URNs that are not in the list contribute no edge.
    pub fn new(resources: &'a [ResourceState]) -> Self {
        let mut index: HashMap<&Urn, Vec<usize>> = HashMap::new();
        for (slot, res) in resources.iter().enumerate() {
            index.entry(&res.urn).or_default().push(slot);
        }

        let mut dependencies = vec![Vec::new(); resources.len()];
        let mut dependents = vec![Vec::new(); resources.len()];

        for (slot, res) in resources.iter().enumerate() {
            let mut edges: Vec<(DependencyKind, Urn)> = res
                .urn_references()
                .into_iter()
                .map(|(kind, urn)| (kind, urn.clone()))
                .collect();

            match res.provider_reference() {
                Ok(Some(reference)) => {
                    edges.push((DependencyKind::Provider, reference.urn().clone()));
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(urn = %res.urn, error = %err, "skipping unparseable provider edge");
                }
            }

            for (kind, urn) in edges {
                for &target in index.get(&urn).map(Vec::as_slice).unwrap_or_default() {
                    dependencies[slot].push((target, kind));
                    dependents[target].push((slot, kind));
                }
            }
        }

        Self {
            resources,
            dependencies,
            dependents,
        }
    }

    /// Number of resources in the graph.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the graph has no resources.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Get all resources that transitively depend on `slot`.
    ///
    /// Walks dependents breadth-first. Resources whose URN is in `ignore` are
    /// neither returned nor traversed through. With `include_children` false,
    /// parent/child edges are not followed. The resource itself is never
    /// part of the result.
    ///
    /// Returns slots in snapshot order.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range for the resource list.
    ///
    /// # Example
    ///
    /// ```
    /// use std::collections::HashSet;
    /// use stackstate::core::graph::DependencyGraph;
    /// use stackstate::core::resource::ResourceState;
    /// use stackstate::core::types::Urn;
    ///
    /// let a = ResourceState::new("t:m:R", Urn::parse("urn:pulumi:s::p::t:m:R::a").unwrap(), true);
    /// let mut b = ResourceState::new("t:m:R", Urn::parse("urn:pulumi:s::p::t:m:R::b").unwrap(), true);
    /// b.dependencies = vec![a.urn.clone()];
    /// let resources = vec![a, b];
    ///
    /// let graph = DependencyGraph::new(&resources);
    /// assert_eq!(graph.depending_on(0, &HashSet::new(), true), vec![1]);
    /// assert!(graph.depending_on(1, &HashSet::new(), true).is_empty());
    /// ```
    pub fn depending_on(
        &self,
        slot: usize,
        ignore: &HashSet<Urn>,
        include_children: bool,
    ) -> Vec<usize> {
        let mut visited = HashSet::from([slot]);
        let mut queue = VecDeque::from([slot]);
        let mut result = Vec::new();

        while let Some(current) = queue.pop_front() {
            for &(dependent, kind) in &self.dependents[current] {
                if kind == DependencyKind::Parent && !include_children {
                    continue;
                }
                if ignore.contains(&self.resources[dependent].urn) {
                    continue;
                }
                if visited.insert(dependent) {
                    result.push(dependent);
                    queue.push_back(dependent);
                }
            }
        }

        result.sort_unstable();
        result
    }

    /// Get the direct dependencies of `slot`, of every edge kind.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range for the resource list.
    pub fn dependencies_of(&self, slot: usize) -> Vec<usize> {
        let mut deps: Vec<usize> = self.dependencies[slot].iter().map(|&(s, _)| s).collect();
        deps.sort_unstable();
        deps.dedup();
        deps
    }

    /// Get everything `slot` depends on, directly or indirectly.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range for the resource list.
    pub fn transitive_dependencies_of(&self, slot: usize) -> Vec<usize> {
        let mut visited = HashSet::from([slot]);
        let mut queue = VecDeque::from([slot]);
        let mut result = Vec::new();

        while let Some(current) = queue.pop_front() {
            for &(dependency, _) in &self.dependencies[current] {
                if visited.insert(dependency) {
                    result.push(dependency);
                    queue.push_back(dependency);
                }
            }
        }

        result.sort_unstable();
        result
    }

    /// Get the direct children of `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range for the resource list.
    pub fn children_of(&self, slot: usize) -> Vec<usize> {
        let mut children: Vec<usize> = self.dependents[slot]
            .iter()
            .filter(|(_, kind)| *kind == DependencyKind::Parent)
            .map(|&(s, _)| s)
            .collect();
        children.sort_unstable();
        children.dedup();
        children
    }

    /// Compute an order in which every resource follows its dependencies.
    ///
    /// Among resources that are ready at the same time, the one with the
    /// lower slot comes first, so an already-valid order is preserved.
    ///
    /// # Errors
    ///
    /// Returns [`CycleError`] if some resources can never become ready.
    pub fn topological_order(&self) -> Result<Vec<usize>, CycleError> {
        let unique_deps: Vec<Vec<usize>> = (0..self.len())
            .map(|slot| self.dependencies_of(slot))
            .collect();

        let mut pending: Vec<usize> = unique_deps.iter().map(Vec::len).collect();
        let mut unblocks: Vec<Vec<usize>> = vec![Vec::new(); self.len()];
        for (slot, deps) in unique_deps.iter().enumerate() {
            for &dep in deps {
                unblocks[dep].push(slot);
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = pending
            .iter()
            .enumerate()
            .filter(|(_, &count)| count == 0)
            .map(|(slot, _)| Reverse(slot))
            .collect();

        let mut order = Vec::with_capacity(self.len());
        while let Some(Reverse(slot)) = ready.pop() {
            order.push(slot);
            for &next in &unblocks[slot] {
                pending[next] -= 1;
                if pending[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if order.len() < self.len() {
            let on_cycle = Self::cycle_member(&unique_deps, &pending);
            return Err(CycleError {
                urn: self.resources[on_cycle].urn.clone(),
            });
        }
        Ok(order)
    }

    /// Find a slot that lies on a cycle, given the counts left over from an
    /// incomplete topological sort.
    ///
    /// A blocked slot always has a blocked dependency, so following blocked
    /// dependencies from any blocked slot must revisit a slot, and the first
    /// revisited slot is on a cycle.
    fn cycle_member(unique_deps: &[Vec<usize>], pending: &[usize]) -> usize {
        let blocked = |slot: usize| pending[slot] > 0;
        let Some(mut current) = (0..pending.len()).find(|&slot| blocked(slot)) else {
            return 0;
        };

        let mut seen = HashSet::new();
        while seen.insert(current) {
            match unique_deps[current].iter().copied().find(|&dep| blocked(dep)) {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }
}
