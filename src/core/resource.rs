//! core::resource
//!
//! In-memory resource state.
//!
//! A [`ResourceState`] is the engine's view of one resource instance. Its
//! references to other resources (`parent`, `dependencies`,
//! `property_dependencies`, `provider`) are textual, because they must cross
//! the serialization boundary; they are resolved through indexes rebuilt per
//! operation (see [`crate::core::graph`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::types::{is_provider_type, ProviderReference, ResourceId, TypeError, Urn};

/// An opaque property bag (inputs or outputs).
pub type PropertyMap = BTreeMap<String, serde_json::Value>;

/// The kind of edge between a resource and something it depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// The resource's `parent`.
    Parent,
    /// An entry of `dependencies`.
    Dependency,
    /// An entry of some `property_dependencies` value.
    PropertyDependency,
    /// The provider named by `provider`.
    Provider,
}

impl std::fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DependencyKind::Parent => "parent",
            DependencyKind::Dependency => "dependency",
            DependencyKind::PropertyDependency => "property dependency",
            DependencyKind::Provider => "provider",
        };
        f.write_str(s)
    }
}

/// Per-operation timeouts, in seconds. Zero means "use the provider default".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomTimeouts {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub create: f64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub update: f64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub delete: f64,
}

fn is_zero(value: &f64) -> bool {
    *value == 0.0
}

/// The state of one resource instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceState {
    /// Full type token
    pub type_token: String,
    /// The resource's URN (not unique during delete-before-replace)
    pub urn: Urn,
    /// Managed by a provider (true) or purely logical (false)
    pub custom: bool,
    /// Pending removal in the next update
    pub delete: bool,
    /// Provider-assigned ID, for custom resources
    pub id: Option<ResourceId>,
    /// Inputs supplied to the provider
    pub inputs: PropertyMap,
    /// Outputs returned by the provider
    pub outputs: PropertyMap,
    /// Parent resource, if this is a child
    pub parent: Option<Urn>,
    /// Deletion guard
    pub protect: bool,
    /// Lifecycle owned by something else
    pub external: bool,
    /// Ordered explicit dependencies
    pub dependencies: Vec<Urn>,
    /// Input property name to the resources that property depends on
    pub property_dependencies: BTreeMap<String, Vec<Urn>>,
    /// Encoded provider reference (`<urn>::<id>`), empty when none
    pub provider: String,
    /// Errors from the last create or update
    pub init_errors: Vec<String>,
    /// Deleted during delete-before-replace, not yet recreated
    pub pending_replacement: bool,
    /// Earlier URNs this resource was known by
    pub aliases: Vec<Urn>,
    pub custom_timeouts: Option<CustomTimeouts>,
    /// Outputs explicitly marked secret at creation
    pub additional_secret_outputs: Vec<String>,
}

impl ResourceState {
    /// Create a resource with the given identity and every other field empty.
    pub fn new(type_token: impl Into<String>, urn: Urn, custom: bool) -> Self {
        Self {
            type_token: type_token.into(),
            urn,
            custom,
            delete: false,
            id: None,
            inputs: PropertyMap::new(),
            outputs: PropertyMap::new(),
            parent: None,
            protect: false,
            external: false,
            dependencies: Vec::new(),
            property_dependencies: BTreeMap::new(),
            provider: String::new(),
            init_errors: Vec::new(),
            pending_replacement: false,
            aliases: Vec::new(),
            custom_timeouts: None,
            additional_secret_outputs: Vec::new(),
        }
    }

    /// Whether this resource is a first-class provider.
    pub fn is_provider(&self) -> bool {
        is_provider_type(&self.type_token)
    }

    /// Parse the `provider` field.
    ///
    /// Returns `Ok(None)` when the resource names no provider.
    pub fn provider_reference(&self) -> Result<Option<ProviderReference>, TypeError> {
        if self.provider.is_empty() {
            return Ok(None);
        }
        ProviderReference::parse(&self.provider).map(Some)
    }

    /// The reference other resources use to name this provider.
    ///
    /// Returns `None` if this is not a provider resource.
    pub fn as_provider_reference(&self) -> Option<ProviderReference> {
        if !self.is_provider() {
            return None;
        }
        let id = self.id.clone().unwrap_or_default();
        ProviderReference::new(self.urn.clone(), id).ok()
    }

    /// Every URN-keyed reference this resource makes, excluding `provider`.
    ///
    /// Order: parent, then `dependencies`, then `property_dependencies` by
    /// property name.
    pub fn urn_references(&self) -> Vec<(DependencyKind, &Urn)> {
        let mut refs = Vec::new();
        if let Some(parent) = &self.parent {
            refs.push((DependencyKind::Parent, parent));
        }
        refs.extend(
            self.dependencies
                .iter()
                .map(|urn| (DependencyKind::Dependency, urn)),
        );
        refs.extend(
            self.property_dependencies
                .values()
                .flatten()
                .map(|urn| (DependencyKind::PropertyDependency, urn)),
        );
        refs
    }
}

/// The kind of an in-flight operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Creating,
    Updating,
    Deleting,
    Reading,
}

/// An operation the engine started but had not finished when the state was
/// last written.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// The state the engine used to start the operation
    pub resource: ResourceState,
    pub op_type: OperationType,
}

impl Operation {
    pub fn new(resource: ResourceState, op_type: OperationType) -> Self {
        Self { resource, op_type }
    }
}
