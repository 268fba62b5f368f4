//! stack::deployment
//!
//! Conversion between the newest wire deployment and the in-memory
//! [`Snapshot`].

use crate::apitype::{
    DeploymentV3, ManifestV1, OperationV2, PluginInfoV1, ResourceV3, SecretsProvidersV1,
};
use crate::core::resource::{Operation, ResourceState};
use crate::core::snapshot::{Manifest, PluginInfo, SecretsProviders, Snapshot};
use crate::core::types::{ResourceId, TypeError, Urn};

use super::{CheckpointError, CheckpointOptions};

/// Convert a snapshot into the newest deployment wire type.
///
/// Never fails: every in-memory value has a wire representation.
pub fn serialize_deployment(snapshot: &Snapshot) -> DeploymentV3 {
    DeploymentV3 {
        manifest: serialize_manifest(&snapshot.manifest),
        secrets_providers: snapshot
            .secrets_providers
            .as_ref()
            .map(|sp| SecretsProvidersV1 {
                provider_type: sp.provider_type.clone(),
                state: sp.state.clone(),
            }),
        resources: snapshot.resources.iter().map(serialize_resource).collect(),
        pending_operations: snapshot
            .pending_operations
            .iter()
            .map(serialize_operation)
            .collect(),
    }
}

/// Convert the newest deployment wire type into a snapshot.
///
/// # Errors
///
/// - [`CheckpointError::MagicMismatch`] if the manifest carries a magic
///   value that does not belong to its version
/// - [`CheckpointError::InvalidValue`] if some URN does not parse
/// - [`CheckpointError::Integrity`] if the result fails
///   [`Snapshot::verify_integrity`], unless
///   `options.disable_integrity_checking` is set
pub fn deserialize_deployment(
    deployment: DeploymentV3,
    options: &CheckpointOptions,
) -> Result<Snapshot, CheckpointError> {
    let manifest = deserialize_manifest(deployment.manifest);
    if !manifest.magic_matches() {
        return Err(CheckpointError::MagicMismatch {
            version: manifest.version,
        });
    }

    let resources = deployment
        .resources
        .into_iter()
        .map(deserialize_resource)
        .collect::<Result<Vec<_>, _>>()?;
    let pending_operations = deployment
        .pending_operations
        .into_iter()
        .map(deserialize_operation)
        .collect::<Result<Vec<_>, _>>()?;

    let mut snapshot = Snapshot::new(manifest, resources, pending_operations);
    snapshot.secrets_providers = deployment.secrets_providers.map(|sp| SecretsProviders {
        provider_type: sp.provider_type,
        state: sp.state,
    });

    if options.disable_integrity_checking {
        tracing::warn!("snapshot integrity checking is disabled");
    } else {
        snapshot.verify_integrity()?;
    }
    Ok(snapshot)
}

fn serialize_manifest(manifest: &Manifest) -> ManifestV1 {
    ManifestV1 {
        time: manifest.time,
        magic: manifest.magic.clone(),
        version: manifest.version.clone(),
        plugins: manifest
            .plugins
            .iter()
            .map(|p| PluginInfoV1 {
                name: p.name.clone(),
                path: p.path.clone(),
                kind: p.kind.clone(),
                version: p.version.clone(),
            })
            .collect(),
    }
}

fn deserialize_manifest(manifest: ManifestV1) -> Manifest {
    Manifest {
        time: manifest.time,
        magic: manifest.magic,
        version: manifest.version,
        plugins: manifest
            .plugins
            .into_iter()
            .map(|p| PluginInfo {
                name: p.name,
                path: p.path,
                kind: p.kind,
                version: p.version,
            })
            .collect(),
    }
}

fn urn_strings(urns: &[Urn]) -> Vec<String> {
    urns.iter().map(|u| u.to_string()).collect()
}

fn parse_urns(urns: Vec<String>) -> Result<Vec<Urn>, TypeError> {
    urns.into_iter().map(Urn::parse).collect()
}

/// Convert one resource into its wire form.
pub fn serialize_resource(res: &ResourceState) -> ResourceV3 {
    ResourceV3 {
        urn: res.urn.to_string(),
        custom: res.custom,
        delete: res.delete,
        id: res
            .id
            .as_ref()
            .map(|id| id.as_str().to_string())
            .unwrap_or_default(),
        type_token: res.type_token.clone(),
        inputs: res.inputs.clone(),
        outputs: res.outputs.clone(),
        parent: res
            .parent
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_default(),
        protect: res.protect,
        external: res.external,
        dependencies: urn_strings(&res.dependencies),
        init_errors: res.init_errors.clone(),
        provider: res.provider.clone(),
        property_dependencies: res
            .property_dependencies
            .iter()
            .map(|(key, deps)| (key.clone(), urn_strings(deps)))
            .collect(),
        pending_replacement: res.pending_replacement,
        additional_secret_outputs: res.additional_secret_outputs.clone(),
        aliases: urn_strings(&res.aliases),
        custom_timeouts: res.custom_timeouts.clone(),
    }
}

/// Convert one wire resource into resource state.
///
/// An empty `id` or `parent` means none. `provider` is kept verbatim; it is
/// checked by integrity verification.
///
/// # Errors
///
/// Returns `TypeError::InvalidUrn` if any URN-bearing field does not parse.
pub fn deserialize_resource(res: ResourceV3) -> Result<ResourceState, TypeError> {
    let urn = Urn::parse(res.urn)?;
    let parent = if res.parent.is_empty() {
        None
    } else {
        Some(Urn::parse(res.parent)?)
    };
    let property_dependencies = res
        .property_dependencies
        .into_iter()
        .map(|(key, deps)| Ok((key, parse_urns(deps)?)))
        .collect::<Result<_, TypeError>>()?;

    Ok(ResourceState {
        type_token: res.type_token,
        urn,
        custom: res.custom,
        delete: res.delete,
        id: (!res.id.is_empty()).then(|| ResourceId::new(res.id)),
        inputs: res.inputs,
        outputs: res.outputs,
        parent,
        protect: res.protect,
        external: res.external,
        dependencies: parse_urns(res.dependencies)?,
        property_dependencies,
        provider: res.provider,
        init_errors: res.init_errors,
        pending_replacement: res.pending_replacement,
        aliases: parse_urns(res.aliases)?,
        custom_timeouts: res.custom_timeouts,
        additional_secret_outputs: res.additional_secret_outputs,
    })
}

/// Convert one pending operation into its wire form.
pub fn serialize_operation(op: &Operation) -> OperationV2 {
    OperationV2 {
        resource: serialize_resource(&op.resource),
        op_type: op.op_type,
    }
}

/// Convert one wire operation into an in-memory operation.
pub fn deserialize_operation(op: OperationV2) -> Result<Operation, TypeError> {
    Ok(Operation::new(deserialize_resource(op.resource)?, op.op_type))
}
