//! migrate
//!
//! The upgrade ladder between adjacent wire versions.
//!
//! # Rules
//!
//! - Each `up_to_*_vN` takes version N-1 and returns version N
//! - Total and pure: no errors, no I/O, inputs are consumed
//! - Additive: fields new in version N get fixed defaults, and nothing the
//!   older version carried is dropped except fields the newer version
//!   explicitly retired (`ResourceV1::defaults`)
//! - Checkpoint migration folds over deployment migration, which folds over
//!   resource and operation migration
//!
//! [`down_to_deployment_v2`] is the only step that goes the other way. It
//! exists for talking to older readers and is lossy.

use std::collections::BTreeMap;

use crate::apitype::{
    CheckpointV1, CheckpointV2, CheckpointV3, DeploymentV1, DeploymentV2, DeploymentV3,
    OperationV1, OperationV2, ResourceV1, ResourceV2, ResourceV3,
};

/// `ResourceV1 -> ResourceV2`.
///
/// Drops the unused `defaults` bag. `external` is false: a V1 resource was
/// always owned by the deployment. `provider` is empty: V1 had no
/// first-class providers.
pub fn up_to_resource_v2(v1: ResourceV1) -> ResourceV2 {
    ResourceV2 {
        urn: v1.urn,
        custom: v1.custom,
        delete: v1.delete,
        id: v1.id,
        type_token: v1.type_token,
        inputs: v1.inputs,
        outputs: v1.outputs,
        parent: v1.parent,
        protect: v1.protect,
        external: false,
        dependencies: v1.dependencies,
        init_errors: v1.init_errors,
        provider: String::new(),
    }
}

/// `ResourceV2 -> ResourceV3`.
///
/// Property dependencies are unknown for older resources and start empty.
pub fn up_to_resource_v3(v2: ResourceV2) -> ResourceV3 {
    ResourceV3 {
        urn: v2.urn,
        custom: v2.custom,
        delete: v2.delete,
        id: v2.id,
        type_token: v2.type_token,
        inputs: v2.inputs,
        outputs: v2.outputs,
        parent: v2.parent,
        protect: v2.protect,
        external: v2.external,
        dependencies: v2.dependencies,
        init_errors: v2.init_errors,
        provider: v2.provider,
        property_dependencies: BTreeMap::new(),
        pending_replacement: false,
        additional_secret_outputs: Vec::new(),
        aliases: Vec::new(),
        custom_timeouts: None,
    }
}

/// `OperationV1 -> OperationV2`.
pub fn up_to_operation_v2(v1: OperationV1) -> OperationV2 {
    OperationV2 {
        resource: up_to_resource_v3(v1.resource),
        op_type: v1.op_type,
    }
}

/// `DeploymentV1 -> DeploymentV2`. There were no pending operations in V1.
pub fn up_to_deployment_v2(v1: DeploymentV1) -> DeploymentV2 {
    DeploymentV2 {
        manifest: v1.manifest,
        resources: v1.resources.into_iter().map(up_to_resource_v2).collect(),
        pending_operations: Vec::new(),
    }
}

/// `DeploymentV2 -> DeploymentV3`. No secrets provider is recorded.
pub fn up_to_deployment_v3(v2: DeploymentV2) -> DeploymentV3 {
    DeploymentV3 {
        manifest: v2.manifest,
        secrets_providers: None,
        resources: v2.resources.into_iter().map(up_to_resource_v3).collect(),
        pending_operations: v2
            .pending_operations
            .into_iter()
            .map(up_to_operation_v2)
            .collect(),
    }
}

/// `CheckpointV1 -> CheckpointV2`.
pub fn up_to_checkpoint_v2(v1: CheckpointV1) -> CheckpointV2 {
    CheckpointV2 {
        stack: v1.stack,
        config: v1.config,
        latest: v1.latest.map(up_to_deployment_v2),
    }
}

/// `CheckpointV2 -> CheckpointV3`.
pub fn up_to_checkpoint_v3(v2: CheckpointV2) -> CheckpointV3 {
    CheckpointV3 {
        stack: v2.stack,
        config: v2.config,
        latest: v2.latest.map(up_to_deployment_v3),
    }
}

fn down_to_resource_v2(v3: ResourceV3) -> ResourceV2 {
    ResourceV2 {
        urn: v3.urn,
        custom: v3.custom,
        delete: v3.delete,
        id: v3.id,
        type_token: v3.type_token,
        inputs: v3.inputs,
        outputs: v3.outputs,
        parent: v3.parent,
        protect: v3.protect,
        external: v3.external,
        dependencies: v3.dependencies,
        init_errors: v3.init_errors,
        provider: v3.provider,
    }
}

/// `DeploymentV3 -> DeploymentV2`, for readers that predate V3.
///
/// **Lossy.** Discards the secrets provider and every resource's property
/// dependencies, pending-replacement flag, aliases, custom timeouts and
/// additional secret outputs. Upgrading the result again yields the V3
/// defaults for those fields, not the original values.
pub fn down_to_deployment_v2(v3: DeploymentV3) -> DeploymentV2 {
    DeploymentV2 {
        manifest: v3.manifest,
        resources: v3.resources.into_iter().map(down_to_resource_v2).collect(),
        pending_operations: v3
            .pending_operations
            .into_iter()
            .map(|op| OperationV1 {
                resource: down_to_resource_v2(op.resource),
                op_type: op.op_type,
            })
            .collect(),
    }
}
