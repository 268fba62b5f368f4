//! apitype::deployment
//!
//! Deployment wire types: a manifest plus the resources and in-flight
//! operations it describes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::null_as_default;
use super::resource::{ResourceV1, ResourceV2, ResourceV3};
use crate::core::resource::OperationType;

/// Version info for a plugin that contributed to a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfoV1 {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub version: String,
}

/// Deployment metadata, shared by every deployment version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestV1 {
    pub time: DateTime<Utc>,
    pub magic: String,
    pub version: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub plugins: Vec<PluginInfoV1>,
}

/// An in-flight operation, over `ResourceV2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationV1 {
    pub resource: ResourceV2,
    #[serde(rename = "type")]
    pub op_type: OperationType,
}

/// An in-flight operation, over `ResourceV3`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationV2 {
    pub resource: ResourceV3,
    #[serde(rename = "type")]
    pub op_type: OperationType,
}

/// The secrets provider a deployment was encrypted with. `state` is opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretsProvidersV1 {
    #[serde(rename = "type")]
    pub provider_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentV1 {
    pub manifest: ManifestV1,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub resources: Vec<ResourceV1>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentV2 {
    pub manifest: ManifestV1,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub resources: Vec<ResourceV2>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub pending_operations: Vec<OperationV1>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentV3 {
    pub manifest: ManifestV1,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secrets_providers: Option<SecretsProvidersV1>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub resources: Vec<ResourceV3>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub pending_operations: Vec<OperationV2>,
}

/// A deployment of any version, carried opaquely beside its version.
///
/// Lets a reader hand a newer deployment back unchanged instead of losing
/// fields it does not understand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UntypedDeployment {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub version: i64,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub deployment: serde_json::Value,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_time_is_rfc3339() {
        let json = r#"{"time": "2018-06-01T12:00:00Z", "magic": "", "version": "1.0.0"}"#;
        let manifest: ManifestV1 = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.time.to_rfc3339(), "2018-06-01T12:00:00+00:00");
        assert!(manifest.plugins.is_empty());
    }

    #[test]
    fn operation_type_field_name() {
        let json = r#"{
            "resource": {"urn": "urn:pulumi:s::p::t:m:R::a", "custom": true, "type": "t:m:R"},
            "type": "deleting"
        }"#;
        let op: OperationV2 = serde_json::from_str(json).unwrap();
        assert_eq!(op.op_type, OperationType::Deleting);
    }

    #[test]
    fn v3_omits_empty_sections() {
        let json = r#"{"manifest": {"time": "2018-06-01T12:00:00Z", "magic": "", "version": ""}}"#;
        let deployment: DeploymentV3 = serde_json::from_str(json).unwrap();
        let value = serde_json::to_value(&deployment).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert!(object.contains_key("manifest"));
    }

    #[test]
    fn untyped_deployment_keeps_payload_verbatim() {
        let json = r#"{"version": 9, "deployment": {"future": [1, 2, 3]}}"#;
        let untyped: UntypedDeployment = serde_json::from_str(json).unwrap();
        assert_eq!(untyped.version, 9);
        assert_eq!(untyped.deployment["future"][2], 3);
        let back = serde_json::to_value(&untyped).unwrap();
        assert_eq!(back, serde_json::from_str::<serde_json::Value>(json).unwrap());
    }
}
