//! apitype::checkpoint
//!
//! Checkpoint wire types: stack identity, configuration and the latest
//! deployment, plus the versioned envelope they are stored in.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::deployment::{DeploymentV1, DeploymentV2, DeploymentV3};

/// Stack configuration, carried opaquely.
pub type ConfigMap = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointV1 {
    pub stack: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: ConfigMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<DeploymentV1>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointV2 {
    pub stack: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: ConfigMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<DeploymentV2>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointV3 {
    pub stack: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: ConfigMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<DeploymentV3>,
}

/// A version number beside an opaque checkpoint document.
///
/// `version` says which `CheckpointVn` the payload decodes into. Version 0
/// (or a missing `version`) marks a legacy document written before the
/// envelope existed; see [`crate::stack::checkpoint_to_latest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedCheckpoint {
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub checkpoint: serde_json::Value,
}
