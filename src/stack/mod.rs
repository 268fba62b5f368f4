//! stack
//!
//! Reading and writing persisted checkpoints.
//!
//! # Reading
//!
//! 1. Parse the [`VersionedCheckpoint`] envelope
//! 2. Dispatch on `version`, migrating older payloads up to
//!    [`CheckpointV3`] (see [`checkpoint_to_latest`])
//! 3. Convert the latest deployment into a [`Snapshot`], checking the
//!    manifest magic and, unless disabled, snapshot integrity
//!
//! # Writing
//!
//! Always at [`DEPLOYMENT_SCHEMA_VERSION_CURRENT`]. Older versions are never
//! written.
//!
//! # Example
//!
//! ```
//! use stackstate::stack::{deserialize_checkpoint, CheckpointOptions};
//!
//! let json = br#"{"version": 3, "checkpoint": {"stack": "dev"}}"#;
//! let loaded = deserialize_checkpoint(json, &CheckpointOptions::default()).unwrap();
//! assert_eq!(loaded.stack, "dev");
//! assert!(loaded.snapshot.is_none());
//! ```

pub mod deployment;

pub use deployment::{
    deserialize_deployment, deserialize_operation, deserialize_resource, serialize_deployment,
    serialize_operation, serialize_resource,
};

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use thiserror::Error;

use crate::apitype::checkpoint::ConfigMap;
use crate::apitype::{
    CheckpointV1, CheckpointV2, CheckpointV3, DeploymentV1, DeploymentV2, DeploymentV3,
    UntypedDeployment, VersionedCheckpoint, DEPLOYMENT_SCHEMA_VERSION_CURRENT,
};
use crate::core::snapshot::{Manifest, Snapshot};
use crate::core::types::{validate_qualified_name, TypeError};
use crate::core::verify::IntegrityError;
use crate::migrate;

/// Errors from checkpoint encoding and decoding.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("failed to parse checkpoint: {0}")]
    Parse(String),

    #[error(
        "unsupported checkpoint version {version}, newest supported: {}",
        DEPLOYMENT_SCHEMA_VERSION_CURRENT
    )]
    UnsupportedVersion { version: i64 },

    #[error("manifest magic does not match engine version '{version}'")]
    MagicMismatch { version: String },

    #[error("invalid value in checkpoint: {0}")]
    InvalidValue(#[from] TypeError),

    #[error("checkpoint failed integrity check: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("failed to serialize checkpoint: {0}")]
    Serialize(String),
}

/// Knobs for reading and writing checkpoints.
///
/// Usually built from configuration via
/// [`crate::core::config::Config::checkpoint_options`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointOptions {
    /// Skip [`Snapshot::verify_integrity`] when loading
    pub disable_integrity_checking: bool,
    /// Indent written JSON by four spaces
    pub pretty: bool,
    /// Restamp written manifests with this engine version
    pub engine_version: Option<String>,
}

impl Default for CheckpointOptions {
    fn default() -> Self {
        Self {
            disable_integrity_checking: false,
            pretty: true,
            engine_version: None,
        }
    }
}

/// A loaded checkpoint: stack identity, its configuration and the latest
/// snapshot, if the stack was ever deployed.
#[derive(Debug, Clone, PartialEq)]
pub struct StackCheckpoint {
    pub stack: String,
    pub config: ConfigMap,
    pub snapshot: Option<Snapshot>,
}

fn parse_error(e: serde_json::Error) -> CheckpointError {
    CheckpointError::Parse(e.to_string())
}

/// Decode checkpoint bytes of any supported version into [`CheckpointV3`].
///
/// Version 0 (or no version at all) is a legacy document written before the
/// envelope existed: the whole document is a [`CheckpointV1`].
///
/// # Errors
///
/// - [`CheckpointError::Parse`] if the bytes are not a checkpoint of the
///   declared version
/// - [`CheckpointError::UnsupportedVersion`] for a negative version or one
///   newer than [`DEPLOYMENT_SCHEMA_VERSION_CURRENT`]
pub fn checkpoint_to_latest(bytes: &[u8]) -> Result<CheckpointV3, CheckpointError> {
    let envelope: VersionedCheckpoint = serde_json::from_slice(bytes).map_err(parse_error)?;
    tracing::debug!(version = envelope.version, "decoding checkpoint");

    match envelope.version {
        0 => {
            tracing::warn!("reading legacy unversioned checkpoint");
            let v1: CheckpointV1 = serde_json::from_slice(bytes).map_err(parse_error)?;
            Ok(migrate::up_to_checkpoint_v3(migrate::up_to_checkpoint_v2(v1)))
        }
        1 => {
            let v1: CheckpointV1 =
                serde_json::from_value(envelope.checkpoint).map_err(parse_error)?;
            Ok(migrate::up_to_checkpoint_v3(migrate::up_to_checkpoint_v2(v1)))
        }
        2 => {
            let v2: CheckpointV2 =
                serde_json::from_value(envelope.checkpoint).map_err(parse_error)?;
            Ok(migrate::up_to_checkpoint_v3(v2))
        }
        3 => serde_json::from_value(envelope.checkpoint).map_err(parse_error),
        version => Err(CheckpointError::UnsupportedVersion { version }),
    }
}

/// Decode an [`UntypedDeployment`] of any supported version into
/// [`DeploymentV3`].
///
/// # Errors
///
/// - [`CheckpointError::Parse`] if the payload does not match its version
/// - [`CheckpointError::UnsupportedVersion`] for any version outside `1..=3`
pub fn deployment_to_latest(untyped: UntypedDeployment) -> Result<DeploymentV3, CheckpointError> {
    tracing::debug!(version = untyped.version, "decoding deployment");
    match untyped.version {
        1 => {
            let v1: DeploymentV1 =
                serde_json::from_value(untyped.deployment).map_err(parse_error)?;
            Ok(migrate::up_to_deployment_v3(migrate::up_to_deployment_v2(v1)))
        }
        2 => {
            let v2: DeploymentV2 =
                serde_json::from_value(untyped.deployment).map_err(parse_error)?;
            Ok(migrate::up_to_deployment_v3(v2))
        }
        3 => serde_json::from_value(untyped.deployment).map_err(parse_error),
        version => Err(CheckpointError::UnsupportedVersion { version }),
    }
}

/// Decode checkpoint bytes all the way into a [`StackCheckpoint`].
pub fn deserialize_checkpoint(
    bytes: &[u8],
    options: &CheckpointOptions,
) -> Result<StackCheckpoint, CheckpointError> {
    let checkpoint = checkpoint_to_latest(bytes)?;
    let snapshot = checkpoint
        .latest
        .map(|latest| deserialize_deployment(latest, options))
        .transpose()?;
    Ok(StackCheckpoint {
        stack: checkpoint.stack,
        config: checkpoint.config,
        snapshot,
    })
}

/// Build the envelope for a checkpoint at the current version.
///
/// With `options.engine_version` set, the written manifest is restamped:
/// new version, current time, matching magic.
///
/// # Errors
///
/// - [`CheckpointError::InvalidValue`] if `stack` is not a valid, possibly
///   `/`-qualified, name
/// - [`CheckpointError::Serialize`] if the payload cannot be encoded
pub fn serialize_checkpoint(
    stack: &str,
    config: ConfigMap,
    snapshot: Option<&Snapshot>,
    options: &CheckpointOptions,
) -> Result<VersionedCheckpoint, CheckpointError> {
    validate_qualified_name("stack", stack)?;

    let latest = snapshot.map(|snap| {
        let mut deployment = serialize_deployment(snap);
        if let Some(version) = &options.engine_version {
            let manifest = Manifest::new(version.clone());
            deployment.manifest.time = manifest.time;
            deployment.manifest.magic = manifest.magic;
            deployment.manifest.version = manifest.version;
        }
        deployment
    });
    let checkpoint = CheckpointV3 {
        stack: stack.to_string(),
        config,
        latest,
    };

    Ok(VersionedCheckpoint {
        version: DEPLOYMENT_SCHEMA_VERSION_CURRENT,
        checkpoint: serde_json::to_value(&checkpoint)
            .map_err(|e| CheckpointError::Serialize(e.to_string()))?,
    })
}

/// Encode a value as JSON, indented by four spaces when `pretty` is set.
pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<Vec<u8>, CheckpointError> {
    let serialize_error = |e: serde_json::Error| CheckpointError::Serialize(e.to_string());
    if !pretty {
        return serde_json::to_vec(value).map_err(serialize_error);
    }

    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer).map_err(serialize_error)?;
    Ok(out)
}

/// Read and decode a checkpoint file.
pub fn read_checkpoint_file(
    path: &Path,
    options: &CheckpointOptions,
) -> anyhow::Result<StackCheckpoint> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read checkpoint '{}'", path.display()))?;
    deserialize_checkpoint(&bytes, options)
        .with_context(|| format!("failed to load checkpoint '{}'", path.display()))
}

/// Encode and write a checkpoint file at the current version.
///
/// Writes to a temporary file beside `path` and renames it into place, so a
/// reader never sees a partial checkpoint. The temporary file is removed if
/// any step fails.
pub fn write_checkpoint_file(
    path: &Path,
    checkpoint: &StackCheckpoint,
    options: &CheckpointOptions,
) -> anyhow::Result<()> {
    let envelope = serialize_checkpoint(
        &checkpoint.stack,
        checkpoint.config.clone(),
        checkpoint.snapshot.as_ref(),
        options,
    )?;
    let bytes = to_json(&envelope, options.pretty)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create '{}'", parent.display()))?;
    }
    let temp_path = path.with_extension("json.tmp");
    let written = write_then_rename(&temp_path, path, &bytes);
    if written.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    written?;

    tracing::debug!(path = %path.display(), stack = %checkpoint.stack, "wrote checkpoint");
    Ok(())
}

fn write_then_rename(temp_path: &Path, path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let mut file = fs::File::create(temp_path)
        .with_context(|| format!("failed to create '{}'", temp_path.display()))?;
    file.write_all(bytes)
        .and_then(|()| file.sync_all())
        .with_context(|| format!("failed to write '{}'", temp_path.display()))?;
    fs::rename(temp_path, path)
        .with_context(|| format!("failed to move checkpoint into '{}'", path.display()))
}
