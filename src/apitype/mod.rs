//! apitype
//!
//! Frozen wire types for persisted state.
//!
//! # Versioning Rules
//!
//! Every type here is serialized across a separately versioned boundary
//! (state files, service APIs). Once published a type never changes:
//! - Nothing is taken away
//! - Nothing optional becomes required
//! - Anything new is optional, in a new `Vn` type
//!
//! Moving between versions is the job of [`crate::migrate`]; converting to
//! and from the in-memory model is the job of [`crate::stack`].
//!
//! Reference fields (URNs, provider references) are plain strings here. They
//! are validated when converted into [`crate::core`] types, never on decode,
//! so that a document can always be read and migrated before it is judged.

pub mod checkpoint;
pub mod deployment;
pub mod resource;

pub use checkpoint::{CheckpointV1, CheckpointV2, CheckpointV3, VersionedCheckpoint};
pub use deployment::{
    DeploymentV1, DeploymentV2, DeploymentV3, ManifestV1, OperationV1, OperationV2, PluginInfoV1,
    SecretsProvidersV1, UntypedDeployment,
};
pub use resource::{ResourceV1, ResourceV2, ResourceV3};

use serde::{Deserialize, Deserializer};

/// The newest deployment schema this crate understands.
///
/// Documents with a newer version are rejected, never interpreted.
pub const DEPLOYMENT_SCHEMA_VERSION_CURRENT: i64 = 3;

/// Deserialize `null` as the type's default.
///
/// Older writers emitted `null` for empty lists.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
