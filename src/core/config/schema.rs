//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Validation
//!
//! Values are validated after parsing; unknown keys are rejected during
//! parsing.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Top-level configuration file.
///
/// # Example
///
/// ```toml
/// [checkpoint]
/// disable_integrity_checking = false
/// pretty = true
/// engine_version = "3.0.0"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StateConfig {
    /// Checkpoint reading and writing
    pub checkpoint: Option<CheckpointSettings>,
}

impl StateConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(checkpoint) = &self.checkpoint {
            checkpoint.validate()?;
        }
        Ok(())
    }
}

/// `[checkpoint]` settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CheckpointSettings {
    /// Skip integrity verification when loading (default: false)
    pub disable_integrity_checking: Option<bool>,

    /// Indent written checkpoints (default: true)
    pub pretty: Option<bool>,

    /// Engine version stamped into written manifests
    pub engine_version: Option<String>,
}

impl CheckpointSettings {
    /// Validate the checkpoint settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(version) = &self.engine_version {
            if version.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "engine_version cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
