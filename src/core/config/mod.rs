//! core::config
//!
//! Configuration schema and loading.
//!
//! # Locations
//!
//! Searched in order, first hit wins:
//! 1. `$STACKSTATE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/stackstate/config.toml`
//! 3. `~/.stackstate/config.toml` (canonical write location)
//!
//! A missing file is not an error; defaults apply.
//!
//! # Example
//!
//! ```no_run
//! use stackstate::core::config::Config;
//!
//! let config = Config::load().unwrap();
//! let options = config.checkpoint_options();
//! println!("pretty: {}", options.pretty);
//! ```

pub mod schema;

pub use schema::{CheckpointSettings, StateConfig};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::stack::CheckpointOptions;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub settings: StateConfig,
    /// Path the settings were loaded from, if any
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed
    /// or validated.
    pub fn load() -> Result<Self, ConfigError> {
        let Some(path) = Self::find() else {
            return Ok(Self::default());
        };
        Self::load_from(&path)
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let settings: StateConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        settings.validate()?;

        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(Self {
            settings,
            path: Some(path.to_path_buf()),
        })
    }

    fn find() -> Option<PathBuf> {
        // 1. Check $STACKSTATE_CONFIG
        if let Ok(path) = std::env::var("STACKSTATE_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check $XDG_CONFIG_HOME/stackstate/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("stackstate/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. Check ~/.stackstate/config.toml
        match Self::config_path() {
            Ok(path) => Some(path).filter(|path| path.exists()),
            Err(err) => {
                tracing::debug!(error = %err, "skipping home config");
                None
            }
        }
    }

    /// The canonical path for the config file: `~/.stackstate/config.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHomeDir`] if the home directory is unknown.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".stackstate/config.toml"))
    }

    /// Write settings atomically to `path`.
    ///
    /// Creates parent directories if needed. Writes to a temp file, then
    /// renames.
    pub fn write_to(path: &Path, settings: &StateConfig) -> Result<(), ConfigError> {
        settings.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents = toml::to_string_pretty(settings)
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let write_error = |e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        };
        let mut file = fs::File::create(&temp_path).map_err(write_error)?;
        file.write_all(contents.as_bytes()).map_err(write_error)?;
        file.sync_all().map_err(write_error)?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    // =========================================================================
    // Accessors with defaults
    // =========================================================================

    fn checkpoint(&self) -> Option<&CheckpointSettings> {
        self.settings.checkpoint.as_ref()
    }

    /// Whether integrity checking is disabled when loading.
    ///
    /// Defaults to `false`.
    pub fn disable_integrity_checking(&self) -> bool {
        self.checkpoint()
            .and_then(|c| c.disable_integrity_checking)
            .unwrap_or(false)
    }

    /// Whether written checkpoints are indented.
    ///
    /// Defaults to `true`.
    pub fn pretty(&self) -> bool {
        self.checkpoint().and_then(|c| c.pretty).unwrap_or(true)
    }

    /// Engine version to stamp into written manifests, if configured.
    pub fn engine_version(&self) -> Option<&str> {
        self.checkpoint().and_then(|c| c.engine_version.as_deref())
    }

    /// Options for [`crate::stack`] reads and writes.
    pub fn checkpoint_options(&self) -> CheckpointOptions {
        CheckpointOptions {
            disable_integrity_checking: self.disable_integrity_checking(),
            pretty: self.pretty(),
            engine_version: self.engine_version().map(str::to_string),
        }
    }

    /// Path the configuration was loaded from.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
