//! Configuration management for Warden.
//!
//! Handles loading configuration from TOML files and environment variables.
//! The database path and the execution bounds are the only knobs; the bounds
//! can be raised or lowered but never disabled.

use crate::error::{Result, WardenError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for Warden.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Path to the SQLite database file.
    pub database: Option<PathBuf>,

    /// Execution bounds for the guarded executor.
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Execution bounds configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Hard cap on rows returned from a single execution.
    #[serde(default = "default_row_limit")]
    pub row_limit: usize,

    /// Bound on lock waits plus statement runtime, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_row_limit() -> usize {
    1000
}

fn default_timeout_secs() -> u64 {
    5
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            row_limit: default_row_limit(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LimitsConfig {
    /// Returns the timeout as a Duration, clamped to at least one second.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("db-warden")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file is not an error; it yields the defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| WardenError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            WardenError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Applies environment variables as defaults for unset fields.
    ///
    /// `DATABASE_PATH` names the SQLite file, matching how the surrounding
    /// service is deployed.
    pub fn apply_env_defaults(&mut self) {
        if self.database.is_none() {
            self.database = std::env::var("DATABASE_PATH").ok().map(PathBuf::from);
        }
    }

    /// Returns the configured database path, or a config error if none is set.
    pub fn database_path(&self) -> Result<PathBuf> {
        self.database.clone().ok_or_else(|| {
            WardenError::config(
                "no database configured (use --database, a config file, or DATABASE_PATH)",
            )
        })
    }
}
