//! Command-line argument parsing for Warden.
//!
//! Uses clap to parse CLI arguments. The binary is a thin front end over the
//! Gate: one statement in, one decision (and result) out.

use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// A safety gate for LLM-generated SQL.
#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// SQL statement to validate and execute (read from stdin if omitted)
    #[arg(value_name = "SQL")]
    pub sql: Option<String>,

    /// Path to the SQLite database file
    #[arg(short = 'd', long, value_name = "PATH", env = "DATABASE_PATH")]
    pub database: Option<PathBuf>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Maximum number of rows returned
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Execution timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Validate only; do not execute
    #[arg(long)]
    pub check: bool,

    /// Print output as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Merges CLI overrides into a loaded configuration.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(database) = &self.database {
            config.database = Some(database.clone());
        }
        if let Some(limit) = self.limit {
            config.limits.row_limit = limit;
        }
        if let Some(secs) = self.timeout {
            config.limits.timeout_secs = secs;
        }
    }
}
