//! Error types for Warden.
//!
//! Defines the main error enum used throughout the crate. Policy rejections
//! are not errors: they are ordinary [`crate::safety::PolicyDecision`] values.
//! The variants here cover failures at or below the storage boundary.

use thiserror::Error;

/// Main error type for Warden operations.
#[derive(Error, Debug)]
pub enum WardenError {
    /// Database connection errors (file missing, not openable read-only, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors reported by the engine (syntax, missing column, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// Statement ran past the configured bound, or lock acquisition did.
    #[error("Execution timed out: {0}")]
    Timeout(String),

    /// Configuration errors (invalid config file, missing database path, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors (unexpected states, bugs).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WardenError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a timeout error with the given message.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Timeout(_) => "Timeout",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns true if the caller may reasonably retry after this error.
    ///
    /// Timeouts should not be retried without backoff; connection failures
    /// are retryable once the storage is reachable again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}

/// Result type alias using WardenError.
pub type Result<T> = std::result::Result<T, WardenError>;
