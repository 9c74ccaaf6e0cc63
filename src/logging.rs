//! Logging configuration for Warden.
//!
//! Logs go to stderr: stdout carries query results (possibly JSON for a
//! consuming process), so diagnostics must never mix into it.

use tracing_subscriber::EnvFilter;

/// Initializes tracing with an env-filtered stderr subscriber.
///
/// `RUST_LOG` controls verbosity; the default level is `info`.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
