//! Guarded query execution for Warden.
//!
//! This module isolates the execution half of the Gate: row-cap injection,
//! timeouts, and result shaping over the read-only storage client.

pub mod executor;

pub use executor::{GuardedExecutor, DEFAULT_ROW_LIMIT, DEFAULT_TIMEOUT};
