//! Database abstraction layer for Warden.
//!
//! Provides a trait-based interface for the read-only storage operations the
//! Gate needs: listing user tables for the allowlist and running bounded
//! queries. A mock implementation backs unit tests.

mod mock;
mod sqlite;
mod types;

pub use mock::MockDatabaseClient;
pub use sqlite::SqliteClient;
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Creates a read-only database client for the given SQLite file.
///
/// This is the central factory function for storage access. The returned
/// client refuses writes at the engine level, independent of any
/// application-side validation.
pub async fn connect(path: &Path) -> Result<Box<dyn DatabaseClient>> {
    let client = SqliteClient::open_read_only(path).await?;
    Ok(Box::new(client))
}

/// Trait defining the interface the Gate requires from storage.
///
/// All operations are async and return Results with WardenError.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Lists user-visible table names, excluding engine-internal tables.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Executes a SQL statement, returning at most `max_rows` rows.
    ///
    /// The call must fail with [`crate::error::WardenError::Timeout`] rather
    /// than block past `timeout`, whether the time goes to lock waits or to
    /// statement runtime.
    async fn execute_query(
        &self,
        sql: &str,
        max_rows: usize,
        timeout: Duration,
    ) -> Result<QueryResult>;

    /// Closes the database connection.
    async fn close(&self) -> Result<()>;
}
