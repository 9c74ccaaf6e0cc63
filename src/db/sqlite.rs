//! SQLite database client implementation.
//!
//! Provides the `SqliteClient` struct that implements the `DatabaseClient`
//! trait using sqlx. The database is always opened read-only: the engine
//! itself refuses write statements, independent of any validation done above
//! this layer.

use crate::db::{ColumnInfo, DatabaseClient, QueryResult, Row, Value};
use crate::error::{Result, WardenError};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as SqlxColumn, Executor, Row as SqlxRow, TypeInfo};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Maximum pooled connections. Gate queries are short-lived; a small pool
/// keeps lock pressure on the database file low.
const MAX_CONNECTIONS: u32 = 5;

/// Timeout for acquiring a pooled connection.
const ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Read-only SQLite database client.
#[derive(Debug)]
pub struct SqliteClient {
    pool: SqlitePool,
}

impl SqliteClient {
    /// Opens the given database file in read-only mode.
    ///
    /// Fails with a connection error if the file does not exist or cannot be
    /// opened; a read-only open never creates the file.
    pub async fn open_read_only(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(WardenError::connection(format!(
                "database file not found: {}",
                path.display()
            )));
        }

        debug!("Opening read-only SQLite database at {}", path.display());

        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
            .connect_with(options)
            .await
            .map_err(|e| map_open_error(e, path))?;

        Ok(Self { pool })
    }

    /// Creates a client from an existing pool.
    ///
    /// This is primarily useful for testing.
    #[allow(dead_code)]
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Streams rows for `sql`, stopping after `max_rows` (one extra row is
    /// probed to detect truncation). The busy timeout is set per connection
    /// so lock waits fail within the caller's bound instead of hanging.
    async fn fetch_capped(
        &self,
        sql: &str,
        max_rows: usize,
        timeout: Duration,
    ) -> Result<QueryResult> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| WardenError::connection(format!("could not acquire connection: {e}")))?;

        let busy_ms = timeout.as_millis().max(1);
        let pragma = format!("PRAGMA busy_timeout = {busy_ms}");
        sqlx::query(&pragma)
            .execute(&mut *conn)
            .await
            .map_err(map_execution_error)?;

        let mut raw: Vec<SqliteRow> = Vec::new();
        let mut truncated = false;
        {
            let mut stream = sqlx::query(sql).fetch(&mut *conn);
            while let Some(row) = stream.try_next().await.map_err(map_execution_error)? {
                if raw.len() == max_rows {
                    truncated = true;
                    break;
                }
                raw.push(row);
            }
        }
        drop(conn);

        let columns: Vec<ColumnInfo> = if let Some(first_row) = raw.first() {
            first_row
                .columns()
                .iter()
                .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                .collect()
        } else {
            // Empty result: recover projection metadata from the prepared
            // statement instead of a row.
            self.describe_columns(sql).await.unwrap_or_default()
        };

        if truncated {
            warn!("query hit the row cap, truncating to {} rows", max_rows);
        }

        let rows: Vec<Row> = raw.iter().map(convert_row).collect();
        let row_count = rows.len();

        Ok(QueryResult {
            columns,
            rows,
            row_count,
            truncated,
            execution_time: Duration::ZERO,
        })
    }

    /// Fetches column metadata for a statement without running it.
    async fn describe_columns(&self, sql: &str) -> Result<Vec<ColumnInfo>> {
        let describe = self
            .pool
            .describe(sql)
            .await
            .map_err(map_execution_error)?;

        Ok(describe
            .columns()
            .iter()
            .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
            .collect())
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT name
            FROM sqlite_master
            WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WardenError::query(format!("Failed to list tables: {e}")))?;

        Ok(names)
    }

    async fn execute_query(
        &self,
        sql: &str,
        max_rows: usize,
        timeout: Duration,
    ) -> Result<QueryResult> {
        let start = Instant::now();

        let mut result = tokio::time::timeout(timeout, self.fetch_capped(sql, max_rows, timeout))
            .await
            .map_err(|_| {
                WardenError::timeout(format!(
                    "statement exceeded the {}ms execution bound",
                    timeout.as_millis()
                ))
            })??;

        result.execution_time = start.elapsed();
        Ok(result)
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Converts a sqlx SqliteRow to our Row type.
fn convert_row(row: &SqliteRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a SqliteRow to our Value type.
fn convert_value(row: &SqliteRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "NULL" => Value::Null,

        "BOOLEAN" | "BOOL" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "INTEGER" | "INT" | "BIGINT" | "INT4" | "INT8" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BLOB" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        // TEXT, DATE/DATETIME and anything else SQLite reports decode as text.
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

/// Returns true if the error is SQLite lock contention, which surfaces after
/// the busy timeout has elapsed and is therefore a timeout from the caller's
/// point of view.
fn is_lock_contention(error: &sqlx::Error) -> bool {
    let error_str = error.to_string().to_lowercase();
    error_str.contains("database is locked") || error_str.contains("database table is locked")
}

/// Maps sqlx execution errors onto the Gate's failure taxonomy.
fn map_execution_error(error: sqlx::Error) -> WardenError {
    if is_lock_contention(&error) {
        return WardenError::timeout(format!("lock wait exceeded the busy timeout: {error}"));
    }

    match &error {
        sqlx::Error::PoolTimedOut => {
            WardenError::connection("timed out acquiring a pooled connection".to_string())
        }
        _ => match error.as_database_error() {
            Some(db_error) => WardenError::query(db_error.message().to_string()),
            None => WardenError::query(error.to_string()),
        },
    }
}

/// Maps sqlx open errors to user-friendly connection messages.
fn map_open_error(error: sqlx::Error, path: &Path) -> WardenError {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("unable to open") {
        WardenError::connection(format!(
            "Cannot open {}. Check that the file exists and is a SQLite database.",
            path.display()
        ))
    } else if error_str.contains("not a database") {
        WardenError::connection(format!("{} is not a SQLite database.", path.display()))
    } else {
        WardenError::connection(error.to_string())
    }
}
