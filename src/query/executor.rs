//! Guarded execution of validated statements.
//!
//! The executor does not re-check table access or statement kind (that is
//! the validator's job), but it refuses anything that is not a single
//! SELECT-shaped statement, caps the row count, and bounds execution time.
//! Together with the read-only connection underneath it, a validator bypass
//! still cannot mutate data or hang the caller.

use crate::db::{DatabaseClient, QueryResult};
use crate::error::{Result, WardenError};
use crate::safety::parse_single;
use sqlparser::ast::{Expr, Statement, Value as SqlValue};
use std::time::Duration;
use tracing::debug;

/// Default hard cap on returned rows.
pub const DEFAULT_ROW_LIMIT: usize = 1000;

/// Default bound on lock waits plus statement runtime.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Executor that runs accepted statements under resource bounds.
///
/// The row limit and timeout can be overridden but not disabled: zero
/// values are clamped up to the smallest enforceable bound.
pub struct GuardedExecutor<'a> {
    db: &'a dyn DatabaseClient,
    row_limit: usize,
    timeout: Duration,
}

impl<'a> GuardedExecutor<'a> {
    /// Creates an executor with the default row cap and timeout.
    pub fn new(db: &'a dyn DatabaseClient) -> Self {
        Self {
            db,
            row_limit: DEFAULT_ROW_LIMIT,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Overrides the row cap.
    pub fn with_row_limit(mut self, row_limit: usize) -> Self {
        self.row_limit = row_limit.max(1);
        self
    }

    /// Overrides the execution timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.max(Duration::from_millis(1));
        self
    }

    /// Runs the statement and returns its shaped result.
    ///
    /// If the outermost query carries no LIMIT, one bound to the row cap is
    /// attached before execution. An existing LIMIT is left untouched; the
    /// storage layer stops fetching at the cap either way.
    pub async fn execute(&self, sql: &str) -> Result<QueryResult> {
        let bounded = enforce_row_limit(sql, self.row_limit)?;
        debug!(
            row_limit = self.row_limit,
            timeout_ms = self.timeout.as_millis() as u64,
            "executing guarded statement"
        );
        self.db
            .execute_query(&bounded, self.row_limit, self.timeout)
            .await
    }
}

/// Attaches `LIMIT row_limit` to the outermost query node when absent.
///
/// This works on the parsed statement rather than the SQL text: a LIMIT
/// inside a subquery must not suppress the outer cap, and textual appension
/// could land inside a trailing comment or bind to the wrong clause.
fn enforce_row_limit(sql: &str, row_limit: usize) -> Result<String> {
    let statement =
        parse_single(sql).map_err(|message| WardenError::query(format!("sql parse error: {message}")))?;

    match statement {
        Statement::Query(mut query) => {
            if query.limit.is_none() {
                query.limit = Some(Expr::Value(SqlValue::Number(row_limit.to_string(), false)));
            }
            Ok(Statement::Query(query).to_string())
        }
        _ => Err(WardenError::query(
            "only SELECT statements can be executed",
        )),
    }
}
