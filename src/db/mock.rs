//! Mock database client for testing.
//!
//! Provides an in-memory implementation with a fixed table listing and
//! canned query results. It records the statements it receives so tests can
//! assert on the SQL the executor actually sends to storage.

use super::{ColumnInfo, DatabaseClient, QueryResult, Row, Value};
use crate::error::{Result, WardenError};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// A mock database client that returns predefined results.
pub struct MockDatabaseClient {
    tables: Vec<String>,
    columns: Vec<ColumnInfo>,
    rows: Vec<Row>,
    fail_execution: bool,
    executed: Mutex<Vec<String>>,
}

impl MockDatabaseClient {
    /// Creates a mock with the given table listing and a one-row result.
    pub fn with_tables<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tables: tables.into_iter().map(Into::into).collect(),
            columns: vec![ColumnInfo::new("result", "TEXT")],
            rows: vec![vec![Value::String("mock".to_string())]],
            fail_execution: false,
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Sets the canned result returned by `execute_query`.
    pub fn with_result(mut self, columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        self.columns = columns;
        self.rows = rows;
        self
    }

    /// Makes every `execute_query` call fail with a query error.
    pub fn failing(mut self) -> Self {
        self.fail_execution = true;
        self
    }

    /// Returns the statements executed so far, in order.
    pub fn executed_statements(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

impl Default for MockDatabaseClient {
    fn default() -> Self {
        Self::with_tables(Vec::<String>::new())
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.tables.clone())
    }

    async fn execute_query(
        &self,
        sql: &str,
        max_rows: usize,
        _timeout: Duration,
    ) -> Result<QueryResult> {
        self.executed.lock().unwrap().push(sql.to_string());

        if self.fail_execution {
            return Err(WardenError::query("mock execution failure"));
        }

        let truncated = self.rows.len() > max_rows;
        let rows: Vec<Row> = self.rows.iter().take(max_rows).cloned().collect();
        let row_count = rows.len();

        Ok(QueryResult {
            columns: self.columns.clone(),
            rows,
            row_count,
            truncated,
            execution_time: Duration::from_millis(1),
        })
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
