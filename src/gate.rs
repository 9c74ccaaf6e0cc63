//! The Gate: validate-then-execute orchestration.
//!
//! Owns the storage client, the table allowlist, and the execution bounds.
//! Callers hand in raw SQL from an untrusted generator and get back either
//! a rejection with its reason or the shaped query result.

use crate::catalog::{AllowedTableSet, TableCatalog};
use crate::config::Config;
use crate::db::{self, DatabaseClient, QueryResult};
use crate::error::Result;
use crate::query::GuardedExecutor;
use crate::safety::{PolicyDecision, Validator};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Outcome of sending one statement through the Gate.
#[derive(Debug)]
pub enum GateOutcome {
    /// The validator refused the statement; it was never executed.
    Rejected(PolicyDecision),
    /// The statement ran within bounds.
    Executed(QueryResult),
}

impl GateOutcome {
    /// Returns true if the statement was accepted and executed.
    pub fn is_executed(&self) -> bool {
        matches!(self, GateOutcome::Executed(_))
    }
}

/// The combined validator + guarded executor over one database.
pub struct Gate {
    db: Box<dyn DatabaseClient>,
    catalog: Arc<TableCatalog>,
    row_limit: usize,
    timeout: Duration,
}

impl Gate {
    /// Opens the configured database read-only and loads the allowlist.
    pub async fn open(config: &Config) -> Result<Self> {
        let path = config.database_path()?;
        let db = db::connect(&path).await?;
        Self::with_client(db, config.limits.row_limit, config.limits.timeout()).await
    }

    /// Builds a Gate over an existing client, loading the allowlist from it.
    pub async fn with_client(
        db: Box<dyn DatabaseClient>,
        row_limit: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let catalog = Arc::new(TableCatalog::load(db.as_ref()).await?);
        info!(
            tables = catalog.current().len(),
            row_limit, "gate ready"
        );
        Ok(Self {
            db,
            catalog,
            row_limit,
            timeout,
        })
    }

    /// Returns a validator bound to this Gate's catalog.
    pub fn validator(&self) -> Validator {
        Validator::new(self.catalog.clone())
    }

    /// Returns the current allowlist snapshot.
    pub fn allowed_tables(&self) -> Arc<AllowedTableSet> {
        self.catalog.current()
    }

    /// Validates and, if accepted, executes one statement.
    pub async fn run(&self, sql: &str) -> Result<GateOutcome> {
        let decision = self.validator().validate(sql);
        if !decision.is_accepted() {
            warn!("statement rejected: {}", decision.reason);
            return Ok(GateOutcome::Rejected(decision));
        }

        let executor = GuardedExecutor::new(self.db.as_ref())
            .with_row_limit(self.row_limit)
            .with_timeout(self.timeout);
        let result = executor.execute(sql).await?;
        Ok(GateOutcome::Executed(result))
    }

    /// Re-reads the table listing, e.g. after a schema change.
    pub async fn reload_catalog(&self) -> Result<()> {
        self.catalog.reload(self.db.as_ref()).await
    }

    /// Closes the underlying connection.
    pub async fn close(&self) -> Result<()> {
        self.db.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ColumnInfo, MockDatabaseClient, Value};

    fn mock_gate_client() -> MockDatabaseClient {
        MockDatabaseClient::with_tables(["clientes", "vendas"]).with_result(
            vec![ColumnInfo::new("count(*)", "INTEGER")],
            vec![vec![Value::Int(12)]],
        )
    }

    #[tokio::test]
    async fn test_accepted_statement_executes() {
        let gate = Gate::with_client(Box::new(mock_gate_client()), 100, Duration::from_secs(5))
            .await
            .unwrap();

        let outcome = gate
            .run("select count(*) from vendas where status = 'Pago'")
            .await
            .unwrap();

        match outcome {
            GateOutcome::Executed(result) => {
                assert_eq!(result.column_names(), vec!["count(*)"]);
                assert_eq!(result.row_count, 1);
            }
            other => panic!("expected execution, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejected_statement_never_reaches_storage() {
        let client = mock_gate_client();
        let gate = Gate::with_client(Box::new(client), 100, Duration::from_secs(5))
            .await
            .unwrap();

        let outcome = gate.run("select * from funcionarios").await.unwrap();

        match outcome {
            GateOutcome::Rejected(decision) => {
                assert_eq!(decision.reason, "disallowed tables used: {funcionarios}");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reload_catalog_updates_allowlist() {
        let gate = Gate::with_client(
            Box::new(MockDatabaseClient::with_tables(["clientes"])),
            100,
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert!(!gate.allowed_tables().contains("vendas"));

        // Simulate a schema change by swapping the client's listing.
        let fresh = MockDatabaseClient::with_tables(["clientes", "vendas"]);
        gate.catalog.reload(&fresh).await.unwrap();

        assert!(gate.allowed_tables().contains("vendas"));
        assert!(gate
            .run("select * from vendas")
            .await
            .unwrap()
            .is_executed());
    }
}
