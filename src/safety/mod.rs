//! Statement validation module.
//!
//! Decides whether a generated SQL statement may run at all: a single
//! read-only SELECT whose table references are all on the allowlist. The
//! checks run in a fixed order and short-circuit, so rejection reasons are
//! deterministic and testable.
//!
//! The keyword denylist is a cheap pre-filter only; the authoritative
//! decisions (statement kind, table access) are made on the parsed tree,
//! which comments, whitespace tricks, and string literals cannot evade.

mod parser;

pub(crate) use parser::parse_single;

use crate::catalog::{AllowedTableSet, TableCatalog};
use serde::{Deserialize, Serialize};
use sqlparser::ast::Statement;
use std::sync::Arc;
use tracing::debug;

/// Mutation and DDL/DCL verbs that reject a candidate outright when they
/// appear as a standalone word.
const DISALLOWED_KEYWORDS: &[&str] = &[
    "insert", "update", "delete", "drop", "alter", "create", "replace", "attach", "detach",
    "truncate", "pragma", "vacuum", "merge",
];

/// The outcome of validating one candidate statement.
///
/// This is the sole contract surfaced to callers: either the statement is
/// acceptable, or `reason` says in plain words why it is not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    /// Whether the statement may be executed.
    pub accepted: bool,
    /// Human-readable reason; "ok" on acceptance.
    pub reason: String,
}

impl PolicyDecision {
    /// Creates an accepting decision.
    pub fn accept() -> Self {
        Self {
            accepted: true,
            reason: "ok".to_string(),
        }
    }

    /// Creates a rejecting decision with the given reason.
    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: reason.into(),
        }
    }

    /// Returns true if the statement was accepted.
    pub fn is_accepted(&self) -> bool {
        self.accepted
    }
}

/// Validator bound to a shared table catalog.
///
/// Each call snapshots the catalog, so a concurrent reload never exposes a
/// half-updated allowlist to an in-flight validation.
#[derive(Debug)]
pub struct Validator {
    catalog: Arc<TableCatalog>,
}

impl Validator {
    /// Creates a validator over the given catalog.
    pub fn new(catalog: Arc<TableCatalog>) -> Self {
        Self { catalog }
    }

    /// Validates a candidate statement against the current allowlist.
    pub fn validate(&self, sql: &str) -> PolicyDecision {
        validate(sql, &self.catalog.current())
    }
}

/// Validates a candidate statement against an explicit allowlist.
///
/// Checks, in order: statement stacking, keyword denylist, parse, statement
/// kind, table allowlist. The first failure wins.
pub fn validate(sql: &str, allowed: &AllowedTableSet) -> PolicyDecision {
    // A separator anywhere means stacking, even inside a trailing comment.
    if sql.contains(';') {
        return PolicyDecision::reject("multiple statements not allowed");
    }

    let lowered = sql.to_lowercase();
    for keyword in DISALLOWED_KEYWORDS {
        if contains_word(&lowered, keyword) {
            return PolicyDecision::reject(format!("disallowed keyword: {keyword}"));
        }
    }

    let statement = match parser::parse_single(sql) {
        Ok(statement) => statement,
        Err(message) => {
            debug!("rejected unparseable statement: {message}");
            return PolicyDecision::reject(format!("sql parse error: {message}"));
        }
    };

    let query = match &statement {
        Statement::Query(query) => query,
        _ => return PolicyDecision::reject("only SELECT statements allowed"),
    };

    let facts = parser::analyze_query(query);
    if !facts.is_read_only() {
        return PolicyDecision::reject("only SELECT statements allowed");
    }

    let referenced = facts.external_tables();
    let disallowed = allowed.disallowed_among(referenced.iter());
    if !disallowed.is_empty() {
        debug!("rejected statement touching {:?}", disallowed);
        return PolicyDecision::reject(format!(
            "disallowed tables used: {{{}}}",
            disallowed.join(", ")
        ));
    }

    PolicyDecision::accept()
}

/// Returns true if `word` occurs in `haystack` as a standalone word, so a
/// column literally named `dropped` does not match `drop`.
fn contains_word(haystack: &str, word: &str) -> bool {
    let bytes = haystack.as_bytes();
    let mut start = 0;

    while let Some(pos) = haystack[start..].find(word) {
        let abs = start + pos;
        let end = abs + word.len();
        let before_ok = abs == 0 || !is_identifier_char(bytes[abs - 1]);
        let after_ok = end >= haystack.len() || !is_identifier_char(bytes[end]);

        if before_ok && after_ok {
            return true;
        }
        start = abs + 1;
        if start >= haystack.len() {
            break;
        }
    }

    false
}

fn is_identifier_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> AllowedTableSet {
        AllowedTableSet::from_names(["clientes", "vendas"])
    }

    #[test]
    fn test_decision_helpers() {
        let ok = PolicyDecision::accept();
        assert!(ok.is_accepted());
        assert_eq!(ok.reason, "ok");

        let bad = PolicyDecision::reject("nope");
        assert!(!bad.is_accepted());
        assert_eq!(bad.reason, "nope");
    }

    #[test]
    fn test_semicolon_rejected_regardless_of_suffix() {
        for sql in [
            "SELECT * FROM clientes;",
            "SELECT * FROM clientes; -- comment",
            "SELECT 1; SELECT 2",
            ";",
        ] {
            let decision = validate(sql, &catalog());
            assert!(!decision.is_accepted(), "accepted: {sql}");
            assert_eq!(decision.reason, "multiple statements not allowed");
        }
    }

    #[test]
    fn test_disallowed_keywords_rejected() {
        let cases = [
            ("INSERT INTO clientes VALUES (1)", "insert"),
            ("update vendas set status = 'x'", "update"),
            ("DELETE FROM vendas", "delete"),
            ("DROP TABLE clientes", "drop"),
            ("PRAGMA journal_mode", "pragma"),
            ("VACUUM", "vacuum"),
        ];
        for (sql, keyword) in cases {
            let decision = validate(sql, &catalog());
            assert!(!decision.is_accepted(), "accepted: {sql}");
            assert_eq!(decision.reason, format!("disallowed keyword: {keyword}"));
        }
    }

    #[test]
    fn test_keyword_match_is_word_bounded() {
        // Identifiers that merely contain a denied verb must not trip the
        // pre-filter.
        let sql = "SELECT dropped, created_at FROM vendas WHERE updated IS NULL";
        let decision = validate(sql, &catalog());
        assert!(decision.is_accepted(), "rejected: {}", decision.reason);
    }

    #[test]
    fn test_parse_error_rejected_with_message() {
        let decision = validate("SELECT FROM WHERE", &catalog());
        assert!(!decision.is_accepted());
        assert!(
            decision.reason.starts_with("sql parse error: "),
            "got: {}",
            decision.reason
        );
    }

    #[test]
    fn test_empty_input_is_parse_error() {
        let decision = validate("", &catalog());
        assert_eq!(decision.reason, "sql parse error: empty statement");
    }

    #[test]
    fn test_non_select_root_rejected() {
        // EXPLAIN is not on the denylist, so it reaches the kind check.
        let decision = validate("EXPLAIN SELECT * FROM clientes", &catalog());
        assert!(!decision.is_accepted());
        assert_eq!(decision.reason, "only SELECT statements allowed");
    }

    #[test]
    fn test_simple_select_accepted() {
        let decision = validate("SELECT * FROM clientes", &catalog());
        assert!(decision.is_accepted());
        assert_eq!(decision.reason, "ok");
    }

    #[test]
    fn test_spec_count_query_accepted() {
        let decision = validate(
            "select count(*) from vendas where status = 'Pago'",
            &catalog(),
        );
        assert!(decision.is_accepted());
    }

    #[test]
    fn test_cte_select_accepted() {
        let decision = validate(
            "WITH pagas AS (SELECT * FROM vendas WHERE status = 'Pago') SELECT count(*) FROM pagas",
            &catalog(),
        );
        assert!(decision.is_accepted(), "rejected: {}", decision.reason);
    }

    #[test]
    fn test_unknown_table_rejected_by_name() {
        let decision = validate("select * from funcionarios", &catalog());
        assert!(!decision.is_accepted());
        assert_eq!(decision.reason, "disallowed tables used: {funcionarios}");
    }

    #[test]
    fn test_unknown_table_in_join_rejected() {
        let decision = validate(
            "SELECT * FROM clientes c JOIN funcionarios f ON c.id = f.id",
            &catalog(),
        );
        assert_eq!(decision.reason, "disallowed tables used: {funcionarios}");
    }

    #[test]
    fn test_unknown_table_in_subquery_rejected() {
        let decision = validate(
            "SELECT * FROM clientes WHERE id IN (SELECT cliente_id FROM funcionarios)",
            &catalog(),
        );
        assert_eq!(decision.reason, "disallowed tables used: {funcionarios}");
    }

    #[test]
    fn test_multiple_unknown_tables_all_named_sorted() {
        let decision = validate(
            "SELECT * FROM funcionarios f JOIN departamentos d ON f.dep = d.id",
            &catalog(),
        );
        assert_eq!(
            decision.reason,
            "disallowed tables used: {departamentos, funcionarios}"
        );
    }

    #[test]
    fn test_cte_alias_not_checked_against_allowlist() {
        let decision = validate(
            "WITH resumo AS (SELECT cliente_id FROM vendas) SELECT * FROM resumo",
            &catalog(),
        );
        assert!(decision.is_accepted(), "rejected: {}", decision.reason);
    }

    #[test]
    fn test_cte_alias_shadowing_real_table_accepted() {
        let decision = validate(
            "WITH vendas AS (SELECT * FROM clientes) SELECT * FROM vendas",
            &catalog(),
        );
        assert!(decision.is_accepted(), "rejected: {}", decision.reason);
    }

    #[test]
    fn test_quoted_identifier_normalized_before_check() {
        let decision = validate(r#"SELECT * FROM "Clientes""#, &catalog());
        assert!(decision.is_accepted(), "rejected: {}", decision.reason);
    }

    #[test]
    fn test_concat_operator_tolerated() {
        let decision = validate(
            "SELECT nome || ' <' || telefone || '>' FROM clientes",
            &catalog(),
        );
        assert!(decision.is_accepted(), "rejected: {}", decision.reason);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let allowed = catalog();
        for sql in [
            "SELECT * FROM clientes",
            "select * from funcionarios",
            "DROP TABLE clientes",
        ] {
            let first = validate(sql, &allowed);
            let second = validate(sql, &allowed);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_empty_allowlist_rejects_any_table() {
        let decision = validate("SELECT * FROM clientes", &AllowedTableSet::default());
        assert_eq!(decision.reason, "disallowed tables used: {clientes}");
    }

    #[test]
    fn test_validator_snapshots_catalog() {
        let catalog = Arc::new(TableCatalog::from_set(AllowedTableSet::from_names([
            "clientes",
        ])));
        let validator = Validator::new(catalog);
        assert!(validator.validate("SELECT * FROM clientes").is_accepted());
        assert!(!validator.validate("SELECT * FROM vendas").is_accepted());
    }

    #[test]
    fn test_contains_word_boundaries() {
        assert!(contains_word("drop table x", "drop"));
        assert!(contains_word("x drop", "drop"));
        assert!(contains_word("(drop)", "drop"));
        assert!(!contains_word("dropped", "drop"));
        assert!(!contains_word("raindrop", "drop"));
        assert!(!contains_word("drop_zone", "drop"));
    }
}
