//! SQL parsing and structural analysis.
//!
//! Uses sqlparser-rs with the SQLite dialect to parse candidate statements
//! and walk the full tree: every table reference (including those inside
//! subqueries, CTEs, join clauses, and expression subqueries) is collected,
//! CTE alias names are tracked separately, and data-modifying bodies hidden
//! in query position are detected.

use sqlparser::ast::{
    Expr, Function, FunctionArg, FunctionArgExpr, FunctionArguments, GroupByExpr, JoinConstraint,
    JoinOperator, ObjectName, Query, Select, SelectItem, SetExpr, Statement, TableFactor,
    TableWithJoins,
};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;
use std::collections::HashSet;

/// Parses `sql` and returns its single statement.
///
/// Errors are surfaced as plain strings so the caller can wrap them into a
/// human-readable rejection reason.
pub(crate) fn parse_single(sql: &str) -> Result<Statement, String> {
    let dialect = SQLiteDialect {};
    let mut statements = Parser::parse_sql(&dialect, sql).map_err(|e| e.to_string())?;

    match statements.len() {
        0 => Err("empty statement".to_string()),
        1 => Ok(statements.remove(0)),
        _ => Err("expected a single statement".to_string()),
    }
}

/// Structural facts about a parsed query, gathered in one walk.
#[derive(Debug, Default)]
pub(crate) struct QueryFacts {
    tables: HashSet<String>,
    cte_aliases: HashSet<String>,
    writes: bool,
}

impl QueryFacts {
    /// True if no data-modifying body was found anywhere in the tree.
    pub fn is_read_only(&self) -> bool {
        !self.writes
    }

    /// Referenced table names that are not CTE aliases, normalized and
    /// sorted. An alias that shadows a real table name is not an external
    /// reference.
    pub fn external_tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tables
            .difference(&self.cte_aliases)
            .cloned()
            .collect();
        names.sort();
        names
    }
}

/// Walks a query tree and gathers its structural facts.
pub(crate) fn analyze_query(query: &Query) -> QueryFacts {
    let mut facts = QueryFacts::default();
    collect_query(query, &mut facts);
    facts
}

/// Lowercases the final identifier segment, stripping any schema qualifier.
fn normalize_table_name(name: &ObjectName) -> String {
    name.0
        .last()
        .map(|ident| ident.value.to_lowercase())
        .unwrap_or_default()
}

fn collect_query(query: &Query, facts: &mut QueryFacts) {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            facts
                .cte_aliases
                .insert(cte.alias.name.value.to_lowercase());
            collect_query(&cte.query, facts);
        }
    }

    collect_set_expr(&query.body, facts);
}

fn collect_set_expr(set_expr: &SetExpr, facts: &mut QueryFacts) {
    match set_expr {
        SetExpr::Select(select) => collect_select(select, facts),
        SetExpr::Query(query) => collect_query(query, facts),
        SetExpr::SetOperation { left, right, .. } => {
            collect_set_expr(left, facts);
            collect_set_expr(right, facts);
        }
        SetExpr::Values(_) | SetExpr::Table(_) => {}
        // INSERT/UPDATE/DELETE/MERGE smuggled into query position (CTE
        // bodies, set-operation arms) make the statement non-read-only.
        _ => facts.writes = true,
    }
}

fn collect_select(select: &Select, facts: &mut QueryFacts) {
    for item in &select.projection {
        match item {
            SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => {
                collect_expr(expr, facts)
            }
            _ => {}
        }
    }

    for table_with_joins in &select.from {
        collect_table_with_joins(table_with_joins, facts);
    }

    if let Some(expr) = &select.selection {
        collect_expr(expr, facts);
    }

    if let GroupByExpr::Expressions(exprs, ..) = &select.group_by {
        for expr in exprs {
            collect_expr(expr, facts);
        }
    }

    if let Some(expr) = &select.having {
        collect_expr(expr, facts);
    }
}

fn collect_table_with_joins(twj: &TableWithJoins, facts: &mut QueryFacts) {
    collect_table_factor(&twj.relation, facts);

    for join in &twj.joins {
        collect_table_factor(&join.relation, facts);
        collect_join_operator(&join.join_operator, facts);
    }
}

fn collect_join_operator(operator: &JoinOperator, facts: &mut QueryFacts) {
    match operator {
        JoinOperator::Inner(constraint)
        | JoinOperator::LeftOuter(constraint)
        | JoinOperator::RightOuter(constraint)
        | JoinOperator::FullOuter(constraint) => {
            if let JoinConstraint::On(expr) = constraint {
                collect_expr(expr, facts);
            }
        }
        _ => {}
    }
}

fn collect_table_factor(factor: &TableFactor, facts: &mut QueryFacts) {
    match factor {
        TableFactor::Table { name, .. } => {
            facts.tables.insert(normalize_table_name(name));
        }
        TableFactor::Derived { subquery, .. } => collect_query(subquery, facts),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => collect_table_with_joins(table_with_joins, facts),
        _ => {}
    }
}

fn collect_expr(expr: &Expr, facts: &mut QueryFacts) {
    match expr {
        Expr::Subquery(query) => collect_query(query, facts),
        Expr::InSubquery { expr, subquery, .. } => {
            collect_expr(expr, facts);
            collect_query(subquery, facts);
        }
        Expr::Exists { subquery, .. } => collect_query(subquery, facts),

        Expr::BinaryOp { left, right, .. } => {
            collect_expr(left, facts);
            collect_expr(right, facts);
        }
        Expr::UnaryOp { expr, .. } => collect_expr(expr, facts),
        Expr::Nested(inner) => collect_expr(inner, facts),
        Expr::Cast { expr, .. } => collect_expr(expr, facts),

        Expr::IsNull(inner)
        | Expr::IsNotNull(inner)
        | Expr::IsTrue(inner)
        | Expr::IsNotTrue(inner)
        | Expr::IsFalse(inner)
        | Expr::IsNotFalse(inner) => collect_expr(inner, facts),

        Expr::InList { expr, list, .. } => {
            collect_expr(expr, facts);
            for item in list {
                collect_expr(item, facts);
            }
        }
        Expr::Between {
            expr, low, high, ..
        } => {
            collect_expr(expr, facts);
            collect_expr(low, facts);
            collect_expr(high, facts);
        }
        Expr::Case {
            operand,
            conditions,
            results,
            else_result,
            ..
        } => {
            if let Some(inner) = operand {
                collect_expr(inner, facts);
            }
            for condition in conditions {
                collect_expr(condition, facts);
            }
            for result in results {
                collect_expr(result, facts);
            }
            if let Some(inner) = else_result {
                collect_expr(inner, facts);
            }
        }
        Expr::Tuple(exprs) => {
            for item in exprs {
                collect_expr(item, facts);
            }
        }
        Expr::Function(func) => collect_function(func, facts),

        // Identifiers, literals and the rest carry no table references.
        _ => {}
    }
}

fn collect_function(func: &Function, facts: &mut QueryFacts) {
    match &func.args {
        FunctionArguments::Subquery(query) => collect_query(query, facts),
        FunctionArguments::List(list) => {
            for arg in &list.args {
                match arg {
                    FunctionArg::Named {
                        arg: FunctionArgExpr::Expr(expr),
                        ..
                    } => collect_expr(expr, facts),
                    FunctionArg::Unnamed(FunctionArgExpr::Expr(expr)) => collect_expr(expr, facts),
                    _ => {}
                }
            }
        }
        FunctionArguments::None => {}
    }
}
