use crate::ast::{
    common::{JoinKind, TableRef},
    expr::Expr,
    select::{FromClause, JoinClause, Select},
};

/// Builds a [`Select`] AST incrementally. Used by capture-oracle
/// implementations to assemble single-row probe queries.
#[derive(Debug, Clone, Default)]
pub struct SelectBuilder {
    ast: Select,
}

impl SelectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, columns: Vec<Expr>) -> Self {
        self.ast.columns = columns;
        self
    }

    pub fn from(mut self, table: TableRef, alias: Option<&str>) -> Self {
        self.ast.from = Some(FromClause {
            table,
            alias: alias.map(str::to_string),
        });
        self
    }

    pub fn join(mut self, kind: JoinKind, table: TableRef, alias: Option<&str>, on: Expr) -> Self {
        self.ast.joins.push(JoinClause {
            kind,
            table,
            alias: alias.map(str::to_string),
            on,
        });
        self
    }

    pub fn where_clause(mut self, expr: Expr) -> Self {
        self.ast.where_clause = Some(expr);
        self
    }

    /// Sets the WHERE clause if a condition is present.
    pub fn where_opt(mut self, expr: Option<Expr>) -> Self {
        self.ast.where_clause = expr;
        self
    }

    pub fn limit(mut self, expr: Expr) -> Self {
        self.ast.limit = Some(expr);
        self
    }

    pub fn offset(mut self, expr: Expr) -> Self {
        self.ast.offset = Some(expr);
        self
    }

    pub fn build(self) -> Select {
        self.ast
    }
}
