use model::filter::{FilterTree, FilterValue};
use std::fmt;

/// The compiler's input: a rule expression attached to an ability.
///
/// A literal is used verbatim and bypasses every check — a documented escape
/// hatch for hand-written conditions. Filter and subquery expressions are
/// closures so the rule can be declared next to the ability definition and
/// evaluated lazily with the row/context accessors in scope.
pub enum Expression {
    /// An already-valid SQL boolean condition, e.g. `"true"`.
    Literal(String),
    /// A filter against the policy target table.
    Filter(FilterFn),
    /// A single-row lookup against some model, wrapped in `EXISTS(...)`.
    SubQuery(SubQueryFn),
}

pub type FilterFn = Box<dyn Fn(&Scope) -> FilterTree + Send + Sync>;
pub type SubQueryFn = Box<dyn Fn(&Scope) -> SubQuerySpec + Send + Sync>;

impl Expression {
    pub fn literal(sql: impl Into<String>) -> Self {
        Expression::Literal(sql.into())
    }

    pub fn filter(f: impl Fn(&Scope) -> FilterTree + Send + Sync + 'static) -> Self {
        Expression::Filter(Box::new(f))
    }

    pub fn sub_query(f: impl Fn(&Scope) -> SubQuerySpec + Send + Sync + 'static) -> Self {
        Expression::SubQuery(Box::new(f))
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(sql) => f.debug_tuple("Literal").field(sql).finish(),
            Expression::Filter(_) => f.write_str("Filter(..)"),
            Expression::SubQuery(_) => f.write_str("SubQuery(..)"),
        }
    }
}

/// A pending relational lookup returned by a subquery expression.
#[derive(Debug, Clone, PartialEq)]
pub struct SubQuerySpec {
    /// The model the single-row lookup runs against.
    pub model: String,
    pub filter: FilterTree,
}

impl SubQuerySpec {
    pub fn new(model: &str, filter: FilterTree) -> Self {
        Self {
            model: model.to_string(),
            filter,
        }
    }
}

/// The accessors available inside filter and subquery closures: two pure
/// lookups that mint typed placeholders, nothing more.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scope;

impl Scope {
    /// References a column of the row the policy is evaluated against.
    pub fn row(&self, column: &str) -> FilterValue {
        FilterValue::Row(column.to_string())
    }

    /// References a session setting installed by the application.
    pub fn context(&self, key: &str) -> FilterValue {
        FilterValue::Context(key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_accessors() {
        let scope = Scope;
        assert_eq!(scope.row("id"), FilterValue::Row("id".to_string()));
        assert_eq!(
            scope.context("user.tenant"),
            FilterValue::Context("user.tenant".to_string())
        );
    }
}
