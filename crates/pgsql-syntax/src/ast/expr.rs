use crate::ast::select::Select;
use model::core::value::Value;

/// An expression node of the captured-query subset.
///
/// `Value` leaves belong to the oracle side of the system: they render as a
/// dialect placeholder and record a bound parameter. `Parameter` leaves are
/// the markers recovered from parsed SQL text. A fully patched tree contains
/// neither.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A possibly qualified identifier; every part is quoted on render.
    Identifier(Ident),
    /// A bound value, rendered as the next positional placeholder.
    Value(Value),
    /// A positional parameter marker parsed from SQL text, e.g. `$3`.
    Parameter(u32),
    /// A numeric literal, rendered verbatim.
    Number(String),
    /// A string literal, escaped by the dialect on render.
    StringLit(String),
    /// Raw SQL text, rendered verbatim.
    Literal(String),
    BinaryOp(Box<BinaryOp>),
    Not(Box<Expr>),
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    Exists(Box<Select>),
    /// `ANY(<subquery>)` on the right-hand side of a comparison.
    AnySubquery(Box<Select>),
    /// A scalar subquery in expression position.
    Subquery(Box<Select>),
    FunctionCall(FunctionCall),
    /// A `::` cast, e.g. `current_setting('key')::float`.
    Cast {
        expr: Box<Expr>,
        data_type: String,
    },
    /// An explicitly parenthesized expression.
    Nested(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub parts: Vec<String>,
}

impl Ident {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOp {
    pub left: Expr,
    pub op: BinaryOperator,
    pub right: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expr>,
}

impl Expr {
    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Expr {
        Expr::BinaryOp(Box::new(BinaryOp { left, op, right }))
    }

    /// Folds expressions into a left-associative AND chain.
    pub fn and_all(exprs: impl IntoIterator<Item = Expr>) -> Option<Expr> {
        exprs
            .into_iter()
            .reduce(|acc, expr| Expr::binary(acc, BinaryOperator::And, expr))
    }
}
