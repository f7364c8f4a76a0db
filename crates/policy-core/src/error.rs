use crate::oracle::OracleError;
use model::context::ContextError;
use pgsql_syntax::error::SqlSyntaxError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    /// A filter referenced a field the schema does not know. Unknown fields
    /// are never guessed at; only known, typed columns are ever substituted
    /// into SQL.
    #[error("unknown field '{field}' on model '{model}'")]
    UnknownField { model: String, field: String },

    /// A numeric column was given a non-number value. Numeric columns are
    /// inlined unquoted, so the type check must fail before any SQL exists.
    #[error("numeric fields can only be filtered with numbers: field '{field}' given '{value}'")]
    NumericTypeMismatch { field: String, value: String },

    /// A relation field was given a scalar condition, or a scalar field a
    /// nested one.
    #[error("field '{field}' on model '{model}' does not accept the given filter shape")]
    RelationMismatch { model: String, field: String },

    #[error(transparent)]
    Context(#[from] ContextError),

    /// A minted token never surfaced as a parameter of the captured query.
    /// This is a tokenizer/oracle pairing bug, not a user error.
    #[error("token {0} was never substituted into the captured query")]
    UnresolvedToken(u32),

    /// A parameter marker survived patching. The capture contained a
    /// parameter the compiler cannot account for.
    #[error("parameter ${0} in the captured query matches no token")]
    UnpatchedParameter(usize),

    /// The captured query carried no filter predicate to extract.
    #[error("captured query has no filter predicate")]
    MissingPredicate,

    #[error("oracle failure: {0}")]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Sql(#[from] SqlSyntaxError),
}

pub type Result<T> = std::result::Result<T, CompileError>;
