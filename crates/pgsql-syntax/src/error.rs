use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlSyntaxError {
    /// The captured query text did not match the supported SELECT subset.
    #[error("SQL parse error: {0}")]
    Parse(String),

    /// The parse tree contained a construct the AST builder cannot place.
    #[error("Unsupported SQL construct: {0}")]
    Unsupported(String),
}
