use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The connection string could not be parsed.
    #[error("Invalid connection URL: {0}")]
    InvalidUrl(String),

    /// Database-related error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),
}
