pub mod error;
pub mod postgres;

pub use error::ConnectorError;
pub use postgres::schema::PgSchema;
