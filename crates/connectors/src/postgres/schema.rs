//! A [`SchemaProvider`] backed by `information_schema` introspection.
//!
//! Scalar columns and their numeric kinds are loaded once at startup.
//! Relation fields cannot be derived from foreign keys alone (constraint
//! names say nothing about how the application names its relations), so the
//! application declares them on top of the introspected columns.

use crate::error::ConnectorError;
use crate::postgres::utils::connect_client;
use model::schema::{FieldMetadata, SchemaProvider};
use std::collections::HashMap;
use tokio_postgres::Client;
use tracing::debug;

const QUERY_COLUMN_METADATA_SQL: &str = include_str!("sql/column_metadata.sql");

const NUMERIC_TYPES: [&str; 7] = [
    "smallint",
    "integer",
    "bigint",
    "real",
    "double precision",
    "numeric",
    "decimal",
];

#[derive(Debug, Clone, Default)]
pub struct PgSchema {
    fields: HashMap<String, HashMap<String, FieldMetadata>>,
}

impl PgSchema {
    /// Connects to `url` and loads column metadata for the public schema.
    pub async fn load(url: &str) -> Result<Self, ConnectorError> {
        let client = connect_client(url).await?;
        Self::from_client(&client).await
    }

    /// Loads column metadata through an existing client.
    pub async fn from_client(client: &Client) -> Result<Self, ConnectorError> {
        let rows = client.query(QUERY_COLUMN_METADATA_SQL, &[]).await?;

        let mut fields: HashMap<String, HashMap<String, FieldMetadata>> = HashMap::new();
        for row in &rows {
            let table: String = row.get("table_name");
            let column: String = row.get("column_name");
            let data_type: String = row.get("data_type");

            let numeric = is_numeric_type(&data_type);
            fields
                .entry(table)
                .or_default()
                .insert(column.clone(), FieldMetadata::scalar(&column, numeric));
        }

        debug!(models = fields.len(), "loaded column metadata");
        Ok(Self { fields })
    }

    /// Declares a relation field on top of the introspected columns.
    pub fn declare_relation(mut self, model: &str, field: &str, related: &str, list: bool) -> Self {
        self.fields
            .entry(model.to_string())
            .or_default()
            .insert(field.to_string(), FieldMetadata::relation(field, related, list));
        self
    }
}

impl SchemaProvider for PgSchema {
    fn field_metadata(&self, model: &str, field: &str) -> Option<FieldMetadata> {
        self.fields.get(model)?.get(field).cloned()
    }
}

fn is_numeric_type(data_type: &str) -> bool {
    NUMERIC_TYPES.contains(&data_type.to_ascii_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_type_classification() {
        assert!(is_numeric_type("integer"));
        assert!(is_numeric_type("double precision"));
        assert!(is_numeric_type("NUMERIC"));
        assert!(!is_numeric_type("text"));
        assert!(!is_numeric_type("character varying"));
        assert!(!is_numeric_type("jsonb"));
    }

    #[test]
    fn test_declared_relations() {
        let schema = PgSchema::default().declare_relation("Post", "tags", "Tag", true);
        let meta = schema.field_metadata("Post", "tags").unwrap();
        assert!(meta.is_relation());
    }
}
