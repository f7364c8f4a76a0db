use crate::schema::{FieldMetadata, SchemaProvider};
use std::collections::HashMap;

/// An in-memory [`SchemaProvider`] populated up front by the application.
#[derive(Debug, Clone, Default)]
pub struct MemorySchema {
    models: HashMap<String, HashMap<String, FieldMetadata>>,
}

impl MemorySchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a model with its fields, replacing any previous definition.
    pub fn model(mut self, name: &str, fields: Vec<FieldMetadata>) -> Self {
        let fields = fields
            .into_iter()
            .map(|f| (f.name.clone(), f))
            .collect::<HashMap<_, _>>();
        self.models.insert(name.to_string(), fields);
        self
    }

    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(|k| k.as_str())
    }
}

impl SchemaProvider for MemorySchema {
    fn field_metadata(&self, model: &str, field: &str) -> Option<FieldMetadata> {
        self.models.get(model)?.get(field).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let schema = MemorySchema::new().model(
            "Post",
            vec![
                FieldMetadata::scalar("id", true),
                FieldMetadata::scalar("title", false),
                FieldMetadata::relation("tags", "Tag", true),
            ],
        );

        assert!(schema.field_metadata("Post", "id").unwrap().is_numeric());
        assert!(schema.field_metadata("Post", "tags").unwrap().is_relation());
        assert!(schema.field_metadata("Post", "nope").is_none());
        assert!(schema.field_metadata("Missing", "id").is_none());
    }
}
