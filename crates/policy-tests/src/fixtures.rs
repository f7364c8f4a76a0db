use model::schema::{FieldMetadata, MemorySchema};

/// A blog-shaped schema exercising every field kind: numeric and text
/// scalars, a has-one relation and a has-many relation.
pub fn blog_schema() -> MemorySchema {
    MemorySchema::new()
        .model(
            "Post",
            vec![
                FieldMetadata::scalar("id", true),
                FieldMetadata::scalar("title", false),
                FieldMetadata::scalar("stock", true),
                FieldMetadata::scalar("authorId", true),
                FieldMetadata::relation("author", "User", false),
                FieldMetadata::relation("tags", "Tag", true),
            ],
        )
        .model(
            "Tag",
            vec![
                FieldMetadata::scalar("id", true),
                FieldMetadata::scalar("label", false),
                FieldMetadata::scalar("postId", true),
            ],
        )
        .model(
            "User",
            vec![
                FieldMetadata::scalar("id", true),
                FieldMetadata::scalar("name", false),
                FieldMetadata::scalar("tenant", false),
            ],
        )
}
