use serde::{Deserialize, Serialize};

pub mod memory;

pub use memory::MemorySchema;

/// Describes a single named field of a model.
///
/// A field is either a scalar column or a relation to another model; the two
/// shapes never mix, so the distinction is carried by [`FieldKind`] rather
/// than a bag of optional attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub name: String,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldKind {
    /// A plain column. Numeric columns are never quoted when inlined, so the
    /// flag decides which token encoding and which fragment kind apply.
    Scalar { numeric: bool },
    /// A has-one (`list: false`) or has-many (`list: true`) relation to
    /// another model.
    Relation { list: bool, related: String },
}

impl FieldMetadata {
    pub fn scalar(name: &str, numeric: bool) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Scalar { numeric },
        }
    }

    pub fn relation(name: &str, related: &str, list: bool) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Relation {
                list,
                related: related.to_string(),
            },
        }
    }

    pub fn is_relation(&self) -> bool {
        matches!(self.kind, FieldKind::Relation { .. })
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, FieldKind::Scalar { numeric: true })
    }
}

/// Source of field metadata for the models a filter may traverse.
///
/// Lookups are consulted on every compilation; implementations must treat
/// the schema as read-only for the lifetime of the provider. A field that
/// does not resolve is a hard error for the caller, never a fallback.
pub trait SchemaProvider: Send + Sync {
    fn field_metadata(&self, model: &str, field: &str) -> Option<FieldMetadata>;
}
