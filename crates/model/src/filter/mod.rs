use crate::core::value::Value;
use std::collections::BTreeMap;

pub mod tokenized;

/// A declarative filter: field name to condition, one entry per field.
///
/// Field names are unique per level by construction; iteration order is the
/// map's and carries no meaning.
pub type FilterTree = BTreeMap<String, FilterValue>;

/// The condition attached to a single field of a [`FilterTree`].
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Compare against a concrete scalar value.
    Scalar(Value),
    /// Compare against a column of the policy target row.
    Row(String),
    /// Compare against a session setting supplied by the application.
    Context(String),
    /// Membership in a literal list of values.
    In(Vec<Value>),
    /// Membership in a JSON-encoded array stored in a session setting.
    InContext(String),
    /// Traverse into a relation field.
    Related(RelationFilter),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RelationFilter {
    /// Constrain a has-one relation.
    Is(FilterTree),
    /// Constrain a has-many relation through its quantifier sub-keys.
    List(ListFilter),
}

/// Quantified conditions on a list relation. Any subset of the three
/// sub-keys may be present; each present sub-tree is applied independently.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListFilter {
    pub some: Option<FilterTree>,
    pub every: Option<FilterTree>,
    pub none: Option<FilterTree>,
}

impl ListFilter {
    pub fn some(tree: FilterTree) -> Self {
        Self {
            some: Some(tree),
            ..Self::default()
        }
    }

    pub fn every(tree: FilterTree) -> Self {
        Self {
            every: Some(tree),
            ..Self::default()
        }
    }

    pub fn none(tree: FilterTree) -> Self {
        Self {
            none: Some(tree),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.some.is_none() && self.every.is_none() && self.none.is_none()
    }
}

impl From<Value> for FilterValue {
    fn from(value: Value) -> Self {
        FilterValue::Scalar(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Scalar(Value::Int(value))
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Scalar(Value::Float(value))
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Scalar(Value::String(value.to_string()))
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Scalar(Value::String(value))
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Scalar(Value::Boolean(value))
    }
}

impl FilterValue {
    pub fn has_one(tree: FilterTree) -> Self {
        FilterValue::Related(RelationFilter::Is(tree))
    }

    pub fn some(tree: FilterTree) -> Self {
        FilterValue::Related(RelationFilter::List(ListFilter::some(tree)))
    }

    pub fn every(tree: FilterTree) -> Self {
        FilterValue::Related(RelationFilter::List(ListFilter::every(tree)))
    }

    pub fn none(tree: FilterTree) -> Self {
        FilterValue::Related(RelationFilter::List(ListFilter::none(tree)))
    }
}

/// Builds a [`FilterTree`] from `(field, condition)` pairs.
pub fn tree<I, K, V>(entries: I) -> FilterTree
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<FilterValue>,
{
    entries
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
