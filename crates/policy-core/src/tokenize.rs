//! Rewrites a declarative filter tree into one a capture oracle can execute
//! safely, replacing every leaf value with an opaque token and recording the
//! AST fragment that must later take its place.

use crate::error::{CompileError, Result};
use crate::fragments;
use crate::registry::TokenRegistry;
use model::context::validate_context_key;
use model::core::value::Value;
use model::filter::{
    FilterTree, FilterValue, RelationFilter,
    tokenized::{TokenizedListFilter, TokenizedRelation, TokenizedTree, TokenizedValue},
};
use model::schema::{FieldKind, SchemaProvider};

/// Schema every generated column reference is qualified with.
pub const PUBLIC_SCHEMA: &str = "public";

/// Tokenizes `tree` for a probe against `model`.
///
/// `table` is the policy target and stays fixed across relation recursion:
/// row references always name a column of the row the policy guards, no
/// matter how deep in a relation filter they appear. `model` tracks the
/// model currently being traversed and is what field names resolve against.
pub fn tokenize(
    schema: &dyn SchemaProvider,
    tree: &FilterTree,
    table: &str,
    model: &str,
    registry: &mut TokenRegistry,
) -> Result<TokenizedTree> {
    let mut out = TokenizedTree::new();

    for (field, value) in tree {
        let meta = schema.field_metadata(model, field).ok_or_else(|| {
            CompileError::UnknownField {
                model: model.to_string(),
                field: field.clone(),
            }
        })?;

        let tokenized = match meta.kind {
            FieldKind::Relation { list, ref related } => {
                tokenize_relation(schema, table, model, field, related, list, value, registry)?
            }
            FieldKind::Scalar { numeric } => {
                tokenize_leaf(schema, table, model, field, numeric, value, registry)?
            }
        };
        out.insert(field.clone(), tokenized);
    }

    Ok(out)
}

#[allow(clippy::too_many_arguments)]
fn tokenize_relation(
    schema: &dyn SchemaProvider,
    table: &str,
    model: &str,
    field: &str,
    related: &str,
    list: bool,
    value: &FilterValue,
    registry: &mut TokenRegistry,
) -> Result<TokenizedValue> {
    let mismatch = || CompileError::RelationMismatch {
        model: model.to_string(),
        field: field.to_string(),
    };

    let relation = match (list, value) {
        (false, FilterValue::Related(RelationFilter::Is(nested))) => {
            TokenizedRelation::Is(tokenize(schema, nested, table, related, registry)?)
        }
        (true, FilterValue::Related(RelationFilter::List(filter))) => {
            if filter.is_empty() {
                return Err(mismatch());
            }
            let mut tokenized = TokenizedListFilter::default();
            if let Some(tree) = &filter.some {
                tokenized.some = Some(tokenize(schema, tree, table, related, registry)?);
            }
            if let Some(tree) = &filter.every {
                tokenized.every = Some(tokenize(schema, tree, table, related, registry)?);
            }
            if let Some(tree) = &filter.none {
                tokenized.none = Some(tokenize(schema, tree, table, related, registry)?);
            }
            TokenizedRelation::List(tokenized)
        }
        _ => return Err(mismatch()),
    };

    Ok(TokenizedValue::Related(relation))
}

/// Classifies one scalar leaf and mints its token(s). The precedence order
/// is load-bearing: row and context references win over everything, then
/// the numeric type gate, then the membership forms, and only then the
/// opaque-string default.
fn tokenize_leaf(
    schema: &dyn SchemaProvider,
    table: &str,
    model: &str,
    field: &str,
    numeric: bool,
    value: &FilterValue,
    registry: &mut TokenRegistry,
) -> Result<TokenizedValue> {
    let fragment = match value {
        FilterValue::Row(column) => {
            // Row references name a column of the policy target table, so
            // they validate against `table`, not the model being traversed.
            if schema.field_metadata(table, column).is_none() {
                return Err(CompileError::UnknownField {
                    model: table.to_string(),
                    field: column.clone(),
                });
            }
            fragments::column_ref(PUBLIC_SCHEMA, table, column)
        }
        FilterValue::Context(key) => {
            validate_context_key(key)?;
            if numeric {
                fragments::current_setting_float(key)
            } else {
                fragments::current_setting(key)
            }
        }
        FilterValue::Related(_) => {
            return Err(CompileError::RelationMismatch {
                model: model.to_string(),
                field: field.to_string(),
            });
        }
        _ if numeric => {
            let FilterValue::Scalar(scalar) = value else {
                return Err(numeric_mismatch(field, value));
            };
            if !scalar.is_numeric() {
                return Err(numeric_mismatch(field, value));
            }
            fragments::number(scalar)
        }
        FilterValue::In(values) => {
            // Each element gets its own token so each ends up independently
            // escaped; array order is preserved.
            let tokens = values
                .iter()
                .map(|element| {
                    let fragment = if element.is_numeric() {
                        fragments::number(element)
                    } else {
                        fragments::string_literal(element)
                    };
                    Value::String(registry.mint(fragment).to_string())
                })
                .collect();
            return Ok(TokenizedValue::In(tokens));
        }
        FilterValue::InContext(key) => {
            validate_context_key(key)?;
            fragments::jsonb_array_membership(key)
        }
        FilterValue::Scalar(scalar) => fragments::string_literal(scalar),
    };

    let id = registry.mint(fragment);
    // The token takes the shape the oracle's own type checks expect.
    let token = if numeric {
        Value::Int(id as i64)
    } else {
        Value::String(id.to_string())
    };
    Ok(TokenizedValue::Scalar(token))
}

fn numeric_mismatch(field: &str, value: &FilterValue) -> CompileError {
    let rendered = match value {
        FilterValue::Scalar(v) => v.to_string(),
        FilterValue::In(_) => "{in: [..]}".to_string(),
        FilterValue::InContext(key) => format!("{{in: context({key})}}"),
        other => format!("{other:?}"),
    };
    CompileError::NumericTypeMismatch {
        field: field.to_string(),
        value: rendered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::filter::ListFilter;
    use model::schema::{FieldMetadata, MemorySchema};
    use pgsql_syntax::ast::expr::Expr;

    fn post_schema() -> MemorySchema {
        MemorySchema::new()
            .model(
                "Post",
                vec![
                    FieldMetadata::scalar("id", true),
                    FieldMetadata::scalar("title", false),
                    FieldMetadata::scalar("stock", true),
                    FieldMetadata::relation("tags", "Tag", true),
                    FieldMetadata::relation("author", "User", false),
                ],
            )
            .model(
                "Tag",
                vec![
                    FieldMetadata::scalar("id", true),
                    FieldMetadata::scalar("label", false),
                ],
            )
            .model(
                "User",
                vec![
                    FieldMetadata::scalar("id", true),
                    FieldMetadata::scalar("name", false),
                ],
            )
    }

    fn tree(entries: Vec<(&str, FilterValue)>) -> FilterTree {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn test_unknown_field_is_fatal() {
        let schema = post_schema();
        let mut registry = TokenRegistry::new();
        let filter = tree(vec![("ghost", FilterValue::from("x"))]);

        let err = tokenize(&schema, &filter, "Post", "Post", &mut registry).unwrap_err();
        assert!(matches!(err, CompileError::UnknownField { field, .. } if field == "ghost"));
    }

    #[test]
    fn test_row_reference_validates_against_table() {
        let schema = post_schema();
        let mut registry = TokenRegistry::new();

        let ok = tree(vec![("title", FilterValue::Row("id".to_string()))]);
        tokenize(&schema, &ok, "Post", "Post", &mut registry).expect("valid row reference");

        let bad = tree(vec![(
            "title",
            FilterValue::Row("escape\"--".to_string()),
        )]);
        let err = tokenize(&schema, &bad, "Post", "Post", &mut TokenRegistry::new()).unwrap_err();
        assert!(matches!(err, CompileError::UnknownField { field, .. } if field == "escape\"--"));
    }

    #[test]
    fn test_numeric_type_mismatch() {
        let schema = post_schema();
        let mut registry = TokenRegistry::new();
        let filter = tree(vec![("stock", FilterValue::from("escape'--"))]);

        let err = tokenize(&schema, &filter, "Post", "Post", &mut registry).unwrap_err();
        assert!(matches!(err, CompileError::NumericTypeMismatch { field, .. } if field == "stock"));
    }

    #[test]
    fn test_numeric_field_rejects_in_list() {
        let schema = post_schema();
        let mut registry = TokenRegistry::new();
        let filter = tree(vec![(
            "stock",
            FilterValue::In(vec![Value::Int(1), Value::Int(2)]),
        )]);

        let err = tokenize(&schema, &filter, "Post", "Post", &mut registry).unwrap_err();
        assert!(matches!(err, CompileError::NumericTypeMismatch { .. }));
    }

    #[test]
    fn test_token_shape_follows_field_kind() {
        let schema = post_schema();
        let mut registry = TokenRegistry::new();
        let filter = tree(vec![
            ("stock", FilterValue::from(7i64)),
            ("title", FilterValue::from("hello")),
        ]);

        let tokenized = tokenize(&schema, &filter, "Post", "Post", &mut registry).unwrap();
        assert!(matches!(
            tokenized.get("stock"),
            Some(TokenizedValue::Scalar(Value::Int(_)))
        ));
        assert!(matches!(
            tokenized.get("title"),
            Some(TokenizedValue::Scalar(Value::String(_)))
        ));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_in_list_tokenizes_each_element() {
        let schema = post_schema();
        let mut registry = TokenRegistry::new();
        let filter = tree(vec![(
            "title",
            FilterValue::In(vec![Value::from("a"), Value::from("b")]),
        )]);

        let tokenized = tokenize(&schema, &filter, "Post", "Post", &mut registry).unwrap();
        let Some(TokenizedValue::In(tokens)) = tokenized.get("title") else {
            panic!("expected IN tokens");
        };
        assert_eq!(tokens.len(), 2);
        assert_eq!(registry.len(), 2);
        assert_ne!(tokens[0], tokens[1]);
    }

    #[test]
    fn test_context_fragments_follow_numeric_kind() {
        let schema = post_schema();
        let mut registry = TokenRegistry::new();
        let filter = tree(vec![
            ("stock", FilterValue::Context("item.value".to_string())),
            ("title", FilterValue::Context("post.title".to_string())),
        ]);

        tokenize(&schema, &filter, "Post", "Post", &mut registry).unwrap();

        let fragments: Vec<&Expr> = registry
            .ids()
            .map(|id| registry.fragment(id).unwrap())
            .collect();
        assert!(fragments.iter().any(|f| matches!(f, Expr::Cast { .. })));
        assert!(
            fragments
                .iter()
                .any(|f| matches!(f, Expr::FunctionCall(call) if call.name == "current_setting"))
        );
    }

    #[test]
    fn test_invalid_context_key() {
        let schema = post_schema();
        let mut registry = TokenRegistry::new();
        let filter = tree(vec![(
            "title",
            FilterValue::Context("Bad-Key".to_string()),
        )]);

        let err = tokenize(&schema, &filter, "Post", "Post", &mut registry).unwrap_err();
        assert!(matches!(err, CompileError::Context(_)));
    }

    #[test]
    fn test_relation_recursion_switches_model() {
        let schema = post_schema();
        let mut registry = TokenRegistry::new();
        let nested = tree(vec![("label", FilterValue::from("rust"))]);
        let filter = tree(vec![(
            "tags",
            FilterValue::Related(RelationFilter::List(ListFilter::some(nested))),
        )]);

        let tokenized = tokenize(&schema, &filter, "Post", "Post", &mut registry).unwrap();
        let Some(TokenizedValue::Related(TokenizedRelation::List(list))) = tokenized.get("tags")
        else {
            panic!("expected list relation");
        };
        assert!(list.some.is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_relation_shape_mismatch() {
        let schema = post_schema();
        let mut registry = TokenRegistry::new();

        // Scalar condition on a relation field.
        let filter = tree(vec![("tags", FilterValue::from("x"))]);
        let err = tokenize(&schema, &filter, "Post", "Post", &mut registry).unwrap_err();
        assert!(matches!(err, CompileError::RelationMismatch { .. }));

        // Nested condition on a scalar field.
        let nested = tree(vec![("label", FilterValue::from("x"))]);
        let filter = tree(vec![("title", FilterValue::has_one(nested))]);
        let err = tokenize(&schema, &filter, "Post", "Post", &mut TokenRegistry::new()).unwrap_err();
        assert!(matches!(err, CompileError::RelationMismatch { .. }));
    }
}
