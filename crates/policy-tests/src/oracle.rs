//! A simulated capture oracle.
//!
//! Plans the same single-row probe a query engine would run for a tokenized
//! filter — qualified column comparisons, correlated `EXISTS` subqueries
//! for relation traversal, `IN` lists, and the trailing LIMIT/OFFSET
//! parameter pair — and reports the rendered SQL with its positional
//! parameters.

use async_trait::async_trait;
use model::core::value::Value;
use model::filter::tokenized::{TokenizedRelation, TokenizedTree, TokenizedValue};
use model::schema::{FieldKind, SchemaProvider};
use pgsql_syntax::ast::common::TableRef;
use pgsql_syntax::ast::expr::{BinaryOperator, Expr, Ident};
use pgsql_syntax::builder::select::SelectBuilder;
use pgsql_syntax::dialect::Postgres;
use pgsql_syntax::renderer::{Render, Renderer};
use policy_core::oracle::{CaptureOracle, CaptureRequest, CapturedQuery, OracleError};
use tracing::debug;

pub struct SimOracle<S> {
    schema: S,
}

impl<S: SchemaProvider> SimOracle<S> {
    pub fn new(schema: S) -> Self {
        Self { schema }
    }

    fn plan_tree(&self, model: &str, tree: &TokenizedTree) -> Result<Option<Expr>, OracleError> {
        let mut conditions = Vec::new();

        for (field, value) in tree {
            match value {
                TokenizedValue::Scalar(token) => {
                    conditions.push(Expr::binary(
                        column(model, field),
                        BinaryOperator::Eq,
                        Expr::Value(token.clone()),
                    ));
                }
                TokenizedValue::In(tokens) => {
                    conditions.push(Expr::InList {
                        expr: Box::new(column(model, field)),
                        list: tokens.iter().map(|t| Expr::Value(t.clone())).collect(),
                        negated: false,
                    });
                }
                TokenizedValue::Related(relation) => {
                    conditions.extend(self.plan_relation(model, field, relation)?);
                }
            }
        }

        Ok(Expr::and_all(conditions))
    }

    fn plan_relation(
        &self,
        model: &str,
        field: &str,
        relation: &TokenizedRelation,
    ) -> Result<Vec<Expr>, OracleError> {
        let meta = self.schema.field_metadata(model, field).ok_or_else(|| {
            OracleError::Rejected(format!("unknown relation '{field}' on '{model}'"))
        })?;
        let FieldKind::Relation { list, related } = meta.kind else {
            return Err(OracleError::Rejected(format!(
                "field '{field}' on '{model}' is not a relation"
            )));
        };

        let mut conditions = Vec::new();
        match relation {
            TokenizedRelation::Is(nested) => {
                if list {
                    return Err(OracleError::Rejected(format!(
                        "relation '{field}' on '{model}' is list-valued"
                    )));
                }
                // Has-one: related.id = model.<field>Id
                let join = Expr::binary(
                    column(&related, "id"),
                    BinaryOperator::Eq,
                    column(model, &format!("{field}Id")),
                );
                conditions.push(self.exists_probe(&related, join, nested, false)?);
            }
            TokenizedRelation::List(filter) => {
                if !list {
                    return Err(OracleError::Rejected(format!(
                        "relation '{field}' on '{model}' is not list-valued"
                    )));
                }
                // Has-many: related.<model>Id = model.id
                let fk = format!("{}Id", lowercase_first(model));
                if let Some(nested) = &filter.some {
                    let join = Expr::binary(
                        column(&related, &fk),
                        BinaryOperator::Eq,
                        column(model, "id"),
                    );
                    conditions.push(self.exists_probe(&related, join, nested, false)?);
                }
                if let Some(nested) = &filter.every {
                    // Every: no related row may violate the nested filter.
                    let join = Expr::binary(
                        column(&related, &fk),
                        BinaryOperator::Eq,
                        column(model, "id"),
                    );
                    let probe = self.exists_probe(&related, join, nested, true)?;
                    conditions.push(Expr::Not(Box::new(probe)));
                }
                if let Some(nested) = &filter.none {
                    let join = Expr::binary(
                        column(&related, &fk),
                        BinaryOperator::Eq,
                        column(model, "id"),
                    );
                    let probe = self.exists_probe(&related, join, nested, false)?;
                    conditions.push(Expr::Not(Box::new(probe)));
                }
            }
        }
        Ok(conditions)
    }

    fn exists_probe(
        &self,
        related: &str,
        join: Expr,
        nested: &TokenizedTree,
        negate_nested: bool,
    ) -> Result<Expr, OracleError> {
        let nested_expr = self.plan_tree(related, nested)?;
        let nested_expr = match (nested_expr, negate_nested) {
            (Some(expr), true) => Some(Expr::Not(Box::new(Expr::Nested(Box::new(expr))))),
            (expr, _) => expr,
        };

        let where_expr = match nested_expr {
            Some(expr) => Expr::binary(join, BinaryOperator::And, expr),
            None => join,
        };

        let select = SelectBuilder::new()
            .select(vec![Expr::Number("1".to_string())])
            .from(TableRef::qualified("public", related), None)
            .where_clause(where_expr)
            .build();

        Ok(Expr::Exists(Box::new(select)))
    }
}

#[async_trait]
impl<S: SchemaProvider> CaptureOracle for SimOracle<S> {
    async fn capture(&self, request: CaptureRequest) -> Result<CapturedQuery, OracleError> {
        let where_expr = self.plan_tree(&request.model, &request.filter)?;

        let select = SelectBuilder::new()
            .select(vec![Expr::Number("1".to_string())])
            .from(TableRef::qualified("public", &request.model), None)
            .where_opt(where_expr)
            .limit(Expr::Value(Value::Int(1)))
            .offset(Expr::Value(Value::Int(0)))
            .build();

        let dialect = Postgres;
        let mut renderer = Renderer::new(&dialect);
        select.render(&mut renderer);
        let (sql, params) = renderer.finish();
        debug!(%sql, params = params.len(), "simulated capture");

        Ok(CapturedQuery { sql, params })
    }
}

fn column(model: &str, field: &str) -> Expr {
    Expr::Identifier(Ident::new(["public", model, field]))
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::blog_schema;
    use model::filter::tokenized::TokenizedListFilter;
    use pgsql_syntax::parser::parse_select;

    async fn capture(request: CaptureRequest) -> CapturedQuery {
        let oracle = SimOracle::new(blog_schema());
        oracle.capture(request).await.expect("capture")
    }

    #[tokio::test]
    async fn test_captured_sql_parses_back() {
        let mut filter = TokenizedTree::new();
        filter.insert(
            "title".to_string(),
            TokenizedValue::Scalar(Value::String("1000000000".to_string())),
        );

        let captured = capture(CaptureRequest {
            model: "Post".to_string(),
            filter,
        })
        .await;

        assert_eq!(captured.params.len(), 3);
        parse_select(&captured.sql).expect("captured SQL parses");
    }

    #[tokio::test]
    async fn test_relation_probe_uses_exists() {
        let mut nested = TokenizedTree::new();
        nested.insert(
            "label".to_string(),
            TokenizedValue::Scalar(Value::String("1000000000".to_string())),
        );
        let mut filter = TokenizedTree::new();
        filter.insert(
            "tags".to_string(),
            TokenizedValue::Related(TokenizedRelation::List(TokenizedListFilter {
                some: Some(nested),
                ..TokenizedListFilter::default()
            })),
        );

        let captured = capture(CaptureRequest {
            model: "Post".to_string(),
            filter,
        })
        .await;

        assert!(captured.sql.contains("EXISTS(SELECT 1 FROM \"public\".\"Tag\""));
        assert!(captured.sql.contains("\"public\".\"Tag\".\"postId\" = \"public\".\"Post\".\"id\""));
        parse_select(&captured.sql).expect("captured SQL parses");
    }
}
