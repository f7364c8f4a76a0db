//! The compilation pipeline: expression in, closed-form SQL boolean out.

use crate::error::{CompileError, Result};
use crate::expression::{Expression, Scope};
use crate::oracle::{CaptureOracle, CaptureRequest};
use crate::patch::patch;
use crate::registry::TokenRegistry;
use crate::tokenize::tokenize;
use model::filter::FilterTree;
use model::schema::SchemaProvider;
use pgsql_syntax::ast::expr::Expr;
use pgsql_syntax::dialect::Postgres;
use pgsql_syntax::parser::parse_select;
use pgsql_syntax::renderer::render_inline;
use tracing::debug;

/// How the patched query is serialized back to SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenderMode {
    /// Just the boolean predicate — the expression was a plain filter.
    WhereOnly,
    /// The whole statement wrapped in `EXISTS(...)` — the expression was a
    /// relational subquery.
    ExistsWrapped,
}

/// Compiles `expression` into a SQL boolean condition for `table`, suitable
/// for direct interpolation into `CREATE POLICY ... USING (...)` or
/// `... WITH CHECK (...)`.
///
/// Each call owns a fresh token registry for its whole duration; concurrent
/// compilations are fully independent. The single oracle round trip is the
/// only suspension point. On any failure the compilation aborts — no
/// partial SQL is ever returned.
pub async fn compile_expression(
    expression: &Expression,
    table: &str,
    schema: &dyn SchemaProvider,
    oracle: &dyn CaptureOracle,
) -> Result<String> {
    match expression {
        Expression::Literal(sql) => Ok(sql.clone()),
        Expression::Filter(build) => {
            let filter = build(&Scope);
            compile_filter(filter, table, table, schema, oracle, RenderMode::WhereOnly).await
        }
        Expression::SubQuery(build) => {
            let spec = build(&Scope);
            compile_filter(
                spec.filter,
                table,
                &spec.model,
                schema,
                oracle,
                RenderMode::ExistsWrapped,
            )
            .await
        }
    }
}

async fn compile_filter(
    filter: FilterTree,
    table: &str,
    model: &str,
    schema: &dyn SchemaProvider,
    oracle: &dyn CaptureOracle,
    mode: RenderMode,
) -> Result<String> {
    let mut registry = TokenRegistry::new();
    let tokenized = tokenize(schema, &filter, table, model, &mut registry)?;
    debug!(model, tokens = registry.len(), "tokenized filter");

    let captured = oracle
        .capture(CaptureRequest {
            model: model.to_string(),
            filter: tokenized,
        })
        .await?;
    debug!(
        params = captured.params.len(),
        sql = %captured.sql,
        "captured probe query"
    );

    let mut select = parse_select(&captured.sql)?;
    patch(&mut select, &captured.params, &registry)?;

    let sql = match mode {
        RenderMode::WhereOnly => {
            let predicate = select.where_clause.ok_or(CompileError::MissingPredicate)?;
            render_inline(&predicate, &Postgres)
        }
        RenderMode::ExistsWrapped => render_inline(&Expr::Exists(Box::new(select)), &Postgres),
    };
    debug!(%sql, "rendered policy condition");

    Ok(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{CapturedQuery, OracleError};
    use async_trait::async_trait;
    use model::core::value::Value;
    use model::filter::tokenized::TokenizedValue;
    use model::schema::{FieldMetadata, MemorySchema};

    /// Replays the probe an engine would emit for a single-field equality
    /// filter, echoing the received token back as the bound parameter.
    struct EchoOracle;

    #[async_trait]
    impl CaptureOracle for EchoOracle {
        async fn capture(
            &self,
            request: CaptureRequest,
        ) -> std::result::Result<CapturedQuery, OracleError> {
            let (field, token) = request
                .filter
                .iter()
                .find_map(|(field, value)| match value {
                    TokenizedValue::Scalar(v) => Some((field.clone(), v.clone())),
                    _ => None,
                })
                .ok_or_else(|| OracleError::Rejected("expected a scalar filter".to_string()))?;

            let sql = format!(
                "SELECT 1 FROM \"public\".\"{model}\" WHERE (\"public\".\"{model}\".\"{field}\" = $1) LIMIT $2 OFFSET $3",
                model = request.model,
            );
            Ok(CapturedQuery {
                sql,
                params: vec![token, Value::Int(1), Value::Int(0)],
            })
        }
    }

    fn schema() -> MemorySchema {
        MemorySchema::new().model(
            "Post",
            vec![
                FieldMetadata::scalar("id", true),
                FieldMetadata::scalar("title", false),
            ],
        )
    }

    #[tokio::test]
    async fn test_literal_identity() {
        let expression = Expression::literal("true");
        let sql = compile_expression(&expression, "Post", &schema(), &EchoOracle)
            .await
            .unwrap();
        assert_eq!(sql, "true");
    }

    #[tokio::test]
    async fn test_filter_renders_where_clause_only() {
        let expression = Expression::filter(|_| {
            [("title".to_string(), "hello".into())].into_iter().collect()
        });
        let sql = compile_expression(&expression, "Post", &schema(), &EchoOracle)
            .await
            .unwrap();
        assert_eq!(sql, r#"("public"."Post"."title" = 'hello')"#);
    }

    #[tokio::test]
    async fn test_oracle_failure_aborts() {
        struct FailingOracle;

        #[async_trait]
        impl CaptureOracle for FailingOracle {
            async fn capture(
                &self,
                _request: CaptureRequest,
            ) -> std::result::Result<CapturedQuery, OracleError> {
                Err(OracleError::Failed("connection reset".to_string()))
            }
        }

        let expression = Expression::filter(|_| {
            [("title".to_string(), "hello".into())].into_iter().collect()
        });
        let err = compile_expression(&expression, "Post", &schema(), &FailingOracle)
            .await
            .unwrap_err();
        assert!(matches!(err, CompileError::Oracle(_)));
    }
}
