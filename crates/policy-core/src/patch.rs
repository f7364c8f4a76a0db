//! Splices the recorded AST fragments into the captured query in place of
//! its positional parameter markers.

use crate::error::{CompileError, Result};
use crate::registry::TokenRegistry;
use model::core::value::Value;
use pgsql_syntax::ast::expr::Expr;
use pgsql_syntax::ast::select::Select;
use std::collections::HashSet;

/// Patches `select` in place.
///
/// The capture is a single-row probe, so LIMIT is normalized to the literal
/// 1 and OFFSET is dropped before any parameter bookkeeping happens — that
/// is where engines put their implicit pagination parameters. Afterwards
/// every remaining `$n` marker must correspond to a registry token, and
/// every registry token must be consumed exactly where the oracle placed
/// it; anything else is an invariant violation and fails the compilation.
pub fn patch(select: &mut Select, params: &[Value], registry: &TokenRegistry) -> Result<()> {
    select.limit = Some(Expr::Number("1".to_string()));
    select.offset = None;

    let mut consumed = HashSet::new();
    patch_select(select, params, registry, &mut consumed)?;

    if consumed.len() != registry.len() {
        let missing = registry
            .ids()
            .find(|id| !consumed.contains(id))
            .unwrap_or_default();
        return Err(CompileError::UnresolvedToken(missing));
    }

    Ok(())
}

fn patch_select(
    select: &mut Select,
    params: &[Value],
    registry: &TokenRegistry,
    consumed: &mut HashSet<u32>,
) -> Result<()> {
    for column in &mut select.columns {
        patch_expr(column, params, registry, consumed)?;
    }
    for join in &mut select.joins {
        patch_expr(&mut join.on, params, registry, consumed)?;
    }
    if let Some(where_clause) = &mut select.where_clause {
        patch_expr(where_clause, params, registry, consumed)?;
    }
    for item in &mut select.order_by {
        patch_expr(&mut item.expr, params, registry, consumed)?;
    }
    Ok(())
}

fn patch_expr(
    expr: &mut Expr,
    params: &[Value],
    registry: &TokenRegistry,
    consumed: &mut HashSet<u32>,
) -> Result<()> {
    if let Expr::Parameter(position) = expr {
        let position = *position as usize;
        let bound = position
            .checked_sub(1)
            .and_then(|i| params.get(i))
            .ok_or(CompileError::UnpatchedParameter(position))?;

        let id = registry
            .match_param(bound)
            .ok_or(CompileError::UnpatchedParameter(position))?;

        // Structural replacement: the fragment becomes a first-class
        // subtree, so precedence around it is preserved by the renderer.
        let fragment = registry
            .fragment(id)
            .cloned()
            .ok_or(CompileError::UnresolvedToken(id))?;
        consumed.insert(id);
        *expr = fragment;
        return Ok(());
    }

    match expr {
        Expr::BinaryOp(op) => {
            patch_expr(&mut op.left, params, registry, consumed)?;
            patch_expr(&mut op.right, params, registry, consumed)?;
        }
        Expr::Not(inner) | Expr::Nested(inner) => {
            patch_expr(inner, params, registry, consumed)?;
        }
        Expr::InList { expr, list, .. } => {
            patch_expr(expr, params, registry, consumed)?;
            for elem in list {
                patch_expr(elem, params, registry, consumed)?;
            }
        }
        Expr::IsNull { expr, .. } => {
            patch_expr(expr, params, registry, consumed)?;
        }
        Expr::Exists(select) | Expr::AnySubquery(select) | Expr::Subquery(select) => {
            patch_select(select, params, registry, consumed)?;
        }
        Expr::FunctionCall(call) => {
            for arg in &mut call.args {
                patch_expr(arg, params, registry, consumed)?;
            }
        }
        Expr::Cast { expr, .. } => {
            patch_expr(expr, params, registry, consumed)?;
        }
        Expr::Identifier(_)
        | Expr::Value(_)
        | Expr::Number(_)
        | Expr::StringLit(_)
        | Expr::Literal(_)
        | Expr::Parameter(_) => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragments;
    use pgsql_syntax::dialect::Postgres;
    use pgsql_syntax::parser::parse_select;
    use pgsql_syntax::renderer::render_inline;

    #[test]
    fn test_patch_replaces_tokens_and_normalizes_limit() {
        let mut registry = TokenRegistry::new();
        let id = registry.mint(fragments::string_literal(&Value::from("hello")));

        let mut select = parse_select(
            r#"SELECT 1 FROM "public"."Post" WHERE ("public"."Post"."title" = $1) LIMIT $2 OFFSET $3"#,
        )
        .unwrap();
        let params = vec![
            Value::String(id.to_string()),
            Value::Int(1),
            Value::Int(0),
        ];

        patch(&mut select, &params, &registry).expect("patch succeeds");

        let sql = render_inline(&select, &Postgres);
        assert_eq!(
            sql,
            r#"SELECT 1 FROM "public"."Post" WHERE ("public"."Post"."title" = 'hello') LIMIT 1"#
        );
    }

    #[test]
    fn test_unconsumed_token_fails() {
        let mut registry = TokenRegistry::new();
        let id = registry.mint(fragments::string_literal(&Value::from("hello")));

        // Captured query carries no marker for the minted token.
        let mut select =
            parse_select(r#"SELECT 1 FROM "public"."Post" LIMIT $1 OFFSET $2"#).unwrap();
        let params = vec![Value::Int(1), Value::Int(0)];

        let err = patch(&mut select, &params, &registry).unwrap_err();
        assert!(matches!(err, CompileError::UnresolvedToken(missing) if missing == id));
    }

    #[test]
    fn test_unknown_parameter_fails() {
        let registry = TokenRegistry::new();

        let mut select = parse_select(
            r#"SELECT 1 FROM "public"."Post" WHERE ("public"."Post"."title" = $1) LIMIT $2"#,
        )
        .unwrap();
        let params = vec![Value::String("not-a-token".to_string()), Value::Int(1)];

        let err = patch(&mut select, &params, &registry).unwrap_err();
        assert!(matches!(err, CompileError::UnpatchedParameter(1)));
    }

    #[test]
    fn test_patch_reaches_nested_subqueries() {
        let mut registry = TokenRegistry::new();
        let id = registry.mint(fragments::string_literal(&Value::from("rust")));

        let mut select = parse_select(
            r#"SELECT 1 FROM "public"."Post" WHERE EXISTS(SELECT 1 FROM "public"."Tag" WHERE ("public"."Tag"."postId" = "public"."Post"."id" AND "public"."Tag"."label" = $1)) LIMIT $2"#,
        )
        .unwrap();
        let params = vec![Value::String(id.to_string()), Value::Int(1)];

        patch(&mut select, &params, &registry).expect("patch succeeds");

        let sql = render_inline(&select, &Postgres);
        assert!(sql.contains("'rust'"));
        assert!(!sql.contains('$'));
    }
}
