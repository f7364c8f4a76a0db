//! Parses captured SQL text into the [`Select`] AST.

use crate::ast::{
    common::{JoinKind, OrderDir, TableRef},
    expr::{BinaryOperator, Expr, FunctionCall, Ident},
    select::{FromClause, JoinClause, OrderByExpr, Select},
};
use crate::error::SqlSyntaxError;
use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use tracing::debug;

#[derive(Parser)]
#[grammar = "grammar/pgsql.pest"]
struct PgSqlParser;

type Result<T> = std::result::Result<T, SqlSyntaxError>;

/// Parses a single SELECT statement of the captured-query subset.
pub fn parse_select(sql: &str) -> Result<Select> {
    let mut pairs = PgSqlParser::parse(Rule::program, sql)
        .map_err(|e| SqlSyntaxError::Parse(e.to_string()))?;
    let program = pairs
        .next()
        .ok_or_else(|| SqlSyntaxError::Parse("empty input".to_string()))?;
    let stmt = program
        .into_inner()
        .find(|p| p.as_rule() == Rule::select_stmt)
        .ok_or_else(|| SqlSyntaxError::Parse("missing SELECT statement".to_string()))?;

    let select = build_select(stmt)?;
    debug!(columns = select.columns.len(), "parsed captured query");
    Ok(select)
}

fn build_select(pair: Pair<Rule>) -> Result<Select> {
    let mut select = Select::default();

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::select_list => {
                for item in part.into_inner() {
                    select.columns.push(build_expr(item)?);
                }
            }
            Rule::from_clause => select.from = Some(build_from(part)?),
            Rule::join_clause => select.joins.push(build_join(part)?),
            Rule::where_clause => {
                let expr = part
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::expr)
                    .ok_or_else(|| SqlSyntaxError::Parse("empty WHERE clause".to_string()))?;
                select.where_clause = Some(build_expr(expr)?);
            }
            Rule::order_by_clause => {
                for item in part.into_inner() {
                    if item.as_rule() == Rule::order_item {
                        select.order_by.push(build_order_item(item)?);
                    }
                }
            }
            Rule::limit_clause => select.limit = clause_expr(part)?,
            Rule::offset_clause => select.offset = clause_expr(part)?,
            _ => {}
        }
    }

    Ok(select)
}

fn clause_expr(pair: Pair<Rule>) -> Result<Option<Expr>> {
    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::expr {
            return Ok(Some(build_expr(inner)?));
        }
    }
    Ok(None)
}

fn build_from(pair: Pair<Rule>) -> Result<FromClause> {
    let mut table = None;
    let mut alias = None;
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::table_name => table = Some(build_table_name(part)?),
            Rule::table_alias => alias = Some(build_alias(part)?),
            _ => {}
        }
    }
    let table = table.ok_or_else(|| SqlSyntaxError::Parse("FROM without a table".to_string()))?;
    Ok(FromClause { table, alias })
}

fn build_join(pair: Pair<Rule>) -> Result<JoinClause> {
    let mut kind = JoinKind::Inner;
    let mut table = None;
    let mut alias = None;
    let mut on = None;
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::join_kind => {
                if part.into_inner().any(|p| p.as_rule() == Rule::kw_left) {
                    kind = JoinKind::Left;
                }
            }
            Rule::table_name => table = Some(build_table_name(part)?),
            Rule::table_alias => alias = Some(build_alias(part)?),
            Rule::expr => on = Some(build_expr(part)?),
            _ => {}
        }
    }
    let table = table.ok_or_else(|| SqlSyntaxError::Parse("JOIN without a table".to_string()))?;
    let on = on.ok_or_else(|| SqlSyntaxError::Parse("JOIN without a condition".to_string()))?;
    Ok(JoinClause {
        kind,
        table,
        alias,
        on,
    })
}

fn build_table_name(pair: Pair<Rule>) -> Result<TableRef> {
    let parts = pair
        .into_inner()
        .filter(|p| p.as_rule() == Rule::name_part)
        .map(unquote_name_part)
        .collect::<Vec<_>>();
    match parts.as_slice() {
        [name] => Ok(TableRef::new(name)),
        [schema, name] => Ok(TableRef::qualified(schema, name)),
        _ => Err(SqlSyntaxError::Parse("malformed table name".to_string())),
    }
}

fn build_alias(pair: Pair<Rule>) -> Result<String> {
    pair.into_inner()
        .find(|p| p.as_rule() == Rule::name_part)
        .map(unquote_name_part)
        .ok_or_else(|| SqlSyntaxError::Parse("empty alias".to_string()))
}

fn build_order_item(pair: Pair<Rule>) -> Result<OrderByExpr> {
    let mut expr = None;
    let mut direction = None;
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::expr => expr = Some(build_expr(part)?),
            Rule::order_dir => {
                direction = Some(match part.as_str().to_ascii_uppercase().as_str() {
                    "DESC" => OrderDir::Desc,
                    _ => OrderDir::Asc,
                });
            }
            _ => {}
        }
    }
    let expr =
        expr.ok_or_else(|| SqlSyntaxError::Parse("ORDER BY without an expression".to_string()))?;
    Ok(OrderByExpr { expr, direction })
}

fn build_expr(pair: Pair<Rule>) -> Result<Expr> {
    match pair.as_rule() {
        Rule::expr => fold_binary(pair, BinaryOperator::Or, build_expr),
        Rule::and_expr => fold_binary(pair, BinaryOperator::And, build_expr),
        Rule::not_expr => {
            let mut inner = pair.into_inner();
            let first = inner
                .next()
                .ok_or_else(|| SqlSyntaxError::Parse("empty expression".to_string()))?;
            if first.as_rule() == Rule::kw_not {
                let operand = inner
                    .next()
                    .ok_or_else(|| SqlSyntaxError::Parse("NOT without an operand".to_string()))?;
                Ok(Expr::Not(Box::new(build_expr(operand)?)))
            } else {
                build_expr(first)
            }
        }
        Rule::predicate => {
            let inner = single_inner(pair)?;
            build_expr(inner)
        }
        Rule::exists_expr => {
            let stmt = pair
                .into_inner()
                .find(|p| p.as_rule() == Rule::select_stmt)
                .ok_or_else(|| SqlSyntaxError::Parse("EXISTS without a subquery".to_string()))?;
            Ok(Expr::Exists(Box::new(build_select(stmt)?)))
        }
        Rule::comparison => build_comparison(pair),
        Rule::operand => build_operand(pair),
        _ => Err(SqlSyntaxError::Unsupported(format!(
            "unexpected rule {:?}",
            pair.as_rule()
        ))),
    }
}

/// Folds `a OP b OP c` sequences left-associatively, skipping keyword pairs.
fn fold_binary(
    pair: Pair<Rule>,
    op: BinaryOperator,
    build: impl Fn(Pair<Rule>) -> Result<Expr>,
) -> Result<Expr> {
    let mut acc: Option<Expr> = None;
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::kw_or | Rule::kw_and => {}
            _ => {
                let expr = build(part)?;
                acc = Some(match acc {
                    Some(left) => Expr::binary(left, op, expr),
                    None => expr,
                });
            }
        }
    }
    acc.ok_or_else(|| SqlSyntaxError::Parse("empty expression".to_string()))
}

fn build_comparison(pair: Pair<Rule>) -> Result<Expr> {
    let mut inner = pair.into_inner();
    let operand = inner
        .next()
        .ok_or_else(|| SqlSyntaxError::Parse("empty comparison".to_string()))?;
    let left = build_operand(operand)?;

    let Some(tail) = inner.next() else {
        return Ok(left);
    };

    let mut negated = false;
    let mut op = None;
    let mut right = None;
    let mut in_list = None;
    let mut is_null = false;

    for part in tail.into_inner() {
        match part.as_rule() {
            Rule::cmp_op => op = Some(comparison_operator(part.as_str())?),
            Rule::operand => right = Some(build_operand(part)?),
            Rule::in_tail => {
                let mut list = Vec::new();
                for elem in part.into_inner() {
                    match elem.as_rule() {
                        Rule::kw_not => negated = true,
                        Rule::expr_list => {
                            for e in elem.into_inner() {
                                list.push(build_expr(e)?);
                            }
                        }
                        _ => {}
                    }
                }
                in_list = Some(list);
            }
            Rule::is_tail => {
                is_null = true;
                negated = part.into_inner().any(|p| p.as_rule() == Rule::kw_not);
            }
            _ => {}
        }
    }

    if let Some(list) = in_list {
        return Ok(Expr::InList {
            expr: Box::new(left),
            list,
            negated,
        });
    }
    if is_null {
        return Ok(Expr::IsNull {
            expr: Box::new(left),
            negated,
        });
    }
    match (op, right) {
        (Some(op), Some(right)) => Ok(Expr::binary(left, op, right)),
        _ => Err(SqlSyntaxError::Parse(
            "comparison without a right-hand side".to_string(),
        )),
    }
}

fn comparison_operator(text: &str) -> Result<BinaryOperator> {
    Ok(match text {
        "=" => BinaryOperator::Eq,
        "<>" | "!=" => BinaryOperator::NotEq,
        "<" => BinaryOperator::Lt,
        "<=" => BinaryOperator::LtEq,
        ">" => BinaryOperator::Gt,
        ">=" => BinaryOperator::GtEq,
        other => {
            return Err(SqlSyntaxError::Unsupported(format!(
                "comparison operator {other}"
            )));
        }
    })
}

fn build_operand(pair: Pair<Rule>) -> Result<Expr> {
    let mut expr = None;
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::primary => expr = Some(build_primary(part)?),
            Rule::cast_suffix => {
                let base = expr.take().ok_or_else(|| {
                    SqlSyntaxError::Parse("cast without an expression".to_string())
                })?;
                let data_type = part
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::ident)
                    .map(|p| p.as_str().to_string())
                    .ok_or_else(|| SqlSyntaxError::Parse("cast without a type".to_string()))?;
                expr = Some(Expr::Cast {
                    expr: Box::new(base),
                    data_type,
                });
            }
            _ => {}
        }
    }
    expr.ok_or_else(|| SqlSyntaxError::Parse("empty operand".to_string()))
}

fn build_primary(pair: Pair<Rule>) -> Result<Expr> {
    let inner = single_inner(pair)?;
    match inner.as_rule() {
        Rule::parameter => {
            let index = inner.as_str()[1..]
                .parse::<u32>()
                .map_err(|_| SqlSyntaxError::Parse("malformed parameter marker".to_string()))?;
            Ok(Expr::Parameter(index))
        }
        Rule::number => Ok(Expr::Number(inner.as_str().to_string())),
        Rule::string_lit => Ok(Expr::StringLit(unquote_string(inner.as_str()))),
        Rule::subquery => {
            let stmt = inner
                .into_inner()
                .find(|p| p.as_rule() == Rule::select_stmt)
                .ok_or_else(|| SqlSyntaxError::Parse("empty subquery".to_string()))?;
            Ok(Expr::Subquery(Box::new(build_select(stmt)?)))
        }
        Rule::paren_expr => {
            // Parens are dropped here; binary operators re-parenthesize on
            // render, so grouping survives without nesting.
            let expr = inner
                .into_inner()
                .find(|p| p.as_rule() == Rule::expr)
                .ok_or_else(|| SqlSyntaxError::Parse("empty parenthesized group".to_string()))?;
            build_expr(expr)
        }
        Rule::function_call => {
            let mut name = String::new();
            let mut args = Vec::new();
            for part in inner.into_inner() {
                match part.as_rule() {
                    Rule::ident => name = part.as_str().to_string(),
                    Rule::expr_list => {
                        for e in part.into_inner() {
                            args.push(build_expr(e)?);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Expr::FunctionCall(FunctionCall { name, args }))
        }
        Rule::qualified_ident => {
            let parts = inner
                .into_inner()
                .filter(|p| p.as_rule() == Rule::name_part)
                .map(unquote_name_part)
                .collect::<Vec<_>>();
            Ok(Expr::Identifier(Ident { parts }))
        }
        other => Err(SqlSyntaxError::Unsupported(format!(
            "unexpected rule {other:?}"
        ))),
    }
}

fn single_inner(pair: Pair<Rule>) -> Result<Pair<Rule>> {
    pair.into_inner()
        .next()
        .ok_or_else(|| SqlSyntaxError::Parse("empty node".to_string()))
}

fn unquote_name_part(pair: Pair<Rule>) -> String {
    let text = pair.as_str();
    if text.starts_with('"') && text.ends_with('"') && text.len() >= 2 {
        text[1..text.len() - 1].replace("\"\"", "\"")
    } else {
        text.to_string()
    }
}

fn unquote_string(text: &str) -> String {
    text[1..text.len() - 1].replace("''", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_probe() {
        let select = parse_select(
            r#"SELECT 1 FROM "public"."Post" WHERE ("public"."Post"."title" = $1) LIMIT $2 OFFSET $3"#,
        )
        .expect("parse probe");

        assert_eq!(select.columns, vec![Expr::Number("1".to_string())]);
        let from = select.from.expect("from clause");
        assert_eq!(from.table.schema.as_deref(), Some("public"));
        assert_eq!(from.table.name, "Post");
        assert_eq!(select.limit, Some(Expr::Parameter(2)));
        assert_eq!(select.offset, Some(Expr::Parameter(3)));

        let Some(Expr::BinaryOp(op)) = select.where_clause else {
            panic!("expected comparison in where clause");
        };
        assert_eq!(op.op, BinaryOperator::Eq);
        assert_eq!(op.right, Expr::Parameter(1));
    }

    #[test]
    fn test_parse_exists_and_in() {
        let select = parse_select(
            r#"SELECT 1 FROM "public"."Post" WHERE ("public"."Post"."title" IN ($1, $2) AND EXISTS(SELECT 1 FROM "public"."Tag" WHERE ("public"."Tag"."postId" = "public"."Post"."id" AND "public"."Tag"."label" = $3))) LIMIT $4"#,
        )
        .expect("parse exists");

        let where_clause = select.where_clause.expect("where clause");
        let rendered = format!("{where_clause:?}");
        assert!(rendered.contains("InList"));
        assert!(rendered.contains("Exists"));
    }

    #[test]
    fn test_parse_not_and_cast() {
        let select = parse_select(
            r#"SELECT 1 FROM "t" WHERE NOT ("t"."flag" = $1::float) LIMIT 1"#,
        )
        .expect("parse cast");

        let rendered = format!("{:?}", select.where_clause.expect("where clause"));
        assert!(rendered.contains("Not"));
        assert!(rendered.contains("Cast"));
        assert_eq!(select.limit, Some(Expr::Number("1".to_string())));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_select("DELETE FROM x").is_err());
        assert!(parse_select("SELECT 1 FROM").is_err());
        assert!(parse_select("").is_err());
    }
}
