//! Constructors for the AST fragments that replace tokens after capture.
//!
//! Fragments are first-class expression subtrees, spliced into the parsed
//! query structurally so they render correctly regardless of surrounding
//! operator precedence.

use model::core::value::Value;
use pgsql_syntax::ast::expr::{Expr, FunctionCall, Ident};
use pgsql_syntax::ast::select::Select;

/// A reference to a column of the policy target table,
/// `"schema"."table"."column"`.
pub fn column_ref(schema: &str, table: &str, column: &str) -> Expr {
    Expr::Identifier(Ident::new([schema, table, column]))
}

/// `current_setting('key')` — reads a context value installed by the
/// application, compared as text.
pub fn current_setting(key: &str) -> Expr {
    Expr::FunctionCall(FunctionCall {
        name: "current_setting".to_string(),
        args: vec![Expr::StringLit(key.to_string())],
    })
}

/// `current_setting('key')::float` — context value compared against a
/// numeric column.
pub fn current_setting_float(key: &str) -> Expr {
    Expr::Cast {
        expr: Box::new(current_setting(key)),
        data_type: "float".to_string(),
    }
}

/// A numeric literal. Only ever built from native numbers, which is what
/// keeps numeric columns injection-free without quoting.
pub fn number(value: &Value) -> Expr {
    match value {
        Value::Int(v) => Expr::Number(v.to_string()),
        Value::Float(v) => Expr::Number(v.to_string()),
        other => Expr::Number(other.to_string()),
    }
}

/// A string literal; the dialect escapes it at render time.
pub fn string_literal(value: &Value) -> Expr {
    Expr::StringLit(value.to_string())
}

/// `ANY(SELECT jsonb_array_elements_text(current_setting('key')::jsonb))` —
/// membership test against a JSON-encoded array stored in a session
/// setting. Replaces the right-hand side of an equality comparison.
pub fn jsonb_array_membership(key: &str) -> Expr {
    let elements = Expr::FunctionCall(FunctionCall {
        name: "jsonb_array_elements_text".to_string(),
        args: vec![Expr::Cast {
            expr: Box::new(current_setting(key)),
            data_type: "jsonb".to_string(),
        }],
    });

    Expr::AnySubquery(Box::new(Select {
        columns: vec![elements],
        ..Select::default()
    }))
}
