//! End-to-end compilation tests: expression in, closed-form policy SQL out,
//! with the simulated oracle standing in for a live query engine.

use crate::fixtures::blog_schema;
use crate::oracle::SimOracle;
use model::core::value::Value;
use model::filter::{FilterTree, FilterValue};
use policy_core::compile::compile_expression;
use policy_core::error::CompileError;
use policy_core::expression::{Expression, SubQuerySpec};
use policy_core::policy::{Operation, create_policy_statement};

fn tree(entries: Vec<(&str, FilterValue)>) -> FilterTree {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

async fn compile(expression: Expression) -> Result<String, CompileError> {
    let schema = blog_schema();
    let oracle = SimOracle::new(blog_schema());
    compile_expression(&expression, "Post", &schema, &oracle).await
}

#[tokio::test]
async fn test_literal_expression_is_identity() {
    let sql = compile(Expression::literal("true")).await.unwrap();
    assert_eq!(sql, "true");

    let raw = r#"tenant_id = current_setting('app.tenant')"#;
    let sql = compile(Expression::literal(raw)).await.unwrap();
    assert_eq!(sql, raw);
}

#[tokio::test]
async fn test_plain_filter_compiles_to_where_clause() {
    let expression = Expression::filter(|_| tree(vec![("title", "hello".into())]));
    let sql = compile(expression).await.unwrap();
    assert_eq!(sql, r#"("public"."Post"."title" = 'hello')"#);
}

#[tokio::test]
async fn test_string_values_are_escaped() {
    let expression = Expression::filter(|_| tree(vec![("title", "it's".into())]));
    let sql = compile(expression).await.unwrap();
    assert!(sql.contains("'it''s'"), "got: {sql}");

    let expression = Expression::filter(|_| tree(vec![("title", "a\\b".into())]));
    let sql = compile(expression).await.unwrap();
    assert!(sql.contains(" E'a\\\\b'"), "got: {sql}");
}

#[tokio::test]
async fn test_numeric_filter_inlines_number() {
    let expression = Expression::filter(|_| tree(vec![("stock", 5i64.into())]));
    let sql = compile(expression).await.unwrap();
    assert_eq!(sql, r#"("public"."Post"."stock" = 5)"#);
}

#[tokio::test]
async fn test_numeric_field_rejects_strings_before_rendering() {
    let expression = Expression::filter(|_| tree(vec![("stock", "escape'--".into())]));
    let err = compile(expression).await.unwrap_err();
    assert!(
        matches!(err, CompileError::NumericTypeMismatch { ref field, .. } if field == "stock"),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn test_row_reference_compiles_to_column_ref() {
    let expression = Expression::filter(|s| tree(vec![("title", s.row("id"))]));
    let sql = compile(expression).await.unwrap();
    assert_eq!(
        sql,
        r#"("public"."Post"."title" = "public"."Post"."id")"#
    );
}

#[tokio::test]
async fn test_row_reference_to_unknown_column_fails() {
    let expression = Expression::filter(|s| tree(vec![("title", s.row("escape\"--"))]));
    let err = compile(expression).await.unwrap_err();
    assert!(
        matches!(err, CompileError::UnknownField { ref field, .. } if field == "escape\"--"),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn test_numeric_context_reference_is_cast() {
    let expression = Expression::filter(|s| tree(vec![("stock", s.context("item.value"))]));
    let sql = compile(expression).await.unwrap();
    assert!(
        sql.contains("current_setting('item.value')::float"),
        "got: {sql}"
    );
}

#[tokio::test]
async fn test_text_context_reference_is_uncast() {
    let expression = Expression::filter(|s| tree(vec![("title", s.context("post.title"))]));
    let sql = compile(expression).await.unwrap();
    assert_eq!(
        sql,
        r#"("public"."Post"."title" = current_setting('post.title'))"#
    );
}

#[tokio::test]
async fn test_invalid_context_key_fails() {
    let expression = Expression::filter(|s| tree(vec![("title", s.context("Bad-Key"))]));
    let err = compile(expression).await.unwrap_err();
    assert!(matches!(err, CompileError::Context(_)), "got: {err:?}");
}

#[tokio::test]
async fn test_literal_in_list_escapes_each_element() {
    let expression = Expression::filter(|_| {
        tree(vec![(
            "title",
            FilterValue::In(vec![Value::from("a"), Value::from("b'c")]),
        )])
    });
    let sql = compile(expression).await.unwrap();
    assert!(sql.contains("IN ('a', 'b''c')"), "got: {sql}");
}

#[tokio::test]
async fn test_context_array_round_trips_through_encoding() {
    // The application JSON-encodes array context values before installing
    // them; the compiled membership test unpacks the same encoding.
    let value = model::context::ContextValue::StringArray(vec!["a".into(), "b".into()]);
    let encoded = value.encode();
    let decoded: Vec<String> = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, vec!["a".to_string(), "b".to_string()]);

    let expression =
        Expression::filter(|_| tree(vec![("title", FilterValue::InContext("post.titles".into()))]));
    let sql = compile(expression).await.unwrap();
    assert!(sql.contains("current_setting('post.titles')::jsonb"), "got: {sql}");
}

#[tokio::test]
async fn test_context_in_list_uses_jsonb_membership() {
    let expression =
        Expression::filter(|_| tree(vec![("title", FilterValue::InContext("post.title".into()))]));
    let sql = compile(expression).await.unwrap();
    assert!(
        sql.contains("ANY(SELECT jsonb_array_elements_text(current_setting('post.title')::jsonb))"),
        "got: {sql}"
    );
}

#[tokio::test]
async fn test_nested_relation_compiles_to_exists() {
    let expression = Expression::filter(|_| {
        tree(vec![(
            "tags",
            FilterValue::some(tree(vec![("label", "foo".into())])),
        )])
    });
    let sql = compile(expression).await.unwrap();
    assert!(
        sql.contains(r#"EXISTS(SELECT 1 FROM "public"."Tag""#),
        "got: {sql}"
    );
    assert!(sql.contains("'foo'"), "got: {sql}");
    assert!(!sql.contains('$'), "unpatched parameter left in: {sql}");
}

#[tokio::test]
async fn test_every_and_none_quantifiers_negate_exists() {
    let expression = Expression::filter(|_| {
        tree(vec![(
            "tags",
            FilterValue::none(tree(vec![("label", "spam".into())])),
        )])
    });
    let sql = compile(expression).await.unwrap();
    assert!(sql.contains("NOT EXISTS("), "got: {sql}");

    let expression = Expression::filter(|_| {
        tree(vec![(
            "tags",
            FilterValue::every(tree(vec![("label", "ok".into())])),
        )])
    });
    let sql = compile(expression).await.unwrap();
    assert!(sql.contains("NOT EXISTS("), "got: {sql}");
    assert!(sql.contains("NOT ("), "got: {sql}");
}

#[tokio::test]
async fn test_has_one_relation_traverses_related_model() {
    let expression = Expression::filter(|s| {
        tree(vec![(
            "author",
            FilterValue::has_one(tree(vec![("name", s.context("user.name"))])),
        )])
    });
    let sql = compile(expression).await.unwrap();
    assert!(
        sql.contains(r#"EXISTS(SELECT 1 FROM "public"."User""#),
        "got: {sql}"
    );
    assert!(sql.contains("current_setting('user.name')"), "got: {sql}");
}

#[tokio::test]
async fn test_subquery_expression_is_wrapped_in_exists() {
    let expression = Expression::sub_query(|s| {
        SubQuerySpec::new("User", tree(vec![("tenant", s.context("app.tenant"))]))
    });
    let sql = compile(expression).await.unwrap();
    assert!(sql.starts_with("EXISTS(SELECT"), "got: {sql}");
    assert!(sql.contains(r#""public"."User""#), "got: {sql}");
    assert!(sql.contains("current_setting('app.tenant')"), "got: {sql}");
    assert!(sql.contains("LIMIT 1"), "got: {sql}");
    assert!(!sql.contains('$'), "unpatched parameter left in: {sql}");
}

#[tokio::test]
async fn test_unknown_field_fails_before_capture() {
    let expression = Expression::filter(|_| tree(vec![("ghost", "x".into())]));
    let err = compile(expression).await.unwrap_err();
    assert!(
        matches!(err, CompileError::UnknownField { ref field, .. } if field == "ghost"),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn test_concurrent_compilations_do_not_cross_contaminate() {
    let schema = blog_schema();
    let oracle = SimOracle::new(blog_schema());

    let left = Expression::filter(|_| tree(vec![("title", "left-value".into())]));
    let right = Expression::filter(|_| tree(vec![("title", "right-value".into())]));

    let (a, b) = tokio::join!(
        compile_expression(&left, "Post", &schema, &oracle),
        compile_expression(&right, "Post", &schema, &oracle),
    );
    let a = a.unwrap();
    let b = b.unwrap();

    assert!(a.contains("'left-value'") && !a.contains("'right-value'"), "got: {a}");
    assert!(b.contains("'right-value'") && !b.contains("'left-value'"), "got: {b}");
}

#[tokio::test]
async fn test_compiled_expression_embeds_into_policy_statement() {
    let expression =
        Expression::filter(|s| tree(vec![("authorId", s.context("user.id"))]));
    let sql = compile(expression).await.unwrap();

    let statement = create_policy_statement(
        "palisade_ability_read",
        "Post",
        Operation::Select,
        "palisade_role_reader",
        &sql,
    );
    assert!(statement.starts_with("CREATE POLICY palisade_ability_read ON \"public\".\"Post\""));
    assert!(
        statement.contains("USING ((\"public\".\"Post\".\"authorId\" = current_setting('user.id')::float))"),
        "got: {statement}"
    );
}
