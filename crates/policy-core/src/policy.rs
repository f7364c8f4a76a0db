//! Ability definitions and the policy naming / statement formatting that
//! surrounds a compiled expression.
//!
//! Provisioning (roles, grants, applying the statements) stays outside this
//! crate; callers feed the formatted statements to their own migration or
//! setup layer.

use crate::expression::Expression;
use pgsql_syntax::dialect::escape_identifier;
use sha2::{Digest, Sha256};
use std::fmt;

pub const ABILITY_PREFIX: &str = "palisade_ability_";
pub const ROLE_PREFIX: &str = "palisade_role_";

/// Postgres truncates role and policy names at NAMEDATALEN - 1 bytes.
const MAX_NAME_LEN: usize = 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operation::Select => "SELECT",
            Operation::Insert => "INSERT",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A named access rule: one operation on one model, guarded by an
/// expression.
#[derive(Debug)]
pub struct Ability {
    pub slug: String,
    pub description: Option<String>,
    pub operation: Operation,
    pub expression: Expression,
}

impl Ability {
    pub fn new(slug: &str, operation: Operation, expression: Expression) -> Self {
        Self {
            slug: slug.to_string(),
            description: None,
            operation,
            expression,
        }
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// Keeps only lowercase alphanumerics and underscores, mapping the first
/// dash to an underscore first.
pub fn sanitize_slug(slug: &str) -> String {
    slug.to_lowercase()
        .replacen('-', "_", 1)
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect()
}

/// Hashes `name` and prefixes it, keeping the result inside the Postgres
/// identifier length cap.
pub fn hash_with_prefix(prefix: &str, name: &str) -> String {
    let digest = Sha256::digest(name.as_bytes());
    let hex = format!("{digest:x}");
    let keep = MAX_NAME_LEN - prefix.len();
    format!("{prefix}{}", &hex[..keep.min(hex.len())])
}

/// Derives the policy name shared by an ability and its dedicated role.
pub fn ability_policy_name(model: &str, slug: &str) -> String {
    sanitize_slug(&hash_with_prefix(
        ABILITY_PREFIX,
        &format!("{model}_{slug}"),
    ))
}

/// Derives the database role name for an application role.
pub fn role_name(name: &str) -> String {
    sanitize_slug(&hash_with_prefix(ROLE_PREFIX, name))
}

/// Formats the `CREATE POLICY` statement around a compiled expression.
/// INSERT policies check new rows, so they take the expression as
/// `WITH CHECK`; every other operation uses `USING`.
pub fn create_policy_statement(
    policy: &str,
    table: &str,
    operation: Operation,
    role: &str,
    expression_sql: &str,
) -> String {
    let table = escape_identifier(table);
    match operation {
        Operation::Insert => format!(
            "CREATE POLICY {policy} ON \"public\".{table} FOR {operation} TO {role} WITH CHECK ({expression_sql});"
        ),
        _ => format!(
            "CREATE POLICY {policy} ON \"public\".{table} FOR {operation} TO {role} USING ({expression_sql});"
        ),
    }
}

/// Formats the `ALTER POLICY` statement used when an ability's expression
/// changed.
pub fn alter_policy_statement(
    policy: &str,
    table: &str,
    operation: Operation,
    role: &str,
    expression_sql: &str,
) -> String {
    let table = escape_identifier(table);
    match operation {
        Operation::Insert => format!(
            "ALTER POLICY {policy} ON \"public\".{table} TO {role} WITH CHECK ({expression_sql});"
        ),
        _ => format!(
            "ALTER POLICY {policy} ON \"public\".{table} TO {role} USING ({expression_sql});"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_slug() {
        assert_eq!(sanitize_slug("Read-All"), "read_all");
        assert_eq!(sanitize_slug("own posts!"), "ownposts");
        assert_eq!(sanitize_slug("a-b-c"), "a_bc");
    }

    #[test]
    fn test_names_fit_postgres_limit() {
        let name = ability_policy_name("SomeVeryLongModelName", "a-rather-long-ability-slug");
        assert!(name.len() <= 63);
        assert!(name.starts_with(ABILITY_PREFIX));

        let role = role_name("tenant-admin");
        assert!(role.len() <= 63);
        assert!(role.starts_with(ROLE_PREFIX));
    }

    #[test]
    fn test_names_are_stable() {
        assert_eq!(
            ability_policy_name("Post", "read"),
            ability_policy_name("Post", "read")
        );
        assert_ne!(
            ability_policy_name("Post", "read"),
            ability_policy_name("Post", "update")
        );
    }

    #[test]
    fn test_policy_statements() {
        let create = create_policy_statement(
            "palisade_ability_abc",
            "Post",
            Operation::Select,
            "palisade_role_xyz",
            "true",
        );
        assert_eq!(
            create,
            "CREATE POLICY palisade_ability_abc ON \"public\".\"Post\" FOR SELECT TO palisade_role_xyz USING (true);"
        );

        let insert = create_policy_statement(
            "palisade_ability_abc",
            "Post",
            Operation::Insert,
            "palisade_role_xyz",
            "true",
        );
        assert!(insert.contains("WITH CHECK (true)"));
        assert!(!insert.contains("USING"));
    }
}
