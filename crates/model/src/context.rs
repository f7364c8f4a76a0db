use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error(
        "context variable \"{0}\" contains invalid characters; keys may only contain lowercase letters, underscores and periods"
    )]
    InvalidKey(String),
}

/// A value the application installs into the session before a query runs.
///
/// String arrays are JSON-encoded so that membership checks can unpack them
/// with `jsonb_array_elements_text` inside a policy expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    String(String),
    Number(f64),
    StringArray(Vec<String>),
}

impl ContextValue {
    /// The string form to store via `set_config`.
    pub fn encode(&self) -> String {
        match self {
            ContextValue::String(s) => s.clone(),
            ContextValue::Number(n) => n.to_string(),
            ContextValue::StringArray(items) => {
                serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
            }
        }
    }
}

/// Validates the shape of a context key before it is spliced into a
/// `current_setting` call. Keys are restricted to lowercase letters,
/// underscores and periods.
pub fn validate_context_key(key: &str) -> Result<(), ContextError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c == '_' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(ContextError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_keys() {
        assert!(validate_context_key("user.id").is_ok());
        assert!(validate_context_key("tenant_id").is_ok());
        assert!(validate_context_key("a.b.c").is_ok());
    }

    #[test]
    fn test_invalid_keys() {
        assert!(validate_context_key("").is_err());
        assert!(validate_context_key("User.Id").is_err());
        assert!(validate_context_key("user-id").is_err());
        assert!(validate_context_key("user id").is_err());
        assert!(validate_context_key("user.id'--").is_err());
    }

    #[test]
    fn test_array_encoding() {
        let value = ContextValue::StringArray(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(value.encode(), r#"["a","b"]"#);
    }
}
