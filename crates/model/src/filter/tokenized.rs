use crate::core::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A filter tree with every leaf replaced by an opaque token scalar.
///
/// This is the shape handed to a capture oracle: structurally identical to
/// the declarative tree, but safe to execute because no application value
/// survives in it. Serializable so an out-of-process oracle can transport it.
pub type TokenizedTree = BTreeMap<String, TokenizedValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenizedValue {
    Scalar(Value),
    In(Vec<Value>),
    Related(TokenizedRelation),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenizedRelation {
    Is(TokenizedTree),
    List(TokenizedListFilter),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenizedListFilter {
    pub some: Option<TokenizedTree>,
    pub every: Option<TokenizedTree>,
    pub none: Option<TokenizedTree>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenized_tree_serializes() {
        let mut tree = TokenizedTree::new();
        tree.insert(
            "title".to_string(),
            TokenizedValue::Scalar(Value::String("1000000000".to_string())),
        );
        tree.insert(
            "stock".to_string(),
            TokenizedValue::Scalar(Value::Int(1000000001)),
        );

        let json = serde_json::to_string(&tree).expect("serialize tokenized tree");
        let back: TokenizedTree = serde_json::from_str(&json).expect("deserialize tokenized tree");
        assert_eq!(tree, back);
    }
}
