use model::core::value::Value;
use pgsql_syntax::ast::expr::Expr;
use std::collections::HashMap;

/// Base for token ids. Large enough that no genuine filter value below it
/// will ever be mistaken for a token by the patcher.
const TOKEN_BASE: u32 = 1_000_000_000;

/// Issues opaque token ids and stores the AST fragment each one stands for.
///
/// A registry belongs to exactly one compilation: it is created inside the
/// compile call, passed explicitly to the tokenizer and patcher, and dropped
/// when the call returns. Ids come from a per-registry monotonic counter, so
/// they are collision-free by construction.
#[derive(Debug, Default)]
pub struct TokenRegistry {
    next: u32,
    fragments: HashMap<u32, Expr>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self {
            next: TOKEN_BASE,
            fragments: HashMap::new(),
        }
    }

    /// Mints a fresh token for `fragment` and returns its id.
    pub fn mint(&mut self, fragment: Expr) -> u32 {
        let id = self.next;
        self.next += 1;
        self.fragments.insert(id, fragment);
        id
    }

    pub fn fragment(&self, id: u32) -> Option<&Expr> {
        self.fragments.get(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.fragments.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Matches an oracle-bound parameter value against a token id. Tokens
    /// travel as numbers on numeric fields and as decimal strings elsewhere,
    /// so both encodings are recognized.
    pub fn match_param(&self, value: &Value) -> Option<u32> {
        let id = match value {
            Value::Int(v) => u32::try_from(*v).ok()?,
            Value::Float(v) if v.fract() == 0.0 && *v >= 0.0 => *v as u32,
            Value::String(s) => s.parse::<u32>().ok()?,
            _ => return None,
        };
        self.fragments.contains_key(&id).then_some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_is_monotonic() {
        let mut registry = TokenRegistry::new();
        let a = registry.mint(Expr::Number("1".to_string()));
        let b = registry.mint(Expr::Number("2".to_string()));
        assert_eq!(b, a + 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_match_param_encodings() {
        let mut registry = TokenRegistry::new();
        let id = registry.mint(Expr::Number("42".to_string()));

        assert_eq!(registry.match_param(&Value::Int(id as i64)), Some(id));
        assert_eq!(registry.match_param(&Value::String(id.to_string())), Some(id));
        assert_eq!(registry.match_param(&Value::Float(id as f64)), Some(id));
        assert_eq!(registry.match_param(&Value::Int(1)), None);
        assert_eq!(registry.match_param(&Value::String("nope".to_string())), None);
    }

    #[test]
    fn test_registries_are_independent() {
        let mut a = TokenRegistry::new();
        let mut b = TokenRegistry::new();
        let id_a = a.mint(Expr::Number("1".to_string()));
        let id_b = b.mint(Expr::Number("2".to_string()));

        // Same id space, disjoint contents: each registry only resolves its
        // own fragment.
        assert_eq!(id_a, id_b);
        assert_eq!(a.fragment(id_a), Some(&Expr::Number("1".to_string())));
        assert_eq!(b.fragment(id_b), Some(&Expr::Number("2".to_string())));
    }
}
