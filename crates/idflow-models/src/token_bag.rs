//! Token accumulator filled during a single sign-in attempt.

use std::collections::HashMap;

/// Maps a token type to a token value.
///
/// One entry per processed identifier; a later token of the same type replaces the
/// earlier one. `Debug` prints only the token types.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TokenBag {
    tokens: HashMap<String, String>,
}

impl TokenBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the token for `token_type`.
    pub fn add_token(&mut self, token_type: impl Into<String>, token: impl Into<String>) {
        self.tokens.insert(token_type.into(), token.into());
    }

    pub fn get(&self, token_type: &str) -> Option<&str> {
        self.tokens.get(token_type).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tokens.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn token_types(&self) -> impl Iterator<Item = &str> {
        self.tokens.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for TokenBag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.token_types().collect();
        types.sort_unstable();
        f.debug_struct("TokenBag").field("token_types", &types).finish()
    }
}
