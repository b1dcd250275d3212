//! Token handlers: where tokenizers put what they find.
//!
//! Every handler receives `(token, element)` pairs from many worker threads at once
//! and records them in a sparse structure:
//!
//! - [`DefaultTokenHandler`]: a plain `token -> (element -> frequency)` matrix, the
//!   input to vector clustering.
//! - [`PairwiseComparisonTokenHandler`]: frequencies split into element chunks, plus
//!   per-element token cardinality, the input to pairwise similarity.
//! - [`PhraseTokenHandler`]: a tagged matrix separating single words from phrases,
//!   with each phrase's constituent words on the side.
//!
//! Tokens are identified by [`hash_token`]. Distinct strings may collide on the
//! same id; that loss is accepted. Each handler keeps its own [`TokenTable`] for
//! reverse lookup, so independent runs never share state.

mod pairwise;
mod phrase;

pub use pairwise::PairwiseComparisonTokenHandler;
pub use phrase::PhraseTokenHandler;

use crate::graph::ElementId;
use crate::matrix::{Index, SparseMatrix};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Identifier of a hashed token.
pub type TokenId = u32;

/// Receives tokens from tokenizing workers.
pub trait TokenHandler: Send + Sync {
    /// Record one occurrence of `token` in `element`.
    fn register_token(&self, token: &str, element: ElementId);
}

/// Hash a token string to its id.
///
/// Polynomial string hash (base 31) over the token's characters, wrapping in `u32`.
pub fn hash_token(token: &str) -> TokenId {
    token
        .chars()
        .fold(0u32, |h, c| h.wrapping_mul(31).wrapping_add(c as u32))
}

/// Reverse lookup from token id to the first string seen with that id.
#[derive(Debug, Default)]
pub struct TokenTable {
    strings: RwLock<HashMap<TokenId, String>>,
}

impl TokenTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `token` under `id` unless something is already there.
    pub fn record(&self, id: TokenId, token: &str) {
        if self.strings.read().contains_key(&id) {
            return;
        }
        self.strings
            .write()
            .entry(id)
            .or_insert_with(|| token.to_string());
    }

    /// The string recorded for `id`.
    pub fn lookup(&self, id: TokenId) -> Option<String> {
        self.strings.read().get(&id).cloned()
    }

    /// Number of distinct ids recorded.
    pub fn len(&self) -> usize {
        self.strings.read().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.strings.read().is_empty()
    }
}

/// Counts token occurrences in a `token -> (element -> frequency)` matrix.
#[derive(Debug, Default)]
pub struct DefaultTokenHandler {
    matrix: SparseMatrix<i32>,
    tokens: TokenTable,
}

impl DefaultTokenHandler {
    /// An empty handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// The frequency matrix: columns are tokens, rows are elements.
    pub fn matrix(&self) -> &SparseMatrix<i32> {
        &self.matrix
    }

    /// Reverse token lookup.
    pub fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    /// Frequency of `token` in `element`.
    pub fn frequency(&self, token: &str, element: ElementId) -> i32 {
        self.matrix
            .get_or_zero(Index::from(element), Index::from(hash_token(token)))
    }

    /// Take the matrix, dropping the token table.
    pub fn into_matrix(self) -> SparseMatrix<i32> {
        self.matrix
    }
}

impl TokenHandler for DefaultTokenHandler {
    fn register_token(&self, token: &str, element: ElementId) {
        let id = hash_token(token);
        self.tokens.record(id, token);
        self.matrix
            .increment(Index::from(element), Index::from(id), 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_and_distinguishes() {
        assert_eq!(hash_token("apple"), hash_token("apple"));
        assert_ne!(hash_token("apple"), hash_token("apply"));
        assert_eq!(hash_token(""), 0);
    }

    #[test]
    fn default_handler_counts() {
        let h = DefaultTokenHandler::new();
        h.register_token("abc", 1);
        h.register_token("abc", 1);
        h.register_token("abc", 2);
        h.register_token("xyz", 2);

        assert_eq!(h.frequency("abc", 1), 2);
        assert_eq!(h.frequency("abc", 2), 1);
        assert_eq!(h.frequency("xyz", 1), 0);
        assert_eq!(h.matrix().num_columns(), 2);
        assert_eq!(h.tokens().lookup(hash_token("xyz")).as_deref(), Some("xyz"));
        assert_eq!(h.tokens().len(), 2);
    }

    #[test]
    fn token_table_keeps_first_string() {
        let t = TokenTable::new();
        t.record(7, "first");
        t.record(7, "second");
        assert_eq!(t.lookup(7).as_deref(), Some("first"));
        assert!(t.lookup(8).is_none());
    }
}
