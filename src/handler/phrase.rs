use super::{hash_token, TokenHandler, TokenId, TokenTable};
use crate::graph::ElementId;
use crate::matrix::{Index, TaggedSparseMatrix};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// Counts single words and phrases in one matrix, telling them apart by column tag.
///
/// A column tagged `true` is a phrase; `false` is a single word. The first tag a
/// column receives sticks. Each phrase also remembers the token ids of the words
/// it was built from.
#[derive(Debug, Default)]
pub struct PhraseTokenHandler {
    matrix: TaggedSparseMatrix<i32>,
    constituents: Mutex<HashMap<TokenId, HashSet<TokenId>>>,
    tokens: TokenTable,
}

impl PhraseTokenHandler {
    /// An empty handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of `phrase` in `element`.
    ///
    /// `words` are the phrase's constituent single words. With
    /// `store_single_words`, each word is also counted as a token of its own.
    /// A one-word phrase is treated as a single word.
    pub fn register_phrase(&self, phrase: &str, element: ElementId, words: &[&str], store_single_words: bool) {
        if words.len() <= 1 {
            self.register_token(phrase, element);
            return;
        }
        let id = self.count(phrase, element, true);
        let word_ids: HashSet<TokenId> = words.iter().map(|word| hash_token(word)).collect();
        self.constituents
            .lock()
            .entry(id)
            .or_default()
            .extend(word_ids);

        if store_single_words {
            for word in words {
                self.register_token(word, element);
            }
        }
    }

    /// Token ids of the words making up `phrase`, empty for single words.
    pub fn constituents(&self, phrase: TokenId) -> HashSet<TokenId> {
        self.constituents
            .lock()
            .get(&phrase)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether `token` was first seen as a phrase.
    pub fn is_phrase(&self, token: TokenId) -> bool {
        self.matrix.tag(Index::from(token)) == Some(true)
    }

    /// The tagged frequency matrix: columns are tokens, rows are elements.
    pub fn matrix(&self) -> &TaggedSparseMatrix<i32> {
        &self.matrix
    }

    /// Reverse token lookup.
    pub fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    fn count(&self, token: &str, element: ElementId, phrase: bool) -> TokenId {
        let id = hash_token(token);
        self.tokens.record(id, token);
        let col = Index::from(id);
        self.matrix.increment(Index::from(element), col, 1);
        self.matrix.tag_column(col, phrase);
        id
    }
}

impl TokenHandler for PhraseTokenHandler {
    fn register_token(&self, token: &str, element: ElementId) {
        self.count(token, element, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phrases_and_words_are_tagged() {
        let h = PhraseTokenHandler::new();
        h.register_phrase("ice cream", 1, &["ice", "cream"], true);
        h.register_phrase("ice cream", 2, &["ice", "cream"], false);
        h.register_token("cone", 2);

        let phrase = hash_token("ice cream");
        assert!(h.is_phrase(phrase));
        assert!(!h.is_phrase(hash_token("ice")));
        assert!(!h.is_phrase(hash_token("cone")));
        assert_eq!(h.matrix().get(2, Index::from(phrase)), Some(1));
        assert_eq!(h.matrix().get(1, Index::from(hash_token("cream"))), Some(1));
        assert_eq!(h.matrix().get(2, Index::from(hash_token("cream"))), None);

        let parts = h.constituents(phrase);
        assert_eq!(parts.len(), 2);
        assert!(parts.contains(&hash_token("ice")));
        assert!(h.constituents(hash_token("cone")).is_empty());
    }

    #[test]
    fn first_tag_sticks() {
        let h = PhraseTokenHandler::new();
        h.register_token("new york", 1);
        h.register_phrase("new york", 2, &["new", "york"], false);
        assert!(!h.is_phrase(hash_token("new york")));
        assert_eq!(h.matrix().column_size(Index::from(hash_token("new york"))), 2);
    }

    #[test]
    fn one_word_phrase_is_a_word() {
        let h = PhraseTokenHandler::new();
        h.register_phrase("solo", 3, &["solo"], true);
        assert!(!h.is_phrase(hash_token("solo")));
        assert_eq!(h.matrix().get(3, Index::from(hash_token("solo"))), Some(1));
    }
}
