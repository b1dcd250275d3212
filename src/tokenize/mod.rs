//! Turning element text into tokens.
//!
//! The exact grammar is pluggable through [`Tokenizer`]; this module ships the
//! tokenizers document clustering and phrase counting need:
//!
//! - [`NGramTokenizer`]: every run of `n` consecutive characters.
//! - [`DelimitedNGramTokenizer`]: the same, skipping runs that contain the delimiter.
//! - [`NWordTokenizer`]: every run of `n` consecutive delimiter-separated words,
//!   re-joined with a single delimiter.
//! - [`NWordWithSingleCharacterWordsTokenizer`]: word runs where some characters
//!   always stand alone.
//! - [`PhraseTokenizer`]: nearby word combinations inside a sentence.
//!
//! Text is cleaned first by a [`SanitizerChain`], and [`TokenizingService`] drives
//! both over a whole element set in parallel.

mod phrase;
mod sanitize;
mod service;

pub use phrase::{NWordWithSingleCharacterWordsTokenizer, PhraseDelimitingSanitizer, PhraseTokenizer};
pub use sanitize::{CaseSanitizer, FilteringSanitizer, Sanitizer, SanitizerChain, TrimmingSanitizer};
pub use service::TokenizingService;

/// Splits a sanitized string into tokens.
pub trait Tokenizer: Send + Sync {
    /// Call `emit` once per token of `text`, in order.
    fn tokenize(&self, text: &str, emit: &mut dyn FnMut(&str));

    /// Call `emit` once per token together with the words it was built from.
    ///
    /// Tokenizers without a notion of phrases report each token as its only word.
    fn phrases(&self, text: &str, emit: &mut dyn FnMut(&str, &[&str])) {
        self.tokenize(text, &mut |token| emit(token, &[token]));
    }

    /// Collect the tokens of `text`.
    fn tokens(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        self.tokenize(text, &mut |token| out.push(token.to_string()));
        out
    }
}

/// Character n-grams.
#[derive(Debug, Clone)]
pub struct NGramTokenizer {
    n: usize,
}

impl NGramTokenizer {
    /// Tokenizer producing `n`-character grams.
    pub fn new(n: usize) -> Self {
        Self { n: n.max(1) }
    }
}

impl Tokenizer for NGramTokenizer {
    fn tokenize(&self, text: &str, emit: &mut dyn FnMut(&str)) {
        let chars: Vec<char> = text.chars().collect();
        let mut token = String::new();
        for window in chars.windows(self.n) {
            token.clear();
            token.extend(window);
            emit(&token);
        }
    }
}

/// Character n-grams that never contain the delimiter.
#[derive(Debug, Clone)]
pub struct DelimitedNGramTokenizer {
    n: usize,
    delimiter: char,
}

impl DelimitedNGramTokenizer {
    /// Tokenizer producing `n`-character grams free of `delimiter`.
    pub fn new(n: usize, delimiter: char) -> Self {
        Self {
            n: n.max(1),
            delimiter,
        }
    }
}

impl Tokenizer for DelimitedNGramTokenizer {
    fn tokenize(&self, text: &str, emit: &mut dyn FnMut(&str)) {
        let mut token = String::new();
        for word in text.split(self.delimiter) {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(self.n) {
                token.clear();
                token.extend(window);
                emit(&token);
            }
        }
    }
}

/// Word n-grams.
#[derive(Debug, Clone)]
pub struct NWordTokenizer {
    n: usize,
    delimiter: char,
}

impl NWordTokenizer {
    /// Tokenizer producing runs of `n` words separated by `delimiter`.
    pub fn new(n: usize, delimiter: char) -> Self {
        Self {
            n: n.max(1),
            delimiter,
        }
    }
}

impl Tokenizer for NWordTokenizer {
    fn tokenize(&self, text: &str, emit: &mut dyn FnMut(&str)) {
        let words: Vec<&str> = text
            .split(self.delimiter)
            .filter(|word| !word.is_empty())
            .collect();
        let mut token = String::new();
        let mut separator = [0u8; 4];
        let separator = self.delimiter.encode_utf8(&mut separator);
        for window in words.windows(self.n) {
            token.clear();
            for (i, word) in window.iter().enumerate() {
                if i > 0 {
                    token.push_str(separator);
                }
                token.push_str(word);
            }
            emit(&token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ngrams() {
        let t = NGramTokenizer::new(3);
        assert_eq!(t.tokens("abcd"), vec!["abc", "bcd"]);
        assert!(t.tokens("ab").is_empty());
        assert_eq!(NGramTokenizer::new(5).tokens("apple pie")[0], "apple");
    }

    #[test]
    fn delimited_ngrams_skip_the_delimiter() {
        let t = DelimitedNGramTokenizer::new(3, ' ');
        assert_eq!(t.tokens("abcd ef  ghi"), vec!["abc", "bcd", "ghi"]);
        assert_eq!(DelimitedNGramTokenizer::new(5, ' ').tokens("apple pie"), vec!["apple"]);
    }

    #[test]
    fn nwords_slide_over_words() {
        let t = NWordTokenizer::new(2, ' ');
        assert_eq!(t.tokens("  the quick  brown fox"), vec!["the quick", "quick brown", "brown fox"]);
        assert!(t.tokens("single").is_empty());
        assert_eq!(NWordTokenizer::new(1, ',').tokens("a,b"), vec!["a", "b"]);
    }

    #[test]
    fn multibyte_characters_count_as_one() {
        let t = NGramTokenizer::new(2);
        assert_eq!(t.tokens("héé"), vec!["hé", "éé"]);
    }
}
