use super::{FilteringSanitizer, Sanitizer, Tokenizer};
use std::collections::HashSet;

/// Replaces each phrase-ending character with a standalone phrase break.
///
/// `"one. two"` becomes `"one .  two"` for a `.` break, so the break always
/// splits into a word of its own.
#[derive(Debug, Clone)]
pub struct PhraseDelimitingSanitizer {
    inner: FilteringSanitizer,
}

impl PhraseDelimitingSanitizer {
    /// Turn every one of `delimiting` into ` <phrase_break> `.
    pub fn new(phrase_break: char, delimiting: impl IntoIterator<Item = char>) -> Self {
        Self {
            inner: FilteringSanitizer::new(format!(" {phrase_break} "), delimiting),
        }
    }
}

impl Sanitizer for PhraseDelimitingSanitizer {
    fn sanitize(&self, text: &str) -> String {
        self.inner.sanitize(text)
    }
}

#[derive(Debug, Clone, Copy)]
struct Word<'a> {
    text: &'a str,
    /// A delimiter came between this word and the one before it.
    spaced: bool,
}

/// Split `text` on `delimiter`, cutting each of `singles` out as a word of its own.
fn split_words<'a>(text: &'a str, delimiter: char, singles: &HashSet<char>) -> Vec<Word<'a>> {
    let mut words = Vec::new();
    let mut start: Option<(usize, bool)> = None;
    let mut spaced = false;
    for (i, c) in text.char_indices() {
        if c != delimiter && !singles.contains(&c) {
            if start.is_none() {
                start = Some((i, spaced));
                spaced = false;
            }
            continue;
        }
        if let Some((from, before)) = start.take() {
            words.push(Word {
                text: &text[from..i],
                spaced: before,
            });
        }
        if c == delimiter {
            spaced = true;
        } else {
            words.push(Word {
                text: &text[i..i + c.len_utf8()],
                spaced,
            });
            spaced = false;
        }
    }
    if let Some((from, before)) = start {
        words.push(Word {
            text: &text[from..],
            spaced: before,
        });
    }
    words
}

fn push_word(token: &mut String, word: &Word<'_>, delimiter: char) {
    if word.spaced && !token.is_empty() {
        token.push(delimiter);
    }
    token.push_str(word.text);
}

/// Word n-grams where some characters are words on their own.
///
/// Each of the single characters splits off from its neighbours even without a
/// delimiter, and is re-joined without one: `"end.next"` gives the words
/// `end`, `.`, `next` and the 2-word tokens `end.` and `.next`.
#[derive(Debug, Clone)]
pub struct NWordWithSingleCharacterWordsTokenizer {
    n: usize,
    delimiter: char,
    singles: HashSet<char>,
}

impl NWordWithSingleCharacterWordsTokenizer {
    /// Tokenizer producing runs of `n` words, with each of `singles` a word by itself.
    pub fn new(n: usize, delimiter: char, singles: impl IntoIterator<Item = char>) -> Self {
        Self {
            n: n.max(1),
            delimiter,
            singles: singles.into_iter().collect(),
        }
    }
}

impl Tokenizer for NWordWithSingleCharacterWordsTokenizer {
    fn tokenize(&self, text: &str, emit: &mut dyn FnMut(&str)) {
        let words = split_words(text, self.delimiter, &self.singles);
        let mut token = String::new();
        for window in words.windows(self.n) {
            token.clear();
            for word in window {
                push_word(&mut token, word, self.delimiter);
            }
            emit(&token);
        }
    }
}

/// Visit every increasing selection of `k` indices out of `0..m`, in lexicographic order.
fn for_each_combination(m: usize, k: usize, mut visit: impl FnMut(&[usize])) {
    if k > m {
        return;
    }
    let mut picked: Vec<usize> = (0..k).collect();
    loop {
        visit(&picked);
        let Some(i) = (0..k).rev().find(|&i| picked[i] < m - k + i) else {
            return;
        };
        picked[i] += 1;
        for j in i + 1..k {
            picked[j] = picked[j - 1] + 1;
        }
    }
}

/// Phrases of `length` words found close together.
///
/// Text is cut into blocks at the phrase break. Inside a block, every word that
/// is not excluded leads phrases: it is combined, in text order, with each
/// choice of `length - 1` non-excluded words among the `proximity - 1` words
/// that follow it. Excluded words still take up room in that window.
///
/// With single words stored (the default for `length > 1`), every non-excluded
/// word is also emitted alone, before the phrases.
#[derive(Debug, Clone)]
pub struct PhraseTokenizer {
    length: usize,
    proximity: usize,
    delimiter: char,
    phrase_break: char,
    excluded: HashSet<String>,
    store_single_words: bool,
}

impl PhraseTokenizer {
    /// Phrases of `length` words spanning at most `proximity` words.
    ///
    /// `proximity` is raised to `length` when smaller.
    pub fn new(
        length: usize,
        proximity: usize,
        delimiter: char,
        phrase_break: char,
        excluded: impl IntoIterator<Item = String>,
    ) -> Self {
        let length = length.max(1);
        Self {
            length,
            proximity: proximity.max(length),
            delimiter,
            phrase_break,
            excluded: excluded.into_iter().collect(),
            store_single_words: length > 1,
        }
    }

    /// Emit each word by itself as well as in phrases.
    pub fn with_single_words(mut self, store_single_words: bool) -> Self {
        self.store_single_words = store_single_words;
        self
    }

    fn is_break(&self, word: &Word<'_>) -> bool {
        let mut chars = word.text.chars();
        chars.next() == Some(self.phrase_break) && chars.next().is_none()
    }

    fn is_excluded(&self, word: &Word<'_>) -> bool {
        self.excluded.contains(word.text)
    }
}

impl Tokenizer for PhraseTokenizer {
    fn tokenize(&self, text: &str, emit: &mut dyn FnMut(&str)) {
        self.phrases(text, &mut |phrase, _| emit(phrase));
    }

    fn phrases(&self, text: &str, emit: &mut dyn FnMut(&str, &[&str])) {
        let singles = HashSet::from([self.phrase_break]);
        let words = split_words(text, self.delimiter, &singles);

        if self.store_single_words && self.length > 1 {
            for word in words.iter().filter(|w| !self.is_break(w) && !self.is_excluded(w)) {
                emit(word.text, &[word.text]);
            }
        }

        let mut token = String::new();
        let mut parts: Vec<&str> = Vec::with_capacity(self.length);
        for block in words.split(|w| self.is_break(w)) {
            for (i, lead) in block.iter().enumerate() {
                if self.is_excluded(lead) {
                    continue;
                }
                if self.length == 1 {
                    emit(lead.text, &[lead.text]);
                    continue;
                }
                let end = (i + self.proximity).min(block.len());
                let followers: Vec<&Word<'_>> = block[i + 1..end]
                    .iter()
                    .filter(|w| !self.is_excluded(w))
                    .collect();
                for_each_combination(followers.len(), self.length - 1, |picked| {
                    token.clear();
                    parts.clear();
                    token.push_str(lead.text);
                    parts.push(lead.text);
                    for &p in picked {
                        push_word(&mut token, followers[p], self.delimiter);
                        parts.push(followers[p].text);
                    }
                    emit(&token, &parts);
                });
            }
        }
    }
}
