use super::{
    CaseSanitizer, DelimitedNGramTokenizer, FilteringSanitizer, NGramTokenizer, NWordTokenizer,
    PhraseDelimitingSanitizer, PhraseTokenizer, SanitizerChain, Tokenizer, TrimmingSanitizer,
};
use crate::config::{AnalysisConfig, TokenizingMethod};
use crate::error::Result;
use crate::graph::{ElementId, ElementSource, ElementType};
use crate::handler::{PhraseTokenHandler, TokenHandler};
use crate::partition::{CancelFlag, WorkPartitioner};

/// Stands between phrase blocks once sanitized.
const PHRASE_BREAK: char = '.';

/// Sanitizes and tokenizes element text in parallel, feeding a [`TokenHandler`].
pub struct TokenizingService {
    sanitizer: SanitizerChain,
    tokenizer: Box<dyn Tokenizer>,
}

impl std::fmt::Debug for TokenizingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenizingService")
            .field("sanitizer", &self.sanitizer)
            .finish_non_exhaustive()
    }
}

impl TokenizingService {
    /// A service from explicit parts.
    pub fn new(sanitizer: SanitizerChain, tokenizer: impl Tokenizer + 'static) -> Self {
        Self {
            sanitizer,
            tokenizer: Box::new(tokenizer),
        }
    }

    /// The service used for document clustering.
    ///
    /// Text is case folded, then every filtered character becomes the delimiter,
    /// then the configured tokenizer runs.
    pub fn for_clustering(config: &AnalysisConfig) -> Self {
        let sanitizer = SanitizerChain::new()
            .then(CaseSanitizer::new(config.case_sensitive))
            .then(FilteringSanitizer::with_delimiter(
                config.delimiter,
                config.filtered_characters.iter().copied(),
            ));
        let n = config.token_length;
        let tokenizer: Box<dyn Tokenizer> = match config.tokenizing_method {
            TokenizingMethod::NGrams => Box::new(NGramTokenizer::new(n)),
            TokenizingMethod::DelimitedNGrams => Box::new(DelimitedNGramTokenizer::new(n, config.delimiter)),
            TokenizingMethod::NWords => Box::new(NWordTokenizer::new(n, config.delimiter)),
        };
        Self { sanitizer, tokenizer }
    }

    /// The service used for pairwise n-gram comparison.
    ///
    /// Text is case folded and cut at the first `,` (or `@` with `remove_domain`),
    /// then split into character n-grams.
    pub fn for_pairwise(config: &AnalysisConfig) -> Self {
        let trim: &[char] = if config.remove_domain { &['@', ','] } else { &[','] };
        Self::new(
            SanitizerChain::new()
                .then(CaseSanitizer::new(config.case_sensitive))
                .then(TrimmingSanitizer::new(trim.iter().copied())),
            NGramTokenizer::new(config.token_length),
        )
    }

    /// The service used for phrase counting.
    ///
    /// Text is case folded, word delimiters become the delimiter, apostrophes are
    /// dropped, and phrase delimiters become standalone breaks. Phrases are then
    /// built per [`PhraseTokenizer`].
    pub fn for_phrases(config: &AnalysisConfig) -> Self {
        let phrases = &config.phrases;
        let sanitizer = SanitizerChain::new()
            .then(CaseSanitizer::new(config.case_sensitive))
            .then(FilteringSanitizer::with_delimiter(
                config.delimiter,
                phrases.word_delimiters.iter().copied(),
            ))
            .then(FilteringSanitizer::new("", ['\'']))
            .then(PhraseDelimitingSanitizer::new(
                PHRASE_BREAK,
                phrases.phrase_delimiters.iter().copied(),
            ));
        let excluded = phrases.excluded_words.iter().map(|word| {
            if config.case_sensitive {
                word.clone()
            } else {
                word.to_lowercase()
            }
        });
        let tokenizer = PhraseTokenizer::new(
            phrases.phrase_length,
            phrases.proximity,
            config.delimiter,
            PHRASE_BREAK,
            excluded,
        )
        .with_single_words(phrases.store_single_words);
        Self::new(sanitizer, tokenizer)
    }

    /// Tokens of one string, after sanitizing.
    pub fn tokens(&self, text: &str) -> Vec<String> {
        self.tokenizer.tokens(&self.sanitizer.apply(text))
    }

    /// Tokenize `attribute` of every element in `elements` into `handler`.
    ///
    /// The partitioner is reset to `elements.len()` units; each worker reads its
    /// chunk of elements from `source`. Elements without a value are skipped.
    #[allow(clippy::too_many_arguments)]
    pub fn run<S: ElementSource + ?Sized>(
        &self,
        source: &S,
        element_type: ElementType,
        attribute: &str,
        elements: &[ElementId],
        handler: &dyn TokenHandler,
        partitioner: &mut WorkPartitioner,
        cancel: Option<&CancelFlag>,
    ) -> Result<()> {
        self.run_with(source, element_type, attribute, elements, partitioner, cancel, |token, element, _| {
            handler.register_token(token, element)
        })
    }

    /// Like [`run`](Self::run), recording phrases and their words in `handler`.
    ///
    /// Single words stored by the tokenizer arrive as one-word phrases.
    #[allow(clippy::too_many_arguments)]
    pub fn run_phrases<S: ElementSource + ?Sized>(
        &self,
        source: &S,
        element_type: ElementType,
        attribute: &str,
        elements: &[ElementId],
        handler: &PhraseTokenHandler,
        partitioner: &mut WorkPartitioner,
        cancel: Option<&CancelFlag>,
    ) -> Result<()> {
        self.run_with(source, element_type, attribute, elements, partitioner, cancel, |phrase, element, words| {
            handler.register_phrase(phrase, element, words, false)
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn run_with<S, F>(
        &self,
        source: &S,
        element_type: ElementType,
        attribute: &str,
        elements: &[ElementId],
        partitioner: &mut WorkPartitioner,
        cancel: Option<&CancelFlag>,
        register: F,
    ) -> Result<()>
    where
        S: ElementSource + ?Sized,
        F: Fn(&str, ElementId, &[&str]) + Sync,
    {
        partitioner.reset_for(elements.len());
        partitioner.run_phase("tokenizing", cancel, |chunk| {
            for &element in &elements[chunk.range()] {
                let Some(text) = source.string_value(element_type, attribute, element) else {
                    continue;
                };
                let clean = self.sanitizer.apply(&text);
                self.tokenizer
                    .phrases(&clean, &mut |token, words| register(token, element, words));
            }
            Ok(())
        })?;
        tracing::debug!(elements = elements.len(), attribute, "tokenized");
        Ok(())
    }
}
