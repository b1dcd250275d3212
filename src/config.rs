//! Run configuration.
//!
//! [`AnalysisConfig`] is a plain record: it can be built in code with the `with_*`
//! setters or deserialized from JSON. Every field has a default, so a partial
//! document is enough.
//!
//! ```rust
//! use tokensim::config::{AnalysisConfig, FollowUpChoice};
//!
//! let config = AnalysisConfig::from_json(r#"{ "attribute": "Label", "number_of_means": 3 }"#).unwrap();
//! assert_eq!(config.number_of_means, 3);
//! assert_eq!(config.follow_up, FollowUpChoice::Cluster);
//! ```

use crate::error::{Error, Result};
use crate::graph::ElementType;
use crate::similarity::SimilarityMethod;
use serde::{Deserialize, Serialize};

/// How strings are split into tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizingMethod {
    /// Every run of `token_length` consecutive characters.
    #[default]
    NGrams,
    /// Character n-grams that never span the delimiter.
    DelimitedNGrams,
    /// Every run of `token_length` consecutive delimiter-separated words.
    NWords,
}

/// How the significance threshold for a token's document frequency is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMethod {
    /// Fraction of all elements that must (or must not) contain the token.
    #[default]
    Appearance,
    /// Percentile rank among all tokens ordered by document frequency.
    Rank,
}

/// What to do with the results once they are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpChoice {
    /// Create one named selection per cluster.
    MakeSelections,
    /// Write the cluster of each element into the named-cluster attribute.
    #[default]
    Cluster,
    /// Add one similarity edge per similar pair.
    AddTransactions,
}

/// Which elements take part in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementScope {
    /// Every element of the configured type.
    #[default]
    All,
    /// Only selected elements (pairwise runs compare them against everything).
    SelectedOnly,
}

/// Common English words left out of phrases.
pub const ENGLISH_BASIC: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "he", "her", "his",
    "i", "if", "in", "is", "it", "its", "of", "on", "or", "she", "so", "that", "the", "their", "there", "they",
    "this", "to", "was", "we", "were", "will", "with", "you",
];

/// Settings for phrase counting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhraseConfig {
    /// Words per phrase.
    pub phrase_length: usize,
    /// Most words a phrase may span, counting its first and last word.
    pub proximity: usize,
    /// Words never used in a phrase, compared after case folding.
    pub excluded_words: Vec<String>,
    /// Characters that separate words, as the delimiter does.
    pub word_delimiters: Vec<char>,
    /// Characters that end a phrase block.
    pub phrase_delimiters: Vec<char>,
    /// Count every word alone as well as inside phrases.
    pub store_single_words: bool,
}

impl Default for PhraseConfig {
    fn default() -> Self {
        Self {
            phrase_length: 2,
            proximity: 2,
            excluded_words: ENGLISH_BASIC.iter().map(|w| w.to_string()).collect(),
            word_delimiters: vec![',', ':', '"', '(', ')', '[', ']', '{', '}', '/', '\\', '|', '-', '_', '\t', '\r'],
            phrase_delimiters: vec!['.', '!', '?', ';', '\n'],
            store_single_words: true,
        }
    }
}

impl PhraseConfig {
    /// Set phrase length and proximity.
    pub fn with_length(mut self, phrase_length: usize, proximity: usize) -> Self {
        self.phrase_length = phrase_length;
        self.proximity = proximity;
        self
    }

    /// Replace the excluded words.
    pub fn with_excluded_words<S: Into<String>>(mut self, words: impl IntoIterator<Item = S>) -> Self {
        self.excluded_words = words.into_iter().map(Into::into).collect();
        self
    }

    /// Set whether single words are counted too.
    pub fn with_single_words(mut self, store_single_words: bool) -> Self {
        self.store_single_words = store_single_words;
        self
    }
}

/// Configuration for a tokenizing + similarity/clustering run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// String attribute holding each element's text.
    pub attribute: String,
    /// Whether vertices or transactions are analysed.
    pub element_type: ElementType,
    /// Keep case when tokenizing.
    pub case_sensitive: bool,
    /// Use presence (1) instead of counts when weighting vectors.
    pub binary_space: bool,
    /// Tokenizer selection.
    pub tokenizing_method: TokenizingMethod,
    /// Characters per n-gram, or words per n-word.
    pub token_length: usize,
    /// Word delimiter for delimited tokenizers.
    pub delimiter: char,
    /// Characters replaced by the delimiter before tokenizing.
    pub filtered_characters: Vec<char>,
    /// Pairwise runs: drop everything from the first `@` (as well as the first `,`).
    pub remove_domain: bool,
    /// Similarity threshold in `[0, 1]`; also the token significance threshold.
    pub threshold: f32,
    /// How the significance threshold is interpreted.
    pub threshold_method: ThresholdMethod,
    /// Keep tokens above (rather than below) the significance threshold.
    pub significant_above_threshold: bool,
    /// Exponent applied to a token's relative document frequency.
    pub weighting_exponent: f32,
    /// k for k-means.
    pub number_of_means: i64,
    /// Follow-up action.
    pub follow_up: FollowUpChoice,
    /// Element scope.
    pub element_scope: ElementScope,
    /// Pairwise similarity function.
    pub similarity: SimilarityMethod,
    /// Upper bound on worker threads.
    pub max_threads: usize,
    /// Upper bound on elements per chunk (and units per worker).
    pub max_chunk_size: usize,
    /// Upper bound on emitted similar pairs.
    pub max_results: usize,
    /// Seed for k-means; `None` draws one from entropy.
    pub seed: Option<u64>,
    /// Phrase counting settings.
    pub phrases: PhraseConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            attribute: String::new(),
            element_type: ElementType::Vertex,
            case_sensitive: false,
            binary_space: true,
            tokenizing_method: TokenizingMethod::NGrams,
            token_length: 3,
            delimiter: ' ',
            filtered_characters: Vec::new(),
            remove_domain: false,
            threshold: 0.5,
            threshold_method: ThresholdMethod::Appearance,
            significant_above_threshold: false,
            weighting_exponent: 0.0,
            number_of_means: 5,
            follow_up: FollowUpChoice::Cluster,
            element_scope: ElementScope::All,
            similarity: SimilarityMethod::BinaryEuclidean,
            max_threads: 8,
            max_chunk_size: 1000,
            max_results: 1_000_000,
            seed: None,
            phrases: PhraseConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Default configuration reading `attribute`.
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            ..Self::default()
        }
    }

    /// Parse from JSON and validate.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the element type.
    pub fn with_element_type(mut self, element_type: ElementType) -> Self {
        self.element_type = element_type;
        self
    }

    /// Set case sensitivity.
    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Set binary vs count space.
    pub fn with_binary_space(mut self, binary_space: bool) -> Self {
        self.binary_space = binary_space;
        self
    }

    /// Set tokenizer and token length.
    pub fn with_tokenizing(mut self, method: TokenizingMethod, token_length: usize) -> Self {
        self.tokenizing_method = method;
        self.token_length = token_length;
        self
    }

    /// Set the delimiter.
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the characters to filter out.
    pub fn with_filtered_characters(mut self, filtered: impl IntoIterator<Item = char>) -> Self {
        self.filtered_characters = filtered.into_iter().collect();
        self
    }

    /// Cut pairwise text at the first `@`.
    pub fn with_remove_domain(mut self, remove_domain: bool) -> Self {
        self.remove_domain = remove_domain;
        self
    }

    /// Set the threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set how token significance is decided.
    pub fn with_significance(mut self, method: ThresholdMethod, above: bool) -> Self {
        self.threshold_method = method;
        self.significant_above_threshold = above;
        self
    }

    /// Set the weighting exponent.
    pub fn with_weighting_exponent(mut self, exponent: f32) -> Self {
        self.weighting_exponent = exponent;
        self
    }

    /// Set k.
    pub fn with_number_of_means(mut self, k: i64) -> Self {
        self.number_of_means = k;
        self
    }

    /// Set the follow-up action.
    pub fn with_follow_up(mut self, follow_up: FollowUpChoice) -> Self {
        self.follow_up = follow_up;
        self
    }

    /// Set the element scope.
    pub fn with_element_scope(mut self, scope: ElementScope) -> Self {
        self.element_scope = scope;
        self
    }

    /// Set the similarity function.
    pub fn with_similarity(mut self, similarity: SimilarityMethod) -> Self {
        self.similarity = similarity;
        self
    }

    /// Set thread and chunk limits.
    pub fn with_limits(mut self, max_threads: usize, max_chunk_size: usize) -> Self {
        self.max_threads = max_threads;
        self.max_chunk_size = max_chunk_size;
        self
    }

    /// Set the maximum number of emitted pairs.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Fix the k-means seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the phrase counting settings.
    pub fn with_phrases(mut self, phrases: PhraseConfig) -> Self {
        self.phrases = phrases;
        self
    }

    /// Check the settings shared by every run.
    pub fn validate(&self) -> Result<()> {
        if self.attribute.trim().is_empty() {
            return Err(Error::invalid("attribute", "must name a string attribute"));
        }
        if self.token_length == 0 {
            return Err(Error::invalid("token_length", "must be at least 1"));
        }
        if !self.threshold.is_finite() || !(0.0..=1.0).contains(&self.threshold) {
            return Err(Error::invalid(
                "threshold",
                format!("must be within [0, 1], got {}", self.threshold),
            ));
        }
        if !self.weighting_exponent.is_finite() {
            return Err(Error::invalid("weighting_exponent", "must be finite"));
        }
        if self.max_threads == 0 {
            return Err(Error::invalid("max_threads", "must be at least 1"));
        }
        if self.max_chunk_size == 0 {
            return Err(Error::invalid("max_chunk_size", "must be at least 1"));
        }
        if self.follow_up == FollowUpChoice::AddTransactions && self.element_type == ElementType::Transaction {
            return Err(Error::invalid(
                "follow_up",
                "similarity edges join vertices; compare vertices to add them",
            ));
        }
        Ok(())
    }

    /// Check the settings a phrase run additionally needs.
    pub fn validate_for_phrases(&self) -> Result<()> {
        self.validate()?;
        if self.phrases.phrase_length == 0 {
            return Err(Error::invalid("phrase_length", "must be at least 1"));
        }
        if self.phrases.proximity < self.phrases.phrase_length {
            return Err(Error::invalid(
                "proximity",
                format!(
                    "must be at least the phrase length {}, got {}",
                    self.phrases.phrase_length, self.phrases.proximity
                ),
            ));
        }
        Ok(())
    }

    /// Check the settings a k-means run additionally needs.
    pub fn validate_for_clustering(&self) -> Result<()> {
        self.validate()?;
        if self.number_of_means < 2 {
            return Err(Error::InvalidClusterCount {
                requested: self.number_of_means,
                minimum: 2,
            });
        }
        if self.follow_up == FollowUpChoice::AddTransactions {
            return Err(Error::invalid(
                "follow_up",
                "k-means produces clusters, not pairs; choose cluster or make_selections",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_need_an_attribute() {
        assert!(AnalysisConfig::default().validate().is_err());
        assert!(AnalysisConfig::new("Label").validate().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        let base = AnalysisConfig::new("Label");
        assert!(base.clone().with_threshold(1.5).validate().is_err());
        assert!(base.clone().with_threshold(f32::NAN).validate().is_err());
        assert!(base.clone().with_tokenizing(TokenizingMethod::NGrams, 0).validate().is_err());
        assert!(base.clone().with_limits(0, 10).validate().is_err());
        assert!(base.clone().with_limits(4, 0).validate().is_err());
    }

    #[test]
    fn edges_need_vertex_elements() {
        let config = AnalysisConfig::new("Note").with_follow_up(FollowUpChoice::AddTransactions);
        assert!(config.clone().validate().is_ok());
        let err = config.with_element_type(ElementType::Transaction).validate();
        assert!(matches!(err, Err(Error::InvalidParameter { name: "follow_up", .. })));
    }

    #[test]
    fn phrases_cannot_outgrow_their_window() {
        let base = AnalysisConfig::new("Body");
        assert!(base.validate_for_phrases().is_ok());
        let wide = base.clone().with_phrases(PhraseConfig::default().with_length(3, 5));
        assert!(wide.validate_for_phrases().is_ok());
        let narrow = base.clone().with_phrases(PhraseConfig::default().with_length(3, 2));
        assert!(matches!(narrow.validate_for_phrases(), Err(Error::InvalidParameter { name: "proximity", .. })));
        let empty = base.with_phrases(PhraseConfig::default().with_length(0, 2));
        assert!(empty.validate_for_phrases().is_err());

        let json = r#"{ "attribute": "Body", "phrases": { "phrase_length": 3, "proximity": 4 } }"#;
        let parsed = AnalysisConfig::from_json(json).unwrap();
        assert_eq!(parsed.phrases.proximity, 4);
        assert!(parsed.phrases.excluded_words.iter().any(|w| w == "the"));
    }

    #[test]
    fn cluster_count_must_exceed_one() {
        let base = AnalysisConfig::new("Label");
        for k in [-3, 0, 1] {
            let err = base.clone().with_number_of_means(k).validate_for_clustering();
            assert!(matches!(err, Err(Error::InvalidClusterCount { .. })));
        }
        assert!(base.with_number_of_means(2).validate_for_clustering().is_ok());
    }

    #[test]
    fn json_round_trip_and_errors() {
        let config = AnalysisConfig::new("Label")
            .with_tokenizing(TokenizingMethod::NWords, 2)
            .with_follow_up(FollowUpChoice::AddTransactions)
            .with_seed(9);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(AnalysisConfig::from_json(&json).unwrap(), config);

        let err = AnalysisConfig::from_json(r#"{ "attribute": "Label", "threshold_method": "sideways" }"#);
        assert!(matches!(err, Err(Error::Config(_))));
    }
}
