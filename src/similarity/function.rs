use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// How a pairwise similarity score is accumulated and normalized.
///
/// For every token two elements share, the service calls
/// [`update_similarity`](SimilarityFunction::update_similarity) with both
/// frequencies. When [`requires_modulus`](SimilarityFunction::requires_modulus)
/// holds, each element's modulus is built first with
/// [`update_modulus`](SimilarityFunction::update_modulus) over all its tokens and
/// closed with [`finalize_modulus`](SimilarityFunction::finalize_modulus).
pub trait SimilarityFunction: Send + Sync + Debug {
    /// Fold one shared token into the running score.
    fn update_similarity(&self, running: f64, freq_a: u32, freq_b: u32) -> f64;

    /// Whether scores are normalized by the elements' moduli.
    fn requires_modulus(&self) -> bool;

    /// Fold one token into an element's running modulus.
    fn update_modulus(&self, running: f64, _freq: u32) -> f64 {
        running
    }

    /// Close a modulus once every token has been folded in.
    fn finalize_modulus(&self, modulus: f64) -> f64 {
        modulus
    }

    /// Turn a raw score into the reported one.
    fn normalize_similarity(&self, raw: f64, _modulus_a: f64, _modulus_b: f64) -> f64 {
        raw
    }

    /// Whether the modulus equals the number of distinct tokens of an element, so
    /// a token handler's cardinality count can stand in for the modulus phase.
    fn modulus_is_cardinality(&self) -> bool {
        false
    }
}

/// Counts shared tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryTaxicab;

impl SimilarityFunction for BinaryTaxicab {
    fn update_similarity(&self, running: f64, _freq_a: u32, _freq_b: u32) -> f64 {
        running + 1.0
    }

    fn requires_modulus(&self) -> bool {
        false
    }
}

/// Sums products of frequencies over shared tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerTaxicab;

impl SimilarityFunction for IntegerTaxicab {
    fn update_similarity(&self, running: f64, freq_a: u32, freq_b: u32) -> f64 {
        running + f64::from(freq_a) * f64::from(freq_b)
    }

    fn requires_modulus(&self) -> bool {
        false
    }
}

fn cosine(raw: f64, modulus_a: f64, modulus_b: f64) -> f64 {
    let denominator = (modulus_a * modulus_b).sqrt();
    if denominator > 0.0 {
        raw / denominator
    } else {
        0.0
    }
}

/// Cosine similarity of token-presence vectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryEuclidean;

impl SimilarityFunction for BinaryEuclidean {
    fn update_similarity(&self, running: f64, _freq_a: u32, _freq_b: u32) -> f64 {
        running + 1.0
    }

    fn requires_modulus(&self) -> bool {
        true
    }

    fn update_modulus(&self, running: f64, _freq: u32) -> f64 {
        running + 1.0
    }

    fn normalize_similarity(&self, raw: f64, modulus_a: f64, modulus_b: f64) -> f64 {
        cosine(raw, modulus_a, modulus_b)
    }

    fn modulus_is_cardinality(&self) -> bool {
        true
    }
}

/// Cosine similarity of token-frequency vectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerEuclidean;

impl SimilarityFunction for IntegerEuclidean {
    fn update_similarity(&self, running: f64, freq_a: u32, freq_b: u32) -> f64 {
        running + f64::from(freq_a) * f64::from(freq_b)
    }

    fn requires_modulus(&self) -> bool {
        true
    }

    fn update_modulus(&self, running: f64, freq: u32) -> f64 {
        let freq = f64::from(freq);
        running + freq * freq
    }

    fn normalize_similarity(&self, raw: f64, modulus_a: f64, modulus_b: f64) -> f64 {
        cosine(raw, modulus_a, modulus_b)
    }
}

/// Named choice of [`SimilarityFunction`], as it appears in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMethod {
    /// [`BinaryTaxicab`].
    BinaryTaxicab,
    /// [`IntegerTaxicab`].
    IntegerTaxicab,
    /// [`BinaryEuclidean`].
    #[default]
    BinaryEuclidean,
    /// [`IntegerEuclidean`].
    IntegerEuclidean,
}

impl SimilarityMethod {
    /// The function this name stands for.
    pub fn function(self) -> &'static dyn SimilarityFunction {
        match self {
            Self::BinaryTaxicab => &BinaryTaxicab,
            Self::IntegerTaxicab => &IntegerTaxicab,
            Self::BinaryEuclidean => &BinaryEuclidean,
            Self::IntegerEuclidean => &IntegerEuclidean,
        }
    }
}
