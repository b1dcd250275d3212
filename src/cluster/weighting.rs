use crate::config::{AnalysisConfig, ThresholdMethod};

/// Decides which tokens enter the vector space, and with what weight.
pub trait VectorWeightingCalculator: Send + Sync {
    /// Weight of a token occurring `frequency` times in an element, given that
    /// `document_frequency` elements contain it.
    fn weight(&self, frequency: i32, document_frequency: usize) -> f32;

    /// Whether a token contained in `document_frequency` elements is kept.
    fn is_significant(&self, document_frequency: usize) -> bool;
}

/// Weights by relative document frequency raised to an exponent.
///
/// ```text
/// weight = (binary ? 1 : freq) × (df / total)^exponent
/// ```
///
/// A token is significant when its document frequency is at or above (or at or
/// below) a cutoff. The cutoff is either a fraction of all elements
/// ([`ThresholdMethod::Appearance`]) or the document frequency found at a
/// percentile rank among all tokens ([`ThresholdMethod::Rank`]).
#[derive(Debug, Clone)]
pub struct DocumentFrequencyWeighting {
    total_elements: usize,
    binary_space: bool,
    exponent: f32,
    cutoff: f32,
    above: bool,
}

impl DocumentFrequencyWeighting {
    /// Weighting that keeps every token.
    pub fn new(total_elements: usize, binary_space: bool, exponent: f32) -> Self {
        Self {
            total_elements,
            binary_space,
            exponent,
            cutoff: 0.0,
            above: true,
        }
    }

    /// Keep tokens whose document frequency is at or above (or at or below)
    /// `threshold × total_elements`.
    pub fn with_appearance_threshold(mut self, threshold: f32, above: bool) -> Self {
        self.cutoff = threshold * self.total_elements as f32;
        self.above = above;
        self
    }

    /// Keep tokens whose document frequency is at or above (or at or below) the
    /// document frequency at percentile `threshold` of `document_frequencies`.
    pub fn with_rank_threshold(mut self, threshold: f32, above: bool, document_frequencies: &[usize]) -> Self {
        let mut sorted = document_frequencies.to_vec();
        sorted.sort_unstable();
        self.cutoff = match sorted.len() {
            0 => 0.0,
            n => {
                let rank = ((n - 1) as f32 * threshold.clamp(0.0, 1.0)).round() as usize;
                sorted[rank.min(n - 1)] as f32
            }
        };
        self.above = above;
        self
    }

    /// Weighting as configured for a run over `total_elements` elements.
    pub fn from_config(config: &AnalysisConfig, total_elements: usize, document_frequencies: &[usize]) -> Self {
        let base = Self::new(total_elements, config.binary_space, config.weighting_exponent);
        match config.threshold_method {
            ThresholdMethod::Appearance => {
                base.with_appearance_threshold(config.threshold, config.significant_above_threshold)
            }
            ThresholdMethod::Rank => base.with_rank_threshold(
                config.threshold,
                config.significant_above_threshold,
                document_frequencies,
            ),
        }
    }

    /// The document frequency separating kept from dropped tokens.
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }
}

impl VectorWeightingCalculator for DocumentFrequencyWeighting {
    fn weight(&self, frequency: i32, document_frequency: usize) -> f32 {
        let base = if self.binary_space { 1.0 } else { frequency as f32 };
        if self.exponent == 0.0 {
            return base;
        }
        let relative = if self.total_elements == 0 {
            0.0
        } else {
            document_frequency as f32 / self.total_elements as f32
        };
        base * relative.powf(self.exponent)
    }

    fn is_significant(&self, document_frequency: usize) -> bool {
        let df = document_frequency as f32;
        if self.above {
            df >= self.cutoff
        } else {
            df <= self.cutoff
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_binary_and_counts() {
        let w = DocumentFrequencyWeighting::new(10, true, 0.0);
        assert_eq!(w.weight(7, 3), 1.0);
        let w = DocumentFrequencyWeighting::new(10, false, 0.0);
        assert_eq!(w.weight(7, 3), 7.0);
        let w = DocumentFrequencyWeighting::new(10, false, 1.0);
        assert!((w.weight(2, 5) - 1.0).abs() < 1e-6);
        let w = DocumentFrequencyWeighting::new(10, true, -1.0);
        assert!((w.weight(1, 5) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_appearance_threshold() {
        let below = DocumentFrequencyWeighting::new(10, true, 0.0).with_appearance_threshold(0.3, false);
        assert!(below.is_significant(3));
        assert!(!below.is_significant(4));
        let above = DocumentFrequencyWeighting::new(10, true, 0.0).with_appearance_threshold(0.3, true);
        assert!(above.is_significant(3));
        assert!(!above.is_significant(2));
    }

    #[test]
    fn test_rank_threshold() {
        let dfs = [9, 1, 4, 2, 7];
        let w = DocumentFrequencyWeighting::new(10, true, 0.0).with_rank_threshold(0.5, true, &dfs);
        assert_eq!(w.cutoff(), 4.0);
        assert!(w.is_significant(7));
        assert!(!w.is_significant(2));
        let none = DocumentFrequencyWeighting::new(0, true, 0.0).with_rank_threshold(0.5, true, &[]);
        assert_eq!(none.cutoff(), 0.0);
    }

    #[test]
    fn test_from_config() {
        let config = AnalysisConfig::new("Label")
            .with_threshold(0.5)
            .with_significance(ThresholdMethod::Rank, false);
        let w = DocumentFrequencyWeighting::from_config(&config, 4, &[1, 2, 3]);
        assert_eq!(w.cutoff(), 2.0);
        assert!(w.is_significant(1));
        assert!(!w.is_significant(3));
    }
}
