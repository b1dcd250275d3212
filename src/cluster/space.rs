use super::{DocumentFrequencyWeighting, VectorWeightingCalculator};
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::graph::ElementId;
use crate::matrix::{Index, SparseMatrix};
use crate::partition::{CancelFlag, WorkPartitioner};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Weighted element vectors: one column per element, one row per significant token.
///
/// Columns with negative keys are scratch space for centroids while a
/// [`Kmeans`](super::Kmeans) fit runs; a space must not be fitted by two models at
/// once.
#[derive(Debug, Default)]
pub struct VectorSpace {
    vectors: SparseMatrix<f32>,
    elements: Vec<ElementId>,
    document_frequencies: HashMap<Index, usize>,
}

impl VectorSpace {
    /// Build the space for a run from a `token -> (element -> frequency)` matrix.
    ///
    /// Weighting and significance follow `config`; see
    /// [`DocumentFrequencyWeighting::from_config`].
    pub fn build(
        tokens: &SparseMatrix<i32>,
        total_elements: usize,
        config: &AnalysisConfig,
        partitioner: &mut WorkPartitioner,
        cancel: Option<&CancelFlag>,
    ) -> Result<Self> {
        Self::build_with(
            tokens,
            |document_frequencies| {
                DocumentFrequencyWeighting::from_config(config, total_elements, document_frequencies)
            },
            partitioner,
            cancel,
        )
    }

    /// Build the space with a calculator derived from every token's document
    /// frequency.
    ///
    /// Two barrier-synchronized phases, both partitioned by token column: the
    /// first counts document frequencies, the second writes the weighted cells of
    /// significant tokens.
    pub fn build_with<C, F>(
        tokens: &SparseMatrix<i32>,
        make_calculator: F,
        partitioner: &mut WorkPartitioner,
        cancel: Option<&CancelFlag>,
    ) -> Result<Self>
    where
        C: VectorWeightingCalculator,
        F: FnOnce(&[usize]) -> C,
    {
        let columns = tokens.column_keys();
        let moduli: Vec<AtomicUsize> = columns.iter().map(|_| AtomicUsize::new(0)).collect();

        partitioner.reset_for(columns.len());
        partitioner.run_phase("document frequency", cancel, |chunk| {
            for position in chunk.range() {
                moduli[position].store(tokens.column_size(columns[position]), Ordering::Relaxed);
            }
            Ok(())
        })?;

        let document_frequencies: Vec<usize> = moduli.into_iter().map(AtomicUsize::into_inner).collect();
        let calculator = make_calculator(&document_frequencies);
        let vectors = SparseMatrix::new();

        partitioner.reset_for(columns.len());
        partitioner.run_phase("vector construction", cancel, |chunk| {
            for position in chunk.range() {
                let df = document_frequencies[position];
                if !calculator.is_significant(df) {
                    continue;
                }
                let token = columns[position];
                for (element, frequency) in tokens.column(token) {
                    vectors.put(token, element, calculator.weight(frequency, df));
                }
            }
            Ok(())
        })?;

        let elements: Vec<ElementId> = vectors
            .column_keys()
            .into_iter()
            .filter_map(|col| ElementId::try_from(col).ok())
            .collect();
        let document_frequencies: HashMap<Index, usize> = columns
            .into_iter()
            .zip(document_frequencies)
            .filter(|&(_, df)| calculator.is_significant(df))
            .collect();
        tracing::debug!(
            elements = elements.len(),
            tokens = document_frequencies.len(),
            "vector space built"
        );

        Ok(Self {
            vectors,
            elements,
            document_frequencies,
        })
    }

    /// A space from explicit `(element, [(token, weight)])` vectors.
    pub fn from_vectors(vectors: impl IntoIterator<Item = (ElementId, Vec<(Index, f32)>)>) -> Self {
        let matrix = SparseMatrix::new();
        let mut document_frequencies: HashMap<Index, usize> = HashMap::new();
        for (element, cells) in vectors {
            for (token, weight) in cells {
                if weight != 0.0 && matrix.get(token, Index::from(element)).is_none() {
                    *document_frequencies.entry(token).or_insert(0) += 1;
                }
                matrix.put(token, Index::from(element), weight);
            }
        }
        let elements = matrix
            .column_keys()
            .into_iter()
            .filter_map(|col| ElementId::try_from(col).ok())
            .collect();
        Self {
            vectors: matrix,
            elements,
            document_frequencies,
        }
    }

    /// The vectors: columns are elements, rows are tokens.
    pub fn vectors(&self) -> &SparseMatrix<f32> {
        &self.vectors
    }

    /// Elements with at least one significant token, ascending.
    pub fn elements(&self) -> &[ElementId] {
        &self.elements
    }

    /// Number of elements in the space.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether no element has a significant token.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Number of significant tokens.
    pub fn num_tokens(&self) -> usize {
        self.document_frequencies.len()
    }

    /// Document frequency of a significant token; zero otherwise.
    pub fn document_frequency(&self, token: Index) -> usize {
        self.document_frequencies.get(&token).copied().unwrap_or(0)
    }
}
