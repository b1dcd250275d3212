//! Pairwise similarity between elements that share tokens.
//!
//! Comparing every element with every other is quadratic in the element count,
//! so the service only ever looks at pairs that share a token, one pair of
//! element chunks at a time:
//!
//! 1. **Modulus phase** (only for functions that normalize): every element's
//!    modulus is folded from its token frequencies, one barrier-synchronized phase
//!    per chunk, parallel over tokens.
//! 2. **Pair passes**: for each scheduled chunk pair `(i, j)`, workers split the
//!    tokens between them and fold every co-occurrence of two elements into a
//!    running score keyed by `(low, high)`. After the pass the dispatcher
//!    normalizes, filters by threshold, emits, and clears the accumulator, so
//!    memory stays bounded by the chunk size rather than the element count.
//!
//! ## Chunk pair schedule
//!
//! Without a subset of interest, every `(i, j)` with `i <= j` is visited once.
//! With one, elements of interest live in chunks `n..2n` and only pairs with at
//! least one element of interest are compared: `i` ranges over the interest
//! chunks and `j` over the other chunks plus the interest chunks from `i` on.
//!
//! ## Accumulator locking
//!
//! Accumulated scores and moduli are sharded by element id behind `parking_lot`
//! mutexes, so two workers only contend when they touch elements in the same
//! shard.

mod function;

pub use function::{
    BinaryEuclidean, BinaryTaxicab, IntegerEuclidean, IntegerTaxicab, SimilarityFunction, SimilarityMethod,
};

use crate::error::{Error, Result};
use crate::graph::ElementId;
use crate::handler::{PairwiseComparisonTokenHandler, TokenId};
use crate::partition::{CancelFlag, WorkPartitioner};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

const SHARDS: usize = 64;

/// A similar pair of elements. Always `low < high`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ElementSimilarity {
    low: ElementId,
    high: ElementId,
    score: f32,
}

impl ElementSimilarity {
    /// A pair in canonical order; `None` when `a == b`.
    pub fn new(a: ElementId, b: ElementId, score: f32) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { low: a, high: b, score }),
            std::cmp::Ordering::Greater => Some(Self { low: b, high: a, score }),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// The smaller element id.
    pub fn low(&self) -> ElementId {
        self.low
    }

    /// The larger element id.
    pub fn high(&self) -> ElementId {
        self.high
    }

    /// The similarity score.
    pub fn score(&self) -> f32 {
        self.score
    }
}

/// Per-element values sharded by element id.
struct Sharded<T> {
    shards: Vec<Mutex<HashMap<ElementId, T>>>,
}

impl<T> Sharded<T> {
    fn new() -> Self {
        Self {
            shards: (0..SHARDS).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }

    fn shard(&self, element: ElementId) -> &Mutex<HashMap<ElementId, T>> {
        &self.shards[element as usize % SHARDS]
    }

    fn drain(&self) -> Vec<(ElementId, T)> {
        self.shards
            .iter()
            .flat_map(|shard| std::mem::take(&mut *shard.lock()))
            .collect()
    }
}

/// Computes similar pairs from a [`PairwiseComparisonTokenHandler`].
#[derive(Debug, Clone)]
pub struct PairwiseSimilarityService {
    max_threads: usize,
    max_units_per_thread: usize,
    max_results: usize,
    cancel: Option<CancelFlag>,
}

impl PairwiseSimilarityService {
    /// Create a service.
    ///
    /// `max_units_per_thread` bounds the number of tokens one worker handles per
    /// pass; `max_results` bounds the number of pairs emitted.
    pub fn new(max_threads: usize, max_units_per_thread: usize, max_results: usize) -> Result<Self> {
        if max_threads == 0 {
            return Err(Error::invalid("max_threads", "must be at least 1"));
        }
        if max_units_per_thread == 0 {
            return Err(Error::invalid("max_chunk_size", "must be at least 1"));
        }
        Ok(Self {
            max_threads,
            max_units_per_thread,
            max_results,
            cancel: None,
        })
    }

    /// Observe `cancel` at every phase boundary.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Every pair sharing at least one token whose score is at least `threshold`.
    ///
    /// Pairs come out sorted by `(low, high)`. Fails with
    /// [`Error::TooManyResults`] as soon as more than `max_results` pairs pass,
    /// discarding everything computed so far.
    pub fn compute(
        &self,
        handler: &PairwiseComparisonTokenHandler,
        function: &dyn SimilarityFunction,
        threshold: f32,
    ) -> Result<Vec<ElementSimilarity>> {
        let tokens = handler.token_ids();
        if tokens.is_empty() || handler.num_chunks() == 0 {
            info!(tokens = tokens.len(), "nothing to compare");
            return Ok(Vec::new());
        }
        let cancel = self.cancel.as_ref();
        let mut partitioner =
            WorkPartitioner::for_available_parallelism(self.max_threads, self.max_units_per_thread, tokens.len())?;

        let moduli = if function.requires_modulus() {
            Some(self.moduli(handler, function, &tokens, &mut partitioner)?)
        } else {
            None
        };

        let accumulator: Sharded<HashMap<ElementId, f64>> = Sharded::new();
        let mut results = Vec::new();
        let schedule: Vec<(usize, usize)> = chunk_pairs(handler.num_chunks(), handler.has_interest())
            .into_iter()
            .filter(|&(i, j)| can_pair(handler, i, j))
            .collect();
        debug!(passes = schedule.len(), tokens = tokens.len(), "pairwise passes scheduled");

        for (i, j) in schedule {
            partitioner.reset_for(tokens.len());
            partitioner.run_phase("pairwise", cancel, |chunk| {
                for &token in &tokens[chunk.range()] {
                    accumulate_pass(handler, function, &accumulator, token, i, j);
                }
                Ok(())
            })?;

            let mut pass: Vec<ElementSimilarity> = Vec::new();
            for (low, highs) in accumulator.drain() {
                for (high, raw) in highs {
                    let score = match &moduli {
                        Some(moduli) => function.normalize_similarity(
                            raw,
                            moduli.get(&low).copied().unwrap_or(0.0),
                            moduli.get(&high).copied().unwrap_or(0.0),
                        ),
                        None => raw,
                    };
                    let score = score as f32;
                    if score >= threshold {
                        pass.extend(ElementSimilarity::new(low, high, score));
                    }
                }
            }
            results.append(&mut pass);

            if results.len() > self.max_results {
                return Err(Error::TooManyResults {
                    count: results.len(),
                    max: self.max_results,
                });
            }
        }

        results.sort_by_key(|pair| (pair.low, pair.high));
        debug!(pairs = results.len(), threshold, "pairwise similarity complete");
        Ok(results)
    }

    fn moduli(
        &self,
        handler: &PairwiseComparisonTokenHandler,
        function: &dyn SimilarityFunction,
        tokens: &[TokenId],
        partitioner: &mut WorkPartitioner,
    ) -> Result<HashMap<ElementId, f64>> {
        if function.modulus_is_cardinality() {
            return Ok(handler
                .cardinalities()
                .into_iter()
                .map(|(element, count)| (element, function.finalize_modulus(f64::from(count))))
                .collect());
        }

        let running: Sharded<f64> = Sharded::new();
        for chunk_index in 0..handler.total_chunks() {
            if handler.chunk_population(chunk_index) == 0 {
                continue;
            }
            partitioner.reset_for(tokens.len());
            partitioner.run_phase("modulus", self.cancel.as_ref(), |chunk| {
                for &token in &tokens[chunk.range()] {
                    for (element, frequency) in handler.chunk_entries(token, chunk_index) {
                        let mut shard = running.shard(element).lock();
                        let modulus = shard.entry(element).or_insert(0.0);
                        *modulus = function.update_modulus(*modulus, frequency);
                    }
                }
                Ok(())
            })?;
        }
        Ok(running
            .drain()
            .into_iter()
            .map(|(element, modulus)| (element, function.finalize_modulus(modulus)))
            .collect())
    }
}

/// Chunk pairs to visit, in order.
fn chunk_pairs(num_chunks: usize, interest: bool) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    if interest {
        for i in num_chunks..num_chunks * 2 {
            pairs.extend((0..num_chunks).map(|j| (i, j)));
            pairs.extend((i..num_chunks * 2).map(|j| (i, j)));
        }
    } else {
        for i in 0..num_chunks {
            pairs.extend((i..num_chunks).map(|j| (i, j)));
        }
    }
    pairs
}

/// Whether chunks `i` and `j` hold at least one pair of distinct elements.
fn can_pair(handler: &PairwiseComparisonTokenHandler, i: usize, j: usize) -> bool {
    if i == j {
        handler.chunk_population(i) >= 2
    } else {
        handler.chunk_population(i) > 0 && handler.chunk_population(j) > 0
    }
}

fn accumulate_pass(
    handler: &PairwiseComparisonTokenHandler,
    function: &dyn SimilarityFunction,
    accumulator: &Sharded<HashMap<ElementId, f64>>,
    token: TokenId,
    i: usize,
    j: usize,
) {
    let left = handler.chunk_entries(token, i);
    if left.is_empty() {
        return;
    }
    if i == j {
        // Entries are sorted, so everything after `x` is a higher id.
        for (x, &(low, freq_low)) in left.iter().enumerate() {
            let rest = &left[x + 1..];
            if rest.is_empty() {
                break;
            }
            let mut shard = accumulator.shard(low).lock();
            let row = shard.entry(low).or_default();
            for &(high, freq_high) in rest {
                let score = row.entry(high).or_insert(0.0);
                *score = function.update_similarity(*score, freq_low, freq_high);
            }
        }
        return;
    }

    let right = handler.chunk_entries(token, j);
    for &(a, freq_a) in &left {
        for &(b, freq_b) in &right {
            let ((low, freq_low), (high, freq_high)) = if a < b {
                ((a, freq_a), (b, freq_b))
            } else {
                ((b, freq_b), (a, freq_a))
            };
            let mut shard = accumulator.shard(low).lock();
            let score = shard.entry(low).or_default().entry(high).or_insert(0.0);
            *score = function.update_similarity(*score, freq_low, freq_high);
        }
    }
}
