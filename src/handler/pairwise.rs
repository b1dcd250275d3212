use super::{hash_token, TokenHandler, TokenId, TokenTable};
use crate::error::{Error, Result};
use crate::graph::ElementId;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

const CARDINALITY_SHARDS: usize = 64;

type ChunkMaps = Arc<Vec<Mutex<BTreeMap<ElementId, u32>>>>;

/// Frequencies split into element chunks, for chunk-pair similarity passes.
///
/// Elements are chunked by their position in the element list the handler was
/// built for, so the chunk count depends on how many elements there are, not on
/// how large their ids get. Element at position `p` lands in chunk
/// `p / max_chunk_size`; when a subset of interest is configured and the element
/// belongs to it, the chunk index is offset by `num_chunks`, so interest elements
/// and all other elements never share a chunk.
///
/// The handler also counts, per element, how many distinct tokens it has seen.
/// That count equals the binary Euclidean modulus and stands in for it.
#[derive(Debug)]
pub struct PairwiseComparisonTokenHandler {
    max_chunk_size: usize,
    num_chunks: usize,
    positions: HashMap<ElementId, usize>,
    interest: Option<HashSet<ElementId>>,
    population: Vec<usize>,
    frequencies: RwLock<HashMap<TokenId, ChunkMaps>>,
    cardinality: Vec<Mutex<HashMap<ElementId, u32>>>,
    tokens: TokenTable,
}

impl PairwiseComparisonTokenHandler {
    /// Create a handler for `elements`, in the order given.
    ///
    /// A repeated element keeps its first position. Fails when `max_chunk_size`
    /// is zero.
    pub fn new(elements: &[ElementId], max_chunk_size: usize) -> Result<Self> {
        if max_chunk_size == 0 {
            return Err(Error::invalid("max_chunk_size", "must be at least 1"));
        }
        let mut positions = HashMap::with_capacity(elements.len());
        for &element in elements {
            let next = positions.len();
            positions.entry(element).or_insert(next);
        }
        let mut handler = Self {
            max_chunk_size,
            num_chunks: positions.len().div_ceil(max_chunk_size),
            positions,
            interest: None,
            population: Vec::new(),
            frequencies: RwLock::new(HashMap::new()),
            cardinality: (0..CARDINALITY_SHARDS)
                .map(|_| Mutex::new(HashMap::new()))
                .collect(),
            tokens: TokenTable::new(),
        };
        handler.count_population();
        Ok(handler)
    }

    /// Designate a subset of interest. Must be called before any token is registered.
    pub fn with_interest(mut self, interest: impl IntoIterator<Item = ElementId>) -> Self {
        self.interest = Some(interest.into_iter().collect());
        self.count_population();
        self
    }

    /// Chunks per group (interest and others each have this many).
    pub fn num_chunks(&self) -> usize {
        self.num_chunks
    }

    /// Total number of chunk maps per token.
    pub fn total_chunks(&self) -> usize {
        if self.interest.is_some() {
            self.num_chunks * 2
        } else {
            self.num_chunks
        }
    }

    /// Number of elements assigned to `chunk`.
    pub fn chunk_population(&self, chunk: usize) -> usize {
        self.population.get(chunk).copied().unwrap_or(0)
    }

    /// Whether a subset of interest is configured.
    pub fn has_interest(&self) -> bool {
        self.interest.is_some()
    }

    /// Whether `element` is in the subset of interest.
    pub fn is_of_interest(&self, element: ElementId) -> bool {
        self.interest
            .as_ref()
            .is_some_and(|interest| interest.contains(&element))
    }

    /// The chunk `element` belongs to, or `None` when it is not one of the
    /// handler's elements.
    pub fn chunk_of(&self, element: ElementId) -> Option<usize> {
        let index = self.positions.get(&element)? / self.max_chunk_size;
        if self.is_of_interest(element) {
            Some(index + self.num_chunks)
        } else {
            Some(index)
        }
    }

    fn count_population(&mut self) {
        let mut population = vec![0; self.total_chunks()];
        for &element in self.positions.keys() {
            if let Some(chunk) = self.chunk_of(element) {
                population[chunk] += 1;
            }
        }
        self.population = population;
    }

    /// All token ids, ascending.
    pub fn token_ids(&self) -> Vec<TokenId> {
        let mut ids: Vec<TokenId> = self.frequencies.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Snapshot of one token's frequencies in one chunk, ascending by element.
    pub fn chunk_entries(&self, token: TokenId, chunk: usize) -> Vec<(ElementId, u32)> {
        let Some(maps) = self.frequencies.read().get(&token).cloned() else {
            return Vec::new();
        };
        maps.get(chunk)
            .map(|map| map.lock().iter().map(|(&e, &f)| (e, f)).collect())
            .unwrap_or_default()
    }

    /// Frequency of `token` in `element`.
    pub fn frequency(&self, token: &str, element: ElementId) -> u32 {
        let Some(chunk) = self.chunk_of(element) else {
            return 0;
        };
        self.chunk_entries(hash_token(token), chunk)
            .into_iter()
            .find(|&(e, _)| e == element)
            .map_or(0, |(_, f)| f)
    }

    /// Distinct tokens seen for `element`.
    pub fn cardinality(&self, element: ElementId) -> u32 {
        self.cardinality[shard(element)]
            .lock()
            .get(&element)
            .copied()
            .unwrap_or(0)
    }

    /// Distinct tokens seen, for every element.
    pub fn cardinalities(&self) -> HashMap<ElementId, u32> {
        let mut all = HashMap::new();
        for shard in &self.cardinality {
            all.extend(shard.lock().iter().map(|(&e, &c)| (e, c)));
        }
        all
    }

    /// Reverse token lookup.
    pub fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    fn chunk_maps(&self, token: TokenId) -> ChunkMaps {
        if let Some(maps) = self.frequencies.read().get(&token) {
            return Arc::clone(maps);
        }
        let total = self.total_chunks();
        let mut frequencies = self.frequencies.write();
        Arc::clone(frequencies.entry(token).or_insert_with(|| {
            Arc::new((0..total).map(|_| Mutex::new(BTreeMap::new())).collect())
        }))
    }
}

fn shard(element: ElementId) -> usize {
    element as usize % CARDINALITY_SHARDS
}

impl TokenHandler for PairwiseComparisonTokenHandler {
    fn register_token(&self, token: &str, element: ElementId) {
        let Some(chunk) = self.chunk_of(element) else {
            tracing::warn!(element, "element unknown to the handler; token dropped");
            return;
        };
        let id = hash_token(token);
        self.tokens.record(id, token);

        let maps = self.chunk_maps(id);
        let first_sighting = {
            let mut map = maps[chunk].lock();
            let frequency = map.entry(element).or_insert(0);
            *frequency += 1;
            *frequency == 1
        };
        if first_sighting {
            *self.cardinality[shard(element)]
                .lock()
                .entry(element)
                .or_insert(0) += 1;
        }
    }
}
