//! End-to-end runs: tokenize a graph attribute, compare or cluster, follow up.
//!
//! ```rust
//! use tokensim::analysis::{AnalysisResult, ContentAnalysis, RunState};
//! use tokensim::config::{AnalysisConfig, FollowUpChoice, TokenizingMethod};
//! use tokensim::graph::{ElementType, InMemoryGraph};
//! use tokensim::similarity::SimilarityMethod;
//!
//! let mut graph = InMemoryGraph::with_vertex_text(
//!     "Label",
//!     [(1, "apple pie"), (2, "apple tart"), (3, "banana split")],
//! );
//! let config = AnalysisConfig::new("Label")
//!     .with_tokenizing(TokenizingMethod::NGrams, 5)
//!     .with_threshold(0.0)
//!     .with_similarity(SimilarityMethod::BinaryTaxicab)
//!     .with_follow_up(FollowUpChoice::Cluster);
//!
//! let mut run = ContentAnalysis::new(config).unwrap();
//! let pairs = run.pairwise_similarities(&graph).unwrap();
//! assert_eq!(pairs.len(), 1);
//!
//! run.follow_up(&mut graph, &AnalysisResult::Pairs(pairs)).unwrap();
//! assert_eq!(run.state(), RunState::FollowUpDispatched);
//! let clusters = graph.clusters(ElementType::Vertex).unwrap();
//! assert_eq!(clusters[&1], clusters[&2]);
//! assert_eq!(clusters[&3], "no cluster");
//! ```

use crate::cluster::{ClusterAssignment, Kmeans, KmeansFit, KmeansStage, MergeClustering, VectorSpace};
use crate::config::{AnalysisConfig, ElementScope, FollowUpChoice};
use crate::error::{Error, Result};
use crate::followup::{self, FollowUpOutcome};
use crate::graph::{ElementId, ElementSource, GraphSink};
use crate::handler::{DefaultTokenHandler, PairwiseComparisonTokenHandler, PhraseTokenHandler};
use crate::partition::{CancelFlag, WorkPartitioner};
use crate::similarity::{ElementSimilarity, PairwiseSimilarityService};
use crate::tokenize::TokenizingService;
use tracing::{debug, info};

/// Where a run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    /// Nothing started.
    #[default]
    Idle,
    /// Reading and tokenizing element text.
    Tokenizing,
    /// Token structures are complete.
    MatrixBuilt,
    /// Choosing k-means seeds.
    Seeding,
    /// Refining k-means clusters.
    Iterating,
    /// Results are ready.
    Converged,
    /// Results were handed to the graph.
    FollowUpDispatched,
}

/// Output of a run, ready for [`ContentAnalysis::follow_up`].
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisResult {
    /// Clusters from k-means.
    Clusters(ClusterAssignment),
    /// Similar pairs.
    Pairs(Vec<ElementSimilarity>),
}

impl From<KmeansFit> for AnalysisResult {
    fn from(fit: KmeansFit) -> Self {
        Self::Clusters(fit.assignment)
    }
}

/// One configured analysis over a graph attribute.
///
/// The run owns all per-run state (token tables, cluster ids), so independent
/// runs never interfere.
#[derive(Debug)]
pub struct ContentAnalysis {
    config: AnalysisConfig,
    cancel: Option<CancelFlag>,
    state: RunState,
}

fn advance(state: &mut RunState, next: RunState) {
    if *state != next {
        debug!(from = ?*state, to = ?next, "run state");
        *state = next;
    }
}

impl ContentAnalysis {
    /// A run with a validated configuration.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: None,
            state: RunState::Idle,
        })
    }

    /// Observe `cancel` at every phase boundary.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// The configuration.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Current state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Cluster element texts into `number_of_means` groups with k-means.
    ///
    /// Fails before any thread starts when the cluster count is below two or
    /// the attribute does not exist.
    pub fn cluster_documents<S: ElementSource + ?Sized>(&mut self, source: &S) -> Result<KmeansFit> {
        self.config.validate_for_clustering()?;
        self.check_attribute(source)?;
        self.state = RunState::Idle;

        let elements = self.scoped_elements(source);
        let mut partitioner = self.partitioner(elements.len())?;
        let handler = DefaultTokenHandler::new();
        advance(&mut self.state, RunState::Tokenizing);
        TokenizingService::for_clustering(&self.config).run(
            source,
            self.config.element_type,
            &self.config.attribute,
            &elements,
            &handler,
            &mut partitioner,
            self.cancel.as_ref(),
        )?;

        let space = VectorSpace::build(
            handler.matrix(),
            elements.len(),
            &self.config,
            &mut partitioner,
            self.cancel.as_ref(),
        )?;
        advance(&mut self.state, RunState::MatrixBuilt);
        info!(elements = elements.len(), vectors = space.len(), tokens = space.num_tokens(), "vector space ready");

        let k = usize::try_from(self.config.number_of_means)
            .map_err(|_| Error::invalid("number_of_means", "must be positive"))?;
        let mut kmeans = Kmeans::new(k);
        if let Some(seed) = self.config.seed {
            kmeans = kmeans.with_seed(seed);
        }
        let state = &mut self.state;
        let fit = kmeans.fit_with(&space, |stage| {
            let next = match stage {
                KmeansStage::Seeding => RunState::Seeding,
                KmeansStage::Iterating(_) => RunState::Iterating,
                KmeansStage::Converged => RunState::Converged,
            };
            advance(state, next);
        })?;
        if self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
            return Err(Error::Cancelled { phase: "k-means" });
        }
        info!(clusters = fit.assignment.num_clusters(), iterations = fit.iterations, "documents clustered");
        Ok(fit)
    }

    /// Similar pairs among the elements.
    ///
    /// With [`ElementScope::SelectedOnly`], only pairs involving at least one
    /// selected element are compared.
    pub fn pairwise_similarities<S: ElementSource + ?Sized>(&mut self, source: &S) -> Result<Vec<ElementSimilarity>> {
        self.check_attribute(source)?;
        self.state = RunState::Idle;

        let element_type = self.config.element_type;
        let elements: Vec<ElementId> = (0..source.element_count(element_type))
            .map(|position| source.element_at(element_type, position))
            .collect();
        let mut handler = PairwiseComparisonTokenHandler::new(&elements, self.config.max_chunk_size)?;
        if self.config.element_scope == ElementScope::SelectedOnly {
            let selected: Vec<ElementId> = elements
                .iter()
                .copied()
                .filter(|&e| source.is_selected(element_type, e))
                .collect();
            if selected.is_empty() {
                info!("no selected elements; nothing to compare");
            }
            handler = handler.with_interest(selected);
        }

        let mut partitioner = self.partitioner(elements.len())?;
        advance(&mut self.state, RunState::Tokenizing);
        TokenizingService::for_pairwise(&self.config).run(
            source,
            element_type,
            &self.config.attribute,
            &elements,
            &handler,
            &mut partitioner,
            self.cancel.as_ref(),
        )?;
        advance(&mut self.state, RunState::MatrixBuilt);

        let mut service = PairwiseSimilarityService::new(
            self.config.max_threads,
            self.config.max_chunk_size,
            self.config.max_results,
        )?;
        if let Some(cancel) = &self.cancel {
            service = service.with_cancel(cancel.clone());
        }
        let pairs = service.compute(&handler, self.config.similarity.function(), self.config.threshold)?;
        advance(&mut self.state, RunState::Converged);
        info!(pairs = pairs.len(), "pairwise similarities computed");
        Ok(pairs)
    }

    /// Count the words and phrases of every element in scope.
    ///
    /// The returned handler tells phrases from single words and maps each phrase
    /// to its words. There is no follow-up for phrase counts.
    pub fn phrase_analysis<S: ElementSource + ?Sized>(&mut self, source: &S) -> Result<PhraseTokenHandler> {
        self.config.validate_for_phrases()?;
        self.check_attribute(source)?;
        self.state = RunState::Idle;

        let elements = self.scoped_elements(source);
        let mut partitioner = self.partitioner(elements.len())?;
        let handler = PhraseTokenHandler::new();
        advance(&mut self.state, RunState::Tokenizing);
        TokenizingService::for_phrases(&self.config).run_phrases(
            source,
            self.config.element_type,
            &self.config.attribute,
            &elements,
            &handler,
            &mut partitioner,
            self.cancel.as_ref(),
        )?;
        advance(&mut self.state, RunState::MatrixBuilt);
        advance(&mut self.state, RunState::Converged);
        info!(elements = elements.len(), tokens = handler.tokens().len(), "phrases counted");
        Ok(handler)
    }

    /// Apply the configured follow-up to `sink`.
    ///
    /// Pairs are merged into similarity clusters when the follow-up writes
    /// clusters or selections. Edges can only be added from pairs.
    pub fn follow_up<G: GraphSink + ?Sized>(&mut self, sink: &mut G, result: &AnalysisResult) -> Result<FollowUpOutcome> {
        let element_type = self.config.element_type;
        let outcome = match (self.config.follow_up, result) {
            (FollowUpChoice::AddTransactions, AnalysisResult::Pairs(pairs)) => {
                followup::add_similarity_edges(sink, pairs)?
            }
            (FollowUpChoice::AddTransactions, AnalysisResult::Clusters(_)) => {
                return Err(Error::invalid("follow_up", "edges need similar pairs, not clusters"));
            }
            (FollowUpChoice::Cluster, AnalysisResult::Clusters(assignment)) => {
                followup::write_clusters(sink, element_type, assignment)
            }
            (FollowUpChoice::Cluster, AnalysisResult::Pairs(pairs)) => {
                followup::write_clusters(sink, element_type, &MergeClustering::from_pairs(pairs))
            }
            (FollowUpChoice::MakeSelections, AnalysisResult::Clusters(assignment)) => {
                followup::make_selections(sink, assignment)
            }
            (FollowUpChoice::MakeSelections, AnalysisResult::Pairs(pairs)) => {
                followup::make_selections(sink, &MergeClustering::from_pairs(pairs))
            }
        };
        advance(&mut self.state, RunState::FollowUpDispatched);
        Ok(outcome)
    }

    fn check_attribute<S: ElementSource + ?Sized>(&self, source: &S) -> Result<()> {
        if source.has_attribute(self.config.element_type, &self.config.attribute) {
            Ok(())
        } else {
            Err(Error::invalid(
                "attribute",
                format!("{:?} has no attribute {:?}", self.config.element_type, self.config.attribute),
            ))
        }
    }

    fn scoped_elements<S: ElementSource + ?Sized>(&self, source: &S) -> Vec<ElementId> {
        let element_type = self.config.element_type;
        (0..source.element_count(element_type))
            .map(|position| source.element_at(element_type, position))
            .filter(|&e| {
                self.config.element_scope == ElementScope::All || source.is_selected(element_type, e)
            })
            .collect()
    }

    fn partitioner(&self, total_units: usize) -> Result<WorkPartitioner> {
        WorkPartitioner::for_available_parallelism(self.config.max_threads, self.config.max_chunk_size, total_units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PhraseConfig, TokenizingMethod};
    use crate::graph::{ElementType, InMemoryGraph};
    use crate::handler::hash_token;
    use crate::matrix::Index;
    use crate::similarity::SimilarityMethod;

    fn recipes() -> InMemoryGraph {
        InMemoryGraph::with_vertex_text(
            "Label",
            [
                (0, "apple pie with cream"),
                (1, "apple pie with custard"),
                (2, "apple pie and cream"),
                (3, "quantum field theory"),
                (4, "quantum field theories"),
                (5, "quantum gravity theory"),
            ],
        )
    }

    #[test]
    fn missing_attribute_fails_fast() {
        let mut run = ContentAnalysis::new(AnalysisConfig::new("Nope")).unwrap();
        assert!(matches!(run.pairwise_similarities(&recipes()), Err(Error::InvalidParameter { name: "attribute", .. })));
        assert_eq!(run.state(), RunState::Idle);
    }

    #[test]
    fn bad_cluster_count_fails_before_tokenizing() {
        let config = AnalysisConfig::new("Label").with_number_of_means(0);
        let mut run = ContentAnalysis::new(config).unwrap();
        assert!(matches!(run.cluster_documents(&recipes()), Err(Error::InvalidClusterCount { .. })));
        assert_eq!(run.state(), RunState::Idle);
    }

    #[test]
    fn cluster_documents_splits_topics() {
        let graph = InMemoryGraph::with_vertex_text(
            "Label",
            [
                (0, "apple pie with cream"),
                (1, "apple pie with cream"),
                (2, "apple pie with cream"),
                (3, "quantum field theory"),
                (4, "quantum field theory"),
                (5, "quantum field theory"),
            ],
        );
        let config = AnalysisConfig::new("Label")
            .with_tokenizing(TokenizingMethod::NWords, 1)
            .with_threshold(1.0)
            .with_number_of_means(2)
            .with_seed(3);
        let mut run = ContentAnalysis::new(config).unwrap();
        let fit = run.cluster_documents(&graph).unwrap();
        assert_eq!(run.state(), RunState::Converged);
        let a = fit.assignment;
        assert_eq!(a.len(), 6);
        assert_eq!(a.get(0), a.get(1));
        assert_eq!(a.get(3), a.get(4));
        assert_ne!(a.get(0), a.get(3));

        let mut graph = recipes();
        let outcome = run.follow_up(&mut graph, &AnalysisResult::Clusters(a)).unwrap();
        assert!(outcome.is_success());
        assert_eq!(run.state(), RunState::FollowUpDispatched);
    }

    #[test]
    fn selected_only_compares_selection_against_everything() {
        let mut graph = recipes();
        graph.select(ElementType::Vertex, 3);
        let config = AnalysisConfig::new("Label")
            .with_similarity(SimilarityMethod::BinaryEuclidean)
            .with_threshold(0.3)
            .with_element_scope(ElementScope::SelectedOnly)
            .with_limits(2, 2);
        let mut run = ContentAnalysis::new(config).unwrap();
        let pairs = run.pairwise_similarities(&graph).unwrap();
        assert!(!pairs.is_empty());
        assert!(pairs.iter().all(|p| p.low() == 3 || p.high() == 3));
    }

    #[test]
    fn edges_follow_up_rejects_clusters() {
        let config = AnalysisConfig::new("Label").with_follow_up(FollowUpChoice::AddTransactions);
        let mut run = ContentAnalysis::new(config).unwrap();
        let mut graph = recipes();
        let err = run.follow_up(&mut graph, &AnalysisResult::Clusters(ClusterAssignment::new()));
        assert!(err.is_err());
        assert_eq!(graph.mutation_count(), 0);
    }

    #[test]
    fn phrase_analysis_counts_recipe_phrases() {
        let mut run = ContentAnalysis::new(AnalysisConfig::new("Label")).unwrap();
        let phrases = run.phrase_analysis(&recipes()).unwrap();
        assert_eq!(run.state(), RunState::Converged);

        let apple_pie = Index::from(hash_token("apple pie"));
        assert!(phrases.is_phrase(hash_token("apple pie")));
        assert_eq!(phrases.matrix().column_size(apple_pie), 3);
        assert_eq!(phrases.matrix().column_size(Index::from(hash_token("quantum field"))), 2);
        assert_eq!(phrases.matrix().column_size(Index::from(hash_token("pie with"))), 0);
        assert_eq!(phrases.tokens().lookup(hash_token("apple pie")).as_deref(), Some("apple pie"));
    }

    #[test]
    fn narrow_phrase_window_fails_before_tokenizing() {
        let config = AnalysisConfig::new("Label").with_phrases(PhraseConfig::default().with_length(3, 2));
        let mut run = ContentAnalysis::new(config).unwrap();
        assert!(run.phrase_analysis(&recipes()).is_err());
        assert_eq!(run.state(), RunState::Idle);
    }

    #[test]
    fn cancelled_run_fails() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let mut run = ContentAnalysis::new(AnalysisConfig::new("Label")).unwrap().with_cancel(cancel);
        assert!(matches!(run.pairwise_similarities(&recipes()), Err(Error::Cancelled { .. })));
    }
}
