//! Writing results back to the host graph.
//!
//! Each follow-up reports a [`FollowUpOutcome`]. A write the graph rejects does
//! not stop the follow-up: the remaining writes go ahead and every failure is
//! listed in [`FollowUpOutcome::PartialFailure`]. Empty input is
//! [`FollowUpOutcome::Skipped`] and touches nothing.

use crate::cluster::ClusterAssignment;
use crate::error::{Error, Result};
use crate::graph::{ElementType, GraphSink, SimilarityEdge};
use crate::similarity::ElementSimilarity;
use tracing::{info, warn};

/// Cluster value written to elements outside every cluster.
pub const NO_CLUSTER: &str = "no cluster";

/// Named selections are called `"similarity cluster 1"`, `"similarity cluster 2"`, ...
pub const SELECTION_NAME_PREFIX: &str = "similarity cluster ";

/// Hard cap on similarity edges added in one follow-up.
pub const MAX_EDGES_TO_ADD: usize = 1_000_000;

/// Top level type of similarity edges.
pub const SIMILARITY_TYPE: &str = "SIMILARITY";

/// Full type of similarity edges.
pub const SIMILARITY_SUBTYPE: &str = "SIMILARITY.nGrammaticallySimilar";

/// Similarity edges are named with this prefix and a running number.
pub const EDGE_NAME_PREFIX: &str = "similarity: ";

/// Colour of similarity edges (purple).
pub const SIMILARITY_COLOR: &str = "#800080";

/// What a follow-up did to the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUpOutcome {
    /// Every write succeeded.
    Completed {
        /// Number of writes.
        applied: usize,
    },
    /// Nothing to write; the graph was not touched.
    Skipped,
    /// Some writes failed.
    PartialFailure {
        /// Number of successful writes.
        applied: usize,
        /// Messages of the failed writes.
        failures: Vec<String>,
    },
}

impl FollowUpOutcome {
    /// Whether every write succeeded (or there was nothing to write).
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::PartialFailure { .. })
    }
}

#[derive(Default)]
struct Tally {
    applied: usize,
    failures: Vec<String>,
}

impl Tally {
    fn record(&mut self, what: &str, result: Result<()>) {
        match result {
            Ok(()) => self.applied += 1,
            Err(err) => {
                warn!(error = %err, what, "follow-up write failed");
                self.failures.push(format!("{what}: {err}"));
            }
        }
    }

    fn outcome(self) -> FollowUpOutcome {
        if self.failures.is_empty() {
            FollowUpOutcome::Completed {
                applied: self.applied,
            }
        } else {
            FollowUpOutcome::PartialFailure {
                applied: self.applied,
                failures: self.failures,
            }
        }
    }
}

/// Write each element's cluster into the named-cluster attribute.
///
/// Every element of `element_type` is first reset to [`NO_CLUSTER`].
pub fn write_clusters<G: GraphSink + ?Sized>(
    sink: &mut G,
    element_type: ElementType,
    assignment: &ClusterAssignment,
) -> FollowUpOutcome {
    if assignment.is_empty() {
        info!("no clusters to write");
        return FollowUpOutcome::Skipped;
    }
    let mut tally = Tally::default();
    for element in sink.element_ids(element_type) {
        let result = sink.set_cluster(element_type, element, NO_CLUSTER);
        tally.record("reset cluster", result);
    }
    for (element, cluster) in assignment.iter() {
        let result = sink.set_cluster(element_type, element, &cluster.to_string());
        tally.record("write cluster", result);
    }
    tally.outcome()
}

/// Create one named selection per cluster, numbered from 1 in cluster order.
pub fn make_selections<G: GraphSink + ?Sized>(sink: &mut G, assignment: &ClusterAssignment) -> FollowUpOutcome {
    if assignment.is_empty() {
        info!("no clusters to select");
        return FollowUpOutcome::Skipped;
    }
    let mut tally = Tally::default();
    for (number, members) in assignment.clusters().into_values().enumerate() {
        let name = format!("{SELECTION_NAME_PREFIX}{}", number + 1);
        let result = sink.create_named_selection(&name, &members);
        tally.record("create selection", result);
    }
    tally.outcome()
}

/// Add one purple `SIMILARITY` edge per pair.
///
/// Fails with [`Error::TooManyResults`] before touching the graph when there
/// are more than [`MAX_EDGES_TO_ADD`] pairs.
pub fn add_similarity_edges<G: GraphSink + ?Sized>(
    sink: &mut G,
    pairs: &[ElementSimilarity],
) -> Result<FollowUpOutcome> {
    add_similarity_edges_capped(sink, pairs, MAX_EDGES_TO_ADD)
}

fn add_similarity_edges_capped<G: GraphSink + ?Sized>(
    sink: &mut G,
    pairs: &[ElementSimilarity],
    max: usize,
) -> Result<FollowUpOutcome> {
    if pairs.len() > max {
        return Err(Error::TooManyResults {
            count: pairs.len(),
            max,
        });
    }
    if pairs.is_empty() {
        info!("no similar pairs to link");
        return Ok(FollowUpOutcome::Skipped);
    }
    let mut tally = Tally::default();
    for (number, pair) in pairs.iter().enumerate() {
        let edge = SimilarityEdge {
            source: pair.low(),
            destination: pair.high(),
            similarity: pair.score(),
            edge_type: SIMILARITY_TYPE.to_string(),
            subtype: SIMILARITY_SUBTYPE.to_string(),
            name: format!("{EDGE_NAME_PREFIX}{number}"),
            color: SIMILARITY_COLOR.to_string(),
        };
        let result = sink.add_similarity_edge(edge);
        tally.record("add edge", result);
    }
    Ok(tally.outcome())
}
