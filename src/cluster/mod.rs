//! Grouping elements into clusters.
//!
//! Two routes lead to a [`ClusterAssignment`]:
//!
//! ## Merge clustering
//!
//! [`MergeClustering`] consumes similar pairs in order and unions the two
//! elements' clusters. The final partition is the transitive closure of the
//! "directly similar" relation: two elements share a cluster exactly when a chain
//! of emitted pairs connects them. Clusters are kept as explicit member sets in an
//! arena with id recycling, not as a path-compressed forest; cluster counts are
//! expected to stay far below element counts.
//!
//! ## K-means over token vectors
//!
//! [`VectorSpace::build`] turns a token matrix into weighted element vectors,
//! keeping only tokens whose document frequency is significant under a
//! [`VectorWeightingCalculator`]. [`Kmeans`] then seeds with k-means++ and
//! refines:
//!
//! ```text
//! J = Σ_k Σ_{x ∈ C_k} d(x, μ_k)²
//! ```
//!
//! where `d` is a sparse [`DistanceMethod`](crate::matrix::DistanceMethod) and
//! `μ_k` the per-token mean of cluster `k`. Refinement stops once `J` fails to
//! drop by at least 10% or reaches zero.
//!
//! ## Usage
//!
//! ```rust
//! use tokensim::cluster::{ClusterAssignment, MergeClustering};
//! use tokensim::similarity::ElementSimilarity;
//!
//! let pairs = [
//!     ElementSimilarity::new(1, 2, 0.9).unwrap(),
//!     ElementSimilarity::new(2, 7, 0.8).unwrap(),
//!     ElementSimilarity::new(4, 5, 0.7).unwrap(),
//! ];
//! let clusters: ClusterAssignment = MergeClustering::from_pairs(&pairs);
//! assert_eq!(clusters.get(1), clusters.get(7));
//! assert_ne!(clusters.get(1), clusters.get(4));
//! assert_eq!(clusters.get(3), None);
//! ```

mod kmeans;
mod merge;
mod space;
mod traits;
mod weighting;

pub use kmeans::{Kmeans, KmeansFit, KmeansStage};
pub use merge::MergeClustering;
pub use space::VectorSpace;
pub use traits::Clustering;
pub use weighting::{DocumentFrequencyWeighting, VectorWeightingCalculator};

use crate::graph::{ClusterId, ElementId};
use serde::Serialize;
use std::collections::BTreeMap;

/// Cluster of every clustered element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterAssignment {
    clusters: BTreeMap<ElementId, ClusterId>,
}

impl ClusterAssignment {
    /// An empty assignment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `element` into `cluster`, replacing any previous cluster.
    pub fn assign(&mut self, element: ElementId, cluster: ClusterId) {
        self.clusters.insert(element, cluster);
    }

    /// The cluster of `element`, if it has one.
    pub fn get(&self, element: ElementId) -> Option<ClusterId> {
        self.clusters.get(&element).copied()
    }

    /// Number of clustered elements.
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// Whether no element is clustered.
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// `(element, cluster)` in ascending element order.
    pub fn iter(&self) -> impl Iterator<Item = (ElementId, ClusterId)> + '_ {
        self.clusters.iter().map(|(&e, &c)| (e, c))
    }

    /// Members of every cluster, ascending.
    pub fn clusters(&self) -> BTreeMap<ClusterId, Vec<ElementId>> {
        let mut members: BTreeMap<ClusterId, Vec<ElementId>> = BTreeMap::new();
        for (element, cluster) in self.iter() {
            members.entry(cluster).or_default().push(element);
        }
        members
    }

    /// Number of distinct clusters.
    pub fn num_clusters(&self) -> usize {
        self.clusters().len()
    }
}

impl FromIterator<(ElementId, ClusterId)> for ClusterAssignment {
    fn from_iter<I: IntoIterator<Item = (ElementId, ClusterId)>>(iter: I) -> Self {
        Self {
            clusters: iter.into_iter().collect(),
        }
    }
}
