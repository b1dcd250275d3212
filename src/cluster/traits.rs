use super::{ClusterAssignment, VectorSpace};
use crate::error::Result;

/// Common interface for hard clustering of a vector space (one cluster per element).
pub trait Clustering {
    /// Cluster every element of `space`.
    ///
    /// Elements without a significant token are not part of the space and so
    /// receive no cluster.
    fn fit_predict(&self, space: &VectorSpace) -> Result<ClusterAssignment>;

    /// The configured number of clusters.
    fn n_clusters(&self) -> usize;
}
