//! K-means over sparse element vectors.
//!
//! Seeding is k-means++: the first centroid is a random element, every further
//! centroid is an element drawn with probability proportional to its squared
//! distance from the nearest centroid chosen so far.
//!
//! Refinement alternates assignment and centroid update. An element equally close
//! to two centroids goes to either with even odds, so two runs with different
//! seeds may split ties differently. Fix the seed for reproducible output.

use super::traits::Clustering;
use super::{ClusterAssignment, VectorSpace};
use crate::error::{Error, Result};
use crate::graph::ClusterId;
use crate::matrix::{column_distance, Column, DistanceMethod, Index};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

/// Refinement continues only while each iteration cuts the error to at most
/// this fraction of the previous one.
const IMPROVEMENT_FACTOR: f64 = 0.9;

/// Progress reported by [`Kmeans::fit_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KmeansStage {
    /// Choosing initial centroids.
    Seeding,
    /// Running refinement iteration `n` (0 is the assignment to the seeds).
    Iterating(usize),
    /// Done.
    Converged,
}

/// Result of a k-means fit.
#[derive(Debug, Clone)]
pub struct KmeansFit {
    /// Cluster of every element in the space.
    pub assignment: ClusterAssignment,
    /// Total squared error after seeding and after each accepted iteration.
    pub errors: Vec<f64>,
    /// Refinement iterations run.
    pub iterations: usize,
}

/// K-means with k-means++ seeding over a [`VectorSpace`].
#[derive(Debug, Clone)]
pub struct Kmeans {
    k: usize,
    max_iter: usize,
    seed: Option<u64>,
    distance: DistanceMethod,
}

impl Kmeans {
    /// K-means with `k` clusters.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: 100,
            seed: None,
            distance: DistanceMethod::default(),
        }
    }

    /// Fix the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Cap refinement iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Choose the sparse distance.
    pub fn with_distance(mut self, distance: DistanceMethod) -> Self {
        self.distance = distance;
        self
    }

    /// Fit without progress reporting.
    pub fn fit(&self, space: &VectorSpace) -> Result<KmeansFit> {
        self.fit_with(space, |_| {})
    }

    /// Fit, calling `observer` as the fit moves through its stages.
    pub fn fit_with(&self, space: &VectorSpace, mut observer: impl FnMut(KmeansStage)) -> Result<KmeansFit> {
        if self.k == 0 {
            return Err(Error::InvalidClusterCount {
                requested: 0,
                minimum: 1,
            });
        }
        let elements = space.elements();
        let n = elements.len();
        if n == 0 {
            debug!("empty vector space; nothing to cluster");
            observer(KmeansStage::Converged);
            return Ok(KmeansFit {
                assignment: ClusterAssignment::new(),
                errors: Vec::new(),
                iterations: 0,
            });
        }
        let k = if self.k > n {
            warn!(k = self.k, n, "fewer elements than clusters; clamping k");
            n
        } else {
            self.k
        };

        let seed = self.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = StdRng::seed_from_u64(seed);
        let matrix = space.vectors();
        let columns: Vec<Column<f32>> = elements
            .iter()
            .map(|&e| matrix.column(Index::from(e)))
            .collect();

        observer(KmeansStage::Seeding);
        let member_cols: Vec<Index> = elements.iter().map(|&e| Index::from(e)).collect();
        let mut centroids = self.seed_centroids(space, &member_cols, &columns, k, &mut rng);
        let k = centroids.len();

        observer(KmeansStage::Iterating(0));
        let (mut assignment, mut error) = self.assign(&columns, &centroids, &mut rng);
        let mut errors = vec![error];
        let mut iterations = 0;

        while error > 0.0 && iterations < self.max_iter {
            iterations += 1;
            observer(KmeansStage::Iterating(iterations));

            for (c, centroid) in centroids.iter_mut().enumerate() {
                let members: Vec<Index> = assignment
                    .iter()
                    .zip(&member_cols)
                    .filter(|&(&a, _)| a == c)
                    .map(|(_, &col)| col)
                    .collect();
                matrix.compute_centroid(&members, centroid_column(c));
                *centroid = matrix.column(centroid_column(c));
            }

            let (next, next_error) = self.assign(&columns, &centroids, &mut rng);
            if next_error > error {
                debug!(iterations, error, next_error, "error rose; keeping previous assignment");
                break;
            }
            let improved = next_error <= IMPROVEMENT_FACTOR * error;
            assignment = next;
            error = next_error;
            errors.push(error);
            if !improved {
                break;
            }
        }

        for c in 0..k {
            matrix.remove_column(centroid_column(c));
        }
        observer(KmeansStage::Converged);
        debug!(k, iterations, error, "k-means converged");

        Ok(KmeansFit {
            assignment: elements
                .iter()
                .zip(assignment)
                .map(|(&e, c)| (e, c as ClusterId))
                .collect(),
            errors,
            iterations,
        })
    }

    /// k-means++ seeding; may return fewer than `k` centroids when every
    /// remaining element coincides with a chosen one.
    fn seed_centroids(
        &self,
        space: &VectorSpace,
        member_cols: &[Index],
        columns: &[Column<f32>],
        k: usize,
        rng: &mut StdRng,
    ) -> Vec<Column<f32>> {
        let matrix = space.vectors();
        let n = columns.len();
        let first = rng.random_range(0..n);
        matrix.compute_centroid(&[member_cols[first]], centroid_column(0));
        let mut centroids = vec![matrix.column(centroid_column(0))];
        let mut nearest: Vec<f32> = columns
            .iter()
            .map(|col| column_distance(col, &centroids[0], self.distance))
            .collect();

        while centroids.len() < k {
            let total: f64 = nearest.iter().map(|&d| f64::from(d) * f64::from(d)).sum();
            if total <= 0.0 {
                warn!(seeded = centroids.len(), k, "no element left away from the centroids");
                break;
            }
            let target = rng.random::<f64>() * total;
            let mut cumulative = 0.0;
            let mut pick = None;
            for (i, &d) in nearest.iter().enumerate() {
                if d <= 0.0 {
                    continue;
                }
                cumulative += f64::from(d) * f64::from(d);
                pick = Some(i);
                if cumulative >= target {
                    break;
                }
            }
            let Some(pick) = pick else { break };

            let c = centroids.len();
            matrix.compute_centroid(&[member_cols[pick]], centroid_column(c));
            let centroid = matrix.column(centroid_column(c));
            for (slot, col) in nearest.iter_mut().zip(columns) {
                *slot = slot.min(column_distance(col, &centroid, self.distance));
            }
            centroids.push(centroid);
        }
        centroids
    }

    /// Nearest centroid for every column, and the total squared error.
    fn assign(&self, columns: &[Column<f32>], centroids: &[Column<f32>], rng: &mut StdRng) -> (Vec<usize>, f64) {
        let mut error = 0.0;
        let assignment = columns
            .iter()
            .map(|col| {
                let mut best = 0;
                let mut best_distance = f32::INFINITY;
                for (c, centroid) in centroids.iter().enumerate() {
                    let d = column_distance(col, centroid, self.distance);
                    if d < best_distance {
                        best = c;
                        best_distance = d;
                    } else if d == best_distance && rng.random_bool(0.5) {
                        best = c;
                    }
                }
                error += f64::from(best_distance) * f64::from(best_distance);
                best
            })
            .collect();
        (assignment, error)
    }
}

impl Clustering for Kmeans {
    fn fit_predict(&self, space: &VectorSpace) -> Result<ClusterAssignment> {
        Ok(self.fit(space)?.assignment)
    }

    fn n_clusters(&self) -> usize {
        self.k
    }
}

fn centroid_column(cluster: usize) -> Index {
    -(cluster as Index) - 1
}
