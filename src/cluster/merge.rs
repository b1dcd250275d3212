use super::ClusterAssignment;
use crate::graph::{ClusterId, ElementId};
use crate::similarity::ElementSimilarity;
use std::collections::{BTreeSet, HashMap};

/// Online union of similar pairs into disjoint clusters.
///
/// Each pair is handled as it arrives:
///
/// - both elements clustered, in different clusters: the smaller-numbered
///   cluster's members move into the other, and the emptied id is recycled;
/// - one clustered: the other joins its cluster;
/// - neither: both go into a fresh (or recycled) cluster.
#[derive(Debug, Default)]
pub struct MergeClustering {
    element_to_cluster: HashMap<ElementId, ClusterId>,
    clusters: Vec<Option<BTreeSet<ElementId>>>,
    free: Vec<ClusterId>,
}

impl MergeClustering {
    /// No clusters yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge every pair, in order, and return the result.
    pub fn from_pairs(pairs: &[ElementSimilarity]) -> ClusterAssignment {
        let mut merge = Self::new();
        for pair in pairs {
            merge.add_pair(pair.low(), pair.high());
        }
        merge.finish()
    }

    /// Record that `a` and `b` are similar.
    pub fn add_pair(&mut self, a: ElementId, b: ElementId) {
        let ca = self.element_to_cluster.get(&a).copied();
        let cb = self.element_to_cluster.get(&b).copied();
        match (ca, cb) {
            (Some(ca), Some(cb)) if ca == cb => {}
            (Some(ca), Some(cb)) => {
                let (from, into) = if ca < cb { (ca, cb) } else { (cb, ca) };
                let moved = self.clusters[from as usize].take().unwrap_or_default();
                for &element in &moved {
                    self.element_to_cluster.insert(element, into);
                }
                if let Some(target) = self.clusters[into as usize].as_mut() {
                    target.extend(moved);
                }
                self.free.push(from);
            }
            (Some(c), None) => self.join(b, c),
            (None, Some(c)) => self.join(a, c),
            (None, None) => {
                let c = self.allocate();
                self.join(a, c);
                self.join(b, c);
            }
        }
    }

    /// Number of live clusters.
    pub fn num_clusters(&self) -> usize {
        self.clusters.len() - self.free.len()
    }

    /// The cluster of `element`, if any.
    pub fn cluster_of(&self, element: ElementId) -> Option<ClusterId> {
        self.element_to_cluster.get(&element).copied()
    }

    /// Members of `cluster`, ascending.
    pub fn members(&self, cluster: ClusterId) -> Vec<ElementId> {
        self.clusters
            .get(cluster as usize)
            .and_then(Option::as_ref)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The element to cluster mapping.
    pub fn finish(self) -> ClusterAssignment {
        self.element_to_cluster.into_iter().collect()
    }

    fn join(&mut self, element: ElementId, cluster: ClusterId) {
        self.element_to_cluster.insert(element, cluster);
        if let Some(members) = self.clusters[cluster as usize].as_mut() {
            members.insert(element);
        }
    }

    fn allocate(&mut self) -> ClusterId {
        if let Some(id) = self.free.pop() {
            self.clusters[id as usize] = Some(BTreeSet::new());
            return id;
        }
        self.clusters.push(Some(BTreeSet::new()));
        (self.clusters.len() - 1) as ClusterId
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_new_and_absorb() {
        let mut m = MergeClustering::new();
        m.add_pair(1, 2);
        m.add_pair(2, 3);
        m.add_pair(8, 9);
        assert_eq!(m.num_clusters(), 2);
        assert_eq!(m.cluster_of(3), Some(0));
        assert_eq!(m.members(0), vec![1, 2, 3]);
        assert_eq!(m.members(1), vec![8, 9]);
    }

    #[test]
    fn test_merge_moves_smaller_id_and_recycles() {
        let mut m = MergeClustering::new();
        m.add_pair(1, 2); // cluster 0
        m.add_pair(3, 4); // cluster 1
        m.add_pair(2, 3); // 0 merges into 1
        assert_eq!(m.num_clusters(), 1);
        assert_eq!(m.members(1), vec![1, 2, 3, 4]);
        assert!(m.members(0).is_empty());

        m.add_pair(6, 7); // reuses 0
        assert_eq!(m.cluster_of(6), Some(0));
        assert_eq!(m.num_clusters(), 2);
    }

    #[test]
    fn test_merge_same_cluster_is_noop() {
        let mut m = MergeClustering::new();
        m.add_pair(1, 2);
        m.add_pair(2, 3);
        m.add_pair(1, 3);
        assert_eq!(m.num_clusters(), 1);
        assert_eq!(m.finish().len(), 3);
    }

    #[test]
    fn test_merge_empty() {
        assert!(MergeClustering::from_pairs(&[]).is_empty());
    }
}
