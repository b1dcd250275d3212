use super::{Column, Index, SparseMatrix, Value};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::ops::Deref;

/// A [`SparseMatrix`] whose columns can carry one boolean tag each.
///
/// Tags are first-write-wins: once a column is tagged, later requests are ignored.
#[derive(Debug)]
pub struct TaggedSparseMatrix<V> {
    matrix: SparseMatrix<V>,
    tags: RwLock<HashMap<Index, bool>>,
}

impl<V: Value> Default for TaggedSparseMatrix<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Value> TaggedSparseMatrix<V> {
    /// Create an empty tagged matrix.
    pub fn new() -> Self {
        Self {
            matrix: SparseMatrix::new(),
            tags: RwLock::new(HashMap::new()),
        }
    }

    /// Tag a column unless it is already tagged. Returns whether the tag was applied.
    pub fn tag_column(&self, col: Index, tag: bool) -> bool {
        if self.tags.read().contains_key(&col) {
            return false;
        }
        let mut tags = self.tags.write();
        if tags.contains_key(&col) {
            return false;
        }
        tags.insert(col, tag);
        true
    }

    /// The tag of a column, if any.
    pub fn tag(&self, col: Index) -> Option<bool> {
        self.tags.read().get(&col).copied()
    }

    /// Columns carrying `tag`, in ascending order.
    pub fn columns_tagged(&self, tag: bool) -> Vec<Index> {
        let mut cols: Vec<Index> = self
            .tags
            .read()
            .iter()
            .filter(|&(_, &t)| t == tag)
            .map(|(&col, _)| col)
            .collect();
        cols.sort_unstable();
        cols
    }

    /// Remove a column together with its tag.
    pub fn remove_column(&self, col: Index) -> Option<Column<V>> {
        self.tags.write().remove(&col);
        self.matrix.remove_column(col)
    }

    /// The untagged matrix underneath.
    pub fn matrix(&self) -> &SparseMatrix<V> {
        &self.matrix
    }
}

impl<V> Deref for TaggedSparseMatrix<V> {
    type Target = SparseMatrix<V>;

    fn deref(&self) -> &Self::Target {
        &self.matrix
    }
}
