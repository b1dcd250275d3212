//! Sparse frequency matrices keyed by two integer axes.
//!
//! A [`SparseMatrix`] stores `column -> (row -> value)`. Which axis is the token and
//! which is the element depends on the caller: the token handlers build
//! `token -> (element -> frequency)`, the vector clustering service builds
//! `element -> (token -> weight)`.
//!
//! ## Invariants
//!
//! - An absent cell means zero. Zero is never stored: writing zero clears the cell,
//!   and a column whose last cell is cleared disappears.
//! - [`SparseMatrix::get`] returns `None` for absent cells; [`SparseMatrix::get_or_zero`]
//!   applies the zero fallback explicitly.
//! - Negative column keys are reserved for synthetic columns such as centroids.
//!
//! ## Concurrency
//!
//! Every column sits behind its own lock. Mutations on disjoint columns proceed in
//! parallel; writes to the same column serialize on that column's lock. The outer
//! column index is only write-locked when a column is created or removed.
//! Clearing or removing a column must not race with writes to that same column.

mod tagged;

pub use tagged::TaggedSparseMatrix;

use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Debug;
use std::sync::Arc;

/// Key type for both matrix axes.
pub type Index = i64;

/// Numeric cell type.
pub trait Value: Copy + PartialEq + PartialOrd + Debug + Send + Sync + 'static {
    /// Additive identity; doubles as the "no entry" value.
    const ZERO: Self;

    /// Sum of two values.
    fn add(self, other: Self) -> Self;

    /// Lossy conversion used for distances and means.
    fn to_f32(self) -> f32;

    /// Conversion back from a mean; integer cells round to nearest.
    fn from_f32(value: f32) -> Self;

    /// Whether this value is the additive identity.
    #[inline]
    fn is_zero(self) -> bool {
        self == Self::ZERO
    }
}

impl Value for i32 {
    const ZERO: Self = 0;

    #[inline]
    fn add(self, other: Self) -> Self {
        self.saturating_add(other)
    }

    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }

    #[inline]
    fn from_f32(value: f32) -> Self {
        value.round() as i32
    }
}

impl Value for f32 {
    const ZERO: Self = 0.0;

    #[inline]
    fn add(self, other: Self) -> Self {
        self + other
    }

    #[inline]
    fn to_f32(self) -> f32 {
        self
    }

    #[inline]
    fn from_f32(value: f32) -> Self {
        value
    }
}

/// How [`SparseMatrix::distance`] combines per-row differences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMethod {
    /// Sum of absolute differences.
    Taxicab,
    /// Square root of the sum of squared differences.
    Euclidean,
    /// Euclidean distance divided by `1 + Σ min(a, b)` over shared rows.
    ///
    /// Columns that share a lot of mass are pulled closer together than plain
    /// Euclidean distance would place them.
    #[default]
    EuclideanOverCommonality,
}

/// A snapshot of one column: `(row, value)` pairs in ascending row order.
#[derive(Debug, Clone, PartialEq)]
pub struct Column<V> {
    entries: Vec<(Index, V)>,
}

impl<V: Value> Column<V> {
    fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of stored (non-zero) entries.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Whether the column has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(row, value)` pairs in ascending row order.
    pub fn iter(&self) -> impl Iterator<Item = (Index, V)> + '_ {
        self.entries.iter().copied()
    }

    /// Row keys in ascending order.
    pub fn rows(&self) -> impl Iterator<Item = Index> + '_ {
        self.entries.iter().map(|&(row, _)| row)
    }

    /// Sum of the column's values.
    pub fn sum(&self) -> V {
        self.entries
            .iter()
            .fold(V::ZERO, |acc, &(_, value)| acc.add(value))
    }
}

impl<V> IntoIterator for Column<V> {
    type Item = (Index, V);
    type IntoIter = std::vec::IntoIter<(Index, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

type ColumnCell<V> = Arc<Mutex<BTreeMap<Index, V>>>;

/// A sparse two-dimensional matrix with per-column locking.
#[derive(Debug)]
pub struct SparseMatrix<V> {
    columns: RwLock<BTreeMap<Index, ColumnCell<V>>>,
}

impl<V: Value> Default for SparseMatrix<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Value> SparseMatrix<V> {
    /// Create an empty matrix.
    pub fn new() -> Self {
        Self {
            columns: RwLock::new(BTreeMap::new()),
        }
    }

    fn column_cell(&self, col: Index) -> Option<ColumnCell<V>> {
        self.columns.read().get(&col).cloned()
    }

    fn column_cell_or_insert(&self, col: Index) -> ColumnCell<V> {
        if let Some(cell) = self.column_cell(col) {
            return cell;
        }
        let mut columns = self.columns.write();
        Arc::clone(columns.entry(col).or_default())
    }

    /// Drop `col` from the index if it has become empty.
    fn prune_if_empty(&self, col: Index) {
        let mut columns = self.columns.write();
        let empty = columns.get(&col).is_some_and(|cell| cell.lock().is_empty());
        if empty {
            columns.remove(&col);
        }
    }

    /// Overwrite a cell. Writing zero clears it.
    pub fn put(&self, row: Index, col: Index, value: V) {
        if value.is_zero() {
            self.clear_cell(row, col);
            return;
        }
        let cell = self.column_cell_or_insert(col);
        cell.lock().insert(row, value);
    }

    /// Add `delta` to a cell and return the new value.
    ///
    /// The read-modify-write happens under the column lock, so concurrent
    /// increments of the same cell are not lost.
    pub fn increment(&self, row: Index, col: Index, delta: V) -> V {
        let cell = self.column_cell_or_insert(col);
        let (updated, now_empty) = {
            let mut column = cell.lock();
            let entry = column.entry(row).or_insert(V::ZERO);
            *entry = entry.add(delta);
            let updated = *entry;
            if updated.is_zero() {
                column.remove(&row);
            }
            (updated, column.is_empty())
        };
        if now_empty {
            self.prune_if_empty(col);
        }
        updated
    }

    /// Read a cell; `None` when absent.
    pub fn get(&self, row: Index, col: Index) -> Option<V> {
        self.column_cell(col)
            .and_then(|cell| cell.lock().get(&row).copied())
    }

    /// Read a cell, treating an absent entry as zero.
    pub fn get_or_zero(&self, row: Index, col: Index) -> V {
        self.get(row, col).unwrap_or(V::ZERO)
    }

    /// Remove a single cell.
    pub fn clear_cell(&self, row: Index, col: Index) {
        let Some(cell) = self.column_cell(col) else {
            return;
        };
        let now_empty = {
            let mut column = cell.lock();
            column.remove(&row);
            column.is_empty()
        };
        if now_empty {
            self.prune_if_empty(col);
        }
    }

    /// Remove a whole column, returning its contents.
    pub fn remove_column(&self, col: Index) -> Option<Column<V>> {
        let cell = self.columns.write().remove(&col)?;
        let entries = cell.lock().iter().map(|(&r, &v)| (r, v)).collect();
        Some(Column { entries })
    }

    /// Snapshot of a column. Missing columns are empty.
    pub fn column(&self, col: Index) -> Column<V> {
        match self.column_cell(col) {
            Some(cell) => Column {
                entries: cell.lock().iter().map(|(&r, &v)| (r, v)).collect(),
            },
            None => Column::empty(),
        }
    }

    /// Whether a column has at least one entry.
    pub fn has_column(&self, col: Index) -> bool {
        self.columns.read().contains_key(&col)
    }

    /// All column keys in ascending order (synthetic negative columns first).
    pub fn column_keys(&self) -> Vec<Index> {
        self.columns.read().keys().copied().collect()
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.columns.read().len()
    }

    /// Number of entries in a column (0 when missing).
    pub fn column_size(&self, col: Index) -> usize {
        self.column_cell(col).map_or(0, |cell| cell.lock().len())
    }

    /// Sum of a column's values.
    pub fn column_sum(&self, col: Index) -> V {
        self.column(col).sum()
    }

    /// Largest column sum over all columns.
    pub fn largest_column_sum(&self) -> V {
        self.largest_column_sum_of(&self.column_keys())
    }

    /// Largest column sum over `cols`.
    pub fn largest_column_sum_of(&self, cols: &[Index]) -> V {
        cols.iter()
            .map(|&col| self.column_sum(col))
            .fold(V::ZERO, |best, sum| if sum > best { sum } else { best })
    }

    /// Largest number of entries in any column.
    pub fn largest_column_size(&self) -> usize {
        self.columns
            .read()
            .values()
            .map(|cell| cell.lock().len())
            .max()
            .unwrap_or(0)
    }

    /// Rows touched by any column in `cols`.
    pub fn column_element_union(&self, cols: &[Index]) -> BTreeSet<Index> {
        let mut rows = BTreeSet::new();
        for &col in cols {
            rows.extend(self.column(col).rows());
        }
        rows
    }

    /// Rows present in every column of `cols`.
    pub fn column_element_intersection(&self, cols: &[Index]) -> BTreeSet<Index> {
        let mut iter = cols.iter();
        let Some(&first) = iter.next() else {
            return BTreeSet::new();
        };
        let mut rows: BTreeSet<Index> = self.column(first).rows().collect();
        for &col in iter {
            if rows.is_empty() {
                break;
            }
            let other: BTreeSet<Index> = self.column(col).rows().collect();
            rows.retain(|row| other.contains(row));
        }
        rows
    }

    /// Deep copy of the matrix as `column -> set of rows`.
    pub fn token_sets(&self) -> HashMap<Index, BTreeSet<Index>> {
        self.columns
            .read()
            .iter()
            .map(|(&col, cell)| (col, cell.lock().keys().copied().collect()))
            .collect()
    }

    /// Write the mean of `cols` into `dest`, replacing whatever `dest` held.
    ///
    /// Every row touched by any of `cols` gets `Σ value / cols.len()`, with missing
    /// entries counting as zero. Rows whose mean rounds to zero are not stored.
    pub fn compute_centroid(&self, cols: &[Index], dest: Index) {
        if cols.is_empty() {
            self.remove_column(dest);
            return;
        }
        let mut sums: BTreeMap<Index, f32> = BTreeMap::new();
        for &col in cols {
            for (row, value) in self.column(col) {
                *sums.entry(row).or_insert(0.0) += value.to_f32();
            }
        }
        let count = cols.len() as f32;
        let centre: BTreeMap<Index, V> = sums
            .into_iter()
            .map(|(row, sum)| (row, V::from_f32(sum / count)))
            .filter(|(_, value)| !value.is_zero())
            .collect();

        let mut columns = self.columns.write();
        if centre.is_empty() {
            columns.remove(&dest);
        } else {
            columns.insert(dest, Arc::new(Mutex::new(centre)));
        }
    }

    /// Distance between two columns over the union of their rows.
    pub fn distance(&self, a: Index, b: Index, method: DistanceMethod) -> f32 {
        if a == b {
            return 0.0;
        }
        column_distance(&self.column(a), &self.column(b), method)
    }
}

/// Merge-walk two sorted columns.
pub(crate) fn column_distance<V: Value>(a: &Column<V>, b: &Column<V>, method: DistanceMethod) -> f32 {
    let component = |d: f32| match method {
        DistanceMethod::Taxicab => d.abs(),
        DistanceMethod::Euclidean | DistanceMethod::EuclideanOverCommonality => d * d,
    };

    let mut distance = 0.0f32;
    let mut commonality = 0.0f32;
    let (mut i, mut j) = (0, 0);
    let (xs, ys) = (&a.entries, &b.entries);

    while i < xs.len() || j < ys.len() {
        match (xs.get(i), ys.get(j)) {
            (Some(&(ra, va)), Some(&(rb, vb))) if ra == rb => {
                let (va, vb) = (va.to_f32(), vb.to_f32());
                distance += component(va - vb);
                commonality += va.min(vb);
                i += 1;
                j += 1;
            }
            (Some(&(ra, va)), Some(&(rb, _))) if ra < rb => {
                distance += component(va.to_f32());
                i += 1;
            }
            (Some(&(_, va)), None) => {
                distance += component(va.to_f32());
                i += 1;
            }
            (_, Some(&(_, vb))) => {
                distance += component(vb.to_f32());
                j += 1;
            }
            (None, None) => break,
        }
    }

    match method {
        DistanceMethod::Taxicab => distance,
        DistanceMethod::Euclidean => distance.sqrt(),
        DistanceMethod::EuclideanOverCommonality => distance.sqrt() / (1.0 + commonality),
    }
}
