//! Column groups: the per-column-subset compressed encodings dispatched
//! over by [`crate::matrix::CompressedMatrix`] (§4.2).
//!
//! Every variant owns the same two pieces of bookkeeping — which global
//! columns it covers (`col_indices`) and how many rows the matrix has
//! (`num_rows`) — plus whatever encoding-specific state it needs to answer
//! `get(row, col)`. `Ddc`/`Sdc`/`Rle`/`Ole` additionally share a
//! `Dictionary` of distinct tuples and a row-to-value-index mapping;
//! `Sdc`/`Rle`/`Ole` leave rows that aren't explicitly mapped implicitly
//! zero, which is what makes them sparse.
//!
//! `Sdc`/`Rle`/`Ole` store their row mapping as, respectively: a sorted
//! exception list, a list of (start, length) runs per distinct value, and
//! a list of row indices per distinct value. This is a simplified
//! analogue of the bit-packed segment encodings a production compressor
//! would use; see the design notes for why.

use crate::dense::{DenseBlock, MatrixBlock};
use crate::dictionary::Dictionary;
use crate::error::{CompressedError, Result};
use crate::types::{BinaryOp, DimensionType, Precision, ScalarOp};
use crate::utils::math;
use crate::utils::numerical::pattern_matches;
use alloc::vec;
use alloc::vec::Vec;

/// Dense row -> value-index mapping, used by `Ddc`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DdcMapping {
    row_to_value: Vec<u32>,
}

impl DdcMapping {
    pub fn new(row_to_value: Vec<u32>) -> Self {
        Self { row_to_value }
    }

    fn value_index_for_row(&self, row: usize) -> Option<usize> {
        Some(self.row_to_value[row] as usize)
    }

    fn counts(&self, num_values: usize) -> Vec<usize> {
        let mut counts = vec![0usize; num_values];
        for &k in &self.row_to_value {
            counts[k as usize] += 1;
        }
        counts
    }

    fn for_each_pair(&self, f: &mut dyn FnMut(usize, usize)) {
        for (row, &k) in self.row_to_value.iter().enumerate() {
            f(row, k as usize);
        }
    }

    fn explicit_rows(&self) -> usize {
        self.row_to_value.len()
    }
}

/// Sparse exception-list mapping, used by `Sdc`: rows not listed are
/// implicitly zero.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SdcMapping {
    row_indices: Vec<u32>,
    value_indices: Vec<u32>,
}

impl SdcMapping {
    pub fn new(row_indices: Vec<u32>, value_indices: Vec<u32>) -> Self {
        debug_assert_eq!(row_indices.len(), value_indices.len());
        debug_assert!(row_indices.windows(2).all(|w| w[0] < w[1]));
        Self {
            row_indices,
            value_indices,
        }
    }

    fn value_index_for_row(&self, row: usize) -> Option<usize> {
        self.row_indices
            .binary_search(&(row as u32))
            .ok()
            .map(|i| self.value_indices[i] as usize)
    }

    fn counts(&self, num_values: usize) -> Vec<usize> {
        let mut counts = vec![0usize; num_values];
        for &k in &self.value_indices {
            counts[k as usize] += 1;
        }
        counts
    }

    fn for_each_pair(&self, f: &mut dyn FnMut(usize, usize)) {
        for (&row, &k) in self.row_indices.iter().zip(self.value_indices.iter()) {
            f(row as usize, k as usize);
        }
    }

    fn explicit_rows(&self) -> usize {
        self.row_indices.len()
    }
}

/// Run-length mapping, used by `Rle`: each distinct value owns a list of
/// non-overlapping `(start_row, length)` runs; rows outside every run are
/// implicitly zero.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RleMapping {
    runs: Vec<Vec<(u32, u32)>>,
}

impl RleMapping {
    pub fn new(runs: Vec<Vec<(u32, u32)>>) -> Self {
        Self { runs }
    }

    fn value_index_for_row(&self, row: usize) -> Option<usize> {
        let row = row as u32;
        for (k, segs) in self.runs.iter().enumerate() {
            for &(start, len) in segs {
                if row >= start && row < start + len {
                    return Some(k);
                }
            }
        }
        None
    }

    fn counts(&self, num_values: usize) -> Vec<usize> {
        let mut counts = vec![0usize; num_values];
        for (k, segs) in self.runs.iter().enumerate() {
            counts[k] = segs.iter().map(|&(_, len)| len as usize).sum();
        }
        counts
    }

    fn for_each_pair(&self, f: &mut dyn FnMut(usize, usize)) {
        for (k, segs) in self.runs.iter().enumerate() {
            for &(start, len) in segs {
                for row in start..start + len {
                    f(row as usize, k);
                }
            }
        }
    }

    fn explicit_rows(&self) -> usize {
        self.runs
            .iter()
            .flat_map(|segs| segs.iter())
            .map(|&(_, len)| len as usize)
            .sum()
    }
}

/// Offset-list mapping, used by `Ole`: each distinct value owns a sorted
/// list of the rows that reference it; rows in no list are implicitly
/// zero.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OleMapping {
    rows_by_value: Vec<Vec<u32>>,
}

impl OleMapping {
    pub fn new(rows_by_value: Vec<Vec<u32>>) -> Self {
        Self { rows_by_value }
    }

    fn value_index_for_row(&self, row: usize) -> Option<usize> {
        let row = row as u32;
        self.rows_by_value
            .iter()
            .position(|rows| rows.binary_search(&row).is_ok())
    }

    fn counts(&self, num_values: usize) -> Vec<usize> {
        let mut counts = vec![0usize; num_values];
        for (k, rows) in self.rows_by_value.iter().enumerate() {
            counts[k] = rows.len();
        }
        counts
    }

    fn for_each_pair(&self, f: &mut dyn FnMut(usize, usize)) {
        for (k, rows) in self.rows_by_value.iter().enumerate() {
            for &row in rows {
                f(row as usize, k);
            }
        }
    }

    fn explicit_rows(&self) -> usize {
        self.rows_by_value.iter().map(|rows| rows.len()).sum()
    }
}

/// A single compressed (or pass-through) column group.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColumnGroup {
    /// Every covered cell is zero.
    Empty { col_indices: Vec<usize>, num_rows: usize },
    /// Every row shares the same tuple.
    Const {
        col_indices: Vec<usize>,
        num_rows: usize,
        dict: Dictionary,
    },
    /// No compression: a dense block held verbatim.
    Uncompressed { col_indices: Vec<usize>, block: DenseBlock },
    /// Dense dictionary coding: every row has an explicit value index.
    Ddc {
        col_indices: Vec<usize>,
        num_rows: usize,
        dict: Dictionary,
        mapping: DdcMapping,
    },
    /// Sparse dictionary coding: only exception rows are recorded.
    Sdc {
        col_indices: Vec<usize>,
        num_rows: usize,
        dict: Dictionary,
        mapping: SdcMapping,
    },
    /// Run-length encoding of value-index segments.
    Rle {
        col_indices: Vec<usize>,
        num_rows: usize,
        dict: Dictionary,
        mapping: RleMapping,
    },
    /// Offset-list encoding of value-index memberships.
    Ole {
        col_indices: Vec<usize>,
        num_rows: usize,
        dict: Dictionary,
        mapping: OleMapping,
    },
}

impl ColumnGroup {
    pub fn col_indices(&self) -> &[usize] {
        match self {
            ColumnGroup::Empty { col_indices, .. }
            | ColumnGroup::Const { col_indices, .. }
            | ColumnGroup::Uncompressed { col_indices, .. }
            | ColumnGroup::Ddc { col_indices, .. }
            | ColumnGroup::Sdc { col_indices, .. }
            | ColumnGroup::Rle { col_indices, .. }
            | ColumnGroup::Ole { col_indices, .. } => col_indices,
        }
    }

    pub fn num_rows(&self) -> DimensionType {
        match self {
            ColumnGroup::Empty { num_rows, .. }
            | ColumnGroup::Ddc { num_rows, .. }
            | ColumnGroup::Sdc { num_rows, .. }
            | ColumnGroup::Rle { num_rows, .. }
            | ColumnGroup::Ole { num_rows, .. }
            | ColumnGroup::Const { num_rows, .. } => *num_rows,
            ColumnGroup::Uncompressed { block, .. } => block.rows(),
        }
    }

    pub fn num_cols(&self) -> usize {
        self.col_indices().len()
    }

    /// Rewrite which global columns this group covers in place, e.g. when
    /// shifting a group's columns during a column-bind append.
    pub fn set_col_indices(&mut self, new_indices: Vec<usize>) {
        let slot = match self {
            ColumnGroup::Empty { col_indices, .. }
            | ColumnGroup::Const { col_indices, .. }
            | ColumnGroup::Uncompressed { col_indices, .. }
            | ColumnGroup::Ddc { col_indices, .. }
            | ColumnGroup::Sdc { col_indices, .. }
            | ColumnGroup::Rle { col_indices, .. }
            | ColumnGroup::Ole { col_indices, .. } => col_indices,
        };
        *slot = new_indices;
    }

    pub fn dict(&self) -> Option<&Dictionary> {
        match self {
            ColumnGroup::Const { dict, .. }
            | ColumnGroup::Ddc { dict, .. }
            | ColumnGroup::Sdc { dict, .. }
            | ColumnGroup::Rle { dict, .. }
            | ColumnGroup::Ole { dict, .. } => Some(dict),
            ColumnGroup::Empty { .. } | ColumnGroup::Uncompressed { .. } => None,
        }
    }

    /// Number of rows explicitly present in this group's mapping (used for
    /// `containsValue`/size accounting on the sparse variants).
    fn explicit_rows(&self) -> usize {
        match self {
            ColumnGroup::Ddc { mapping, .. } => mapping.explicit_rows(),
            ColumnGroup::Sdc { mapping, .. } => mapping.explicit_rows(),
            ColumnGroup::Rle { mapping, .. } => mapping.explicit_rows(),
            ColumnGroup::Ole { mapping, .. } => mapping.explicit_rows(),
            ColumnGroup::Const { num_rows, .. } => *num_rows,
            ColumnGroup::Empty { .. } | ColumnGroup::Uncompressed { .. } => 0,
        }
    }

    fn value_index_for_row(&self, row: usize) -> Option<usize> {
        match self {
            ColumnGroup::Ddc { mapping, .. } => mapping.value_index_for_row(row),
            ColumnGroup::Sdc { mapping, .. } => mapping.value_index_for_row(row),
            ColumnGroup::Rle { mapping, .. } => mapping.value_index_for_row(row),
            ColumnGroup::Ole { mapping, .. } => mapping.value_index_for_row(row),
            ColumnGroup::Const { .. } => Some(0),
            ColumnGroup::Empty { .. } | ColumnGroup::Uncompressed { .. } => None,
        }
    }

    fn for_each_pair(&self, f: &mut dyn FnMut(usize, usize)) {
        match self {
            ColumnGroup::Ddc { mapping, .. } => mapping.for_each_pair(f),
            ColumnGroup::Sdc { mapping, .. } => mapping.for_each_pair(f),
            ColumnGroup::Rle { mapping, .. } => mapping.for_each_pair(f),
            ColumnGroup::Ole { mapping, .. } => mapping.for_each_pair(f),
            ColumnGroup::Const { num_rows, .. } => {
                for row in 0..*num_rows {
                    f(row, 0);
                }
            }
            ColumnGroup::Empty { .. } | ColumnGroup::Uncompressed { .. } => {}
        }
    }

    /// Row-count per distinct dictionary value, `0` for groups with no
    /// dictionary.
    fn counts(&self) -> Vec<usize> {
        match self {
            ColumnGroup::Const { num_rows, .. } => vec![*num_rows],
            ColumnGroup::Ddc { dict, mapping, .. } => mapping.counts(dict.num_values()),
            ColumnGroup::Sdc { dict, mapping, .. } => mapping.counts(dict.num_values()),
            ColumnGroup::Rle { dict, mapping, .. } => mapping.counts(dict.num_values()),
            ColumnGroup::Ole { dict, mapping, .. } => mapping.counts(dict.num_values()),
            ColumnGroup::Empty { .. } | ColumnGroup::Uncompressed { .. } => Vec::new(),
        }
    }

    /// Value at `(row, local_col)`, `local_col` indexing into
    /// [`ColumnGroup::col_indices`].
    pub fn get(&self, row: usize, local_col: usize) -> Precision {
        match self {
            ColumnGroup::Empty { .. } => 0.0,
            ColumnGroup::Const { dict, .. } => dict.get_value(0, local_col),
            ColumnGroup::Uncompressed { block, .. } => block.get(row, local_col),
            ColumnGroup::Ddc { dict, mapping, .. } => mapping
                .value_index_for_row(row)
                .map(|k| dict.get_value(k, local_col))
                .unwrap_or(0.0),
            ColumnGroup::Sdc { dict, mapping, .. } => mapping
                .value_index_for_row(row)
                .map(|k| dict.get_value(k, local_col))
                .unwrap_or(0.0),
            ColumnGroup::Rle { dict, mapping, .. } => mapping
                .value_index_for_row(row)
                .map(|k| dict.get_value(k, local_col))
                .unwrap_or(0.0),
            ColumnGroup::Ole { dict, mapping, .. } => mapping
                .value_index_for_row(row)
                .map(|k| dict.get_value(k, local_col))
                .unwrap_or(0.0),
        }
    }

    fn row_tuple(&self, row: usize) -> Vec<Precision> {
        (0..self.num_cols()).map(|c| self.get(row, c)).collect()
    }

    /// Add this group's contribution into `target` at its global column
    /// positions. `target` must have the same row count as this group;
    /// `add_at` accumulation is what makes overlapping matrices sum
    /// correctly across groups.
    pub fn decompress_to_block(&self, target: &mut DenseBlock) {
        let cols = self.col_indices();
        match self {
            ColumnGroup::Empty { .. } => {}
            ColumnGroup::Uncompressed { block, .. } => {
                for r in 0..block.rows() {
                    for (lc, &gc) in cols.iter().enumerate() {
                        target.add_at(r, gc, block.get(r, lc));
                    }
                }
            }
            ColumnGroup::Const { num_rows, dict, .. } => {
                for r in 0..*num_rows {
                    for (lc, &gc) in cols.iter().enumerate() {
                        target.add_at(r, gc, dict.get_value(0, lc));
                    }
                }
            }
            _ => {
                let dict = self.dict().expect("dictionary-backed variant");
                self.for_each_pair(&mut |row, k| {
                    for (lc, &gc) in cols.iter().enumerate() {
                        target.add_at(row, gc, dict.get_value(k, lc));
                    }
                });
            }
        }
    }

    /// Sum over every cell this group covers.
    pub fn compute_sum(&self) -> Precision {
        match self {
            ColumnGroup::Empty { .. } => 0.0,
            ColumnGroup::Uncompressed { block, .. } => block.data().iter().sum(),
            _ => {
                let dict = self.dict().expect("dictionary-backed variant");
                dict.sum(&self.counts())
            }
        }
    }

    pub fn compute_sumsq(&self) -> Precision {
        match self {
            ColumnGroup::Empty { .. } => 0.0,
            ColumnGroup::Uncompressed { block, .. } => block.data().iter().map(|v| v * v).sum(),
            _ => {
                let dict = self.dict().expect("dictionary-backed variant");
                dict.sumsq(&self.counts())
            }
        }
    }

    /// This group's contribution to every row's sum (length `num_rows`).
    pub fn row_sums(&self) -> Vec<Precision> {
        let num_rows = self.num_rows();
        match self {
            ColumnGroup::Empty { .. } => vec![0.0; num_rows],
            ColumnGroup::Uncompressed { block, .. } => {
                (0..num_rows).map(|r| block.row(r).iter().sum()).collect()
            }
            _ => {
                let dict = self.dict().expect("dictionary-backed variant");
                let per_tuple = dict.sum_all_rows_to_double(false);
                (0..num_rows)
                    .map(|r| self.value_index_for_row(r).map(|k| per_tuple[k]).unwrap_or(0.0))
                    .collect()
            }
        }
    }

    /// This group's contribution to every row's sum of squares.
    pub fn row_sums_squared(&self) -> Vec<Precision> {
        let num_rows = self.num_rows();
        match self {
            ColumnGroup::Empty { .. } => vec![0.0; num_rows],
            ColumnGroup::Uncompressed { block, .. } => (0..num_rows)
                .map(|r| block.row(r).iter().map(|v| v * v).sum())
                .collect(),
            _ => {
                let dict = self.dict().expect("dictionary-backed variant");
                let per_tuple = dict.sum_all_rows_to_double(true);
                (0..num_rows)
                    .map(|r| self.value_index_for_row(r).map(|k| per_tuple[k]).unwrap_or(0.0))
                    .collect()
            }
        }
    }

    /// This group's contribution to every (local) column's sum of squares.
    pub fn col_sums_squared(&self) -> Vec<Precision> {
        let cols = self.num_cols();
        match self {
            ColumnGroup::Empty { .. } => vec![0.0; cols],
            ColumnGroup::Uncompressed { block, .. } => (0..cols)
                .map(|c| (0..block.rows()).map(|r| block.get(r, c).powi(2)).sum())
                .collect(),
            _ => {
                let dict = self.dict().expect("dictionary-backed variant");
                let counts = self.counts();
                let mut sums = vec![0.0; cols];
                for k in 0..dict.num_values() {
                    let w = counts[k] as Precision;
                    if w == 0.0 {
                        continue;
                    }
                    for c in 0..cols {
                        sums[c] += w * dict.get_value(k, c).powi(2);
                    }
                }
                sums
            }
        }
    }

    /// This group's contribution to every (local) column's sum.
    pub fn col_sums(&self) -> Vec<Precision> {
        let cols = self.num_cols();
        match self {
            ColumnGroup::Empty { .. } => vec![0.0; cols],
            ColumnGroup::Uncompressed { block, .. } => (0..cols)
                .map(|c| (0..block.rows()).map(|r| block.get(r, c)).sum())
                .collect(),
            _ => {
                let dict = self.dict().expect("dictionary-backed variant");
                let counts = self.counts();
                let mut sums = vec![0.0; cols];
                for k in 0..dict.num_values() {
                    let w = counts[k] as Precision;
                    if w == 0.0 {
                        continue;
                    }
                    for c in 0..cols {
                        sums[c] += w * dict.get_value(k, c);
                    }
                }
                sums
            }
        }
    }

    fn full_reduce(&self, init: Precision, f: impl Fn(Precision, Precision) -> Precision) -> Precision {
        let mut acc = init;
        for r in 0..self.num_rows() {
            for c in 0..self.num_cols() {
                acc = f(acc, self.get(r, c));
            }
        }
        acc
    }

    pub fn compute_min(&self) -> Precision {
        self.full_reduce(Precision::INFINITY, Precision::min)
    }

    pub fn compute_max(&self) -> Precision {
        self.full_reduce(Precision::NEG_INFINITY, Precision::max)
    }

    pub fn compute_product(&self) -> Precision {
        self.full_reduce(1.0, |a, b| a * b)
    }

    pub fn row_mxx(&self, max: bool) -> Vec<Precision> {
        let init = if max { Precision::NEG_INFINITY } else { Precision::INFINITY };
        (0..self.num_rows())
            .map(|r| {
                (0..self.num_cols()).fold(init, |acc, c| {
                    let v = self.get(r, c);
                    if max {
                        acc.max(v)
                    } else {
                        acc.min(v)
                    }
                })
            })
            .collect()
    }

    pub fn col_mxx(&self, max: bool) -> Vec<Precision> {
        let init = if max { Precision::NEG_INFINITY } else { Precision::INFINITY };
        (0..self.num_cols())
            .map(|c| {
                (0..self.num_rows()).fold(init, |acc, r| {
                    let v = self.get(r, c);
                    if max {
                        acc.max(v)
                    } else {
                        acc.min(v)
                    }
                })
            })
            .collect()
    }

    pub fn row_product(&self) -> Vec<Precision> {
        (0..self.num_rows())
            .map(|r| (0..self.num_cols()).map(|c| self.get(r, c)).product())
            .collect()
    }

    pub fn col_product(&self) -> Vec<Precision> {
        (0..self.num_cols())
            .map(|c| (0..self.num_rows()).map(|r| self.get(r, c)).product())
            .collect()
    }

    /// Densify a sparse (`Sdc`/`Rle`/`Ole`) group into an equivalent
    /// `Ddc`, appending an explicit zero tuple for previously-implicit
    /// rows. Used whenever an operator would otherwise turn the implicit
    /// default into something non-zero.
    fn densify(&self) -> (Dictionary, DdcMapping) {
        let num_rows = self.num_rows();
        let cols = self.num_cols();
        let dict = self.dict().expect("dictionary-backed variant");
        let default_index = dict.num_values() as u32;
        let mut row_to_value = vec![default_index; num_rows];
        self.for_each_pair(&mut |row, k| row_to_value[row] = k as u32);
        let mut values = dict.raw_values().to_vec();
        values.extend(core::iter::repeat(0.0).take(cols));
        (Dictionary::new(values, cols), DdcMapping::new(row_to_value))
    }

    /// Apply a position-independent scalar operator, returning a new group.
    pub fn scalar_op(&self, op: ScalarOp) -> ColumnGroup {
        let col_indices = self.col_indices().to_vec();
        match self {
            ColumnGroup::Empty { num_rows, .. } => {
                if op.preserves_zero() {
                    ColumnGroup::Empty {
                        col_indices,
                        num_rows: *num_rows,
                    }
                } else {
                    let tuple = vec![op.apply(0.0); col_indices.len()];
                    ColumnGroup::Const {
                        col_indices,
                        num_rows: *num_rows,
                        dict: Dictionary::single_tuple(tuple),
                    }
                }
            }
            ColumnGroup::Uncompressed { block, .. } => ColumnGroup::Uncompressed {
                col_indices,
                block: block.scalar_op(op),
            },
            ColumnGroup::Const { num_rows, dict, .. } => ColumnGroup::Const {
                col_indices,
                num_rows: *num_rows,
                dict: dict.apply(op),
            },
            ColumnGroup::Ddc {
                num_rows,
                dict,
                mapping,
                ..
            } => ColumnGroup::Ddc {
                col_indices,
                num_rows: *num_rows,
                dict: dict.apply(op),
                mapping: mapping.clone(),
            },
            _ if op.preserves_zero() => {
                let dict = self.dict().expect("dictionary-backed variant").apply(op);
                match self {
                    ColumnGroup::Sdc { num_rows, mapping, .. } => ColumnGroup::Sdc {
                        col_indices,
                        num_rows: *num_rows,
                        dict,
                        mapping: mapping.clone(),
                    },
                    ColumnGroup::Rle { num_rows, mapping, .. } => ColumnGroup::Rle {
                        col_indices,
                        num_rows: *num_rows,
                        dict,
                        mapping: mapping.clone(),
                    },
                    ColumnGroup::Ole { num_rows, mapping, .. } => ColumnGroup::Ole {
                        col_indices,
                        num_rows: *num_rows,
                        dict,
                        mapping: mapping.clone(),
                    },
                    _ => unreachable!(),
                }
            }
            _ => {
                let (dict, mapping) = self.densify();
                ColumnGroup::Ddc {
                    col_indices,
                    num_rows: self.num_rows(),
                    dict: dict.apply(op),
                    mapping,
                }
            }
        }
    }

    /// Apply a binary operator broadcasting row vector `v_local` (already
    /// sliced to this group's columns) against every row.
    pub fn binary_row_op(&self, op: BinaryOp, v_local: &[Precision], left_side: bool) -> ColumnGroup {
        let col_indices = self.col_indices().to_vec();
        let default_of = |c: usize| {
            if left_side {
                op.apply(v_local[c], 0.0)
            } else {
                op.apply(0.0, v_local[c])
            }
        };
        let default_is_zero = (0..col_indices.len()).all(|c| default_of(c) == 0.0);

        match self {
            ColumnGroup::Empty { num_rows, .. } => {
                if default_is_zero {
                    ColumnGroup::Empty {
                        col_indices,
                        num_rows: *num_rows,
                    }
                } else {
                    let tuple: Vec<Precision> = (0..col_indices.len()).map(default_of).collect();
                    ColumnGroup::Const {
                        col_indices,
                        num_rows: *num_rows,
                        dict: Dictionary::single_tuple(tuple),
                    }
                }
            }
            ColumnGroup::Uncompressed { block, .. } => {
                let mut out = DenseBlock::zeros(block.rows(), block.cols());
                for r in 0..block.rows() {
                    for c in 0..block.cols() {
                        let a = block.get(r, c);
                        out.set(r, c, if left_side { op.apply(v_local[c], a) } else { op.apply(a, v_local[c]) });
                    }
                }
                ColumnGroup::Uncompressed { col_indices, block: out }
            }
            ColumnGroup::Const { num_rows, dict, .. } => ColumnGroup::Const {
                col_indices,
                num_rows: *num_rows,
                dict: dict.apply_binary_row_op(op, v_local, left_side),
            },
            ColumnGroup::Ddc {
                num_rows,
                dict,
                mapping,
                ..
            } => ColumnGroup::Ddc {
                col_indices,
                num_rows: *num_rows,
                dict: dict.apply_binary_row_op(op, v_local, left_side),
                mapping: mapping.clone(),
            },
            _ if default_is_zero => {
                let dict = self
                    .dict()
                    .expect("dictionary-backed variant")
                    .apply_binary_row_op(op, v_local, left_side);
                match self {
                    ColumnGroup::Sdc { num_rows, mapping, .. } => ColumnGroup::Sdc {
                        col_indices,
                        num_rows: *num_rows,
                        dict,
                        mapping: mapping.clone(),
                    },
                    ColumnGroup::Rle { num_rows, mapping, .. } => ColumnGroup::Rle {
                        col_indices,
                        num_rows: *num_rows,
                        dict,
                        mapping: mapping.clone(),
                    },
                    ColumnGroup::Ole { num_rows, mapping, .. } => ColumnGroup::Ole {
                        col_indices,
                        num_rows: *num_rows,
                        dict,
                        mapping: mapping.clone(),
                    },
                    _ => unreachable!(),
                }
            }
            _ => {
                let (dict, mapping) = self.densify();
                ColumnGroup::Ddc {
                    col_indices,
                    num_rows: self.num_rows(),
                    dict: dict.apply_binary_row_op(op, v_local, left_side),
                    mapping,
                }
            }
        }
    }

    /// Replace every value matching `pattern` with `replacement`.
    pub fn replace(&self, pattern: Precision, replacement: Precision) -> ColumnGroup {
        let col_indices = self.col_indices().to_vec();
        let default_becomes = pattern_matches(0.0, pattern);

        match self {
            ColumnGroup::Empty { num_rows, .. } => {
                if default_becomes {
                    ColumnGroup::Const {
                        col_indices,
                        num_rows: *num_rows,
                        dict: Dictionary::single_tuple(vec![replacement; col_indices.len()]),
                    }
                } else {
                    ColumnGroup::Empty {
                        col_indices,
                        num_rows: *num_rows,
                    }
                }
            }
            ColumnGroup::Uncompressed { block, .. } => ColumnGroup::Uncompressed {
                col_indices,
                block: block.replace(pattern, replacement),
            },
            ColumnGroup::Const { num_rows, dict, .. } => ColumnGroup::Const {
                col_indices,
                num_rows: *num_rows,
                dict: dict.replace(pattern, replacement),
            },
            ColumnGroup::Ddc {
                num_rows,
                dict,
                mapping,
                ..
            } => ColumnGroup::Ddc {
                col_indices,
                num_rows: *num_rows,
                dict: dict.replace(pattern, replacement),
                mapping: mapping.clone(),
            },
            _ if !default_becomes => {
                let dict = self.dict().expect("dictionary-backed variant").replace(pattern, replacement);
                match self {
                    ColumnGroup::Sdc { num_rows, mapping, .. } => ColumnGroup::Sdc {
                        col_indices,
                        num_rows: *num_rows,
                        dict,
                        mapping: mapping.clone(),
                    },
                    ColumnGroup::Rle { num_rows, mapping, .. } => ColumnGroup::Rle {
                        col_indices,
                        num_rows: *num_rows,
                        dict,
                        mapping: mapping.clone(),
                    },
                    ColumnGroup::Ole { num_rows, mapping, .. } => ColumnGroup::Ole {
                        col_indices,
                        num_rows: *num_rows,
                        dict,
                        mapping: mapping.clone(),
                    },
                    _ => unreachable!(),
                }
            }
            _ => {
                let (dict, mapping) = self.densify();
                ColumnGroup::Ddc {
                    col_indices,
                    num_rows: self.num_rows(),
                    dict: dict.replace(pattern, replacement),
                    mapping,
                }
            }
        }
    }

    /// Project onto the local column range `[lo, hi)`.
    pub fn slice_columns(&self, lo: usize, hi: usize) -> Result<ColumnGroup> {
        if hi > self.num_cols() || lo >= hi {
            return Err(CompressedError::InvalidArgument {
                message: "column range out of bounds".into(),
                parameter: Some("lo/hi".into()),
            });
        }
        let col_indices = self.col_indices()[lo..hi].to_vec();
        Ok(match self {
            ColumnGroup::Empty { num_rows, .. } => ColumnGroup::Empty {
                col_indices,
                num_rows: *num_rows,
            },
            ColumnGroup::Uncompressed { block, .. } => ColumnGroup::Uncompressed {
                col_indices,
                block: block.slice(0, block.rows() - 1, lo, hi - 1)?,
            },
            ColumnGroup::Const { num_rows, dict, .. } => ColumnGroup::Const {
                col_indices,
                num_rows: *num_rows,
                dict: dict.slice_out_column_range(lo, hi),
            },
            ColumnGroup::Ddc {
                num_rows,
                dict,
                mapping,
                ..
            } => ColumnGroup::Ddc {
                col_indices,
                num_rows: *num_rows,
                dict: dict.slice_out_column_range(lo, hi),
                mapping: mapping.clone(),
            },
            ColumnGroup::Sdc {
                num_rows,
                dict,
                mapping,
                ..
            } => ColumnGroup::Sdc {
                col_indices,
                num_rows: *num_rows,
                dict: dict.slice_out_column_range(lo, hi),
                mapping: mapping.clone(),
            },
            ColumnGroup::Rle {
                num_rows,
                dict,
                mapping,
                ..
            } => ColumnGroup::Rle {
                col_indices,
                num_rows: *num_rows,
                dict: dict.slice_out_column_range(lo, hi),
                mapping: mapping.clone(),
            },
            ColumnGroup::Ole {
                num_rows,
                dict,
                mapping,
                ..
            } => ColumnGroup::Ole {
                col_indices,
                num_rows: *num_rows,
                dict: dict.slice_out_column_range(lo, hi),
                mapping: mapping.clone(),
            },
        })
    }

    /// Whether any covered cell equals `v` (NaN matches NaN).
    pub fn contains_value(&self, v: Precision) -> bool {
        match self {
            ColumnGroup::Empty { .. } => pattern_matches(0.0, v),
            ColumnGroup::Uncompressed { block, .. } => block.data().iter().any(|&x| pattern_matches(x, v)),
            ColumnGroup::Const { dict, .. } | ColumnGroup::Ddc { dict, .. } => dict.contains_value(v),
            _ => {
                let dict = self.dict().expect("dictionary-backed variant");
                let has_default_rows = self.explicit_rows() < self.num_rows();
                dict.contains_value(v) || (has_default_rows && pattern_matches(0.0, v))
            }
        }
    }

    /// Number of non-zero cells this group covers.
    pub fn number_non_zeros(&self) -> usize {
        match self {
            ColumnGroup::Empty { .. } => 0,
            ColumnGroup::Uncompressed { block, .. } => block.nnz(),
            _ => {
                let dict = self.dict().expect("dictionary-backed variant");
                dict.get_number_non_zeros(&self.counts())
            }
        }
    }

    /// `self^T * rhs_full[col_indices, :]` — used by `rightMultByMatrix`.
    /// `rhs_full` has one row per column of the full (uncompressed)
    /// matrix.
    pub fn right_mult_by_matrix(&self, rhs_full: &DenseBlock) -> Result<DenseBlock> {
        let out_cols = rhs_full.cols();
        let num_rows = self.num_rows();
        match self {
            ColumnGroup::Empty { .. } => Ok(DenseBlock::zeros(num_rows, out_cols)),
            ColumnGroup::Uncompressed { block, col_indices } => {
                let local_rhs = gather_rows(rhs_full, col_indices);
                block.matmul(&local_rhs)
            }
            ColumnGroup::Const { dict, .. } => {
                let local_rhs = gather_rows(rhs_full, self.col_indices());
                let proj = dict.as_matrix_view().matmul(&local_rhs)?;
                let mut out = DenseBlock::zeros(num_rows, out_cols);
                for r in 0..num_rows {
                    out.row_mut(r).copy_from_slice(proj.row(0));
                }
                Ok(out)
            }
            _ => {
                let dict = self.dict().expect("dictionary-backed variant");
                let local_rhs = gather_rows(rhs_full, self.col_indices());
                let proj = dict.as_matrix_view().matmul(&local_rhs)?;
                let mut out = DenseBlock::zeros(num_rows, out_cols);
                for r in 0..num_rows {
                    if let Some(k) = self.value_index_for_row(r) {
                        out.row_mut(r).copy_from_slice(proj.row(k));
                    }
                }
                Ok(out)
            }
        }
    }

    /// `lhs_col^T * self` for one row of the left operand — used by
    /// `leftMultByMatrix`'s row-at-a-time accumulation. Returns a vector
    /// of length `num_cols()`, aligned to this group's local columns.
    pub fn left_mult_by_row(&self, lhs_row: &[Precision]) -> Vec<Precision> {
        let cols = self.num_cols();
        match self {
            ColumnGroup::Empty { .. } => vec![0.0; cols],
            ColumnGroup::Uncompressed { block, .. } => (0..cols)
                .map(|c| (0..block.rows()).map(|r| lhs_row[r] * block.get(r, c)).sum())
                .collect(),
            _ => {
                let dict = self.dict().expect("dictionary-backed variant");
                let mut w = vec![0.0; dict.num_values()];
                self.for_each_pair(&mut |row, k| w[k] += lhs_row[row]);
                (0..cols)
                    .map(|c| (0..dict.num_values()).map(|k| w[k] * dict.get_value(k, c)).sum())
                    .collect()
            }
        }
    }

    /// `left * self`, where `left` has `self.num_rows()` columns — used by
    /// `CompressedMatrix::left_mult_by_matrix` (§4.3). Rows of `left` that
    /// share a value-index are pre-aggregated once (O(rows * n)) before the
    /// single dictionary multiply (O(distinct * n * cols)), avoiding the
    /// O(rows * n * cols) cost of expanding this group first.
    pub fn left_mult_by_matrix(&self, left: &DenseBlock) -> Result<DenseBlock> {
        if left.cols() != self.num_rows() {
            return Err(CompressedError::DimensionMismatch {
                expected: (left.rows(), self.num_rows()),
                actual: (left.rows(), left.cols()),
                operation: "ColumnGroup::left_mult_by_matrix".into(),
            });
        }
        let n = left.rows();
        let cols = self.num_cols();
        match self {
            ColumnGroup::Empty { .. } => Ok(DenseBlock::zeros(n, cols)),
            ColumnGroup::Uncompressed { block, .. } => left.matmul(block),
            ColumnGroup::Const { dict, .. } => {
                let tuple = dict.tuple(0);
                let mut out = DenseBlock::zeros(n, cols);
                for i in 0..n {
                    let row_sum: Precision = left.row(i).iter().sum();
                    math::vector_scale(row_sum, tuple, out.row_mut(i));
                }
                Ok(out)
            }
            _ => {
                let dict = self.dict().expect("dictionary-backed variant");
                let distinct = dict.num_values();
                let mut partial = DenseBlock::zeros(distinct, n);
                self.for_each_pair(&mut |row, k| {
                    for i in 0..n {
                        let v = left.get(i, row);
                        if v != 0.0 {
                            partial.add_at(k, i, v);
                        }
                    }
                });
                partial.transpose().matmul(&dict.as_matrix_view())
            }
        }
    }

    /// `self^T * self`, restricted to this group's own columns — the
    /// diagonal block of `tsmm`.
    pub fn tsmm_self(&self) -> Result<DenseBlock> {
        let cols = self.num_cols();
        match self {
            ColumnGroup::Empty { .. } => Ok(DenseBlock::zeros(cols, cols)),
            ColumnGroup::Uncompressed { block, .. } => block.transpose().matmul(block),
            _ => {
                let dict = self.dict().expect("dictionary-backed variant");
                let counts = self.counts();
                let dict_mat = dict.as_matrix_view();
                let mut scaled = DenseBlock::zeros(dict.num_values(), cols);
                for k in 0..dict.num_values() {
                    let w = counts[k] as Precision;
                    math::vector_scale(w, dict_mat.row(k), scaled.row_mut(k));
                }
                dict_mat.transpose().matmul(&scaled)
            }
        }
    }

    /// `self^T * other`, the off-diagonal cross term between two distinct
    /// column groups sharing the same rows. Falls back to a row-wise
    /// outer-product accumulation: the two groups' row-to-value mappings
    /// are independent, so there is no shared dictionary structure to
    /// exploit the way `tsmm_self` does.
    pub fn tsmm_cross(&self, other: &ColumnGroup) -> DenseBlock {
        let cols_a = self.num_cols();
        let cols_b = other.num_cols();
        let mut out = DenseBlock::zeros(cols_a, cols_b);
        for r in 0..self.num_rows() {
            let lt = self.row_tuple(r);
            if lt.iter().all(|&v| v == 0.0) {
                continue;
            }
            let rt = other.row_tuple(r);
            for i in 0..cols_a {
                if lt[i] == 0.0 {
                    continue;
                }
                math::axpy(lt[i], &rt, out.row_mut(i));
            }
        }
        out
    }

    /// Upper bound on in-memory size in bytes.
    pub fn in_memory_size(&self) -> usize {
        let base = self.col_indices().len() * core::mem::size_of::<usize>();
        base + match self {
            ColumnGroup::Empty { .. } => 0,
            ColumnGroup::Uncompressed { block, .. } => block.in_memory_size(),
            ColumnGroup::Const { dict, .. } => dict.in_memory_size(),
            ColumnGroup::Ddc { dict, mapping, .. } => {
                dict.in_memory_size() + mapping.row_to_value.len() * core::mem::size_of::<u32>()
            }
            ColumnGroup::Sdc { dict, mapping, .. } => {
                dict.in_memory_size()
                    + (mapping.row_indices.len() + mapping.value_indices.len()) * core::mem::size_of::<u32>()
            }
            ColumnGroup::Rle { dict, mapping, .. } => {
                dict.in_memory_size()
                    + mapping.runs.iter().map(|s| s.len() * 2 * core::mem::size_of::<u32>()).sum::<usize>()
            }
            ColumnGroup::Ole { dict, mapping, .. } => {
                dict.in_memory_size()
                    + mapping.rows_by_value.iter().map(|s| s.len() * core::mem::size_of::<u32>()).sum::<usize>()
            }
        }
    }
}

/// Variant tags for the on-disk layout (§6.1).
const TAG_EMPTY: u8 = 0;
const TAG_UNCOMPRESSED: u8 = 1;
const TAG_CONST: u8 = 2;
const TAG_DDC: u8 = 3;
const TAG_SDC: u8 = 4;
const TAG_RLE: u8 = 5;
const TAG_OLE: u8 = 6;

fn write_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn read_u32(buf: &[u8], pos: &mut usize) -> u32 {
    let v = u32::from_le_bytes(buf[*pos..*pos + 4].try_into().unwrap());
    *pos += 4;
    v
}

impl ColumnGroup {
    /// Upper bound on the serialized byte length, used by the
    /// size-adaptive serializer (§4.5) without actually encoding.
    pub fn disk_size(&self) -> usize {
        let header = 1 + 4 + self.col_indices().len() * 4;
        header
            + match self {
                ColumnGroup::Empty { .. } => 4,
                ColumnGroup::Uncompressed { block, .. } => {
                    8 + block.data().len() * core::mem::size_of::<Precision>()
                }
                ColumnGroup::Const { dict, .. } => 4 + dict_disk_size(dict),
                ColumnGroup::Ddc { dict, mapping, .. } => {
                    4 + dict_disk_size(dict) + mapping.row_to_value.len() * 4
                }
                ColumnGroup::Sdc { dict, mapping, .. } => {
                    4 + dict_disk_size(dict) + 4 + mapping.row_indices.len() * 8
                }
                ColumnGroup::Rle { dict, mapping, .. } => {
                    4 + dict_disk_size(dict)
                        + 4
                        + mapping.runs.iter().map(|segs| 4 + segs.len() * 8).sum::<usize>()
                }
                ColumnGroup::Ole { dict, mapping, .. } => {
                    4 + dict_disk_size(dict)
                        + 4
                        + mapping.rows_by_value.iter().map(|rows| 4 + rows.len() * 4).sum::<usize>()
                }
            }
    }

    /// Stable on-disk encoding (§6.1): `u8 tag, u32 colCount, colIdx[u32],
    /// variant body`. The tag is written first so [`ColumnGroup::read`]'s
    /// caller can dispatch on it before decoding the rest.
    pub fn write(&self, out: &mut Vec<u8>) {
        out.push(self.tag());
        let cols = self.col_indices();
        write_u32(out, cols.len() as u32);
        for &c in cols {
            write_u32(out, c as u32);
        }
        match self {
            ColumnGroup::Empty { num_rows, .. } => {
                write_u32(out, *num_rows as u32);
            }
            ColumnGroup::Uncompressed { block, .. } => {
                write_u32(out, block.rows() as u32);
                for &v in block.data() {
                    out.extend_from_slice(&v.to_le_bytes());
                }
            }
            ColumnGroup::Const { num_rows, dict, .. } => {
                write_u32(out, *num_rows as u32);
                dict.write(out);
            }
            ColumnGroup::Ddc { num_rows, dict, mapping, .. } => {
                write_u32(out, *num_rows as u32);
                dict.write(out);
                for &k in &mapping.row_to_value {
                    write_u32(out, k);
                }
            }
            ColumnGroup::Sdc { num_rows, dict, mapping, .. } => {
                write_u32(out, *num_rows as u32);
                dict.write(out);
                write_u32(out, mapping.row_indices.len() as u32);
                for (&r, &k) in mapping.row_indices.iter().zip(mapping.value_indices.iter()) {
                    write_u32(out, r);
                    write_u32(out, k);
                }
            }
            ColumnGroup::Rle { num_rows, dict, mapping, .. } => {
                write_u32(out, *num_rows as u32);
                dict.write(out);
                write_u32(out, mapping.runs.len() as u32);
                for segs in &mapping.runs {
                    write_u32(out, segs.len() as u32);
                    for &(start, len) in segs {
                        write_u32(out, start);
                        write_u32(out, len);
                    }
                }
            }
            ColumnGroup::Ole { num_rows, dict, mapping, .. } => {
                write_u32(out, *num_rows as u32);
                dict.write(out);
                write_u32(out, mapping.rows_by_value.len() as u32);
                for rows in &mapping.rows_by_value {
                    write_u32(out, rows.len() as u32);
                    for &r in rows {
                        write_u32(out, r);
                    }
                }
            }
        }
    }

    /// Inverse of [`ColumnGroup::write`]. The tag byte is read first by the
    /// caller so `CompressedMatrix::read` can dispatch without peeking.
    pub fn read(tag: u8, buf: &[u8], pos: &mut usize) -> ColumnGroup {
        let col_count = read_u32(buf, pos) as usize;
        let col_indices: Vec<usize> = (0..col_count).map(|_| read_u32(buf, pos) as usize).collect();
        let num_rows = read_u32(buf, pos) as usize;
        match tag {
            TAG_EMPTY => ColumnGroup::Empty { col_indices, num_rows },
            TAG_UNCOMPRESSED => {
                let mut data = Vec::with_capacity(num_rows * col_count);
                for _ in 0..(num_rows * col_count) {
                    let v = f64::from_le_bytes(buf[*pos..*pos + 8].try_into().unwrap());
                    data.push(v);
                    *pos += 8;
                }
                ColumnGroup::Uncompressed {
                    col_indices,
                    block: DenseBlock::from_row_major(num_rows, col_count, data)
                        .expect("serialized block matches declared shape"),
                }
            }
            TAG_CONST => ColumnGroup::Const {
                col_indices,
                num_rows,
                dict: Dictionary::read(buf, pos),
            },
            TAG_DDC => {
                let dict = Dictionary::read(buf, pos);
                let row_to_value = (0..num_rows).map(|_| read_u32(buf, pos)).collect();
                ColumnGroup::Ddc {
                    col_indices,
                    num_rows,
                    dict,
                    mapping: DdcMapping::new(row_to_value),
                }
            }
            TAG_SDC => {
                let dict = Dictionary::read(buf, pos);
                let count = read_u32(buf, pos) as usize;
                let mut row_indices = Vec::with_capacity(count);
                let mut value_indices = Vec::with_capacity(count);
                for _ in 0..count {
                    row_indices.push(read_u32(buf, pos));
                    value_indices.push(read_u32(buf, pos));
                }
                ColumnGroup::Sdc {
                    col_indices,
                    num_rows,
                    dict,
                    mapping: SdcMapping::new(row_indices, value_indices),
                }
            }
            TAG_RLE => {
                let dict = Dictionary::read(buf, pos);
                let num_values = read_u32(buf, pos) as usize;
                let mut runs = Vec::with_capacity(num_values);
                for _ in 0..num_values {
                    let seg_count = read_u32(buf, pos) as usize;
                    let mut segs = Vec::with_capacity(seg_count);
                    for _ in 0..seg_count {
                        let start = read_u32(buf, pos);
                        let len = read_u32(buf, pos);
                        segs.push((start, len));
                    }
                    runs.push(segs);
                }
                ColumnGroup::Rle {
                    col_indices,
                    num_rows,
                    dict,
                    mapping: RleMapping::new(runs),
                }
            }
            TAG_OLE => {
                let dict = Dictionary::read(buf, pos);
                let num_values = read_u32(buf, pos) as usize;
                let mut rows_by_value = Vec::with_capacity(num_values);
                for _ in 0..num_values {
                    let row_count = read_u32(buf, pos) as usize;
                    let mut rows = Vec::with_capacity(row_count);
                    for _ in 0..row_count {
                        rows.push(read_u32(buf, pos));
                    }
                    rows_by_value.push(rows);
                }
                ColumnGroup::Ole {
                    col_indices,
                    num_rows,
                    dict,
                    mapping: OleMapping::new(rows_by_value),
                }
            }
            other => panic!("unknown column group tag {other}"),
        }
    }

    /// The tag byte [`ColumnGroup::write`] would emit, needed by callers
    /// that must write the tag before the rest of the body.
    pub fn tag(&self) -> u8 {
        match self {
            ColumnGroup::Empty { .. } => TAG_EMPTY,
            ColumnGroup::Uncompressed { .. } => TAG_UNCOMPRESSED,
            ColumnGroup::Const { .. } => TAG_CONST,
            ColumnGroup::Ddc { .. } => TAG_DDC,
            ColumnGroup::Sdc { .. } => TAG_SDC,
            ColumnGroup::Rle { .. } => TAG_RLE,
            ColumnGroup::Ole { .. } => TAG_OLE,
        }
    }
}

fn dict_disk_size(dict: &Dictionary) -> usize {
    1 + 4 + 4 + dict.raw_values().len() * core::mem::size_of::<Precision>()
}

fn gather_rows(rhs_full: &DenseBlock, col_indices: &[usize]) -> DenseBlock {
    let out_cols = rhs_full.cols();
    let mut local = DenseBlock::zeros(col_indices.len(), out_cols);
    for (lc, &gc) in col_indices.iter().enumerate() {
        local.row_mut(lc).copy_from_slice(rhs_full.row(gc));
    }
    local
}

/// Convenience used by `CompressedMatrix` when it needs to treat an
/// uncompressed matrix as a single column group (e.g. the serializer's
/// dense fallback, or the `append` path before recompression).
pub fn uncompressed_group(block: MatrixBlock, col_indices: Vec<usize>) -> ColumnGroup {
    ColumnGroup::Uncompressed {
        col_indices,
        block: block.to_dense(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ddc_group() -> ColumnGroup {
        // 4 rows, 2 cols, 2 distinct tuples: {1,2} and {0,0}
        let dict = Dictionary::new(vec![1.0, 2.0, 0.0, 0.0], 2);
        let mapping = DdcMapping::new(vec![0, 1, 0, 1]);
        ColumnGroup::Ddc {
            col_indices: vec![3, 4],
            num_rows: 4,
            dict,
            mapping,
        }
    }

    fn sdc_group() -> ColumnGroup {
        // 4 rows, 1 col: rows 0 and 2 hold 5.0, rows 1 and 3 are implicit zero
        let dict = Dictionary::new(vec![5.0], 1);
        let mapping = SdcMapping::new(vec![0, 2], vec![0, 0]);
        ColumnGroup::Sdc {
            col_indices: vec![7],
            num_rows: 4,
            dict,
            mapping,
        }
    }

    #[test]
    fn ddc_get_matches_mapping() {
        let g = ddc_group();
        assert_eq!(g.get(0, 0), 1.0);
        assert_eq!(g.get(1, 0), 0.0);
        assert_eq!(g.get(2, 1), 2.0);
    }

    #[test]
    fn ddc_decompress_accumulates() {
        let g = ddc_group();
        let mut target = DenseBlock::zeros(4, 5);
        g.decompress_to_block(&mut target);
        assert_eq!(target.get(0, 3), 1.0);
        assert_eq!(target.get(0, 4), 2.0);
        assert_eq!(target.get(1, 3), 0.0);
    }

    #[test]
    fn sdc_default_rows_are_zero() {
        let g = sdc_group();
        assert_eq!(g.get(0, 0), 5.0);
        assert_eq!(g.get(1, 0), 0.0);
        assert_eq!(g.compute_sum(), 10.0);
        assert_eq!(g.number_non_zeros(), 2);
    }

    #[test]
    fn scalar_op_non_zero_preserving_densifies_sdc() {
        let g = sdc_group();
        let shifted = g.scalar_op(ScalarOp::Add(1.0));
        assert!(matches!(shifted, ColumnGroup::Ddc { .. }));
        assert_eq!(shifted.get(0, 0), 6.0);
        assert_eq!(shifted.get(1, 0), 1.0);
    }

    #[test]
    fn scalar_op_zero_preserving_keeps_sdc_shape() {
        let g = sdc_group();
        let scaled = g.scalar_op(ScalarOp::Multiply(2.0));
        assert!(matches!(scaled, ColumnGroup::Sdc { .. }));
        assert_eq!(scaled.get(0, 0), 10.0);
        assert_eq!(scaled.get(1, 0), 0.0);
    }

    #[test]
    fn tsmm_self_matches_dense_reference() {
        let g = ddc_group();
        let tsmm = g.tsmm_self().unwrap();
        // reference: decompress then transpose-multiply
        let mut dense = DenseBlock::zeros(4, 2);
        for r in 0..4 {
            dense.set(r, 0, g.get(r, 0));
            dense.set(r, 1, g.get(r, 1));
        }
        let reference = dense.transpose().matmul(&dense).unwrap();
        assert_eq!(tsmm, reference);
    }

    #[test]
    fn left_mult_by_row_matches_dense_reference() {
        let g = ddc_group();
        let lhs = vec![1.0, 2.0, 3.0, 4.0];
        let result = g.left_mult_by_row(&lhs);
        let expected = vec![
            1.0 * g.get(0, 0) + 2.0 * g.get(1, 0) + 3.0 * g.get(2, 0) + 4.0 * g.get(3, 0),
            1.0 * g.get(0, 1) + 2.0 * g.get(1, 1) + 3.0 * g.get(2, 1) + 4.0 * g.get(3, 1),
        ];
        assert_eq!(result, expected);
    }

    #[test]
    fn contains_value_sees_implicit_default() {
        let g = sdc_group();
        assert!(g.contains_value(0.0));
        assert!(g.contains_value(5.0));
        assert!(!g.contains_value(9.0));
    }

    #[test]
    fn slice_columns_narrows_dictionary() {
        let g = ddc_group();
        let sliced = g.slice_columns(1, 2).unwrap();
        assert_eq!(sliced.col_indices(), &[4]);
        assert_eq!(sliced.get(0, 0), 2.0);
    }
}
