//! `CompressedMatrix`: the column-group container (§3, §4.3).
//!
//! This module owns the struct, its construction-time invariant checks,
//! and the low-level whole-list replacement methods (`allocate_col_group`,
//! `allocate_col_group_list`, `recompute_non_zeros`). The cross-group
//! dispatch kernels (decompress, scalar/binary ops, matrix multiplies,
//! aggregates, serialization) live in [`crate::kernels`] and
//! [`crate::serialize`], each as an `impl CompressedMatrix` block, so this
//! file stays focused on what the container *is* rather than what it can
//! *do*.

use crate::cache::DecompressionCache;
use crate::colgroup::ColumnGroup;
use crate::error::{CompressedError, Result};
use crate::types::DimensionType;
use alloc::vec::Vec;

/// A column-partitioned (or, when overlapping, column-covering) compressed
/// matrix (§3).
#[derive(Debug, Clone)]
pub struct CompressedMatrix {
    pub(crate) rows: DimensionType,
    pub(crate) cols: DimensionType,
    /// `None` is the "unknown" sentinel (§3; persisted as `-1`).
    pub(crate) nnz: Option<usize>,
    pub(crate) overlapping: bool,
    pub(crate) groups: Vec<ColumnGroup>,
    pub(crate) cache: DecompressionCache,
}

impl CompressedMatrix {
    /// Build a compressed matrix from an explicit group list, validating
    /// the partition/overlap invariant (§3). `nnz` of `None` defers the
    /// count to a later [`CompressedMatrix::recompute_non_zeros`] call.
    pub fn new(
        rows: DimensionType,
        cols: DimensionType,
        groups: Vec<ColumnGroup>,
        overlapping: bool,
        nnz: Option<usize>,
    ) -> Result<Self> {
        validate_groups(rows, cols, &groups, overlapping)?;
        // A single-group matrix is never overlapping in effect (§3).
        let overlapping = overlapping && groups.len() > 1;
        Ok(Self {
            rows,
            cols,
            nnz,
            overlapping,
            groups,
            cache: DecompressionCache::new(),
        })
    }

    /// Build an all-zero compressed matrix: a single `EMPTY` group
    /// spanning every column (§3: "a group with zero columns is never
    /// stored; empty groups are represented by the EMPTY variant").
    pub fn zeros(rows: DimensionType, cols: DimensionType) -> Self {
        let col_indices: Vec<usize> = (0..cols).collect();
        Self {
            rows,
            cols,
            nnz: Some(0),
            overlapping: false,
            groups: alloc::vec![ColumnGroup::Empty { col_indices, num_rows: rows }],
            cache: DecompressionCache::new(),
        }
    }

    pub fn rows(&self) -> DimensionType {
        self.rows
    }

    pub fn cols(&self) -> DimensionType {
        self.cols
    }

    /// `None` is the "unknown" sentinel.
    pub fn nnz(&self) -> Option<usize> {
        self.nnz
    }

    pub fn is_overlapping(&self) -> bool {
        self.overlapping
    }

    pub fn groups(&self) -> &[ColumnGroup] {
        &self.groups
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    /// Replace the group list with a single group, e.g. the serializer's
    /// dense fallback (§3 lifecycle, §4.5).
    pub fn allocate_col_group(&mut self, group: ColumnGroup) -> Result<()> {
        self.allocate_col_group_list(alloc::vec![group])
    }

    /// Wholesale replacement of the group list, used by `replace`,
    /// `sliceColumns` and `squash` (§3 lifecycle).
    pub fn allocate_col_group_list(&mut self, groups: Vec<ColumnGroup>) -> Result<()> {
        validate_groups(self.rows, self.cols, &groups, self.overlapping)?;
        self.overlapping = self.overlapping && groups.len() > 1;
        self.groups = groups;
        Ok(())
    }

    /// Refresh `nnz` from the group list and compact to a single `EMPTY`
    /// group if the total is zero (§3 lifecycle).
    ///
    /// For an overlapping matrix the per-group non-zero counts don't
    /// account for cancellation between groups, so the conservative
    /// `rows * cols` bound from §3 is used instead; callers that need the
    /// exact count after cancellation should decompress and count directly.
    pub fn recompute_non_zeros(&mut self) {
        let total = if self.overlapping {
            self.rows * self.cols
        } else {
            self.groups.iter().map(ColumnGroup::number_non_zeros).sum()
        };
        self.nnz = Some(total);
        if total == 0 {
            let col_indices: Vec<usize> = (0..self.cols).collect();
            self.groups = alloc::vec![ColumnGroup::Empty { col_indices, num_rows: self.rows }];
            self.overlapping = false;
        }
    }

    /// Drop the decompression cache without touching the group list
    /// (§4.4).
    pub fn clear_soft_reference_to_decompressed(&self) {
        self.cache.clear();
    }

    /// Upper bound on in-memory size in bytes (§6.2): fixed header fields,
    /// the group list container, the cache slot, plus each group's own
    /// estimate.
    pub fn in_memory_size(&self) -> usize {
        let base = core::mem::size_of::<Self>();
        let groups: usize = self.groups.iter().map(ColumnGroup::in_memory_size).sum();
        base + groups
    }
}

/// Validate the §3 partition/overlap invariant: non-overlapping groups'
/// `colIndices` must be pairwise disjoint and union to `{0..cols-1}`;
/// overlapping groups need only stay within `{0..cols-1}` (they may
/// repeat columns, since overlapping semantics sum contributions).
fn validate_groups(
    rows: DimensionType,
    cols: DimensionType,
    groups: &[ColumnGroup],
    overlapping: bool,
) -> Result<()> {
    for g in groups {
        if g.num_rows() != rows {
            return Err(CompressedError::DimensionMismatch {
                expected: (rows, cols),
                actual: (g.num_rows(), g.num_cols()),
                operation: "CompressedMatrix::new (group row count)".into(),
            });
        }
        if g.col_indices().is_empty() {
            return Err(CompressedError::InvalidState {
                message: "a column group with zero columns must be the EMPTY variant, not omitted or empty-ranged".into(),
            });
        }
        for &c in g.col_indices() {
            if c >= cols {
                return Err(CompressedError::InvalidArgument {
                    message: alloc::format!("column index {c} out of range for {cols} columns"),
                    parameter: Some("colIndices".into()),
                });
            }
        }
        if !g.col_indices().windows(2).all(|w| w[0] < w[1]) {
            return Err(CompressedError::InvalidState {
                message: "colIndices must be strictly increasing".into(),
            });
        }
    }

    if overlapping && groups.len() > 1 {
        return Ok(());
    }

    let mut seen = alloc::vec![false; cols];
    for g in groups {
        for &c in g.col_indices() {
            if seen[c] {
                return Err(CompressedError::InvalidState {
                    message: alloc::format!("column {c} is covered by more than one group in a non-overlapping matrix"),
                });
            }
            seen[c] = true;
        }
    }
    if seen.iter().any(|&s| !s) {
        return Err(CompressedError::InvalidState {
            message: "column groups must partition every column in a non-overlapping matrix".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::Dictionary;

    fn const_group(cols: Vec<usize>, rows: usize, tuple: Vec<f64>) -> ColumnGroup {
        ColumnGroup::Const {
            col_indices: cols,
            num_rows: rows,
            dict: Dictionary::single_tuple(tuple),
        }
    }

    #[test]
    fn single_group_is_never_overlapping() {
        let g = const_group(vec![0, 1, 2], 3, alloc::vec![1.0, 1.0, 2.0]);
        let m = CompressedMatrix::new(3, 3, alloc::vec![g], true, None).unwrap();
        assert!(!m.is_overlapping());
    }

    #[test]
    fn non_overlapping_groups_must_partition_columns() {
        let g = const_group(vec![0, 1], 2, alloc::vec![1.0, 1.0]);
        let err = CompressedMatrix::new(2, 3, alloc::vec![g], false, None);
        assert!(err.is_err());
    }

    #[test]
    fn overlapping_groups_may_repeat_columns() {
        let a = const_group(vec![0, 1], 2, alloc::vec![1.0, 1.0]);
        let b = const_group(vec![0, 1], 2, alloc::vec![2.0, 2.0]);
        let m = CompressedMatrix::new(2, 2, alloc::vec![a, b], true, None).unwrap();
        assert!(m.is_overlapping());
    }

    #[test]
    fn recompute_non_zeros_compacts_to_empty() {
        let col_indices: Vec<usize> = (0..2).collect();
        let g = ColumnGroup::Empty { col_indices, num_rows: 2 };
        let mut m = CompressedMatrix::new(2, 2, alloc::vec![g], false, None).unwrap();
        m.recompute_non_zeros();
        assert_eq!(m.nnz(), Some(0));
        assert_eq!(m.num_groups(), 1);
    }
}
