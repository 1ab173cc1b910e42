//! The uncompressed matrix collaborator (§6.4).
//!
//! `CompressedMatrix` treats this as an opaque dense/sparse matrix: every
//! mutating or unsupported compressed operation decompresses to a
//! [`MatrixBlock`] and delegates to it. The encoder/planner side of the
//! real system (which `MatrixBlock` an operation should even produce) is
//! out of scope (§1); what's implemented here is the minimal concrete
//! collaborator needed to compile and test the compressed-side kernels
//! against real dense/sparse data, grounded in the teacher's CSR storage.

use crate::error::{CompressedError, Result};
use crate::types::{BinaryOp, DimensionType, Precision, ScalarOp};
use alloc::vec;
use alloc::vec::Vec;

/// Row-major dense matrix.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DenseBlock {
    pub(crate) rows: DimensionType,
    pub(crate) cols: DimensionType,
    pub(crate) data: Vec<Precision>,
}

impl DenseBlock {
    /// Allocate a zeroed dense block of the given shape.
    pub fn zeros(rows: DimensionType, cols: DimensionType) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Build a dense block from row-major data.
    pub fn from_row_major(rows: DimensionType, cols: DimensionType, data: Vec<Precision>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(CompressedError::DimensionMismatch {
                expected: (rows, cols),
                actual: (1, data.len()),
                operation: "DenseBlock::from_row_major".into(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    pub fn rows(&self) -> DimensionType {
        self.rows
    }

    pub fn cols(&self) -> DimensionType {
        self.cols
    }

    pub fn data(&self) -> &[Precision] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [Precision] {
        &mut self.data
    }

    #[inline]
    pub fn get(&self, r: usize, c: usize) -> Precision {
        self.data[r * self.cols + c]
    }

    #[inline]
    pub fn set(&mut self, r: usize, c: usize, v: Precision) {
        self.data[r * self.cols + c] = v;
    }

    /// `self[r, c] += v` — the "unsafe"/accumulating write column groups
    /// use while decompressing their contribution (§4.2 `decompressToBlock`).
    #[inline]
    pub fn add_at(&mut self, r: usize, c: usize, v: Precision) {
        self.data[r * self.cols + c] += v;
    }

    pub fn row(&self, r: usize) -> &[Precision] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub fn row_mut(&mut self, r: usize) -> &mut [Precision] {
        &mut self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Number of non-zero cells.
    pub fn nnz(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0.0).count()
    }

    /// Out-of-place transpose.
    pub fn transpose(&self) -> DenseBlock {
        let mut out = DenseBlock::zeros(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                out.set(c, r, self.get(r, c));
            }
        }
        out
    }

    /// Dense matrix-matrix multiply: `self * rhs`.
    pub fn matmul(&self, rhs: &DenseBlock) -> Result<DenseBlock> {
        if self.cols != rhs.rows {
            return Err(CompressedError::DimensionMismatch {
                expected: (self.cols, rhs.rows),
                actual: (self.cols, rhs.rows),
                operation: "DenseBlock::matmul".into(),
            });
        }
        let mut out = DenseBlock::zeros(self.rows, rhs.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self.get(i, k);
                if a == 0.0 {
                    continue;
                }
                crate::utils::math::axpy(a, rhs.row(k), out.row_mut(i));
            }
        }
        Ok(out)
    }

    /// Apply a scalar operator cell-wise, returning a new block.
    pub fn scalar_op(&self, op: ScalarOp) -> DenseBlock {
        DenseBlock {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&v| op.apply(v)).collect(),
        }
    }

    /// Apply a binary operator cell-wise against another block of the
    /// same shape.
    pub fn binary_cell_op(&self, op: BinaryOp, rhs: &DenseBlock) -> Result<DenseBlock> {
        if self.rows != rhs.rows || self.cols != rhs.cols {
            return Err(CompressedError::DimensionMismatch {
                expected: (self.rows, self.cols),
                actual: (rhs.rows, rhs.cols),
                operation: "DenseBlock::binary_cell_op".into(),
            });
        }
        let data = self
            .data
            .iter()
            .zip(rhs.data.iter())
            .map(|(&a, &b)| op.apply(a, b))
            .collect();
        Ok(DenseBlock {
            rows: self.rows,
            cols: self.cols,
            data,
        })
    }

    /// Replace every cell matching `pattern` (NaN matches NaN) with `replacement`.
    pub fn replace(&self, pattern: Precision, replacement: Precision) -> DenseBlock {
        use crate::utils::numerical::pattern_matches;
        DenseBlock {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .map(|&v| if pattern_matches(v, pattern) { replacement } else { v })
                .collect(),
        }
    }

    /// Project onto the given row and column ranges (inclusive bounds, as
    /// in the compressed `slice` contract).
    pub fn slice(&self, rl: usize, ru: usize, cl: usize, cu: usize) -> Result<DenseBlock> {
        if ru < rl || ru >= self.rows || cu < cl || cu >= self.cols {
            return Err(CompressedError::InvalidArgument {
                message: "slice bounds out of range".into(),
                parameter: Some("rl/ru/cl/cu".into()),
            });
        }
        let new_rows = ru - rl + 1;
        let new_cols = cu - cl + 1;
        let mut out = DenseBlock::zeros(new_rows, new_cols);
        for r in 0..new_rows {
            for c in 0..new_cols {
                out.set(r, c, self.get(rl + r, cl + c));
            }
        }
        Ok(out)
    }

    /// Upper bound on in-memory size in bytes.
    pub fn in_memory_size(&self) -> usize {
        core::mem::size_of::<Self>() + self.data.len() * core::mem::size_of::<Precision>()
    }

    /// Sum of every cell. Used by the decompressed fallback path for
    /// `aggregateUnary` on overlapping matrices (§4.3), where per-group
    /// combination rules don't hold because cells are themselves sums.
    pub fn sum(&self) -> Precision {
        self.data.iter().sum()
    }

    pub fn sumsq(&self) -> Precision {
        self.data.iter().map(|v| v * v).sum()
    }

    pub fn min(&self) -> Precision {
        self.data.iter().cloned().fold(Precision::INFINITY, Precision::min)
    }

    pub fn max(&self) -> Precision {
        self.data.iter().cloned().fold(Precision::NEG_INFINITY, Precision::max)
    }

    pub fn product(&self) -> Precision {
        self.data.iter().product()
    }

    pub fn row_sums(&self, square: bool) -> Vec<Precision> {
        (0..self.rows)
            .map(|r| self.row(r).iter().map(|&v| if square { v * v } else { v }).sum())
            .collect()
    }

    pub fn col_sums(&self, square: bool) -> Vec<Precision> {
        let mut out = vec![0.0; self.cols];
        for r in 0..self.rows {
            for c in 0..self.cols {
                let v = self.get(r, c);
                out[c] += if square { v * v } else { v };
            }
        }
        out
    }

    pub fn row_mxx(&self, max: bool) -> Vec<Precision> {
        let init = if max { Precision::NEG_INFINITY } else { Precision::INFINITY };
        (0..self.rows)
            .map(|r| {
                self.row(r).iter().fold(init, |acc, &v| if max { acc.max(v) } else { acc.min(v) })
            })
            .collect()
    }

    pub fn col_mxx(&self, max: bool) -> Vec<Precision> {
        let init = if max { Precision::NEG_INFINITY } else { Precision::INFINITY };
        (0..self.cols)
            .map(|c| {
                (0..self.rows).fold(init, |acc, r| {
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
        (0..self.rows).map(|r| self.row(r).iter().product()).collect()
    }

    pub fn col_product(&self) -> Vec<Precision> {
        (0..self.cols)
            .map(|c| (0..self.rows).map(|r| self.get(r, c)).product())
            .collect()
    }

    /// Sort rows by the values of column `col`.
    pub fn sort_by_column(&self, col: usize, descending: bool) -> DenseBlock {
        let mut order: Vec<usize> = (0..self.rows).collect();
        order.sort_by(|&a, &b| {
            let (va, vb) = (self.get(a, col), self.get(b, col));
            let ord = va.partial_cmp(&vb).unwrap_or(core::cmp::Ordering::Equal);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });
        let mut out = DenseBlock::zeros(self.rows, self.cols);
        for (new_r, &old_r) in order.iter().enumerate() {
            out.row_mut(new_r).copy_from_slice(self.row(old_r));
        }
        out
    }

    /// Pick the value at the given quantile (0.0..=1.0) over every cell,
    /// using nearest-rank selection on the sorted flat buffer.
    pub fn pick_value(&self, quantile: Precision) -> Precision {
        let mut sorted = self.data.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(core::cmp::Ordering::Equal));
        if sorted.is_empty() {
            return 0.0;
        }
        let rank = ((quantile.clamp(0.0, 1.0)) * (sorted.len() - 1) as Precision).round() as usize;
        sorted[rank.min(sorted.len() - 1)]
    }

    /// Zero out the cell range `[rl, ru) x [cl, cu)`.
    pub fn zero_out(&self, rl: usize, ru: usize, cl: usize, cu: usize) -> DenseBlock {
        let mut out = self.clone();
        for r in rl..ru.min(self.rows) {
            for c in cl..cu.min(self.cols) {
                out.set(r, c, 0.0);
            }
        }
        out
    }

    /// Drop every all-zero row (if `rows`) or column (if `!rows`).
    pub fn remove_empty(&self, rows: bool) -> DenseBlock {
        if rows {
            let kept: Vec<usize> = (0..self.rows).filter(|&r| self.row(r).iter().any(|&v| v != 0.0)).collect();
            let mut out = DenseBlock::zeros(kept.len(), self.cols);
            for (new_r, &old_r) in kept.iter().enumerate() {
                out.row_mut(new_r).copy_from_slice(self.row(old_r));
            }
            out
        } else {
            let kept: Vec<usize> = (0..self.cols)
                .filter(|&c| (0..self.rows).any(|r| self.get(r, c) != 0.0))
                .collect();
            let mut out = DenseBlock::zeros(self.rows, kept.len());
            for r in 0..self.rows {
                for (new_c, &old_c) in kept.iter().enumerate() {
                    out.set(r, new_c, self.get(r, old_c));
                }
            }
            out
        }
    }

    /// Cross-tabulate two single-column blocks: `out[a][b]` counts rows
    /// where `self` holds (integer-rounded, non-negative) value `a` and
    /// `other` holds `b`. Mirrors the teacher-agnostic `ctable` collaborator
    /// required by §6.4.
    pub fn ctable(&self, other: &DenseBlock) -> Result<DenseBlock> {
        if self.rows != other.rows || self.cols != 1 || other.cols != 1 {
            return Err(CompressedError::DimensionMismatch {
                expected: (self.rows, 1),
                actual: (other.rows, other.cols),
                operation: "DenseBlock::ctable".into(),
            });
        }
        let max_a = self.data.iter().cloned().fold(0.0, Precision::max) as usize;
        let max_b = other.data.iter().cloned().fold(0.0, Precision::max) as usize;
        let mut out = DenseBlock::zeros(max_a + 1, max_b + 1);
        for r in 0..self.rows {
            let a = self.get(r, 0).max(0.0).round() as usize;
            let b = other.get(r, 0).max(0.0).round() as usize;
            out.add_at(a, b, 1.0);
        }
        Ok(out)
    }
}

/// Compressed Sparse Row storage, used by [`MatrixBlock::Sparse`] for the
/// "falls back to a sparse uncompressed matrix" branch of the on-disk
/// size estimate. Mirrors the teacher's `CSRStorage` one-for-one.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SparseBlock {
    pub(crate) rows: DimensionType,
    pub(crate) cols: DimensionType,
    values: Vec<Precision>,
    col_indices: Vec<u32>,
    row_ptr: Vec<u32>,
}

impl SparseBlock {
    /// Build sparse storage from a dense block, dropping explicit zeros.
    pub fn from_dense(block: &DenseBlock) -> Self {
        let mut values = Vec::new();
        let mut col_indices = Vec::new();
        let mut row_ptr = vec![0u32; block.rows + 1];

        for r in 0..block.rows {
            for c in 0..block.cols {
                let v = block.get(r, c);
                if v != 0.0 {
                    values.push(v);
                    col_indices.push(c as u32);
                }
            }
            row_ptr[r + 1] = values.len() as u32;
        }

        Self {
            rows: block.rows,
            cols: block.cols,
            values,
            col_indices,
            row_ptr,
        }
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn to_dense(&self) -> DenseBlock {
        let mut out = DenseBlock::zeros(self.rows, self.cols);
        for r in 0..self.rows {
            let start = self.row_ptr[r] as usize;
            let end = self.row_ptr[r + 1] as usize;
            for i in start..end {
                out.set(r, self.col_indices[i] as usize, self.values[i]);
            }
        }
        out
    }

    pub fn in_memory_size(&self) -> usize {
        core::mem::size_of::<Self>()
            + self.values.len() * core::mem::size_of::<Precision>()
            + self.col_indices.len() * core::mem::size_of::<u32>()
            + self.row_ptr.len() * core::mem::size_of::<u32>()
    }
}

/// The opaque "uncompressed matrix" collaborator required by §6.4:
/// allocate dense/sparse, get/set, matmul, transpose, binary/scalar
/// cell-ops, slice and a storage-format switch. A compressed matrix never
/// inspects which variant it holds; it only calls through this interface.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MatrixBlock {
    Dense(DenseBlock),
    Sparse(SparseBlock),
}

impl MatrixBlock {
    pub fn dense(rows: DimensionType, cols: DimensionType) -> Self {
        MatrixBlock::Dense(DenseBlock::zeros(rows, cols))
    }

    pub fn sparse_from_dense(dense: &DenseBlock) -> Self {
        MatrixBlock::Sparse(SparseBlock::from_dense(dense))
    }

    pub fn rows(&self) -> DimensionType {
        match self {
            MatrixBlock::Dense(d) => d.rows,
            MatrixBlock::Sparse(s) => s.rows,
        }
    }

    pub fn cols(&self) -> DimensionType {
        match self {
            MatrixBlock::Dense(d) => d.cols,
            MatrixBlock::Sparse(s) => s.cols,
        }
    }

    pub fn nnz(&self) -> usize {
        match self {
            MatrixBlock::Dense(d) => d.nnz(),
            MatrixBlock::Sparse(s) => s.nnz(),
        }
    }

    pub fn get(&self, r: usize, c: usize) -> Precision {
        match self {
            MatrixBlock::Dense(d) => d.get(r, c),
            MatrixBlock::Sparse(s) => s.to_dense().get(r, c),
        }
    }

    /// Materialize as a dense block, converting if necessary.
    pub fn to_dense(&self) -> DenseBlock {
        match self {
            MatrixBlock::Dense(d) => d.clone(),
            MatrixBlock::Sparse(s) => s.to_dense(),
        }
    }

    pub fn matmul(&self, rhs: &MatrixBlock) -> Result<MatrixBlock> {
        Ok(MatrixBlock::Dense(self.to_dense().matmul(&rhs.to_dense())?))
    }

    pub fn transpose(&self) -> MatrixBlock {
        MatrixBlock::Dense(self.to_dense().transpose())
    }

    pub fn scalar_op(&self, op: ScalarOp) -> MatrixBlock {
        MatrixBlock::Dense(self.to_dense().scalar_op(op))
    }

    pub fn binary_cell_op(&self, op: BinaryOp, rhs: &MatrixBlock) -> Result<MatrixBlock> {
        Ok(MatrixBlock::Dense(
            self.to_dense().binary_cell_op(op, &rhs.to_dense())?,
        ))
    }

    pub fn replace(&self, pattern: Precision, replacement: Precision) -> MatrixBlock {
        MatrixBlock::Dense(self.to_dense().replace(pattern, replacement))
    }

    pub fn slice(&self, rl: usize, ru: usize, cl: usize, cu: usize) -> Result<MatrixBlock> {
        Ok(MatrixBlock::Dense(self.to_dense().slice(rl, ru, cl, cu)?))
    }

    /// `sort`/`pickValue`/`ctable`/`incrementalAggregate`/`zeroOut`/
    /// `removeEmpty` from §6.4's required interface. `CompressedMatrix`
    /// never implements these directly (§4.3): it decompresses and
    /// delegates here.
    pub fn sort_by_column(&self, col: usize, descending: bool) -> MatrixBlock {
        MatrixBlock::Dense(self.to_dense().sort_by_column(col, descending))
    }

    pub fn pick_value(&self, quantile: Precision) -> Precision {
        self.to_dense().pick_value(quantile)
    }

    pub fn zero_out(&self, rl: usize, ru: usize, cl: usize, cu: usize) -> MatrixBlock {
        MatrixBlock::Dense(self.to_dense().zero_out(rl, ru, cl, cu))
    }

    pub fn remove_empty(&self, rows: bool) -> MatrixBlock {
        MatrixBlock::Dense(self.to_dense().remove_empty(rows))
    }

    pub fn ctable(&self, other: &MatrixBlock) -> Result<MatrixBlock> {
        Ok(MatrixBlock::Dense(self.to_dense().ctable(&other.to_dense())?))
    }

    /// `result := self <op> increment`, e.g. accumulating a running sum
    /// across mini-batches.
    pub fn incremental_aggregate(&self, op: BinaryOp, increment: &MatrixBlock) -> Result<MatrixBlock> {
        self.binary_cell_op(op, increment)
    }

    pub fn sum(&self) -> Precision {
        self.to_dense().sum()
    }

    pub fn sumsq(&self) -> Precision {
        self.to_dense().sumsq()
    }

    pub fn min(&self) -> Precision {
        self.to_dense().min()
    }

    pub fn max(&self) -> Precision {
        self.to_dense().max()
    }

    pub fn product(&self) -> Precision {
        self.to_dense().product()
    }

    /// Estimate the on-disk size of this block if it were written as the
    /// serializer's dense fallback (§4.5's `estimateDenseDiskSize`).
    pub fn estimate_disk_size(&self) -> usize {
        let header = 2 * core::mem::size_of::<u32>() + core::mem::size_of::<i64>();
        match self {
            MatrixBlock::Dense(d) => header + d.data.len() * core::mem::size_of::<Precision>(),
            MatrixBlock::Sparse(s) => {
                header
                    + s.nnz() * (core::mem::size_of::<Precision>() + core::mem::size_of::<u32>())
                    + (s.rows + 1) * core::mem::size_of::<u32>()
            }
        }
    }

    pub fn in_memory_size(&self) -> usize {
        match self {
            MatrixBlock::Dense(d) => d.in_memory_size(),
            MatrixBlock::Sparse(s) => s.in_memory_size(),
        }
    }
}

/// Estimate the on-disk size of a dense block of the given shape and
/// non-zero count, choosing a sparse-triplet estimate when the matrix is
/// sparse enough and a flat row-major estimate otherwise. Used by the
/// size-adaptive serializer (§4.5) independent of any concrete block.
pub fn estimate_dense_disk_size(rows: DimensionType, cols: DimensionType, nnz: Option<usize>) -> usize {
    let header = 2 * core::mem::size_of::<u32>() + core::mem::size_of::<i64>();
    let dense_bytes = rows * cols * core::mem::size_of::<Precision>();
    let sparse_bytes = nnz.map(|n| {
        n * (core::mem::size_of::<Precision>() + core::mem::size_of::<u32>())
            + (rows + 1) * core::mem::size_of::<u32>()
    });
    header
        + match sparse_bytes {
            Some(s) => s.min(dense_bytes),
            None => dense_bytes,
        }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_matmul_identity() {
        let a = DenseBlock::from_row_major(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let id = DenseBlock::from_row_major(2, 2, vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        let out = a.matmul(&id).unwrap();
        assert_eq!(out.data(), a.data());
    }

    #[test]
    fn sparse_round_trips_through_dense() {
        let dense = DenseBlock::from_row_major(2, 3, vec![0.0, 1.0, 0.0, 2.0, 0.0, 3.0]).unwrap();
        let sparse = SparseBlock::from_dense(&dense);
        assert_eq!(sparse.nnz(), 3);
        assert_eq!(sparse.to_dense(), dense);
    }

    #[test]
    fn transpose_is_involutive() {
        let a = DenseBlock::from_row_major(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(a.transpose().transpose(), a);
    }

    #[test]
    fn replace_matches_nan() {
        let a = DenseBlock::from_row_major(1, 2, vec![f64::NAN, 1.0]).unwrap();
        let b = a.replace(f64::NAN, 0.0);
        assert_eq!(b.data(), &[0.0, 1.0]);
    }
}
