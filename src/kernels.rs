//! Cross-group dispatch: the kernels that see a [`CompressedMatrix`] as a
//! whole rather than a single column group (§4.3, §2 "MatrixKernels
//! (compressed)").
//!
//! Every kernel here either (a) stays compressed by delegating to each
//! group's own per-variant operation and recombining the per-group
//! results, or (b) decompresses once and delegates to the dense
//! collaborator (§6.4) when the compressed form can't represent the
//! result — recompression is an encoder/planner concern and out of scope
//! (§1), so the "decompress and delegate" paths return a [`MatrixBlock`]
//! rather than trying to re-wrap the answer as compressed.
//!
//! Parallel kernels (gated by the `parallel` feature) follow the
//! group-partitioned strategy from §5: every group's contribution is
//! computed independently (no shared mutable state), then the pure
//! per-group results are merged sequentially. This sidesteps unsafe row-
//! stripe splitting of a shared dense buffer entirely.

use crate::colgroup::ColumnGroup;
use crate::config::CompressionConfig;
use crate::dense::{DenseBlock, MatrixBlock};
use crate::error::{CompressedError, Result};
use crate::matrix::CompressedMatrix;
use crate::types::{AggregateDirection, AggregateOp, AggregateResult, BinaryOp, DimensionType, Precision, ScalarOp};
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

/// Right-hand operand shapes `binaryCellOp` specializes on (§4.3).
pub enum BinaryRhs<'a> {
    Scalar(Precision),
    /// A vector broadcast across every row, aligned to global columns.
    RowVector(&'a [Precision]),
    Matrix(&'a MatrixBlock),
}

/// `binaryCellOp`/`append`/`replace`/`slice` can each either stay
/// compressed or fall back to the dense collaborator; this carries
/// whichever happened back to the caller instead of forcing a
/// (potentially lossy, definitely out-of-scope) recompression.
pub enum MaybeCompressed {
    Compressed(CompressedMatrix),
    Dense(MatrixBlock),
}

impl MaybeCompressed {
    pub fn is_compressed(&self) -> bool {
        matches!(self, MaybeCompressed::Compressed(_))
    }

    /// Materialize either variant as a dense block.
    pub fn to_dense(&self) -> DenseBlock {
        match self {
            MaybeCompressed::Compressed(m) => (*m.decompress(&CompressionConfig::default())).clone(),
            MaybeCompressed::Dense(b) => b.to_dense(),
        }
    }
}

impl CompressedMatrix {
    /// Single-cell read (§4.2 `get`): binary search each group's
    /// `colIndices`, summing across groups when overlapping.
    pub fn get(&self, r: DimensionType, c: DimensionType) -> Precision {
        if self.overlapping {
            self.groups
                .iter()
                .filter_map(|g| g.col_indices().binary_search(&c).ok().map(|lc| g.get(r, lc)))
                .sum()
        } else {
            for g in &self.groups {
                if let Ok(lc) = g.col_indices().binary_search(&c) {
                    return g.get(r, lc);
                }
            }
            0.0
        }
    }

    /// Decompress to a dense block, consulting and populating the soft
    /// cache (§4.3, §4.4). `config.parallelism` is the parallelism hint;
    /// with the `parallel` feature it partitions groups across a rayon
    /// pool instead of row stripes (§5), since every group's contribution
    /// is a pure value that can be merged afterward without shared
    /// mutable state.
    pub fn decompress(&self, config: &CompressionConfig) -> Arc<DenseBlock> {
        let k = config.parallelism;
        if let Some(cached) = self.cache.get() {
            log::trace!("decompression cache hit for {}x{} matrix", self.rows, self.cols);
            return cached;
        }
        log::debug!("decompressing {}x{} compressed matrix (k={})", self.rows, self.cols, k);
        let mut target = DenseBlock::zeros(self.rows, self.cols);
        #[cfg(feature = "parallel")]
        {
            if k > 1 && self.groups.len() > 1 {
                use rayon::prelude::*;
                let stripes: Vec<DenseBlock> = self
                    .groups
                    .par_iter()
                    .map(|g| {
                        let mut local = DenseBlock::zeros(self.rows, self.cols);
                        g.decompress_to_block(&mut local);
                        local
                    })
                    .collect();
                for stripe in stripes {
                    crate::utils::math::axpy(1.0, stripe.data(), target.data_mut());
                }
            } else {
                for g in &self.groups {
                    g.decompress_to_block(&mut target);
                }
            }
        }
        #[cfg(not(feature = "parallel"))]
        {
            for g in &self.groups {
                g.decompress_to_block(&mut target);
            }
        }
        let arc = Arc::new(target);
        self.cache.store(arc.clone());
        arc
    }

    /// Non-forcing fetch of a previously-decompressed dense form (§4.4).
    pub fn get_cached_decompressed(&self) -> Option<Arc<DenseBlock>> {
        self.cache.get()
    }

    /// Apply a position-independent scalar operator to every group,
    /// preserving the overlapping flag (§4.3 `scalarOp`). The resulting
    /// `nnz` is unknown: a non-zero-preserving operator can turn implicit
    /// zeros into non-zeros, so the caller should
    /// `recompute_non_zeros` if an exact count is needed.
    pub fn scalar_op(&self, op: ScalarOp) -> CompressedMatrix {
        let groups: Vec<ColumnGroup> = self.groups.iter().map(|g| g.scalar_op(op)).collect();
        CompressedMatrix::new(self.rows, self.cols, groups, self.overlapping, None)
            .expect("scalar_op preserves every group's colIndices and row count")
    }

    /// `binaryCellOp` (§4.3): specializes on the right-hand operand's
    /// shape. Scalar and row-vector right-hand sides stay compressed;
    /// a matrix right-hand side decompresses both operands.
    pub fn binary_cell_op(&self, op: BinaryOp, rhs: BinaryRhs, left_side: bool) -> Result<MaybeCompressed> {
        match rhs {
            BinaryRhs::Scalar(c) => {
                let groups: Vec<ColumnGroup> = self
                    .groups
                    .iter()
                    .map(|g| {
                        let v_local = vec![c; g.num_cols()];
                        g.binary_row_op(op, &v_local, left_side)
                    })
                    .collect();
                let m = CompressedMatrix::new(self.rows, self.cols, groups, self.overlapping, None)?;
                Ok(MaybeCompressed::Compressed(m))
            }
            BinaryRhs::RowVector(v) => {
                if v.len() != self.cols {
                    return Err(CompressedError::DimensionMismatch {
                        expected: (1, self.cols),
                        actual: (1, v.len()),
                        operation: "CompressedMatrix::binary_cell_op (row vector)".into(),
                    });
                }
                let groups: Vec<ColumnGroup> = self
                    .groups
                    .iter()
                    .map(|g| {
                        let v_local: Vec<Precision> = g.col_indices().iter().map(|&c| v[c]).collect();
                        g.binary_row_op(op, &v_local, left_side)
                    })
                    .collect();
                let m = CompressedMatrix::new(self.rows, self.cols, groups, self.overlapping, None)?;
                Ok(MaybeCompressed::Compressed(m))
            }
            BinaryRhs::Matrix(rhs) => {
                if rhs.rows() != self.rows || rhs.cols() != self.cols {
                    return Err(CompressedError::DimensionMismatch {
                        expected: (self.rows, self.cols),
                        actual: (rhs.rows(), rhs.cols()),
                        operation: "CompressedMatrix::binary_cell_op (matrix)".into(),
                    });
                }
                log::debug!("decompressing for binaryCellOp against a matrix right-hand side");
                let lhs = MatrixBlock::Dense((*self.decompress(&CompressionConfig::default())).clone());
                Ok(MaybeCompressed::Dense(lhs.binary_cell_op(op, rhs)?))
            }
        }
    }

    /// `append(rhs, cbind)` (§4.3). Column-binding a single right-hand
    /// matrix merges the group lists (rhs's column indices shifted by
    /// this matrix's column count); row-binding, or binding more than one
    /// operand, decompresses.
    pub fn append_cbind(&self, rhs: &CompressedMatrix) -> Result<CompressedMatrix> {
        if rhs.rows != self.rows {
            return Err(CompressedError::DimensionMismatch {
                expected: (self.rows, self.cols + rhs.cols),
                actual: (rhs.rows, rhs.cols),
                operation: "CompressedMatrix::append_cbind".into(),
            });
        }
        let mut groups = self.groups.clone();
        for g in &rhs.groups {
            groups.push(shift_columns(g, self.cols));
        }
        CompressedMatrix::new(self.rows, self.cols + rhs.cols, groups, self.overlapping || rhs.overlapping, None)
    }

    /// Row-binding always decompresses both operands (§4.3).
    pub fn append_rbind(&self, rhs: &CompressedMatrix) -> Result<MatrixBlock> {
        if rhs.cols != self.cols {
            return Err(CompressedError::DimensionMismatch {
                expected: (self.rows + rhs.rows, self.cols),
                actual: (rhs.rows, rhs.cols),
                operation: "CompressedMatrix::append_rbind".into(),
            });
        }
        log::debug!("decompressing both operands for rbind append");
        let top = self.decompress(&CompressionConfig::default());
        let bottom = rhs.decompress(&CompressionConfig::default());
        let mut out = DenseBlock::zeros(self.rows + rhs.rows, self.cols);
        for r in 0..self.rows {
            out.row_mut(r).copy_from_slice(top.row(r));
        }
        for r in 0..rhs.rows {
            out.row_mut(self.rows + r).copy_from_slice(bottom.row(r));
        }
        Ok(MatrixBlock::Dense(out))
    }

    /// `rightMultByMatrix(right, k, allowOverlap)` (§4.3): each group
    /// contributes an independent dense slab over `right`'s columns.
    /// When `config.allow_overlap` and `right` has more than one column,
    /// those slabs become an overlapping compressed matrix with zero
    /// extra materialization; otherwise they're summed into a single
    /// dense group. `config.parallelism` is the group-partitioning hint.
    pub fn right_mult_by_matrix(&self, right: &DenseBlock, config: &CompressionConfig) -> Result<CompressedMatrix> {
        if right.rows() != self.cols {
            return Err(CompressedError::DimensionMismatch {
                expected: (self.cols, right.cols()),
                actual: (right.rows(), right.cols()),
                operation: "CompressedMatrix::right_mult_by_matrix".into(),
            });
        }
        let contributions = self.map_groups(config.parallelism, |g| g.right_mult_by_matrix(right));
        let mut slabs = Vec::with_capacity(contributions.len());
        for c in contributions {
            slabs.push(c?);
        }

        let out_cols = right.cols();
        if config.allow_overlap && out_cols > 1 && slabs.len() > 1 {
            let col_indices: Vec<usize> = (0..out_cols).collect();
            let groups: Vec<ColumnGroup> = slabs
                .into_iter()
                .map(|block| ColumnGroup::Uncompressed { col_indices: col_indices.clone(), block })
                .collect();
            CompressedMatrix::new(self.rows, out_cols, groups, true, None)
        } else {
            let mut summed = DenseBlock::zeros(self.rows, out_cols);
            for slab in &slabs {
                crate::utils::math::axpy(1.0, slab.data(), summed.data_mut());
            }
            let col_indices: Vec<usize> = (0..out_cols).collect();
            CompressedMatrix::new(
                self.rows,
                out_cols,
                vec![ColumnGroup::Uncompressed { col_indices, block: summed }],
                false,
                None,
            )
        }
    }

    /// `leftMultByMatrix(left, k)` (§4.3): dense result of shape
    /// `left.rows x cols`; each group fills its own `colIndices` slab.
    pub fn left_mult_by_matrix(&self, left: &DenseBlock, k: usize) -> Result<DenseBlock> {
        if left.cols() != self.rows {
            return Err(CompressedError::DimensionMismatch {
                expected: (left.rows(), self.rows),
                actual: (left.rows(), left.cols()),
                operation: "CompressedMatrix::left_mult_by_matrix".into(),
            });
        }
        let slabs = self.map_groups(k, |g| g.left_mult_by_matrix(left));
        let mut out = DenseBlock::zeros(left.rows(), self.cols);
        for (g, slab) in self.groups.iter().zip(slabs) {
            let slab = slab?;
            for (lc, &gc) in g.col_indices().iter().enumerate() {
                for r in 0..left.rows() {
                    out.set(r, gc, slab.get(r, lc));
                }
            }
        }
        Ok(out)
    }

    /// `transposeSelfMult` (left-only, §4.3): `X^T * X`'s upper triangle,
    /// mirrored into the lower triangle for caller convenience (§8 leaves
    /// the choice open; this implementation's decision is recorded in
    /// DESIGN.md). Overlapping matrices add the cross-group terms
    /// `groupA^T * groupB` for every pair sharing columns.
    pub fn transpose_self_mult(&self, k: usize) -> Result<DenseBlock> {
        let mut out = DenseBlock::zeros(self.cols, self.cols);
        let diag = self.map_groups(k, |g| g.tsmm_self());
        for (g, d) in self.groups.iter().zip(diag) {
            let d = d?;
            for (i, &gi) in g.col_indices().iter().enumerate() {
                for (j, &gj) in g.col_indices().iter().enumerate() {
                    out.add_at(gi, gj, d.get(i, j));
                }
            }
        }
        if self.overlapping {
            for i in 0..self.groups.len() {
                for j in 0..self.groups.len() {
                    if i == j {
                        continue;
                    }
                    let cross = self.groups[i].tsmm_cross(&self.groups[j]);
                    for (li, &gi) in self.groups[i].col_indices().iter().enumerate() {
                        for (lj, &gj) in self.groups[j].col_indices().iter().enumerate() {
                            out.add_at(gi, gj, cross.get(li, lj));
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    /// `aggregateUnary` (§4.3): sum/sumsq/mean/min/max/product, full or
    /// per-row/per-column. Overlapping matrices decompress first because
    /// per-group min/max/product don't commute with the implicit
    /// cross-group summation.
    pub fn aggregate_unary(&self, op: AggregateOp, dir: AggregateDirection) -> AggregateResult {
        if self.overlapping {
            log::debug!("decompressing for aggregateUnary on an overlapping matrix");
            let dense = self.decompress(&CompressionConfig::default());
            return match dir {
                AggregateDirection::Full => AggregateResult::Scalar(dense_full_aggregate(&dense, op)),
                AggregateDirection::Row => AggregateResult::Vector((0..dense.rows()).map(|r| dense_row_aggregate(&dense, op, r)).collect()),
                AggregateDirection::Col => AggregateResult::Vector((0..dense.cols()).map(|c| dense_col_aggregate(&dense, op, c)).collect()),
            };
        }
        match dir {
            AggregateDirection::Full => AggregateResult::Scalar(self.aggregate_full(op)),
            AggregateDirection::Row => AggregateResult::Vector(self.aggregate_rows(op)),
            AggregateDirection::Col => AggregateResult::Vector(self.aggregate_cols(op)),
        }
    }

    fn aggregate_full(&self, op: AggregateOp) -> Precision {
        match op {
            AggregateOp::Sum => self.groups.iter().map(ColumnGroup::compute_sum).sum(),
            AggregateOp::SumSquares => self.groups.iter().map(ColumnGroup::compute_sumsq).sum(),
            AggregateOp::Mean => {
                let total: Precision = self.groups.iter().map(ColumnGroup::compute_sum).sum();
                total / (self.rows * self.cols) as Precision
            }
            AggregateOp::Min => self.groups.iter().map(ColumnGroup::compute_min).fold(Precision::INFINITY, Precision::min),
            AggregateOp::Max => self.groups.iter().map(ColumnGroup::compute_max).fold(Precision::NEG_INFINITY, Precision::max),
            AggregateOp::Product => self.groups.iter().map(ColumnGroup::compute_product).product(),
        }
    }

    fn aggregate_rows(&self, op: AggregateOp) -> Vec<Precision> {
        match op {
            AggregateOp::Sum => self.combine_rows(|g| g.row_sums(), |a, b| a + b, 0.0),
            AggregateOp::SumSquares => self.combine_rows(|g| g.row_sums_squared(), |a, b| a + b, 0.0),
            AggregateOp::Mean => self
                .combine_rows(|g| g.row_sums(), |a, b| a + b, 0.0)
                .into_iter()
                .map(|s| s / self.cols as Precision)
                .collect(),
            AggregateOp::Min => self.combine_rows(|g| g.row_mxx(false), Precision::min, Precision::INFINITY),
            AggregateOp::Max => self.combine_rows(|g| g.row_mxx(true), Precision::max, Precision::NEG_INFINITY),
            AggregateOp::Product => self.combine_rows(|g| g.row_product(), |a, b| a * b, 1.0),
        }
    }

    fn aggregate_cols(&self, op: AggregateOp) -> Vec<Precision> {
        match op {
            AggregateOp::Sum => self.scatter_cols(|g| g.col_sums()),
            AggregateOp::SumSquares => self.scatter_cols(|g| g.col_sums_squared()),
            AggregateOp::Mean => self.scatter_cols(|g| g.col_sums()).into_iter().map(|s| s / self.rows as Precision).collect(),
            AggregateOp::Min => self.scatter_cols(|g| g.col_mxx(false)),
            AggregateOp::Max => self.scatter_cols(|g| g.col_mxx(true)),
            AggregateOp::Product => self.scatter_cols(|g| g.col_product()),
        }
    }

    /// Additive/min/max reduction across groups at the SAME row index —
    /// valid because non-overlapping groups partition the columns, so
    /// each group's row-level reduction already covers disjoint cells of
    /// that row.
    fn combine_rows(&self, per_group: impl Fn(&ColumnGroup) -> Vec<Precision>, combine: impl Fn(Precision, Precision) -> Precision, init: Precision) -> Vec<Precision> {
        let mut acc = vec![init; self.rows];
        for g in &self.groups {
            for (a, v) in acc.iter_mut().zip(per_group(g)) {
                *a = combine(*a, v);
            }
        }
        acc
    }

    /// Positional scatter of each group's local column vector into the
    /// full-width column vector — no reduction needed since
    /// non-overlapping groups own disjoint columns.
    fn scatter_cols(&self, per_group: impl Fn(&ColumnGroup) -> Vec<Precision>) -> Vec<Precision> {
        let mut out = vec![0.0; self.cols];
        for g in &self.groups {
            let local = per_group(g);
            for (lc, &gc) in g.col_indices().iter().enumerate() {
                out[gc] = local[lc];
            }
        }
        out
    }

    /// `replace(pattern, replacement)` (§4.3): overlapping matrices
    /// decompress (a per-group value is no longer the cell value once
    /// contributions are summed); otherwise every group is rewritten and
    /// the list replaces the current one.
    pub fn replace(&self, pattern: Precision, replacement: Precision) -> Result<MaybeCompressed> {
        if self.overlapping {
            log::debug!("decompressing for replace on an overlapping matrix");
            return Ok(MaybeCompressed::Dense(MatrixBlock::Dense(
                self.decompress(&CompressionConfig::default()).replace(pattern, replacement),
            )));
        }
        let groups: Vec<ColumnGroup> = self.groups.iter().map(|g| g.replace(pattern, replacement)).collect();
        let m = CompressedMatrix::new(self.rows, self.cols, groups, false, None)?;
        Ok(MaybeCompressed::Compressed(m))
    }

    /// `slice(rl,ru,cl,cu)` (§4.3): pure column-range slicing stays
    /// compressed; any row restriction decompresses into a dense target
    /// spanning the row range.
    pub fn slice(&self, rl: usize, ru: usize, cl: usize, cu: usize) -> Result<MaybeCompressed> {
        if ru < rl || ru >= self.rows || cu < cl || cu >= self.cols {
            return Err(CompressedError::InvalidArgument {
                message: "slice bounds out of range".into(),
                parameter: Some("rl/ru/cl/cu".into()),
            });
        }
        if rl == 0 && ru == self.rows - 1 {
            let mut groups = Vec::new();
            for g in &self.groups {
                let lo = g.col_indices().partition_point(|&c| c < cl);
                let hi = g.col_indices().partition_point(|&c| c <= cu);
                if lo >= hi {
                    continue;
                }
                let mut sliced = g.slice_columns(lo, hi)?;
                rebase_columns_in_place(&mut sliced, cl);
                groups.push(sliced);
            }
            let m = CompressedMatrix::new(ru - rl + 1, cu - cl + 1, groups, self.overlapping, None)?;
            return Ok(MaybeCompressed::Compressed(m));
        }
        log::debug!("decompressing for row-restricted slice");
        let dense = self.decompress(&CompressionConfig::default());
        Ok(MaybeCompressed::Dense(MatrixBlock::Dense(dense.slice(rl, ru, cl, cu)?)))
    }

    /// `X^T (X v)`, optionally weighted `X^T (w * (X v))` (§4.3 chainMM /
    /// XtXv / XtwXv). Right-multiply is always allowed to overlap when
    /// `v` has more than one column (it's immediately decompressed
    /// anyway to apply the weight / feed the left-multiply).
    pub fn chain_mm(&self, v: &DenseBlock, w: Option<&DenseBlock>, k: usize) -> Result<DenseBlock> {
        let config = CompressionConfig { parallelism: k, allow_overlap: v.cols() > 1, ..CompressionConfig::default() };
        let xv = self.right_mult_by_matrix(v, &config)?;
        let mut dense_xv = (*xv.decompress(&config)).clone();
        if let Some(w) = w {
            dense_xv = dense_xv.binary_cell_op(BinaryOp::Multiply, w)?;
        }
        let transposed = dense_xv.transpose();
        let left_result = self.left_mult_by_matrix(&transposed, k)?;
        Ok(left_result.transpose())
    }

    /// Whether the compressed form contains `v` anywhere (§4.2
    /// `containsValue`). Unsupported on overlapping matrices (§9 open
    /// question): the correct sum-vs-per-group semantics is unspecified,
    /// so this raises rather than guesses (decision recorded in
    /// DESIGN.md).
    pub fn contains_value(&self, v: Precision) -> Result<bool> {
        if self.overlapping {
            return Err(CompressedError::Unsupported {
                operation: "containsValue(overlapping)".into(),
            });
        }
        Ok(self.groups.iter().any(|g| g.contains_value(v)))
    }

    /// Collapse an overlapping matrix into a non-overlapping single
    /// `UNCOMPRESSED` group by decompressing (§3 "squash").
    pub fn squash(&self) -> Result<CompressedMatrix> {
        if !self.overlapping {
            return Ok(self.clone());
        }
        let dense = self.decompress(&CompressionConfig::default());
        let col_indices: Vec<usize> = (0..self.cols).collect();
        CompressedMatrix::new(
            self.rows,
            self.cols,
            vec![ColumnGroup::Uncompressed { col_indices, block: (*dense).clone() }],
            false,
            None,
        )
    }

    /// Operations for which neither a compressed-side implementation nor
    /// a useful partial one exists (§4.3's "unsupported operations" list:
    /// cm/cov/sort/pickValue/groupedAgg/quaternary/ctable/leftIndexing/
    /// zeroOut/reorg-non-transpose/removeEmpty). These always decompress
    /// and delegate to the dense collaborator; this is logged, never an
    /// error (§7 policy).
    pub fn decompress_and_delegate(&self, op_name: &str) -> MatrixBlock {
        log::debug!("decompressing for unsupported op '{op_name}'");
        MatrixBlock::Dense((*self.decompress(&CompressionConfig::default())).clone())
    }

    pub fn sort_by_column(&self, col: usize, descending: bool) -> MatrixBlock {
        self.decompress_and_delegate("sort").sort_by_column(col, descending)
    }

    pub fn pick_value(&self, quantile: Precision) -> Precision {
        self.decompress_and_delegate("pickValue").pick_value(quantile)
    }

    pub fn zero_out(&self, rl: usize, ru: usize, cl: usize, cu: usize) -> MatrixBlock {
        self.decompress_and_delegate("zeroOut").zero_out(rl, ru, cl, cu)
    }

    pub fn remove_empty(&self, rows: bool) -> MatrixBlock {
        self.decompress_and_delegate("removeEmpty").remove_empty(rows)
    }

    pub fn ctable(&self, other: &MatrixBlock) -> Result<MatrixBlock> {
        self.decompress_and_delegate("ctable").ctable(other)
    }

    /// Partition work across groups, using rayon when the `parallel`
    /// feature is enabled and `k` asks for more than one worker (§5
    /// group-partitioned strategy).
    fn map_groups<T: Send>(&self, k: usize, f: impl Fn(&ColumnGroup) -> T + Sync) -> Vec<T> {
        #[cfg(feature = "parallel")]
        {
            if k > 1 && self.groups.len() > 1 {
                use rayon::prelude::*;
                return self.groups.par_iter().map(|g| f(g)).collect();
            }
        }
        #[cfg(not(feature = "parallel"))]
        let _ = k;
        self.groups.iter().map(f).collect()
    }
}

fn shift_columns(g: &ColumnGroup, shift: usize) -> ColumnGroup {
    let mut shifted = g.clone();
    shift_columns_in_place(&mut shifted, shift);
    shifted
}

fn shift_columns_in_place(g: &mut ColumnGroup, shift: usize) {
    // Every variant's `col_indices` sits in the same struct position;
    // rebuilding via `slice_columns`-style replacement would require a
    // full match, so this touches the shared field directly through the
    // enum's public accessor pattern instead.
    let cols: Vec<usize> = g.col_indices().iter().map(|&c| c + shift).collect();
    g.set_col_indices(cols);
}

/// Inverse of [`shift_columns_in_place`]: rebases `col_indices` that are
/// still absolute within the source matrix (as produced by
/// `slice_columns`, which carries over the original indices) down onto
/// the new matrix's local `0..(cu-cl+1)` range.
fn rebase_columns_in_place(g: &mut ColumnGroup, lower_bound: usize) {
    let cols: Vec<usize> = g.col_indices().iter().map(|&c| c - lower_bound).collect();
    g.set_col_indices(cols);
}

fn dense_full_aggregate(d: &DenseBlock, op: AggregateOp) -> Precision {
    match op {
        AggregateOp::Sum => d.sum(),
        AggregateOp::SumSquares => d.sumsq(),
        AggregateOp::Mean => d.sum() / (d.rows() * d.cols()) as Precision,
        AggregateOp::Min => d.min(),
        AggregateOp::Max => d.max(),
        AggregateOp::Product => d.product(),
    }
}

fn dense_row_aggregate(d: &DenseBlock, op: AggregateOp, r: usize) -> Precision {
    match op {
        AggregateOp::Sum => d.row_sums(false)[r],
        AggregateOp::SumSquares => d.row_sums(true)[r],
        AggregateOp::Mean => d.row_sums(false)[r] / d.cols() as Precision,
        AggregateOp::Min => d.row_mxx(false)[r],
        AggregateOp::Max => d.row_mxx(true)[r],
        AggregateOp::Product => d.row_product()[r],
    }
}

fn dense_col_aggregate(d: &DenseBlock, op: AggregateOp, c: usize) -> Precision {
    match op {
        AggregateOp::Sum => d.col_sums(false)[c],
        AggregateOp::SumSquares => d.col_sums(true)[c],
        AggregateOp::Mean => d.col_sums(false)[c] / d.rows() as Precision,
        AggregateOp::Min => d.col_mxx(false)[c],
        AggregateOp::Max => d.col_mxx(true)[c],
        AggregateOp::Product => d.col_product()[c],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::Dictionary;

    fn const_matrix_3x3() -> CompressedMatrix {
        // [[1,1,2],[1,1,2],[1,1,2]] as one CONST group.
        let dict = Dictionary::single_tuple(vec![1.0, 1.0, 2.0]);
        let group = ColumnGroup::Const { col_indices: vec![0, 1, 2], num_rows: 3, dict };
        CompressedMatrix::new(3, 3, vec![group], false, None).unwrap()
    }

    #[test]
    fn const_matrix_aggregates_match_scenario_1() {
        let m = const_matrix_3x3();
        assert_eq!(m.aggregate_unary(AggregateOp::Sum, AggregateDirection::Full).as_scalar(), 12.0);
        assert_eq!(
            m.aggregate_unary(AggregateOp::Sum, AggregateDirection::Col).as_vector(),
            &[3.0, 3.0, 6.0]
        );
        assert_eq!(m.aggregate_unary(AggregateOp::Min, AggregateDirection::Full).as_scalar(), 1.0);
        assert_eq!(m.aggregate_unary(AggregateOp::Max, AggregateDirection::Full).as_scalar(), 2.0);
    }

    #[test]
    fn const_matrix_tsmm_matches_scenario_1() {
        let m = const_matrix_3x3();
        let tsmm = m.transpose_self_mult(1).unwrap();
        assert_eq!(tsmm.get(0, 0), 3.0);
        assert_eq!(tsmm.get(0, 2), 6.0);
        assert_eq!(tsmm.get(2, 2), 12.0);
    }

    #[test]
    fn decompress_matches_get() {
        let m = const_matrix_3x3();
        let dense = m.decompress(&CompressionConfig::default());
        for r in 0..3 {
            for c in 0..3 {
                assert_eq!(dense.get(r, c), m.get(r, c));
            }
        }
    }

    #[test]
    fn decompress_is_idempotent_via_cache() {
        let m = const_matrix_3x3();
        let first = m.decompress(&CompressionConfig::default());
        let second = m.decompress(&CompressionConfig::default());
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn scalar_op_matches_decompressed_apply() {
        let m = const_matrix_3x3();
        let scaled = m.scalar_op(ScalarOp::Multiply(2.0));
        let dense_scaled = scaled.decompress(&CompressionConfig::default());
        let dense_original = m.decompress(&CompressionConfig::default());
        for r in 0..3 {
            for c in 0..3 {
                assert_eq!(dense_scaled.get(r, c), dense_original.get(r, c) * 2.0);
            }
        }
    }

    #[test]
    fn right_mult_overlapping_matches_dense_product() {
        let m = const_matrix_3x3();
        let right = DenseBlock::from_row_major(3, 2, vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();
        let overlapped = m.right_mult_by_matrix(&right, &CompressionConfig::parallel(1).with_overlap(true)).unwrap();
        assert!(overlapped.is_overlapping());
        let expected = m.decompress(&CompressionConfig::default()).matmul(&right).unwrap();
        let got = overlapped.decompress(&CompressionConfig::default());
        assert_eq!(*got, expected);
    }

    #[test]
    fn left_mult_matches_dense_product() {
        let m = const_matrix_3x3();
        let left = DenseBlock::from_row_major(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let got = m.left_mult_by_matrix(&left, 1).unwrap();
        let expected = left.matmul(&m.decompress(&CompressionConfig::default())).unwrap();
        assert_eq!(got, expected);
    }

    #[test]
    fn slice_with_nonzero_col_lower_bound_rebases_to_local_columns() {
        // Two CONST groups over a 3x5 matrix: columns {0,1} and {2,3,4}.
        // slice(0, 2, 2, 3) should return the 3x2 block D[:, 2..=3],
        // spanning both groups, rebased onto local columns {0, 1}.
        let dict_a = Dictionary::single_tuple(vec![1.0, 2.0]);
        let group_a = ColumnGroup::Const { col_indices: vec![0, 1], num_rows: 3, dict: dict_a };
        let dict_b = Dictionary::single_tuple(vec![3.0, 4.0, 5.0]);
        let group_b = ColumnGroup::Const { col_indices: vec![2, 3, 4], num_rows: 3, dict: dict_b };
        let m = CompressedMatrix::new(3, 5, vec![group_a, group_b], false, None).unwrap();

        let sliced = m.slice(0, 2, 2, 3).unwrap();
        match sliced {
            MaybeCompressed::Compressed(sm) => {
                assert_eq!(sm.rows(), 3);
                assert_eq!(sm.cols(), 2);
                for r in 0..3 {
                    assert_eq!(sm.get(r, 0), 4.0);
                    assert_eq!(sm.get(r, 1), 5.0);
                }
                let dense = sm.decompress(&CompressionConfig::default());
                let expected = m.decompress(&CompressionConfig::default()).slice(0, 2, 2, 3).unwrap();
                assert_eq!(*dense, expected);
            }
            MaybeCompressed::Dense(_) => panic!("column-only slice should stay compressed"),
        }
    }

    #[test]
    fn contains_value_raises_on_overlapping() {
        let dict = Dictionary::single_tuple(vec![1.0, 2.0]);
        let a = ColumnGroup::Const { col_indices: vec![0, 1], num_rows: 2, dict: dict.clone() };
        let b = ColumnGroup::Const { col_indices: vec![0, 1], num_rows: 2, dict };
        let m = CompressedMatrix::new(2, 2, vec![a, b], true, None).unwrap();
        assert!(m.contains_value(1.0).is_err());
    }
}
