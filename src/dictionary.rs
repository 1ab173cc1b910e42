//! Dictionary: the table of distinct tuple values a column group
//! references (§4.1).
//!
//! A dictionary is a flat row-major buffer of `numValues * numCols`
//! doubles; value-index `k` occupies `values[k*numCols .. (k+1)*numCols]`.
//! Every operation here is pure (returns a new `Dictionary`) except the
//! read/write pair.

use crate::dense::DenseBlock;
use crate::types::{BinaryOp, Precision, ScalarOp};
use crate::utils::math;
use crate::utils::numerical::pattern_matches;
use alloc::vec;
use alloc::vec::Vec;

/// A dictionary of distinct tuple values, laid out contiguously.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dictionary {
    values: Vec<Precision>,
    num_cols: usize,
    /// True when the dictionary was built from a lossy encoder (e.g.
    /// quantization); carried through so kernels can decide whether exact
    /// equality checks (`containsValue`) are meaningful. Not otherwise
    /// interpreted by this crate.
    lossy: bool,
}

impl Dictionary {
    /// Build a dictionary from row-major tuple data; `values.len()` must
    /// be a multiple of `num_cols`.
    pub fn new(values: Vec<Precision>, num_cols: usize) -> Self {
        debug_assert_eq!(values.len() % num_cols.max(1), 0);
        Self {
            values,
            num_cols,
            lossy: false,
        }
    }

    /// Build a single-tuple dictionary (used by the `CONST` group).
    pub fn single_tuple(tuple: Vec<Precision>) -> Self {
        let num_cols = tuple.len();
        Self::new(tuple, num_cols)
    }

    pub fn with_lossy(mut self, lossy: bool) -> Self {
        self.lossy = lossy;
        self
    }

    pub fn is_lossy(&self) -> bool {
        self.lossy
    }

    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    /// Number of distinct tuples stored.
    pub fn num_values(&self) -> usize {
        if self.num_cols == 0 {
            0
        } else {
            self.values.len() / self.num_cols
        }
    }

    #[inline]
    pub fn get_value(&self, value_index: usize, col: usize) -> Precision {
        self.values[value_index * self.num_cols + col]
    }

    pub fn tuple(&self, value_index: usize) -> &[Precision] {
        &self.values[value_index * self.num_cols..(value_index + 1) * self.num_cols]
    }

    pub fn raw_values(&self) -> &[Precision] {
        &self.values
    }

    /// Reduce every scalar in the dictionary with `acc`/`fold`, e.g. sum
    /// or product over every (tuple, column) cell irrespective of how
    /// often a tuple is referenced by rows.
    pub fn aggregate<F: Fn(Precision, Precision) -> Precision>(&self, init: Precision, fold: F) -> Precision {
        self.values.iter().fold(init, |acc, &v| fold(acc, v))
    }

    /// Per-column reduction across all tuples (ignoring row counts);
    /// `acc` has length `num_cols`.
    pub fn aggregate_cols<F: Fn(Precision, Precision) -> Precision>(&self, mut acc: Vec<Precision>, fold: F) -> Vec<Precision> {
        for k in 0..self.num_values() {
            for c in 0..self.num_cols {
                acc[c] = fold(acc[c], self.get_value(k, c));
            }
        }
        acc
    }

    /// Per-tuple reduction: one value per distinct tuple, folding across
    /// that tuple's columns.
    pub fn aggregate_tuples<F: Fn(Precision, Precision) -> Precision>(&self, init: Precision, fold: F) -> Vec<Precision> {
        (0..self.num_values())
            .map(|k| self.tuple(k).iter().fold(init, |acc, &v| fold(acc, v)))
            .collect()
    }

    /// `sum(counts[k] * tuple[k].sum())` over all tuples — the
    /// counts-weighted sum exploited by `computeSum`/`computeColSums`
    /// (§4.2).
    pub fn sum(&self, counts: &[usize]) -> Precision {
        self.sum_weighted(counts, false)
    }

    pub fn sumsq(&self, counts: &[usize]) -> Precision {
        self.sum_weighted(counts, true)
    }

    fn sum_weighted(&self, counts: &[usize], square: bool) -> Precision {
        let mut total = 0.0;
        for k in 0..self.num_values() {
            let c = counts.get(k).copied().unwrap_or(0) as Precision;
            if c == 0.0 {
                continue;
            }
            let row_sum: Precision = if square {
                math::dot_product(self.tuple(k), self.tuple(k))
            } else {
                math::sum(self.tuple(k))
            };
            total += c * row_sum;
        }
        total
    }

    /// Per-tuple row sum (optionally squared), independent of counts —
    /// used by `computeRowSums`, where each row looks up its own tuple's
    /// precomputed value.
    pub fn sum_all_rows_to_double(&self, square: bool) -> Vec<Precision> {
        (0..self.num_values())
            .map(|k| {
                self.tuple(k)
                    .iter()
                    .map(|&v| if square { v * v } else { v })
                    .sum()
            })
            .collect()
    }

    /// Per-tuple product across that tuple's columns.
    pub fn product_all_rows(&self) -> Vec<Precision> {
        (0..self.num_values())
            .map(|k| self.tuple(k).iter().product())
            .collect()
    }

    /// Apply a scalar operator to every value, returning a new dictionary.
    pub fn apply(&self, op: ScalarOp) -> Dictionary {
        Dictionary {
            values: self.values.iter().map(|&v| op.apply(v)).collect(),
            num_cols: self.num_cols,
            lossy: self.lossy,
        }
    }

    /// Apply a binary operator broadcasting row vector `v` (length
    /// `num_cols`, aligned to this dictionary's `colIndices` by the
    /// caller) against every tuple.
    pub fn apply_binary_row_op(&self, op: BinaryOp, v: &[Precision], left_side: bool) -> Dictionary {
        debug_assert_eq!(v.len(), self.num_cols);
        let mut out = Vec::with_capacity(self.values.len());
        for k in 0..self.num_values() {
            for c in 0..self.num_cols {
                let tuple_val = self.get_value(k, c);
                let result = if left_side {
                    op.apply(v[c], tuple_val)
                } else {
                    op.apply(tuple_val, v[c])
                };
                out.push(result);
            }
        }
        Dictionary {
            values: out,
            num_cols: self.num_cols,
            lossy: self.lossy,
        }
    }

    /// Replace every value matching `pattern` (NaN matches NaN) with
    /// `replacement`.
    pub fn replace(&self, pattern: Precision, replacement: Precision) -> Dictionary {
        Dictionary {
            values: self
                .values
                .iter()
                .map(|&v| if pattern_matches(v, pattern) { replacement } else { v })
                .collect(),
            num_cols: self.num_cols,
            lossy: self.lossy,
        }
    }

    /// Project every tuple onto the column range `[lo, hi)`.
    pub fn slice_out_column_range(&self, lo: usize, hi: usize) -> Dictionary {
        let new_cols = hi - lo;
        let mut out = Vec::with_capacity(self.num_values() * new_cols);
        for k in 0..self.num_values() {
            out.extend_from_slice(&self.tuple(k)[lo..hi]);
        }
        Dictionary {
            values: out,
            num_cols: new_cols,
            lossy: self.lossy,
        }
    }

    /// Whether any stored tuple value equals `v` (NaN matches NaN).
    pub fn contains_value(&self, v: Precision) -> bool {
        self.values.iter().any(|&x| pattern_matches(x, v))
    }

    /// Number of non-zero cells across all rows, given each value-index's
    /// row count.
    pub fn get_number_non_zeros(&self, counts: &[usize]) -> usize {
        let mut total = 0usize;
        for k in 0..self.num_values() {
            let c = counts.get(k).copied().unwrap_or(0);
            if c == 0 {
                continue;
            }
            let nz_in_tuple = self.tuple(k).iter().filter(|&&v| v != 0.0).count();
            total += c * nz_in_tuple;
        }
        total
    }

    /// Expose the tuples as a `distinct x numCols` dense matrix view, for
    /// BLAS-style multiplies (§4.1 `asMatrixView`, §9 design note).
    pub fn as_matrix_view(&self) -> DenseBlock {
        DenseBlock::from_row_major(self.num_values(), self.num_cols, self.values.clone())
            .expect("dictionary buffer is always num_values * num_cols")
    }

    /// In-memory footprint upper bound.
    pub fn in_memory_size(&self) -> usize {
        core::mem::size_of::<Self>() + self.values.len() * core::mem::size_of::<Precision>()
    }

    /// Stable on-disk encoding: `u8 kind(0=plain), u32 nValues, f64[] values`.
    pub fn write(&self, out: &mut Vec<u8>) {
        out.push(0u8);
        out.extend_from_slice(&(self.num_values() as u32).to_le_bytes());
        out.extend_from_slice(&(self.num_cols as u32).to_le_bytes());
        for &v in &self.values {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }

    /// Inverse of [`Dictionary::write`].
    pub fn read(buf: &[u8], pos: &mut usize) -> Dictionary {
        let _kind = buf[*pos];
        *pos += 1;
        let n_values = u32::from_le_bytes(buf[*pos..*pos + 4].try_into().unwrap()) as usize;
        *pos += 4;
        let num_cols = u32::from_le_bytes(buf[*pos..*pos + 4].try_into().unwrap()) as usize;
        *pos += 4;
        let mut values = Vec::with_capacity(n_values * num_cols);
        for _ in 0..(n_values * num_cols) {
            let v = f64::from_le_bytes(buf[*pos..*pos + 8].try_into().unwrap());
            values.push(v);
            *pos += 8;
        }
        Dictionary {
            values,
            num_cols,
            lossy: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dictionary {
        // two tuples of width 3: {1,1,2} and {0,0,0}
        Dictionary::new(vec![1.0, 1.0, 2.0, 0.0, 0.0, 0.0], 3)
    }

    #[test]
    fn sum_is_counts_weighted() {
        let d = sample();
        // tuple 0 used by 3 rows, tuple 1 used by 0 rows
        assert_eq!(d.sum(&[3, 0]), 12.0);
    }

    #[test]
    fn col_sums_ignore_counts() {
        let d = sample();
        let col_sums = d.aggregate_cols(vec![0.0; 3], |a, b| a + b);
        assert_eq!(col_sums, vec![1.0, 1.0, 2.0]);
    }

    #[test]
    fn apply_scalar_preserves_shape() {
        let d = sample();
        let doubled = d.apply(ScalarOp::Multiply(2.0));
        assert_eq!(doubled.tuple(0), &[2.0, 2.0, 4.0]);
    }

    #[test]
    fn replace_matches_nan_pattern() {
        let d = Dictionary::new(vec![f64::NAN, 1.0], 1);
        let replaced = d.replace(f64::NAN, 9.0);
        assert_eq!(replaced.raw_values(), &[9.0, 1.0]);
    }

    #[test]
    fn slice_out_column_range_projects_tuples() {
        let d = sample();
        let sliced = d.slice_out_column_range(1, 3);
        assert_eq!(sliced.num_cols(), 2);
        assert_eq!(sliced.tuple(0), &[1.0, 2.0]);
    }

    #[test]
    fn serialize_round_trips() {
        let d = sample();
        let mut buf = Vec::new();
        d.write(&mut buf);
        let mut pos = 0;
        let back = Dictionary::read(&buf, &mut pos);
        assert_eq!(back, d);
        assert_eq!(pos, buf.len());
    }
}
