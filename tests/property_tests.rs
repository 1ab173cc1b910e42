//! Property-based tests using proptest.
//!
//! These exercise the algebraic identities a compressed encoding must
//! preserve regardless of the underlying data: decompressing after a
//! kernel runs must agree with running the same operation on the already
//! decompressed matrix, for arbitrary small inputs rather than hand-picked
//! fixtures.

use proptest::prelude::*;

use compressed_matrix::colgroup::DdcMapping;
use compressed_matrix::types::{Precision, ScalarOp};
use compressed_matrix::{ColumnGroup, CompressedMatrix, CompressionConfig, Dictionary};

/// Build a `rows x cols` matrix as a single `DDC` group where every row is
/// its own dictionary tuple (row `r` maps to value-index `r`), the
/// simplest encoding that still exercises the dictionary-indirection path
/// rather than a flat dense block.
fn ddc_matrix(rows: usize, cols: usize, values: Vec<Precision>) -> CompressedMatrix {
    debug_assert_eq!(values.len(), rows * cols);
    let dict = Dictionary::new(values, cols);
    let mapping = DdcMapping::new((0..rows as u32).collect());
    let group = ColumnGroup::Ddc {
        col_indices: (0..cols).collect(),
        num_rows: rows,
        dict,
        mapping,
    };
    CompressedMatrix::new(rows, cols, vec![group], false, None).unwrap()
}

// Values are kept as small integers so every intermediate sum stays
// exactly representable in `f64`; that lets these properties assert exact
// equality instead of tolerating summation-order rounding drift between
// the compressed kernels and the dense reference path.
fn cell_values() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(-5i64..=5, 20)
}

proptest! {
    /// `decompress(scalarOp(M)) == apply(op, decompress(M))` (§8).
    #[test]
    fn scalar_multiply_commutes_with_decompress(
        rows in 1usize..=5,
        cols in 1usize..=4,
        raw in cell_values(),
        factor in -3i64..=3,
    ) {
        let values: Vec<Precision> = raw.into_iter().take(rows * cols).map(|v| v as Precision).collect();
        let m = ddc_matrix(rows, cols, values);
        let dense_before = m.decompress(&CompressionConfig::default());
        let scaled = m.scalar_op(ScalarOp::Multiply(factor as Precision));
        let dense_after = scaled.decompress(&CompressionConfig::default());

        for r in 0..rows {
            for c in 0..cols {
                prop_assert_eq!(dense_after.get(r, c), dense_before.get(r, c) * factor as Precision);
            }
        }
    }

    /// `tsmm(M) == transpose(decompress(M)) * decompress(M)` (§8).
    #[test]
    fn tsmm_matches_transpose_times_self(
        rows in 1usize..=4,
        cols in 1usize..=3,
        raw in cell_values(),
    ) {
        let values: Vec<Precision> = raw.into_iter().take(rows * cols).map(|v| v as Precision).collect();
        let m = ddc_matrix(rows, cols, values);
        let tsmm = m.transpose_self_mult(1).unwrap();
        let dense = m.decompress(&CompressionConfig::default());
        let expected = dense.transpose().matmul(&dense).unwrap();
        prop_assert_eq!(tsmm, expected);
    }

    /// Writing and reading back preserves the decompressed content no
    /// matter where the size-adaptive threshold lands the fallback
    /// decision.
    #[test]
    fn write_read_round_trip_preserves_decompressed_content(
        rows in 1usize..=4,
        cols in 1usize..=3,
        raw in cell_values(),
        threshold in 0.0f64..=4.0,
    ) {
        let values: Vec<Precision> = raw.into_iter().take(rows * cols).map(|v| v as Precision).collect();
        let mut m = ddc_matrix(rows, cols, values);
        let before = m.decompress(&CompressionConfig::default());

        let mut buf = Vec::new();
        m.write(&mut buf, &CompressionConfig::default().with_size_threshold(threshold));

        let read_back = CompressedMatrix::read(&buf).unwrap();
        let after = read_back.decompress(&CompressionConfig::default());
        prop_assert_eq!(*after, *before);
    }
}
