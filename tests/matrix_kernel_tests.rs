//! End-to-end tests exercising `CompressedMatrix` through its public API,
//! across multiple column-group encodings at once.

use compressed_matrix::types::{AggregateDirection, AggregateOp, BinaryOp, ScalarOp};
use compressed_matrix::{ColumnGroup, CompressedMatrix, CompressionConfig, Dictionary, MaybeCompressed};

/// A 4x5 matrix split across a `CONST` group (columns 0-1), a `DDC` group
/// (columns 2-3) and an `UNCOMPRESSED` group (column 4), matching what a
/// planner mixing encodings per column subset would actually produce.
fn mixed_matrix() -> CompressedMatrix {
    use compressed_matrix::DenseBlock;
    use compressed_matrix::colgroup::DdcMapping;

    let const_group = ColumnGroup::Const {
        col_indices: vec![0, 1],
        num_rows: 4,
        dict: Dictionary::single_tuple(vec![7.0, 7.0]),
    };

    // Two distinct tuples over columns {2, 3}: {1,2} for rows 0/2, {3,4} for rows 1/3.
    let ddc_dict = Dictionary::new(vec![1.0, 2.0, 3.0, 4.0], 2);
    let ddc_group = ColumnGroup::Ddc {
        col_indices: vec![2, 3],
        num_rows: 4,
        dict: ddc_dict,
        mapping: DdcMapping::new(vec![0, 1, 0, 1]),
    };

    let block = DenseBlock::from_row_major(4, 1, vec![10.0, 0.0, 0.0, 20.0]).unwrap();
    let dense_group = ColumnGroup::Uncompressed {
        col_indices: vec![4],
        block,
    };

    CompressedMatrix::new(4, 5, vec![const_group, ddc_group, dense_group], false, None).unwrap()
}

#[test]
fn mixed_matrix_get_matches_expected_values() {
    let m = mixed_matrix();
    assert_eq!(m.get(0, 0), 7.0);
    assert_eq!(m.get(0, 2), 1.0);
    assert_eq!(m.get(1, 2), 3.0);
    assert_eq!(m.get(0, 4), 10.0);
    assert_eq!(m.get(1, 4), 0.0);
}

#[test]
fn mixed_matrix_decompress_matches_get_everywhere() {
    let m = mixed_matrix();
    let dense = m.decompress(&CompressionConfig::default());
    for r in 0..4 {
        for c in 0..5 {
            assert_eq!(dense.get(r, c), m.get(r, c));
        }
    }
}

#[test]
fn mixed_matrix_full_sum_matches_decompressed_sum() {
    let m = mixed_matrix();
    let expected = m.decompress(&CompressionConfig::default()).sum();
    assert_eq!(m.aggregate_unary(AggregateOp::Sum, AggregateDirection::Full).as_scalar(), expected);
}

#[test]
fn mixed_matrix_col_sums_match_decompressed_reference() {
    let m = mixed_matrix();
    let dense = m.decompress(&CompressionConfig::default());
    let got = m.aggregate_unary(AggregateOp::Sum, AggregateDirection::Col);
    for c in 0..5 {
        let expected: f64 = (0..4).map(|r| dense.get(r, c)).sum();
        assert_eq!(got.as_vector()[c], expected);
    }
}

#[test]
fn mixed_matrix_scalar_op_then_decompress_matches_dense_scalar_op() {
    let m = mixed_matrix();
    let dense_before = m.decompress(&CompressionConfig::default());
    let scaled = m.scalar_op(ScalarOp::Multiply(3.0));
    let dense_after = scaled.decompress(&CompressionConfig::default());
    for r in 0..4 {
        for c in 0..5 {
            assert_eq!(dense_after.get(r, c), dense_before.get(r, c) * 3.0);
        }
    }
}

#[test]
fn mixed_matrix_right_mult_matches_dense_product() {
    use compressed_matrix::DenseBlock;
    let m = mixed_matrix();
    let right = DenseBlock::from_row_major(5, 2, vec![1.0, 0.5, 0.0, 1.0, 2.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();
    let product = m.right_mult_by_matrix(&right, &CompressionConfig::single_threaded()).unwrap();
    let expected = m.decompress(&CompressionConfig::default()).matmul(&right).unwrap();
    let got = product.decompress(&CompressionConfig::default());
    assert_eq!(*got, expected);
}

#[test]
fn mixed_matrix_tsmm_matches_dense_reference() {
    let m = mixed_matrix();
    let tsmm = m.transpose_self_mult(1).unwrap();
    let dense = m.decompress(&CompressionConfig::default());
    let expected = dense.transpose().matmul(&dense).unwrap();
    assert_eq!(tsmm, expected);
}

#[test]
fn mixed_matrix_column_slice_stays_compressed_and_rebases() {
    let m = mixed_matrix();
    let sliced = m.slice(0, 3, 2, 4).unwrap();
    match sliced {
        MaybeCompressed::Compressed(sm) => {
            assert_eq!(sm.cols(), 3);
            let expected = m.decompress(&CompressionConfig::default()).slice(0, 3, 2, 4).unwrap();
            let got = sm.decompress(&CompressionConfig::default());
            assert_eq!(*got, expected);
        }
        MaybeCompressed::Dense(_) => panic!("pure column slice should stay compressed"),
    }
}

#[test]
fn mixed_matrix_row_restricted_slice_decompresses() {
    let m = mixed_matrix();
    let sliced = m.slice(1, 2, 0, 4).unwrap();
    assert!(!sliced.is_compressed());
    let expected = m.decompress(&CompressionConfig::default()).slice(1, 2, 0, 4).unwrap();
    assert_eq!(sliced.to_dense(), expected);
}

#[test]
fn mixed_matrix_append_cbind_preserves_both_halves() {
    let m = mixed_matrix();
    let rhs = mixed_matrix();
    let joined = m.append_cbind(&rhs).unwrap();
    assert_eq!(joined.cols(), 10);
    let dense = joined.decompress(&CompressionConfig::default());
    let m_dense = m.decompress(&CompressionConfig::default());
    for r in 0..4 {
        for c in 0..5 {
            assert_eq!(dense.get(r, c), m_dense.get(r, c));
            assert_eq!(dense.get(r, c + 5), m_dense.get(r, c));
        }
    }
}

#[test]
fn mixed_matrix_binary_cell_op_row_vector_matches_dense() {
    let m = mixed_matrix();
    let v = vec![1.0, 2.0, 3.0, 4.0, 5.0];
    let result = m
        .binary_cell_op(BinaryOp::Add, compressed_matrix::BinaryRhs::RowVector(&v), false)
        .unwrap();
    let dense = m.decompress(&CompressionConfig::default());
    let got = result.to_dense();
    for r in 0..4 {
        for c in 0..5 {
            assert_eq!(got.get(r, c), dense.get(r, c) + v[c]);
        }
    }
}

#[test]
fn mixed_matrix_contains_value_finds_tuple_and_dense_cells() {
    let m = mixed_matrix();
    assert!(m.contains_value(7.0).unwrap());
    assert!(m.contains_value(20.0).unwrap());
    assert!(!m.contains_value(999.0).unwrap());
}

#[test]
fn overlapping_matrix_right_mult_sums_group_contributions() {
    use compressed_matrix::DenseBlock;
    let dict_a = Dictionary::single_tuple(vec![1.0, 1.0]);
    let dict_b = Dictionary::single_tuple(vec![2.0, 2.0]);
    let a = ColumnGroup::Const { col_indices: vec![0, 1], num_rows: 2, dict: dict_a };
    let b = ColumnGroup::Const { col_indices: vec![0, 1], num_rows: 2, dict: dict_b };
    let m = CompressedMatrix::new(2, 2, vec![a, b], true, None).unwrap();
    assert!(m.is_overlapping());

    let right = DenseBlock::from_row_major(2, 1, vec![1.0, 1.0]).unwrap();
    let product = m.right_mult_by_matrix(&right, &CompressionConfig::parallel(1).with_overlap(false)).unwrap();
    assert!(!product.is_overlapping());
    let dense = product.decompress(&CompressionConfig::default());
    // each row is (1+2) summed contributions times 2 implicit cols
    assert_eq!(dense.get(0, 0), 6.0);
}
