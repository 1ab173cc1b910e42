//! Round-trip and size-adaptive fallback behavior of the persisted layout,
//! exercised from outside the crate through its public API.

use compressed_matrix::{ColumnGroup, CompressedMatrix, CompressionConfig, Dictionary};

fn small_const_matrix() -> CompressedMatrix {
    let dict = Dictionary::single_tuple(vec![1.0, 2.0, 3.0]);
    let group = ColumnGroup::Const { col_indices: vec![0, 1, 2], num_rows: 3, dict };
    CompressedMatrix::new(3, 3, vec![group], false, None).unwrap()
}

#[test]
fn compressed_layout_round_trips_without_falling_back() {
    let mut m = small_const_matrix();
    let mut buf = Vec::new();
    m.write(&mut buf, &CompressionConfig::default());

    // A 3-row CONST group is tiny on disk relative to a 3x3 dense dump, so
    // the compressed layout should be kept, not replaced by a dense group.
    assert_eq!(m.num_groups(), 1);
    assert!(matches!(m.groups()[0], ColumnGroup::Const { .. }));

    let read_back = CompressedMatrix::read(&buf).unwrap();
    assert_eq!(read_back.rows(), 3);
    assert_eq!(read_back.cols(), 3);
    assert_eq!(
        *m.decompress(&CompressionConfig::default()),
        *read_back.decompress(&CompressionConfig::default())
    );
}

#[test]
fn low_threshold_forces_dense_fallback_on_write() {
    let mut m = small_const_matrix();
    let mut buf = Vec::new();
    // A threshold of 0 means any nonzero compressed size is "too big",
    // forcing the fallback path regardless of actual encoding efficiency.
    m.write(&mut buf, &CompressionConfig::default().with_size_threshold(0.0));

    assert_eq!(m.num_groups(), 1);
    assert!(matches!(m.groups()[0], ColumnGroup::Uncompressed { .. }));
    assert!(m.get_cached_decompressed().is_none());

    let read_back = CompressedMatrix::read(&buf).unwrap();
    assert_eq!(
        *m.decompress(&CompressionConfig::default()),
        *read_back.decompress(&CompressionConfig::default())
    );
}

#[test]
fn wide_low_cardinality_matrix_falls_back_when_encoding_is_inefficient() {
    // 64 distinct single-column CONST groups over one row: per-group
    // overhead dwarfs a flat row-major dump of the same data.
    let mut groups = Vec::new();
    for c in 0..64 {
        let dict = Dictionary::single_tuple(vec![c as f64 + 0.25]);
        groups.push(ColumnGroup::Const { col_indices: vec![c], num_rows: 1, dict });
    }
    let mut m = CompressedMatrix::new(1, 64, groups, false, None).unwrap();
    m.recompute_non_zeros();

    let mut buf = Vec::new();
    m.write(&mut buf, &CompressionConfig::default());
    assert_eq!(m.num_groups(), 1);
    assert!(matches!(m.groups()[0], ColumnGroup::Uncompressed { .. }));
}

#[test]
fn unknown_nnz_round_trips_as_none_when_compressed_layout_is_kept() {
    let mut m = small_const_matrix();
    assert_eq!(m.nnz(), None);

    let mut buf = Vec::new();
    m.write(&mut buf, &CompressionConfig::default());
    // The compressed CONST encoding is small enough to be kept as-is, so
    // `write` never touches `nnz` and it stays the "unknown" sentinel.
    assert_eq!(m.nnz(), None);

    let read_back = CompressedMatrix::read(&buf).unwrap();
    assert_eq!(read_back.nnz(), None);
}
