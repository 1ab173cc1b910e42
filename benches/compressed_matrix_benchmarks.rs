use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

use compressed_matrix::types::{AggregateDirection, AggregateOp};
use compressed_matrix::{ColumnGroup, CompressedMatrix, CompressionConfig, DenseBlock, Dictionary};

/// Build an `n x n` matrix of `groups_per_row` equal-width `CONST` groups,
/// a reasonable stand-in for a column-partitioned dictionary-encoded
/// dataset with low cardinality per column subset.
fn const_matrix(n: usize, groups_per_row: usize) -> CompressedMatrix {
    let group_width = (n / groups_per_row).max(1);
    let mut groups = Vec::new();
    let mut start = 0;
    while start < n {
        let end = (start + group_width).min(n);
        let col_indices: Vec<usize> = (start..end).collect();
        let tuple: Vec<f64> = col_indices.iter().map(|&c| (c as f64 * 0.5) + 1.0).collect();
        groups.push(ColumnGroup::Const {
            col_indices,
            num_rows: n,
            dict: Dictionary::single_tuple(tuple),
        });
        start = end;
    }
    CompressedMatrix::new(n, n, groups, false, None).unwrap()
}

fn benchmark_decompress(c: &mut Criterion) {
    let mut group = c.benchmark_group("decompress");
    group.measurement_time(Duration::from_secs(10));

    for &n in &[64usize, 256, 1024] {
        let m = const_matrix(n, 8);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| black_box(m.decompress(&CompressionConfig::single_threaded())));
        });
    }

    group.finish();
}

fn benchmark_aggregate_unary(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate_unary_sum");
    group.measurement_time(Duration::from_secs(10));

    for &n in &[64usize, 256, 1024] {
        let m = const_matrix(n, 8);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| black_box(m.aggregate_unary(AggregateOp::Sum, AggregateDirection::Full)));
        });
    }

    group.finish();
}

fn benchmark_right_mult_by_matrix(c: &mut Criterion) {
    let mut group = c.benchmark_group("right_mult_by_matrix");
    group.measurement_time(Duration::from_secs(15));
    group.sample_size(20);

    for &n in &[64usize, 256] {
        let m = const_matrix(n, 8);
        let right = DenseBlock::zeros(n, 16);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| black_box(m.right_mult_by_matrix(&right, &CompressionConfig::single_threaded()).unwrap()));
        });
    }

    group.finish();
}

fn benchmark_transpose_self_mult(c: &mut Criterion) {
    let mut group = c.benchmark_group("transpose_self_mult");
    group.measurement_time(Duration::from_secs(15));
    group.sample_size(20);

    for &n in &[64usize, 256] {
        let m = const_matrix(n, 8);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| black_box(m.transpose_self_mult(1).unwrap()));
        });
    }

    group.finish();
}

fn benchmark_serialize_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialize_write");
    group.measurement_time(Duration::from_secs(10));

    for &n in &[64usize, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let mut m = const_matrix(n, 8);
                let mut buf = Vec::new();
                m.write(&mut buf, &CompressionConfig::default());
                black_box(buf);
            });
        });
    }

    group.finish();
}

criterion_group!(
    compressed_matrix_benches,
    benchmark_decompress,
    benchmark_aggregate_unary,
    benchmark_right_mult_by_matrix,
    benchmark_transpose_self_mult,
    benchmark_serialize_write
);
criterion_main!(compressed_matrix_benches);
