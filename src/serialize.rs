//! Size-adaptive persisted layout (§4.5, §6.1).
//!
//! `rows:u32, cols:u32, nnz:i64 (-1 = unknown), overlapping:u8, groupCount:u32,
//! groups...`. Before writing, the compressed size (header plus every
//! group's `disk_size`) is compared against `estimate_dense_disk_size`; if
//! the compressed form would be larger on disk, the write falls back to a
//! single `UNCOMPRESSED` group wrapping the decompressed form instead.
//! `read` accepts either layout transparently — it never needs to know
//! which one produced the bytes.

use crate::colgroup::ColumnGroup;
use crate::config::CompressionConfig;
use crate::dense::estimate_dense_disk_size;
use crate::error::Result;
use crate::matrix::CompressedMatrix;
use alloc::vec::Vec;

fn write_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn write_i64(out: &mut Vec<u8>, v: i64) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn read_u32(buf: &[u8], pos: &mut usize) -> u32 {
    let v = u32::from_le_bytes(buf[*pos..*pos + 4].try_into().unwrap());
    *pos += 4;
    v
}

fn read_i64(buf: &[u8], pos: &mut usize) -> i64 {
    let v = i64::from_le_bytes(buf[*pos..*pos + 8].try_into().unwrap());
    *pos += 8;
    v
}

const HEADER_SIZE: usize = 4 + 4 + 8 + 1 + 4;

impl CompressedMatrix {
    /// Upper bound on the compressed form's serialized byte length
    /// (header plus every group's `disk_size`), used to decide the
    /// dense-fallback write without actually encoding.
    fn size_compressed(&self) -> usize {
        HEADER_SIZE + self.groups.iter().map(ColumnGroup::disk_size).sum::<usize>()
    }

    /// Serialize to the persisted layout, falling back to a single
    /// `UNCOMPRESSED` group when the compressed form would be larger on
    /// disk than `config.compressed_size_threshold * sizeDense` (§4.5).
    /// The fallback replaces `self`'s group list in place via
    /// `allocate_col_group` (the exact lifecycle transition spec'd for
    /// "serializer when falling back to dense"), updates `nnz`, and
    /// clears the decompression cache — a writer therefore needs
    /// exclusive access to `self` (§5 thread safety), same as
    /// `recompute_non_zeros`/`allocate_col_group_list`.
    pub fn write(&mut self, out: &mut Vec<u8>, config: &CompressionConfig) {
        let size_compressed = self.size_compressed() as f64;
        let size_dense = estimate_dense_disk_size(self.rows, self.cols, self.nnz) as f64;

        if size_compressed > config.compressed_size_threshold * size_dense {
            log::debug!(
                "serializer falling back to dense layout: compressed={size_compressed} dense={size_dense} threshold={}",
                config.compressed_size_threshold
            );
            let dense = self.decompress(config);
            let nnz = dense.nnz();
            let col_indices: Vec<usize> = (0..self.cols).collect();
            let group = ColumnGroup::Uncompressed { col_indices, block: (*dense).clone() };
            self.allocate_col_group(group).expect("dense fallback group spans every column");
            self.nnz = Some(nnz);
            self.clear_soft_reference_to_decompressed();
        }

        write_u32(out, self.rows as u32);
        write_u32(out, self.cols as u32);
        write_i64(out, self.nnz.map(|n| n as i64).unwrap_or(-1));
        out.push(self.overlapping as u8);
        write_u32(out, self.groups.len() as u32);
        for g in &self.groups {
            g.write(out);
        }
    }

    /// Inverse of [`CompressedMatrix::write`]; accepts either the
    /// compressed or the dense-fallback layout transparently.
    pub fn read(buf: &[u8]) -> Result<CompressedMatrix> {
        let mut pos = 0usize;
        let rows = read_u32(buf, &mut pos) as usize;
        let cols = read_u32(buf, &mut pos) as usize;
        let nnz = read_i64(buf, &mut pos);
        let overlapping = buf[pos] != 0;
        pos += 1;
        let group_count = read_u32(buf, &mut pos) as usize;
        let mut groups = Vec::with_capacity(group_count);
        for _ in 0..group_count {
            let tag = buf[pos];
            pos += 1;
            groups.push(ColumnGroup::read(tag, buf, &mut pos));
        }
        let nnz = if nnz < 0 { None } else { Some(nnz as usize) };
        CompressedMatrix::new(rows, cols, groups, overlapping, nnz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::Dictionary;

    fn const_matrix() -> CompressedMatrix {
        let dict = Dictionary::single_tuple(alloc::vec![1.0, 1.0, 2.0]);
        let group = ColumnGroup::Const { col_indices: alloc::vec![0, 1, 2], num_rows: 3, dict };
        CompressedMatrix::new(3, 3, alloc::vec![group], false, None).unwrap()
    }

    #[test]
    fn round_trip_preserves_decompressed_content() {
        let mut m = const_matrix();
        let mut buf = Vec::new();
        m.write(&mut buf, &CompressionConfig::default());
        let read_back = CompressedMatrix::read(&buf).unwrap();
        assert_eq!(*m.decompress(&CompressionConfig::default()), *read_back.decompress(&CompressionConfig::default()));
    }

    #[test]
    fn dense_fallback_mutates_self_in_place() {
        let mut m = CompressedMatrix::zeros(1, 64);
        let mut groups = Vec::new();
        for c in 0..64 {
            let dict = Dictionary::single_tuple(alloc::vec![c as f64 + 0.5]);
            groups.push(ColumnGroup::Const { col_indices: alloc::vec![c], num_rows: 1, dict });
        }
        m.allocate_col_group_list(groups).unwrap();
        m.recompute_non_zeros();

        let mut buf = Vec::new();
        m.write(&mut buf, &CompressionConfig::default());
        assert_eq!(m.num_groups(), 1);
        assert!(matches!(m.groups()[0], ColumnGroup::Uncompressed { .. }));
        assert!(m.get_cached_decompressed().is_none());
    }

    #[test]
    fn dense_fallback_yields_single_uncompressed_group() {
        // A single-row, wide, highly distinct (no dictionary reuse) matrix
        // makes the per-group encoding larger than a flat row-major dump.
        let mut m = CompressedMatrix::zeros(1, 64);
        let mut groups = Vec::new();
        for c in 0..64 {
            let dict = Dictionary::single_tuple(alloc::vec![c as f64 + 0.5]);
            groups.push(ColumnGroup::Const { col_indices: alloc::vec![c], num_rows: 1, dict });
        }
        m.allocate_col_group_list(groups).unwrap();
        m.recompute_non_zeros();

        let mut buf = Vec::new();
        m.write(&mut buf, &CompressionConfig::default());
        let read_back = CompressedMatrix::read(&buf).unwrap();
        assert_eq!(read_back.num_groups(), 1);
        assert!(matches!(read_back.groups()[0], ColumnGroup::Uncompressed { .. }));
        assert_eq!(*m.decompress(&CompressionConfig::default()), *read_back.decompress(&CompressionConfig::default()));
    }
}

