//! Compression-time knobs (§10.3).
//!
//! `CompressedMatrix` itself only holds the column groups it was built
//! with; `CompressionConfig` is the set of parameters a caller supplies to
//! the constructor helpers (parallelism, whether overlapping results are
//! allowed, the threshold the serializer uses to fall back to dense).

use crate::types::Precision;

/// Parameters governing how a compressed matrix is built and how its
/// kernels execute.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompressionConfig {
    /// Number of worker threads the `parallel` feature's kernels should
    /// target. Ignored when the `parallel` feature is disabled.
    pub parallelism: usize,
    /// Whether `rightMultByMatrix` may produce an overlapping result
    /// instead of eagerly materializing a dense output.
    pub allow_overlap: bool,
    /// Serializer fallback threshold: a compressed representation is
    /// written as-is when `sizeCompressed <= threshold * estimateDenseDiskSize`,
    /// and as a single dense group otherwise.
    pub compressed_size_threshold: Precision,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            parallelism: 1,
            allow_overlap: true,
            compressed_size_threshold: 1.0,
        }
    }
}

impl CompressionConfig {
    /// Single-threaded, non-overlapping configuration — the safest
    /// default for callers that don't care about peak throughput.
    pub fn single_threaded() -> Self {
        Self {
            parallelism: 1,
            allow_overlap: false,
            compressed_size_threshold: 1.0,
        }
    }

    /// Configuration tuned for throughput: `n`-way parallelism and
    /// overlapping right-multiply results allowed.
    pub fn parallel(n: usize) -> Self {
        Self {
            parallelism: n.max(1),
            allow_overlap: true,
            compressed_size_threshold: 1.0,
        }
    }

    pub fn with_overlap(mut self, allow_overlap: bool) -> Self {
        self.allow_overlap = allow_overlap;
        self
    }

    pub fn with_size_threshold(mut self, threshold: Precision) -> Self {
        self.compressed_size_threshold = threshold;
        self
    }
}
