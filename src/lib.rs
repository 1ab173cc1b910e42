//! # compressed-matrix
//!
//! A column-partitioned, dictionary-encoded compressed matrix
//! representation for numerical dataflow engines, together with the
//! linear-algebra kernels (matrix multiply, unary aggregation, scalar and
//! cell-wise operators, transpose-self-multiply) that execute directly on
//! the compressed form instead of materializing the dense matrix first.
//!
//! ## Key features
//!
//! - **Column groups**: seven encodings (`EMPTY`, `CONST`, `UNCOMPRESSED`,
//!   `DDC`, `SDC`, `RLE`, `OLE`) dispatched per column subset, each backed
//!   by a shared [`Dictionary`] of distinct row tuples.
//! - **Overlapping matrices**: column groups may cover (rather than
//!   partition) the column space, with cell values summed across every
//!   covering group — the natural output shape of a right-multiply that
//!   doesn't want to eagerly materialize its result.
//! - **Cross-group kernels**: right/left matrix multiply and
//!   transpose-self-multiply exploit the dictionary structure directly,
//!   at `O(distinct values)` rather than `O(rows)`.
//! - **Size-adaptive serialization**: falls back to a single dense group
//!   on write whenever the compressed encoding would be larger on disk.
//!
//! ## Quick start
//!
//! ```rust
//! use compressed_matrix::{CompressedMatrix, ColumnGroup, Dictionary};
//! use compressed_matrix::types::{AggregateOp, AggregateDirection};
//!
//! // [[1,1,2],[1,1,2],[1,1,2]] as a single CONST group.
//! let dict = Dictionary::single_tuple(vec![1.0, 1.0, 2.0]);
//! let group = ColumnGroup::Const { col_indices: vec![0, 1, 2], num_rows: 3, dict };
//! let m = CompressedMatrix::new(3, 3, vec![group], false, None)?;
//!
//! assert_eq!(m.aggregate_unary(AggregateOp::Sum, AggregateDirection::Full).as_scalar(), 12.0);
//! # Ok::<(), compressed_matrix::error::CompressedError>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![allow(clippy::float_cmp)] // exact comparisons are intentional throughout the dictionary/column-group code

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub use cache::DecompressionCache;
pub use colgroup::ColumnGroup;
pub use config::CompressionConfig;
pub use dense::{estimate_dense_disk_size, DenseBlock, MatrixBlock, SparseBlock};
pub use dictionary::Dictionary;
pub use error::{CompressedError, Result};
pub use kernels::{BinaryRhs, MaybeCompressed};
pub use matrix::CompressedMatrix;

pub mod cache;
pub mod colgroup;
pub mod config;
pub mod dense;
pub mod dictionary;
pub mod error;
mod kernels;
pub mod matrix;
mod serialize;
pub mod types;
mod utils;

/// Crate version, read from `Cargo.toml` at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Crate description, read from `Cargo.toml` at compile time.
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Initialize default logging for host applications embedding this crate.
///
/// Call once at startup; safe to call more than once (subsequent calls are
/// no-ops).
#[cfg(feature = "std")]
pub fn init() {
    #[cfg(feature = "env_logger")]
    env_logger::try_init().ok();
}

/// Report which optional features this build was compiled with.
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: VERSION,
        features: enabled_features(),
    }
}

/// Build configuration snapshot, mirroring the feature set active when
/// this crate was compiled.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BuildInfo {
    /// Crate version string.
    pub version: &'static str,
    /// Names of the optional features enabled in this build.
    pub features: alloc::vec::Vec<&'static str>,
}

fn enabled_features() -> alloc::vec::Vec<&'static str> {
    let mut features = alloc::vec::Vec::new();

    #[cfg(feature = "std")]
    features.push("std");

    #[cfg(feature = "serde")]
    features.push("serde");

    #[cfg(feature = "parallel")]
    features.push("parallel");

    features
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn build_info_reports_version() {
        let info = build_info();
        assert_eq!(info.version, VERSION);
    }

    #[test]
    fn version_and_description_are_nonempty() {
        assert!(!VERSION.is_empty());
        assert!(!DESCRIPTION.is_empty());
    }
}
