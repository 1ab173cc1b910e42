//! The decompression cache: a single-slot weak reference to a previously
//! materialized dense form (§4.4).
//!
//! Populated by [`crate::matrix::CompressedMatrix::decompress`], cleared by
//! the serializer's dense-fallback path and by
//! [`crate::matrix::CompressedMatrix::clear_soft_reference_to_decompressed`].
//! Correctness never depends on a stored value surviving: every reader
//! tolerates a `None` fetch and recomputes.

use crate::dense::DenseBlock;

#[cfg(feature = "std")]
mod imp {
    use super::DenseBlock;
    use std::sync::{Arc, Mutex, Weak};

    /// Weakly-held cache slot, safe to share read-only across threads
    /// (§5): the mutex only ever guards a pointer swap, never the
    /// decompression work itself.
    #[derive(Debug, Default)]
    pub struct DecompressionCache {
        slot: Mutex<Weak<DenseBlock>>,
    }

    impl DecompressionCache {
        pub fn new() -> Self {
            Self { slot: Mutex::new(Weak::new()) }
        }

        /// Non-forcing fetch: returns the cached dense form iff still live.
        pub fn get(&self) -> Option<Arc<DenseBlock>> {
            self.slot.lock().unwrap().upgrade()
        }

        pub fn store(&self, dense: Arc<DenseBlock>) {
            *self.slot.lock().unwrap() = Arc::downgrade(&dense);
        }

        pub fn clear(&self) {
            *self.slot.lock().unwrap() = Weak::new();
        }
    }

    impl Clone for DecompressionCache {
        /// A clone starts with an empty slot — the cache is a pure
        /// optimization, so losing it on clone never changes the logical
        /// value of the matrix it's attached to.
        fn clone(&self) -> Self {
            Self::new()
        }
    }
}

#[cfg(not(feature = "std"))]
mod imp {
    use super::DenseBlock;
    use alloc::sync::Arc;

    /// `no_std` builds have no portable weak-pointer primitive backed by a
    /// lock; the cache degenerates to always-empty, which is a valid
    /// (if slower) implementation of "never rely on cache for correctness".
    #[derive(Debug, Default, Clone)]
    pub struct DecompressionCache;

    impl DecompressionCache {
        pub fn new() -> Self {
            Self
        }

        pub fn get(&self) -> Option<Arc<DenseBlock>> {
            None
        }

        pub fn store(&self, _dense: Arc<DenseBlock>) {}

        pub fn clear(&self) {}
    }
}

pub use imp::DecompressionCache;
