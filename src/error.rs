//! Error types for the compressed matrix crate.
//!
//! This module defines every error condition a compressed matrix operation
//! can raise, per the error model in §6.3/§7 of the design: read paths
//! either succeed or raise one of these variants, and decompression
//! fallback is never an error (it is merely logged at debug level).

use core::fmt;
use alloc::string::String;

/// Result type alias for compressed matrix operations.
pub type Result<T> = core::result::Result<T, CompressedError>;

/// Errors raised by compressed matrix and column group operations.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CompressedError {
    /// The operation requires a non-overlapping matrix, or a specific
    /// column-group variant, and the precondition does not hold.
    InvalidState {
        /// Description of the required state.
        message: String,
    },

    /// Operand shapes are incompatible for the requested operation.
    DimensionMismatch {
        expected: (DimensionType, DimensionType),
        actual: (DimensionType, DimensionType),
        operation: String,
    },

    /// An out-of-range or otherwise invalid caller-supplied argument.
    InvalidArgument {
        message: String,
        parameter: Option<String>,
    },

    /// Neither the compressed nor the decompressed path implements this
    /// operation (e.g. overlapping `containsValue`, per the open question
    /// in §9).
    Unsupported { operation: String },

    /// Caller attempted a mutating/low-level API invalid for a
    /// build-once, read-many compressed matrix (reset/init/copy/
    /// appendValue/allocateDenseBlock).
    CompressedMatrixMisuse { operation: String },

    /// Failure reading or writing the persisted layout (§6.1).
    #[cfg(feature = "std")]
    IoError { message: String, context: String },
}

use crate::types::DimensionType;

impl fmt::Display for CompressedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressedError::InvalidState { message } => {
                write!(f, "invalid state: {}", message)
            }
            CompressedError::DimensionMismatch {
                expected,
                actual,
                operation,
            } => write!(
                f,
                "dimension mismatch in {}: expected {:?}, got {:?}",
                operation, expected, actual
            ),
            CompressedError::InvalidArgument { message, parameter } => match parameter {
                Some(p) => write!(f, "invalid argument '{}': {}", p, message),
                None => write!(f, "invalid argument: {}", message),
            },
            CompressedError::Unsupported { operation } => {
                write!(f, "operation '{}' is not supported", operation)
            }
            CompressedError::CompressedMatrixMisuse { operation } => write!(
                f,
                "'{}' is not valid on a compressed matrix; decompress first",
                operation
            ),
            #[cfg(feature = "std")]
            CompressedError::IoError { message, context } => {
                write!(f, "I/O error in {}: {}", context, message)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CompressedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for CompressedError {
    fn from(err: std::io::Error) -> Self {
        CompressedError::IoError {
            message: err.to_string(),
            context: "compressed matrix serialization".into(),
        }
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn display_messages_are_human_readable() {
        let err = CompressedError::DimensionMismatch {
            expected: (3, 3),
            actual: (3, 4),
            operation: "tsmm".into(),
        };
        assert!(err.to_string().contains("tsmm"));

        let err = CompressedError::Unsupported {
            operation: "containsValue(overlapping)".into(),
        };
        assert!(err.to_string().contains("not supported"));
    }
}
