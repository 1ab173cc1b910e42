//! Common types and type aliases used throughout the compressed matrix crate.
//!
//! This module defines the scalar precision, the operator vocabulary shared
//! between dictionaries, column groups and the dense fallback path, and the
//! small value types returned by aggregate kernels.

use alloc::vec::Vec;

/// Floating-point precision type.
///
/// Fixed to f64, matching the host dataflow engine's cell representation.
pub type Precision = f64;

/// Integer type used for row/value-index bookkeeping inside column groups.
pub type IndexType = u32;

/// Type for matrix/vector dimensions.
pub type DimensionType = usize;

/// Pointwise operators applied to every value of a dictionary (or dense
/// block) independent of position: `scalarOperation` in the component
/// design.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScalarOp {
    /// `v + c`
    Add(Precision),
    /// `v - c`
    Subtract(Precision),
    /// `c - v`
    SubtractReverse(Precision),
    /// `v * c`
    Multiply(Precision),
    /// `v / c`
    Divide(Precision),
    /// `c / v`
    DivideReverse(Precision),
    /// `v ^ c`
    Power(Precision),
    /// `max(v, c)`
    Max(Precision),
    /// `min(v, c)`
    Min(Precision),
    /// `abs(v)`
    Abs,
    /// Unconditional replacement with `c` (used by `replace`-style rewrites).
    Constant(Precision),
}

impl ScalarOp {
    /// Apply the operator to a single value.
    pub fn apply(&self, v: Precision) -> Precision {
        match *self {
            ScalarOp::Add(c) => v + c,
            ScalarOp::Subtract(c) => v - c,
            ScalarOp::SubtractReverse(c) => c - v,
            ScalarOp::Multiply(c) => v * c,
            ScalarOp::Divide(c) => v / c,
            ScalarOp::DivideReverse(c) => c / v,
            ScalarOp::Power(c) => v.powf(c),
            ScalarOp::Max(c) => v.max(c),
            ScalarOp::Min(c) => v.min(c),
            ScalarOp::Abs => v.abs(),
            ScalarOp::Constant(c) => c,
        }
    }

    /// Whether `op(0) == 0`, i.e. the operator preserves an implicit zero
    /// default. Column groups use this to decide whether a sparse default
    /// value can remain implicit after the operator is applied.
    pub fn preserves_zero(&self) -> bool {
        self.apply(0.0) == 0.0
    }
}

/// Pointwise binary operators, used for cell-wise matrix ops and for the
/// row-vector broadcast path (`binaryRowOp`).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Equal,
    NotEqual,
}

impl BinaryOp {
    /// Apply the operator to a pair of values.
    pub fn apply(&self, a: Precision, b: Precision) -> Precision {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Subtract => a - b,
            BinaryOp::Multiply => a * b,
            BinaryOp::Divide => a / b,
            BinaryOp::LessThan => bool_to_cell(a < b),
            BinaryOp::LessEqual => bool_to_cell(a <= b),
            BinaryOp::GreaterThan => bool_to_cell(a > b),
            BinaryOp::GreaterEqual => bool_to_cell(a >= b),
            BinaryOp::Equal => bool_to_cell(a == b),
            BinaryOp::NotEqual => bool_to_cell(a != b),
        }
    }

    /// Whether `op(0, 0) == 0`, used the same way as [`ScalarOp::preserves_zero`].
    pub fn preserves_zero(&self) -> bool {
        self.apply(0.0, 0.0) == 0.0
    }
}

fn bool_to_cell(b: bool) -> Precision {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Unary aggregate operators supported directly on the compressed
/// representation without decompressing (§4.3 `aggregateUnary`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AggregateOp {
    Sum,
    SumSquares,
    Mean,
    Min,
    Max,
    Product,
}

/// The axis an aggregate reduces over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AggregateDirection {
    /// Reduce to a single scalar.
    Full,
    /// Reduce each row to a scalar (one value per row).
    Row,
    /// Reduce each column to a scalar (one value per column).
    Col,
}

/// Result of a unary aggregate: either a single scalar or a per-row/per-column vector.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AggregateResult {
    Scalar(Precision),
    Vector(Vec<Precision>),
}

impl AggregateResult {
    /// Unwrap a scalar result, panicking if this is a vector. Only used in
    /// call sites that already know the direction was `Full`.
    pub fn as_scalar(&self) -> Precision {
        match self {
            AggregateResult::Scalar(v) => *v,
            AggregateResult::Vector(_) => {
                panic!("aggregate result is a vector, not a scalar")
            }
        }
    }

    pub fn as_vector(&self) -> &[Precision] {
        match self {
            AggregateResult::Vector(v) => v,
            AggregateResult::Scalar(_) => panic!("aggregate result is a scalar, not a vector"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_op_preserves_zero() {
        assert!(ScalarOp::Multiply(5.0).preserves_zero());
        assert!(!ScalarOp::Add(1.0).preserves_zero());
        assert!(ScalarOp::Max(-1.0).preserves_zero());
        assert!(!ScalarOp::Max(1.0).preserves_zero());
    }

    #[test]
    fn binary_op_preserves_zero() {
        assert!(BinaryOp::Add.preserves_zero());
        assert!(BinaryOp::Multiply.preserves_zero());
        assert!(!BinaryOp::Equal.preserves_zero());
    }
}
