//! Error kinds for tensor construction and ops.

use libetude_pool::PoolError;

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum TensorError {
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },

    #[error("axis {0} out of range for a tensor of rank {1}")]
    InvalidAxis(usize, usize),

    #[error("reshape cannot change element count: {from} elements into shape with {to} elements")]
    ElementCountMismatch { from: usize, to: usize },

    #[error("operation requires a contiguous tensor")]
    NotContiguous,

    #[error("matmul requires rank-2 tensors, got ranks {lhs} and {rhs}")]
    MatmulRankMismatch { lhs: usize, rhs: usize },

    #[error("matmul inner dimensions disagree: {lhs} vs {rhs}")]
    MatmulShapeMismatch { lhs: usize, rhs: usize },

    #[error("dtype conversion from {from:?} to {to:?} is not supported")]
    UnsupportedConversion { from: crate::dtype::DType, to: crate::dtype::DType },

    #[error(transparent)]
    Pool(#[from] PoolError),
}

pub type TensorResult<T> = Result<T, TensorError>;
