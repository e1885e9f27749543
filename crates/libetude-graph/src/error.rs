//! Error kinds for operator registration and graph execution.

use crate::node::NodeId;
use libetude_pool::PoolError;
use libetude_tensor::TensorError;

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum GraphError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("operator {0:?} is already registered")]
    DuplicateOperator(String),

    #[error("no operator registered under {0:?}")]
    OperatorNotFound(String),

    #[error("node {0:?} does not exist in this graph")]
    NodeNotFound(NodeId),

    #[error("graph contains a cycle reachable from node {0:?}")]
    Cycle(NodeId),

    #[error("execution was cancelled")]
    Cancelled,

    #[error("node {0:?} ({1:?}) failed during execution: {2}")]
    NodeFailed(NodeId, String, String),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Tensor(#[from] TensorError),
}

pub type GraphResult<T> = Result<T, GraphError>;
