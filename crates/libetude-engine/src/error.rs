//! Error taxonomy for the engine facade: wraps every subsystem's error
//! type plus a handful of facade-level conditions (no model loaded, no
//! graph built) that don't belong to any one subsystem.

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine runtime error: {0}")]
    Runtime(String),

    #[error(transparent)]
    Pool(#[from] libetude_pool::PoolError),

    #[error(transparent)]
    Tensor(#[from] libetude_tensor::TensorError),

    #[error(transparent)]
    Graph(#[from] libetude_graph::GraphError),

    #[error(transparent)]
    Lef(#[from] libetude_lef::LefError),

    #[error(transparent)]
    Lefx(#[from] libetude_lefx::LefxError),
}

pub type EngineResult<T> = Result<T, EngineError>;
