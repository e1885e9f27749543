//! Error taxonomy for the scenario harness: every subsystem's error
//! type, plus an `Assertion` variant for scenario checks that don't map
//! to any subsystem's own failure.

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("scenario assertion failed: {0}")]
    Assertion(String),

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

    #[error("unknown scenario {0:?}")]
    UnknownScenario(String),
}

pub type HarnessResult<T> = Result<T, HarnessError>;
