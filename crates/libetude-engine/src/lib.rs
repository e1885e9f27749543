//! Engine facade over the memory pool, tensor, operator registry, graph
//! execution, LEF, and LEFX crates: loads a base model, blends LEFX
//! extensions over it, and runs inference through a built graph.

mod config;
mod engine;
mod error;

pub use config::{EngineConfig, PoolSizeConfig};
pub use engine::{Engine, would_conflict};
pub use error::{EngineError, EngineResult};

pub use libetude_graph::{CancellationToken, Graph, GraphError, NodeId, OperatorParams, OperatorRegistry};
pub use libetude_lef::{FullModel, LefHeader, LefModel, ModelMeta};
pub use libetude_lefx::{ActiveExtensionInfo, DependencyType, LefxExtension, LoadedExtension};
pub use libetude_pool::{Pool, PoolKind, PoolManager, PoolManagerConfig};
pub use libetude_tensor::{DType, Shape, Tensor};
