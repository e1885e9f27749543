//! Node DAG, operator registry, and the sequential/parallel execution
//! engines that run a graph's nodes once topologically ordered.

mod cancellation;
mod error;
mod executor;
mod graph;
mod node;
mod ops;
mod planner;
mod registry;

pub use cancellation::CancellationToken;
pub use error::{GraphError, GraphResult};
pub use graph::{Graph, OptimizeFlags, DEFAULT_PARALLEL_THRESHOLD};
pub use node::{NodeId, NodeState, OperatorParams, ParamValue};
pub use registry::{BackwardFn, CreateFn, DestroyFn, ForwardFn, OperatorDef, OperatorRegistry, OperatorState};
