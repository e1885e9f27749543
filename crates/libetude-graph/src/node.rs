//! Graph node bookkeeping.
//!
//! Nodes reference each other by `NodeId`, an arena index, rather than
//! by pointer — the same discipline `libetude-pool` applies to its
//! allocations (`PoolHandle` over raw pointers), extended here to graph
//! topology so the graph is trivially `Send` and free of any lifetime
//! parameter.

use std::collections::HashMap;

use libetude_tensor::Tensor;

use crate::registry::OperatorState;

/// An index into a [`crate::Graph`]'s node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Named operator attributes (kernel size, stride, epsilon, ...).
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f32),
    Bool(bool),
    Str(String),
}

/// A bag of operator attributes, keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperatorParams(pub HashMap<String, ParamValue>);

impl OperatorParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: ParamValue) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.0.get(key) {
            Some(ParamValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_float(&self, key: &str) -> Option<f32> {
        match self.0.get(key) {
            Some(ParamValue::Float(v)) => Some(*v),
            _ => None,
        }
    }
}

/// A node's execution state, advanced by the sequential/parallel
/// runners as `forward` is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Ready,
    Running,
    Completed,
    Error,
}

pub(crate) struct Node {
    pub(crate) id: NodeId,
    pub(crate) op_name: String,
    /// Predecessor node handles — the node's input tensor array, one
    /// per incoming edge, resolved to actual tensors at dispatch time
    /// via each predecessor's `outputs`.
    pub(crate) inputs: Vec<NodeId>,
    /// Downstream node handles (the reverse of `inputs`): kept to walk
    /// the graph from a node to its consumers (`remove_node`,
    /// dead-code elimination).
    pub(crate) successors: Vec<NodeId>,
    pub(crate) params: OperatorParams,
    pub(crate) state: Option<OperatorState>,
    /// The node's output tensor array, one entry per value its operator
    /// produces (a single tensor for most operators, two for `stft`'s
    /// magnitude+phase). Empty until the node has run.
    pub(crate) outputs: Vec<Tensor>,
    pub(crate) run_state: NodeState,
    pub(crate) is_input: bool,
    pub(crate) is_output: bool,
    pub(crate) execution_order: i64,
    pub(crate) removed: bool,
}
