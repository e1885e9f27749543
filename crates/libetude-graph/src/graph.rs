//! The node DAG: mutation, topological sort, and the execution entry
//! points that dispatch to the sequential or parallel runner.

use std::sync::Arc;

use libetude_pool::Pool;
use libetude_tensor::Tensor;
use parking_lot::Mutex;

use crate::cancellation::CancellationToken;
use crate::error::{GraphError, GraphResult};
use crate::executor::{run_parallel, run_sequential};
use crate::node::{Node, NodeId, NodeState, OperatorParams};
use crate::planner::{self, MemoryPlan};
use crate::registry::OperatorRegistry;

/// A graph runs the sequential runner at or below this many live
/// (non-removed) nodes, and the parallel runner above it.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4;

/// Optimization passes `Graph::optimize` applies. Every flag defaults
/// to on; a v1 pass may be a structural no-op (still validated against
/// the graph) without the API needing to change later.
#[derive(Debug, Clone, Copy)]
pub struct OptimizeFlags {
    pub operator_fusion: bool,
    pub dead_code_elimination: bool,
    pub memory_access_reordering: bool,
}

impl Default for OptimizeFlags {
    fn default() -> Self {
        Self { operator_fusion: true, dead_code_elimination: true, memory_access_reordering: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

pub struct Graph {
    name: String,
    nodes: Vec<Node>,
    pool: Arc<Mutex<Pool>>,
    registry: Arc<OperatorRegistry>,
    order: Vec<NodeId>,
    is_sorted: bool,
    is_optimized: bool,
    parallel_threshold: usize,
    last_plan: Option<MemoryPlan>,
}

impl Graph {
    /// Creates an empty graph owning a freshly allocated pool of
    /// `pool_size` bytes, aligned to `alignment`.
    pub fn create(name: impl Into<String>, registry: Arc<OperatorRegistry>, pool_size: usize, alignment: u32) -> GraphResult<Graph> {
        let pool = Pool::create(pool_size, alignment)?;
        Ok(Graph {
            name: name.into(),
            nodes: Vec::new(),
            pool: Arc::new(Mutex::new(pool)),
            registry,
            order: Vec::new(),
            is_sorted: false,
            is_optimized: false,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            last_plan: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pool(&self) -> Arc<Mutex<Pool>> {
        Arc::clone(&self.pool)
    }

    pub fn is_sorted(&self) -> bool {
        self.is_sorted
    }

    pub fn is_optimized(&self) -> bool {
        self.is_optimized
    }

    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.removed).count()
    }

    pub fn set_parallel_threshold(&mut self, threshold: usize) {
        self.parallel_threshold = threshold;
    }

    fn node(&self, id: NodeId) -> GraphResult<&Node> {
        self.nodes.get(id.index()).filter(|n| !n.removed).ok_or(GraphError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> GraphResult<&mut Node> {
        let exists = self.nodes.get(id.index()).map(|n| !n.removed).unwrap_or(false);
        if !exists {
            return Err(GraphError::NodeNotFound(id));
        }
        Ok(&mut self.nodes[id.index()])
    }

    /// Adds a node computing `op_name` over `inputs` (each must already
    /// exist). Fails if `op_name` is not registered.
    pub fn add_node(&mut self, op_name: impl Into<String>, inputs: Vec<NodeId>, params: OperatorParams) -> GraphResult<NodeId> {
        let op_name = op_name.into();
        if self.registry.find(&op_name).is_none() {
            return Err(GraphError::OperatorNotFound(op_name));
        }
        for &pred in &inputs {
            self.node(pred)?;
        }

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            id,
            op_name,
            inputs: inputs.clone(),
            successors: Vec::new(),
            params,
            state: None,
            outputs: Vec::new(),
            run_state: NodeState::Ready,
            is_input: false,
            is_output: false,
            execution_order: -1,
            removed: false,
        });
        for pred in inputs {
            self.nodes[pred.index()].successors.push(id);
        }
        self.is_sorted = false;
        Ok(id)
    }

    pub fn mark_input(&mut self, id: NodeId) -> GraphResult<()> {
        self.node_mut(id)?.is_input = true;
        Ok(())
    }

    pub fn mark_output(&mut self, id: NodeId) -> GraphResult<()> {
        self.node_mut(id)?.is_output = true;
        Ok(())
    }

    pub fn input_nodes(&self) -> Vec<NodeId> {
        self.nodes.iter().filter(|n| !n.removed && n.is_input).map(|n| n.id).collect()
    }

    pub fn output_nodes(&self) -> Vec<NodeId> {
        self.nodes.iter().filter(|n| !n.removed && n.is_output).map(|n| n.id).collect()
    }

    /// Adds an edge `src -> dst` (`src` becomes one of `dst`'s inputs).
    pub fn connect(&mut self, src: NodeId, dst: NodeId) -> GraphResult<()> {
        self.node(src)?;
        self.node(dst)?;
        if !self.nodes[dst.index()].inputs.contains(&src) {
            self.nodes[dst.index()].inputs.push(src);
            self.nodes[src.index()].successors.push(dst);
        }
        self.is_sorted = false;
        Ok(())
    }

    pub fn disconnect(&mut self, src: NodeId, dst: NodeId) -> GraphResult<()> {
        self.node(src)?;
        self.node(dst)?;
        self.nodes[dst.index()].inputs.retain(|&p| p != src);
        self.nodes[src.index()].successors.retain(|&s| s != dst);
        self.is_sorted = false;
        Ok(())
    }

    /// Disconnects every incident edge, then tombstones the node. Its
    /// `NodeId` is never reused.
    pub fn remove_node(&mut self, id: NodeId) -> GraphResult<()> {
        self.node(id)?;
        let preds = self.nodes[id.index()].inputs.clone();
        let succs = self.nodes[id.index()].successors.clone();
        for p in preds {
            self.nodes[p.index()].successors.retain(|&s| s != id);
        }
        for s in succs {
            self.nodes[s.index()].inputs.retain(|&p| p != id);
        }
        let node = &mut self.nodes[id.index()];
        node.inputs.clear();
        node.successors.clear();
        node.outputs.clear();
        node.removed = true;
        self.is_sorted = false;
        Ok(())
    }

    /// Three-color DFS producing a reverse-postorder (dependency-first)
    /// node list. A node revisited while still `Gray` (in-progress)
    /// indicates a cycle.
    pub fn topological_sort(&mut self) -> GraphResult<()> {
        let n = self.nodes.len();
        let mut color = vec![Color::White; n];
        let mut order = Vec::with_capacity(n);

        for start in 0..n {
            if self.nodes[start].removed || color[start] != Color::White {
                continue;
            }
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            color[start] = Color::Gray;
            while let Some(&(node_idx, pred_cursor)) = stack.last() {
                let pred_count = self.nodes[node_idx].inputs.len();
                if pred_cursor < pred_count {
                    let pred = self.nodes[node_idx].inputs[pred_cursor].index();
                    stack.last_mut().unwrap().1 += 1;
                    match color[pred] {
                        Color::White => {
                            color[pred] = Color::Gray;
                            stack.push((pred, 0));
                        }
                        Color::Gray => {
                            return Err(GraphError::Cycle(NodeId(pred as u32)));
                        }
                        Color::Black => {}
                    }
                } else {
                    color[node_idx] = Color::Black;
                    order.push(NodeId(node_idx as u32));
                    stack.pop();
                }
            }
        }

        for (step, &id) in order.iter().enumerate() {
            self.nodes[id.index()].execution_order = step as i64;
        }
        self.order = order;
        self.is_sorted = true;
        Ok(())
    }

    /// Failure-safe: any internal error (there shouldn't be one) is
    /// reported as `true`, matching spec's "assume cyclic if unsure".
    pub fn has_cycle(&self) -> bool {
        let n = self.nodes.len();
        let mut color = vec![Color::White; n];
        for start in 0..n {
            if self.nodes[start].removed || color[start] != Color::White {
                continue;
            }
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            color[start] = Color::Gray;
            while let Some(&(node_idx, pred_cursor)) = stack.last() {
                let pred_count = self.nodes[node_idx].inputs.len();
                if pred_cursor < pred_count {
                    let pred = self.nodes[node_idx].inputs[pred_cursor].index();
                    stack.last_mut().unwrap().1 += 1;
                    match color.get(pred) {
                        Some(Color::White) => {
                            color[pred] = Color::Gray;
                            stack.push((pred, 0));
                        }
                        Some(Color::Gray) => return true,
                        Some(Color::Black) => {}
                        None => return true,
                    }
                } else {
                    color[node_idx] = Color::Black;
                    stack.pop();
                }
            }
        }
        false
    }

    /// No-op structural passes in v1 (operator fusion, dead-code
    /// elimination, memory-access reordering) behind a stable API;
    /// dead-code elimination does remove nodes with no path to any
    /// output, since that one is cheap and safe to actually perform.
    pub fn optimize(&mut self, flags: OptimizeFlags) -> GraphResult<()> {
        if flags.dead_code_elimination {
            self.eliminate_dead_nodes()?;
        }
        self.is_optimized = true;
        self.is_sorted = false;
        Ok(())
    }

    fn eliminate_dead_nodes(&mut self) -> GraphResult<()> {
        let outputs = self.output_nodes();
        if outputs.is_empty() {
            return Ok(());
        }
        let n = self.nodes.len();
        let mut live = vec![false; n];
        let mut stack: Vec<NodeId> = outputs;
        while let Some(id) = stack.pop() {
            if live[id.index()] {
                continue;
            }
            live[id.index()] = true;
            for &pred in &self.nodes[id.index()].inputs.clone() {
                stack.push(pred);
            }
        }
        for idx in 0..n {
            if !self.nodes[idx].removed && !live[idx] {
                self.remove_node(NodeId(idx as u32))?;
            }
        }
        Ok(())
    }

    fn reset_states(&mut self) {
        for node in &mut self.nodes {
            if node.removed {
                continue;
            }
            node.run_state = NodeState::Ready;
            if !node.is_input {
                node.outputs.clear();
            }
        }
    }

    fn bind_inputs(&mut self, inputs: &[Tensor]) -> GraphResult<()> {
        let input_ids = self.input_nodes();
        if input_ids.len() != inputs.len() {
            return Err(GraphError::InvalidParameter("execute: input count does not match the graph's input node count"));
        }
        for (id, tensor) in input_ids.into_iter().zip(inputs) {
            let node = &mut self.nodes[id.index()];
            node.outputs = vec![tensor.clone()];
            node.run_state = NodeState::Completed;
        }
        Ok(())
    }

    /// Flattens every output node's tensor array, in declaration order —
    /// a multi-output output node (e.g. `stft`) contributes all of its
    /// tensors in sequence.
    fn collect_outputs(&self) -> GraphResult<Vec<Tensor>> {
        let mut out = Vec::new();
        for id in self.output_nodes() {
            let node = &self.nodes[id.index()];
            if node.outputs.is_empty() {
                return Err(GraphError::NodeNotFound(id));
            }
            out.extend(node.outputs.iter().cloned());
        }
        Ok(out)
    }

    fn update_plan(&mut self) {
        let order = self.order.clone();
        let plan = planner::plan(
            &order,
            |id| self.nodes[id.index()].inputs.clone(),
            |id| self.nodes[id.index()].outputs.iter().map(|t| t.dtype().bytes_for(t.numel())).sum(),
        );
        self.last_plan = Some(plan);
    }

    /// The peak concurrent live-memory estimate from the most recent
    /// run, if one has completed. The planner works retrospectively
    /// (see `planner` module docs) — there is no generic shape-inference
    /// pass to size the pool before a first execution, so sizing ahead
    /// of time is a caller decision informed by this number, not
    /// something `execute` does automatically.
    pub fn last_peak_bytes(&self) -> Option<usize> {
        self.last_plan.as_ref().map(|p| p.peak_bytes)
    }

    fn prepare(&mut self) -> GraphResult<()> {
        if !self.is_sorted {
            self.topological_sort()?;
        }
        self.reset_states();
        Ok(())
    }

    /// Runs every non-input node in the graph, in dependency order, and
    /// returns the output nodes' tensors in declaration order.
    pub fn execute(&mut self, inputs: &[Tensor]) -> GraphResult<Vec<Tensor>> {
        self.execute_with_cancellation(inputs, &CancellationToken::new())
    }

    pub fn execute_with_cancellation(&mut self, inputs: &[Tensor], cancel: &CancellationToken) -> GraphResult<Vec<Tensor>> {
        self.prepare()?;
        self.bind_inputs(inputs)?;

        let live = self.node_count();
        let order = self.order.clone();
        if live > self.parallel_threshold {
            run_parallel(&mut self.nodes, &order, &self.registry, default_worker_count(), cancel)?;
        } else {
            run_sequential(&mut self.nodes, &order, &self.registry, cancel)?;
        }

        self.update_plan();
        self.collect_outputs()
    }

    /// Runs in topological order and stops after `target`, returning its
    /// output tensor array (most operators produce one tensor; `stft`
    /// and other multi-output operators produce more). Nodes after
    /// `target` are left `Ready`.
    pub fn execute_until_node(&mut self, target: NodeId, inputs: &[Tensor]) -> GraphResult<Vec<Tensor>> {
        self.node(target)?;
        self.prepare()?;
        self.bind_inputs(inputs)?;

        let full_order = self.order.clone();
        let cutoff = full_order.iter().position(|&id| id == target).ok_or(GraphError::NodeNotFound(target))?;
        let prefix: Vec<NodeId> = full_order[..=cutoff].to_vec();

        run_sequential(&mut self.nodes, &prefix, &self.registry, &CancellationToken::new())?;
        let outputs = &self.nodes[target.index()].outputs;
        if outputs.is_empty() {
            return Err(GraphError::NodeNotFound(target));
        }
        Ok(outputs.clone())
    }

    /// Forces the parallel runner with exactly `num_threads` workers,
    /// regardless of `parallel_threshold`.
    pub fn execute_parallel_explicit(&mut self, inputs: &[Tensor], num_threads: usize) -> GraphResult<Vec<Tensor>> {
        self.prepare()?;
        self.bind_inputs(inputs)?;
        let order = self.order.clone();
        run_parallel(&mut self.nodes, &order, &self.registry, num_threads.max(1), &CancellationToken::new())?;
        self.update_plan();
        self.collect_outputs()
    }
}

/// `min(available_parallelism, 8)`, the default worker count when the
/// caller doesn't force one via `execute_parallel_explicit`.
fn default_worker_count() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1).min(8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use libetude_tensor::{DType, Shape};

    fn test_graph(threshold: usize) -> Graph {
        let registry = Arc::new(OperatorRegistry::with_builtins());
        let mut g = Graph::create("test", registry, 1 << 20, 32).unwrap();
        g.set_parallel_threshold(threshold);
        g
    }

    #[test]
    fn s5_graph_execute_scenario() {
        // input -> Linear -> Attention -> output, with a second input
        // feeding Attention (as the key/value source).
        let mut g = test_graph(100); // force sequential for this test
        let input = g.add_node("linear", vec![], OperatorParams::new()).unwrap();
        g.mark_input(input).unwrap();
        let kv_input = g.add_node("linear", vec![], OperatorParams::new()).unwrap();
        g.mark_input(kv_input).unwrap();

        let weight_input = g.add_node("linear", vec![], OperatorParams::new()).unwrap();
        g.mark_input(weight_input).unwrap();

        let linear = g.add_node("linear", vec![input, weight_input], OperatorParams::new()).unwrap();
        let attention = g.add_node("attention", vec![linear, kv_input, kv_input], OperatorParams::new()).unwrap();
        g.mark_output(attention).unwrap();

        let pool = g.pool();
        let x = Tensor::zeros(Arc::clone(&pool), Shape::new(vec![1, 4]), DType::Float32).unwrap();
        let weight = Tensor::zeros(Arc::clone(&pool), Shape::new(vec![4, 4]), DType::Float32).unwrap();
        for i in 0..4 {
            weight.set_f32(&[i, i], 1.0); // identity, so linear(x) == x
        }
        let kv = Tensor::zeros(Arc::clone(&pool), Shape::new(vec![2, 4]), DType::Float32).unwrap();

        let outputs = g.execute(&[x, kv, weight]).unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].shape().dims(), &[1, 4]);
        assert_eq!(g.nodes[linear.index()].run_state, NodeState::Completed);
        assert_eq!(g.nodes[attention.index()].run_state, NodeState::Completed);
        assert!(g.nodes[linear.index()].execution_order < g.nodes[attention.index()].execution_order);
    }

    #[test]
    fn cycle_is_detected_and_rejected() {
        let mut g = test_graph(100);
        let a = g.add_node("linear", vec![], OperatorParams::new()).unwrap();
        g.mark_input(a).unwrap();
        let b = g.add_node("linear", vec![a], OperatorParams::new()).unwrap();
        // Manually wire a cycle: b feeds back into a.
        g.connect(b, a).unwrap();
        assert!(g.has_cycle());
        assert!(matches!(g.topological_sort(), Err(GraphError::Cycle(_))));
    }

    #[test]
    fn duplicate_operator_name_is_rejected_at_add_node() {
        let mut g = test_graph(4);
        assert!(matches!(g.add_node("not_a_real_operator", vec![], OperatorParams::new()), Err(GraphError::OperatorNotFound(_))));
    }

    #[test]
    fn remove_node_disconnects_incident_edges() {
        let mut g = test_graph(4);
        let a = g.add_node("linear", vec![], OperatorParams::new()).unwrap();
        let b = g.add_node("linear", vec![a], OperatorParams::new()).unwrap();
        g.remove_node(a).unwrap();
        assert!(g.nodes[b.index()].inputs.is_empty());
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn parallel_runner_matches_sequential_result_above_threshold() {
        // Five nodes: one input feeding four independent `abs`-like
        // linear passes into a shared attention; forces parallel
        // dispatch since node_count > parallel_threshold (4, default).
        let registry = Arc::new(OperatorRegistry::with_builtins());
        let mut g = Graph::create("parallel-test", registry, 1 << 20, 32).unwrap();

        let input = g.add_node("linear", vec![], OperatorParams::new()).unwrap();
        g.mark_input(input).unwrap();
        let weight_input = g.add_node("linear", vec![], OperatorParams::new()).unwrap();
        g.mark_input(weight_input).unwrap();

        let l1 = g.add_node("linear", vec![input, weight_input], OperatorParams::new()).unwrap();
        let l2 = g.add_node("linear", vec![input, weight_input], OperatorParams::new()).unwrap();
        let l3 = g.add_node("linear", vec![l1, weight_input], OperatorParams::new()).unwrap();
        g.mark_output(l2).unwrap();
        g.mark_output(l3).unwrap();

        let pool = g.pool();
        let x = Tensor::zeros(Arc::clone(&pool), Shape::new(vec![1, 4]), DType::Float32).unwrap();
        let weight = Tensor::zeros(Arc::clone(&pool), Shape::new(vec![4, 4]), DType::Float32).unwrap();
        for i in 0..4 {
            weight.set_f32(&[i, i], 1.0);
        }

        let outputs = g.execute(&[x, weight]).unwrap();
        assert_eq!(outputs.len(), 2);
    }

    #[test]
    fn dead_code_elimination_drops_nodes_with_no_path_to_an_output() {
        let mut g = test_graph(4);
        let input = g.add_node("linear", vec![], OperatorParams::new()).unwrap();
        g.mark_input(input).unwrap();
        let kept = g.add_node("linear", vec![input], OperatorParams::new()).unwrap();
        g.mark_output(kept).unwrap();
        let dangling = g.add_node("linear", vec![input], OperatorParams::new()).unwrap();

        g.optimize(OptimizeFlags::default()).unwrap();
        assert!(g.node(dangling).is_err());
        assert!(g.node(kept).is_ok());
    }
}
