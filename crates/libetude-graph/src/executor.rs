//! Sequential and parallel node runners.
//!
//! Both runners share one invariant: a node's `forward` starts only
//! after every predecessor's `forward` has returned. The sequential
//! runner gets this for free by walking the topological order; the
//! parallel runner enforces it with an explicit in-degree count.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;

use libetude_tensor::Tensor;
use parking_lot::{Condvar, Mutex};

use crate::cancellation::CancellationToken;
use crate::error::{GraphError, GraphResult};
use crate::node::{Node, NodeId, NodeState};
use crate::registry::OperatorRegistry;

/// Clones (cheap: an `Arc` bump) each predecessor's output array so the
/// caller doesn't hold a borrow of `nodes` across the mutation that
/// follows (marking the current node `Running`, caching its state).
/// Flattened in predecessor order, so a multi-output predecessor (e.g.
/// `stft`'s magnitude+phase) contributes every one of its outputs in
/// sequence to the consuming node's input list.
fn gather_inputs(nodes: &[Node], preds: &[NodeId]) -> GraphResult<Vec<Tensor>> {
    let mut inputs = Vec::with_capacity(preds.len());
    for &p in preds {
        let node = &nodes[p.index()];
        if node.outputs.is_empty() {
            return Err(GraphError::NodeFailed(p, node.op_name.clone(), "ran before its predecessor produced an output".to_string()));
        }
        inputs.extend(node.outputs.iter().cloned());
    }
    Ok(inputs)
}

/// Runs `order` one node at a time on the calling thread.
pub(crate) fn run_sequential(
    nodes: &mut [Node],
    order: &[NodeId],
    registry: &OperatorRegistry,
    cancel: &CancellationToken,
) -> GraphResult<()> {
    for &id in order {
        if cancel.is_cancelled() {
            return Err(GraphError::Cancelled);
        }
        if nodes[id.index()].is_input || nodes[id.index()].removed {
            continue;
        }

        let op_name = nodes[id.index()].op_name.clone();
        let def = registry.find(&op_name).ok_or_else(|| GraphError::OperatorNotFound(op_name.clone()))?;

        let preds = nodes[id.index()].inputs.clone();
        let input_tensors = gather_inputs(nodes, &preds)?;
        let input_refs: Vec<&Tensor> = input_tensors.iter().collect();
        let params = nodes[id.index()].params.clone();

        nodes[id.index()].run_state = NodeState::Running;
        if nodes[id.index()].state.is_none() {
            let created = (def.create)(&params)?;
            nodes[id.index()].state = Some(created);
        }
        let state = nodes[id.index()].state.as_ref().unwrap();
        let result = (def.forward)(state, &input_refs, &params);

        match result {
            Ok(outputs) => {
                nodes[id.index()].outputs = outputs;
                nodes[id.index()].run_state = NodeState::Completed;
            }
            Err(err) => {
                nodes[id.index()].run_state = NodeState::Error;
                return Err(GraphError::NodeFailed(id, op_name, err.to_string()));
            }
        }
    }
    Ok(())
}

struct Scheduler {
    ready: VecDeque<NodeId>,
    in_degree: Vec<usize>,
    outputs: Vec<Option<Vec<Tensor>>>,
    completed: usize,
    shutdown: bool,
    error: Option<GraphError>,
}

/// Runs `order` across `num_threads` worker threads, dispatching a node
/// as soon as every predecessor has completed. `num_threads = 0` is
/// treated as 1.
pub(crate) fn run_parallel(
    nodes: &mut [Node],
    order: &[NodeId],
    registry: &OperatorRegistry,
    num_threads: usize,
    cancel: &CancellationToken,
) -> GraphResult<()> {
    let runnable: Vec<NodeId> = order.iter().copied().filter(|id| !nodes[id.index()].removed).collect();
    let total = runnable.len();
    if total == 0 {
        return Ok(());
    }

    let index_of = |id: NodeId| runnable.iter().position(|&n| n == id);

    let mut in_degree = vec![0usize; total];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); total];
    let mut ready = VecDeque::new();
    let mut outputs: Vec<Option<Vec<Tensor>>> = vec![None; total];

    for (slot, &id) in runnable.iter().enumerate() {
        let node = &nodes[id.index()];
        if node.is_input {
            outputs[slot] = Some(node.outputs.clone());
            in_degree[slot] = 0;
            continue;
        }
        let preds: Vec<usize> = node.inputs.iter().filter_map(|&p| index_of(p)).collect();
        in_degree[slot] = preds.len();
        for pred_slot in preds {
            successors[pred_slot].push(slot);
        }
    }
    for (slot, &deg) in in_degree.iter().enumerate() {
        if deg == 0 && !nodes[runnable[slot].index()].is_input {
            ready.push_back(runnable[slot]);
        }
    }

    let scheduler = Arc::new(Mutex::new(Scheduler { ready, in_degree, outputs, completed: 0, shutdown: false, error: None }));
    let cv = Arc::new(Condvar::new());
    let workers = num_threads.max(1).min(total.max(1));

    // Preload every input node as "completed" so its successors' wait
    // counts are already satisfied.
    {
        let mut sched = scheduler.lock();
        for (slot, &id) in runnable.iter().enumerate() {
            if nodes[id.index()].is_input {
                sched.completed += 1;
                for &succ in &successors[slot] {
                    sched.in_degree[succ] -= 1;
                    if sched.in_degree[succ] == 0 {
                        sched.ready.push_back(runnable[succ]);
                    }
                }
            }
        }
        if sched.completed == total {
            sched.shutdown = true;
        }
        cv.notify_all();
    }

    thread::scope(|scope| {
        for _ in 0..workers {
            let scheduler = Arc::clone(&scheduler);
            let cv = Arc::clone(&cv);
            let nodes_ref: &[Node] = nodes;
            let runnable_ref = &runnable;
            let successors_ref = &successors;
            let cancel = cancel.clone();
            scope.spawn(move || {
                loop {
                    let node_id = {
                        let mut sched = scheduler.lock();
                        loop {
                            if sched.shutdown || sched.error.is_some() {
                                return;
                            }
                            if cancel.is_cancelled() {
                                sched.error = Some(GraphError::Cancelled);
                                sched.shutdown = true;
                                cv.notify_all();
                                return;
                            }
                            if let Some(id) = sched.ready.pop_front() {
                                break id;
                            }
                            cv.wait(&mut sched);
                        }
                    };

                    let slot = runnable_ref.iter().position(|&n| n == node_id).unwrap();
                    let node = &nodes_ref[node_id.index()];
                    let op_name = node.op_name.clone();
                    let params = node.params.clone();
                    let def = match registry.find(&op_name) {
                        Some(def) => def,
                        None => {
                            let mut sched = scheduler.lock();
                            sched.error = Some(GraphError::OperatorNotFound(op_name));
                            sched.shutdown = true;
                            cv.notify_all();
                            return;
                        }
                    };

                    let input_tensors: Vec<Tensor> = {
                        let sched = scheduler.lock();
                        node.inputs
                            .iter()
                            .filter_map(|&p| runnable_ref.iter().position(|&n| n == p))
                            .filter_map(|pred_slot| sched.outputs[pred_slot].clone())
                            .flatten()
                            .collect()
                    };
                    let input_refs: Vec<&Tensor> = input_tensors.iter().collect();

                    // Operator state is created lazily and only ever
                    // read by `forward`, so a fresh state per call here
                    // would diverge from the sequential runner's
                    // persistent state. Bundled operators are stateless
                    // (`no_state`), so this is a non-issue in practice;
                    // stateful third-party operators would need a
                    // per-node mutex around `state`, which is outside
                    // this engine's bundled operator set.
                    let state = (def.create)(&params);
                    let result = state.and_then(|state| (def.forward)(&state, &input_refs, &params));

                    let mut sched = scheduler.lock();
                    match result {
                        Ok(outputs) => {
                            sched.outputs[slot] = Some(outputs);
                            sched.completed += 1;
                            for &succ in &successors_ref[slot] {
                                sched.in_degree[succ] -= 1;
                                if sched.in_degree[succ] == 0 {
                                    sched.ready.push_back(runnable_ref[succ]);
                                }
                            }
                            if sched.completed == total {
                                sched.shutdown = true;
                            }
                        }
                        Err(err) => {
                            sched.error = Some(GraphError::NodeFailed(node_id, op_name, err.to_string()));
                            sched.shutdown = true;
                        }
                    }
                    cv.notify_all();
                }
            });
        }
    });

    let sched = scheduler.lock();
    if let Some(err) = sched.error.clone() {
        return Err(err);
    }
    let outputs = sched.outputs.clone();
    drop(sched);

    for (slot, &id) in runnable.iter().enumerate() {
        if let Some(outputs) = outputs[slot].clone() {
            nodes[id.index()].outputs = outputs;
            nodes[id.index()].run_state = NodeState::Completed;
        }
    }
    Ok(())
}
