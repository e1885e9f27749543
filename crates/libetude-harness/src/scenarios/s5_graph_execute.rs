use std::sync::Arc;

use libetude_graph::{Graph, OperatorParams, OperatorRegistry};
use libetude_tensor::{DType, Shape, Tensor};

use crate::error::{HarnessError, HarnessResult};

/// Three-node compute graph: `x`/`weight` feed `linear`; `linear`'s
/// output and a second input `kv` (used as both key and value) feed
/// `attention`. `topological_sort` + `execute` must run `linear` before
/// `attention` — if it didn't, `attention` would read an empty
/// predecessor output and `execute` would fail outright, so a
/// successful run is itself the ordering proof.
pub fn run() -> HarnessResult<()> {
    let registry = Arc::new(OperatorRegistry::with_builtins());
    let mut graph = Graph::create("s5", registry, 1 << 20, 32)?;

    let x = graph.add_node("linear", vec![], OperatorParams::new())?;
    let weight = graph.add_node("linear", vec![], OperatorParams::new())?;
    let kv = graph.add_node("linear", vec![], OperatorParams::new())?;
    graph.mark_input(x)?;
    graph.mark_input(weight)?;
    graph.mark_input(kv)?;

    let linear = graph.add_node("linear", vec![x, weight], OperatorParams::new())?;
    let attention = graph.add_node("attention", vec![linear, kv, kv], OperatorParams::new())?;
    graph.mark_output(attention)?;
    graph.topological_sort()?;

    let pool = graph.pool();
    let x_t = Tensor::zeros(Arc::clone(&pool), Shape::new(vec![2, 3]), DType::Float32)?;
    let weight_t = Tensor::zeros(Arc::clone(&pool), Shape::new(vec![4, 3]), DType::Float32)?;
    let kv_t = Tensor::zeros(pool, Shape::new(vec![2, 4]), DType::Float32)?;
    for r in 0..2 {
        for c in 0..3 {
            x_t.set_f32(&[r, c], (r + c) as f32);
        }
    }
    for r in 0..4 {
        for c in 0..3 {
            weight_t.set_f32(&[r, c], if r == c { 1.0 } else { 0.0 });
        }
    }
    for r in 0..2 {
        for c in 0..4 {
            kv_t.set_f32(&[r, c], (r * 4 + c) as f32);
        }
    }

    let outputs = graph.execute(&[x_t, weight_t, kv_t])?;
    if outputs.len() != 1 {
        return Err(HarnessError::Assertion(format!("expected 1 output, got {}", outputs.len())));
    }
    let dims = outputs[0].shape().dims();
    if dims != [2, 4] {
        return Err(HarnessError::Assertion(format!("attention output shape {dims:?} != [2, 4]")));
    }
    Ok(())
}
