//! Bundled "Basic" operators: the tensor-algebra primitives speech
//! models are built from. Weights and biases are ordinary graph inputs
//! (other nodes' outputs), not baked into operator state — the same way
//! a constant-folded weight tensor is just another node in most graph
//! IRs, so the registry's `create` function stays pool-agnostic.

use libetude_tensor::{DType, Shape, Tensor};

use crate::error::{GraphError, GraphResult};
use crate::node::OperatorParams;
use crate::registry::{OperatorDef, OperatorState};

fn no_state(_: &OperatorParams) -> GraphResult<OperatorState> {
    Ok(OperatorState(Box::new(())))
}

fn no_destroy(_: OperatorState) {}

/// `y = x @ weight^T [+ bias]`. `x`: `[batch, in_features]`, `weight`:
/// `[out_features, in_features]`, optional `bias`: `[out_features]`.
fn linear_apply(x: &Tensor, weight: &Tensor, bias: Option<&Tensor>) -> GraphResult<Tensor> {
    let weight_t = weight.transpose(0, 1)?;
    let out = x.matmul(&weight_t)?;

    if let Some(bias) = bias {
        let (rows, cols) = (out.shape().dims()[0], out.shape().dims()[1]);
        for r in 0..rows {
            for c in 0..cols {
                let v = out.get_f32(&[r, c]) + bias.get_f32(&[c]);
                out.set_f32(&[r, c], v);
            }
        }
    }
    Ok(out)
}

fn linear_forward(_: &OperatorState, inputs: &[&Tensor], _: &OperatorParams) -> GraphResult<Vec<Tensor>> {
    let x = inputs.first().ok_or(GraphError::InvalidParameter("linear requires an input tensor"))?;
    let weight = inputs.get(1).ok_or(GraphError::InvalidParameter("linear requires a weight tensor"))?;
    let bias = inputs.get(2).map(|b| *b);
    Ok(vec![linear_apply(x, weight, bias)?])
}

/// `x`: `[in_channels, length]`, `weight`: `[out_channels, in_channels,
/// kernel_size]`, optional `bias`: `[out_channels]`. `stride`/
/// `padding`/`dilation` come from params (default `1`/`0`/`1`). The
/// kernel's span over the (padded) input is `(kernel_size - 1) *
/// dilation + 1`; a sample `dilation` apart from its neighbor is taken
/// at each tap instead of every adjacent position.
fn conv1d_forward(_: &OperatorState, inputs: &[&Tensor], params: &OperatorParams) -> GraphResult<Vec<Tensor>> {
    let x = inputs.first().ok_or(GraphError::InvalidParameter("conv1d requires an input tensor"))?;
    let weight = inputs.get(1).ok_or(GraphError::InvalidParameter("conv1d requires a weight tensor"))?;
    let bias = inputs.get(2);

    let stride = params.get_int("stride").unwrap_or(1).max(1) as usize;
    let padding = params.get_int("padding").unwrap_or(0).max(0) as usize;
    let dilation = params.get_int("dilation").unwrap_or(1).max(1) as usize;

    let in_channels = x.shape().dims()[0];
    let length = x.shape().dims()[1];
    let out_channels = weight.shape().dims()[0];
    let weight_in_channels = weight.shape().dims()[1];
    let kernel_size = weight.shape().dims()[2];
    if weight_in_channels != in_channels {
        return Err(GraphError::InvalidParameter("conv1d weight in_channels must match input"));
    }

    let padded_length = length + 2 * padding;
    let kernel_span = (kernel_size - 1) * dilation + 1;
    if padded_length < kernel_span {
        return Err(GraphError::InvalidParameter("conv1d dilated kernel span exceeds padded input length"));
    }
    let out_length = (padded_length - kernel_span) / stride + 1;

    let out = Tensor::create(x.pool(), Shape::new(vec![out_channels, out_length]), DType::Float32)?;

    let sample = |channel: usize, pos: usize| -> f32 {
        if pos < padding || pos >= padding + length {
            0.0
        } else {
            x.get_f32(&[channel, pos - padding])
        }
    };

    for oc in 0..out_channels {
        for ol in 0..out_length {
            let start = ol * stride;
            let mut acc = 0.0f32;
            for ic in 0..in_channels {
                for k in 0..kernel_size {
                    acc += sample(ic, start + k * dilation) * weight.get_f32(&[oc, ic, k]);
                }
            }
            if let Some(bias) = bias {
                acc += bias.get_f32(&[oc]);
            }
            out.set_f32(&[oc, ol], acc);
        }
    }
    Ok(vec![out])
}

fn softmax_row_in_place(tensor: &Tensor, row: usize, cols: usize) {
    let mut max = f32::NEG_INFINITY;
    for c in 0..cols {
        max = max.max(tensor.get_f32(&[row, c]));
    }
    let mut sum = 0.0f32;
    for c in 0..cols {
        let e = (tensor.get_f32(&[row, c]) - max).exp();
        tensor.set_f32(&[row, c], e);
        sum += e;
    }
    for c in 0..cols {
        let v = tensor.get_f32(&[row, c]) / sum;
        tensor.set_f32(&[row, c], v);
    }
}

/// Scaled dot-product attention over a single head. `query`/`key`/
/// `value`: `[seq_len, head_dim]`.
fn scaled_dot_product(query: &Tensor, key: &Tensor, value: &Tensor) -> GraphResult<Tensor> {
    let d_model = query.shape().dims()[1];
    let scale = 1.0 / (d_model as f32).sqrt();

    let key_t = key.transpose(0, 1)?;
    let scores = query.matmul(&key_t)?;
    let scores = scores.mul_scalar(scale)?;

    let seq_len = scores.shape().dims()[0];
    let cols = scores.shape().dims()[1];
    for row in 0..seq_len {
        softmax_row_in_place(&scores, row, cols);
    }

    Ok(scores.matmul(value)?)
}

fn column_slice(t: &Tensor, start: usize, end: usize) -> GraphResult<Tensor> {
    let rows = t.shape().dims()[0];
    let width = end - start;
    let out = Tensor::create(t.pool(), Shape::new(vec![rows, width]), DType::Float32)?;
    for r in 0..rows {
        for c in 0..width {
            out.set_f32(&[r, c], t.get_f32(&[r, start + c]));
        }
    }
    Ok(out)
}

fn write_column_slice(dst: &Tensor, start: usize, src: &Tensor) {
    let rows = src.shape().dims()[0];
    let width = src.shape().dims()[1];
    for r in 0..rows {
        for c in 0..width {
            dst.set_f32(&[r, start + c], src.get_f32(&[r, c]));
        }
    }
}

/// Multi-head attention. `query`/`key`/`value`: `[seq_len, embed_dim]`.
/// Inputs 4-7 are the Q/K/V/Out projection weights (`[embed_dim,
/// embed_dim]` each); inputs 8-11, if present, are their four biases
/// (`[embed_dim]` each, same order) — either all four are supplied or
/// none are. `embed_dim` (default: `query`'s second dimension) and
/// `num_heads` (default `1`) come from params; `embed_dim` must be
/// divisible by `num_heads`. `dropout` is accepted for signature parity
/// with the bundled operator's declared attributes but applied as
/// identity: this engine only ever runs inference, and dropout is
/// disabled in eval mode.
fn attention_forward(_: &OperatorState, inputs: &[&Tensor], params: &OperatorParams) -> GraphResult<Vec<Tensor>> {
    let query = inputs.first().ok_or(GraphError::InvalidParameter("attention requires a query tensor"))?;
    let key = inputs.get(1).ok_or(GraphError::InvalidParameter("attention requires a key tensor"))?;
    let value = inputs.get(2).ok_or(GraphError::InvalidParameter("attention requires a value tensor"))?;
    let w_q = inputs.get(3).ok_or(GraphError::InvalidParameter("attention requires a query projection weight"))?;
    let w_k = inputs.get(4).ok_or(GraphError::InvalidParameter("attention requires a key projection weight"))?;
    let w_v = inputs.get(5).ok_or(GraphError::InvalidParameter("attention requires a value projection weight"))?;
    let w_out = inputs.get(6).ok_or(GraphError::InvalidParameter("attention requires an output projection weight"))?;
    let (b_q, b_k, b_v, b_out) = if inputs.len() >= 11 {
        (Some(inputs[7]), Some(inputs[8]), Some(inputs[9]), Some(inputs[10]))
    } else {
        (None, None, None, None)
    };

    let embed_dim = params.get_int("embed_dim").map(|v| v as usize).unwrap_or_else(|| query.shape().dims()[1]);
    let num_heads = params.get_int("num_heads").unwrap_or(1).max(1) as usize;
    if embed_dim % num_heads != 0 {
        return Err(GraphError::InvalidParameter("attention embed_dim must be divisible by num_heads"));
    }
    let head_dim = embed_dim / num_heads;

    let q_proj = linear_apply(query, w_q, b_q)?;
    let k_proj = linear_apply(key, w_k, b_k)?;
    let v_proj = linear_apply(value, w_v, b_v)?;

    let seq_len = q_proj.shape().dims()[0];
    let concat = Tensor::create(q_proj.pool(), Shape::new(vec![seq_len, embed_dim]), DType::Float32)?;
    for h in 0..num_heads {
        let start = h * head_dim;
        let end = start + head_dim;
        let q_h = column_slice(&q_proj, start, end)?;
        let k_h = column_slice(&k_proj, start, end)?;
        let v_h = column_slice(&v_proj, start, end)?;
        let head_out = scaled_dot_product(&q_h, &k_h, &v_h)?;
        write_column_slice(&concat, start, &head_out);
    }

    let _dropout = params.get_float("dropout").unwrap_or(0.0);

    Ok(vec![linear_apply(&concat, w_out, b_out)?])
}

pub(crate) fn operator_defs() -> Vec<OperatorDef> {
    vec![
        OperatorDef { name: "linear", create: no_state, forward: linear_forward, destroy: no_destroy, backward: None },
        OperatorDef { name: "conv1d", create: no_state, forward: conv1d_forward, destroy: no_destroy, backward: None },
        OperatorDef { name: "attention", create: no_state, forward: attention_forward, destroy: no_destroy, backward: None },
    ]
}
