//! Differential layer decoders: reconstruct an effective tensor from a
//! base tensor plus an encoded `ext - base` delta.
//!
//! Three encodings, chosen per layer by a similarity score computed at
//! write time (layers similar enough to the base are omitted from the
//! extension entirely rather than encoded at all):
//!
//! - [`DiffEncoding::WeightDelta`]: raw, full-shape `f32` delta.
//! - [`DiffEncoding::SparseMask`]: `(index, value)` pairs for the subset
//!   of elements that actually changed.
//! - [`DiffEncoding::QuantizedDelta`]: a per-tensor `(scale, zero_point)`
//!   plus one quantized byte per element.

use libetude_tensor::Tensor;

use crate::error::{LefxError, LefxResult};
use crate::layer::DiffEncoding;

/// Enumerates every multi-index of `dims` in row-major order. Same shape
/// as `libetude_tensor`'s private `elementwise::for_each_index` — that
/// one isn't exported, so this crate carries its own copy rather than
/// threading a new public API through the tensor crate for one caller.
fn for_each_index(dims: &[usize], mut f: impl FnMut(&[usize])) {
    if dims.is_empty() {
        f(&[]);
        return;
    }
    let mut idx = vec![0usize; dims.len()];
    loop {
        f(&idx);
        let mut axis = dims.len() - 1;
        loop {
            idx[axis] += 1;
            if idx[axis] < dims[axis] {
                break;
            }
            idx[axis] = 0;
            if axis == 0 {
                return;
            }
            axis -= 1;
        }
    }
}

fn decode_weight_delta(base: &Tensor, diff_bytes: &[u8]) -> LefxResult<Tensor> {
    let numel = base.numel();
    if diff_bytes.len() < numel * 4 {
        return Err(LefxError::BufferTooSmall { needed: numel * 4, available: diff_bytes.len() });
    }
    let out = base.copy(true)?;
    let dims = out.shape().dims().to_vec();
    let mut i = 0usize;
    for_each_index(&dims, |idx| {
        let off = i * 4;
        let delta = f32::from_le_bytes([diff_bytes[off], diff_bytes[off + 1], diff_bytes[off + 2], diff_bytes[off + 3]]);
        out.set_f32(idx, out.get_f32(idx) + delta);
        i += 1;
    });
    Ok(out)
}

fn decode_sparse_mask(base: &Tensor, diff_bytes: &[u8]) -> LefxResult<Tensor> {
    if diff_bytes.len() < 4 {
        return Err(LefxError::BufferTooSmall { needed: 4, available: diff_bytes.len() });
    }
    let count = u32::from_le_bytes([diff_bytes[0], diff_bytes[1], diff_bytes[2], diff_bytes[3]]) as usize;
    let needed = 4 + count * 8;
    if diff_bytes.len() < needed {
        return Err(LefxError::BufferTooSmall { needed, available: diff_bytes.len() });
    }

    let out = base.copy(true)?;
    let dims = out.shape().dims().to_vec();
    let numel = out.numel();
    for i in 0..count {
        let off = 4 + i * 8;
        let flat = u32::from_le_bytes([diff_bytes[off], diff_bytes[off + 1], diff_bytes[off + 2], diff_bytes[off + 3]]) as usize;
        let value = f32::from_le_bytes([diff_bytes[off + 4], diff_bytes[off + 5], diff_bytes[off + 6], diff_bytes[off + 7]]);
        if flat >= numel {
            return Err(LefxError::InvalidParameter("sparse-mask index out of range for base tensor"));
        }
        let idx = flat_to_multi(flat, &dims);
        out.set_f32(&idx, out.get_f32(&idx) + value);
    }
    Ok(out)
}

fn decode_quantized_delta(base: &Tensor, diff_bytes: &[u8]) -> LefxResult<Tensor> {
    let numel = base.numel();
    let header_len = 8;
    if diff_bytes.len() < header_len + numel {
        return Err(LefxError::BufferTooSmall { needed: header_len + numel, available: diff_bytes.len() });
    }
    let scale = f32::from_le_bytes([diff_bytes[0], diff_bytes[1], diff_bytes[2], diff_bytes[3]]);
    let zero_point = f32::from_le_bytes([diff_bytes[4], diff_bytes[5], diff_bytes[6], diff_bytes[7]]);

    let out = base.copy(true)?;
    let dims = out.shape().dims().to_vec();
    let mut i = 0usize;
    for_each_index(&dims, |idx| {
        let q = diff_bytes[header_len + i] as i8;
        let delta = (q as f32 - zero_point) * scale;
        out.set_f32(idx, out.get_f32(idx) + delta);
        i += 1;
    });
    Ok(out)
}

fn flat_to_multi(mut flat: usize, dims: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; dims.len()];
    for i in (0..dims.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * dims[i + 1];
    }
    let mut idx = vec![0usize; dims.len()];
    for (axis, stride) in strides.iter().enumerate() {
        idx[axis] = flat / stride;
        flat %= stride;
    }
    idx
}

/// Reconstructs the effective (post-diff) tensor for a differential
/// layer, given the base layer's tensor and the layer's encoded delta
/// bytes.
pub fn reconstruct(base: &Tensor, encoding: DiffEncoding, diff_bytes: &[u8]) -> LefxResult<Tensor> {
    match encoding {
        DiffEncoding::WeightDelta => decode_weight_delta(base, diff_bytes),
        DiffEncoding::SparseMask => decode_sparse_mask(base, diff_bytes),
        DiffEncoding::QuantizedDelta => decode_quantized_delta(base, diff_bytes),
        DiffEncoding::Unknown(v) => Err(LefxError::InvalidFormat(format!("unknown diff encoding {v}"))),
    }
}
