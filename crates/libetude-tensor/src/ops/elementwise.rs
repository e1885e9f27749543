//! Elementwise arithmetic. Operates through `get_f32`/`set_f32`, so it
//! works on any dtype and any (including non-contiguous) stride layout,
//! at the cost of looping per-element rather than per-byte-run.

use crate::error::{TensorError, TensorResult};
use crate::tensor::Tensor;

/// Enumerates every multi-index of `dims` in row-major order.
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

fn check_same_shape(a: &Tensor, b: &Tensor) -> TensorResult<()> {
    if a.shape() != b.shape() {
        return Err(TensorError::ShapeMismatch {
            expected: a.shape().dims().to_vec(),
            got: b.shape().dims().to_vec(),
        });
    }
    Ok(())
}

fn binary_op(a: &Tensor, b: &Tensor, op: impl Fn(f32, f32) -> f32) -> TensorResult<Tensor> {
    check_same_shape(a, b)?;
    let out = Tensor::create(a.pool(), a.shape().clone(), a.dtype())?;
    for_each_index(a.shape().dims(), |idx| {
        out.set_f32(idx, op(a.get_f32(idx), b.get_f32(idx)));
    });
    Ok(out)
}

fn binary_op_in_place(a: &mut Tensor, b: &Tensor, op: impl Fn(f32, f32) -> f32) -> TensorResult<()> {
    check_same_shape(a, b)?;
    let dims = a.shape().dims().to_vec();
    for_each_index(&dims, |idx| {
        a.set_f32(idx, op(a.get_f32(idx), b.get_f32(idx)));
    });
    Ok(())
}

fn unary_op(a: &Tensor, op: impl Fn(f32) -> f32) -> TensorResult<Tensor> {
    let out = Tensor::create(a.pool(), a.shape().clone(), a.dtype())?;
    for_each_index(a.shape().dims(), |idx| {
        out.set_f32(idx, op(a.get_f32(idx)));
    });
    Ok(out)
}

fn unary_op_in_place(a: &mut Tensor, op: impl Fn(f32) -> f32) {
    let dims = a.shape().dims().to_vec();
    for_each_index(&dims, |idx| {
        a.set_f32(idx, op(a.get_f32(idx)));
    });
}

impl Tensor {
    pub fn add(&self, other: &Tensor) -> TensorResult<Tensor> {
        binary_op(self, other, |x, y| x + y)
    }

    pub fn add_(&mut self, other: &Tensor) -> TensorResult<()> {
        binary_op_in_place(self, other, |x, y| x + y)
    }

    pub fn mul(&self, other: &Tensor) -> TensorResult<Tensor> {
        binary_op(self, other, |x, y| x * y)
    }

    pub fn mul_(&mut self, other: &Tensor) -> TensorResult<()> {
        binary_op_in_place(self, other, |x, y| x * y)
    }

    pub fn add_scalar(&self, scalar: f32) -> TensorResult<Tensor> {
        unary_op(self, |x| x + scalar)
    }

    pub fn add_scalar_(&mut self, scalar: f32) {
        unary_op_in_place(self, |x| x + scalar);
    }

    pub fn mul_scalar(&self, scalar: f32) -> TensorResult<Tensor> {
        unary_op(self, |x| x * scalar)
    }

    pub fn mul_scalar_(&mut self, scalar: f32) {
        unary_op_in_place(self, |x| x * scalar);
    }

    pub fn abs(&self) -> TensorResult<Tensor> {
        unary_op(self, f32::abs)
    }

    pub fn square(&self) -> TensorResult<Tensor> {
        unary_op(self, |x| x * x)
    }

    pub fn sqrt(&self) -> TensorResult<Tensor> {
        unary_op(self, f32::sqrt)
    }

    pub fn exp(&self) -> TensorResult<Tensor> {
        unary_op(self, f32::exp)
    }

    pub fn log(&self) -> TensorResult<Tensor> {
        unary_op(self, f32::ln)
    }
}
