//! N-dimensional tensor storage and ops for the LibEtude engine core.
//!
//! A [`Tensor`] is a thin (shape, strides, dtype) view over storage
//! allocated from a [`libetude_pool::Pool`]; it never allocates through
//! the global allocator. Compute (elementwise ops, matmul, reductions)
//! always happens in `f32`; other dtypes are interchange/storage
//! formats converted at the boundary (see [`dtype`]).

mod dtype;
mod error;
mod ops;
mod shape;
mod tensor;

pub use dtype::{
    bf16_bits_to_f32, f16_bits_to_f32, f32_to_bf16_bits, f32_to_f16_bits, f32_to_i8, i8_to_f32, pack_i4, unpack_i4,
    DType,
};
pub use error::{TensorError, TensorResult};
pub use shape::Shape;
pub use tensor::Tensor;
