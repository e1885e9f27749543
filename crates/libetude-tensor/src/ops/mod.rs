//! Operations on [`crate::Tensor`], grouped by kind. Each submodule adds
//! an `impl Tensor` block rather than free functions, so call sites read
//! as `tensor.matmul(&other)` the way the teacher's domain types read.

mod convert;
mod elementwise;
mod linalg;
mod reduce;
mod shape_ops;
