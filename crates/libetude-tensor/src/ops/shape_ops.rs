//! Shape-only transforms: every one of these shares storage with its
//! input (an `Arc::clone`, no bytes copied) and differs only in the
//! `shape`/`strides` pair attached to the view.

use crate::error::{TensorError, TensorResult};
use crate::shape::Shape;
use crate::tensor::Tensor;

impl Tensor {
    fn view_with(&self, shape: Shape, strides: Vec<usize>) -> Tensor {
        Tensor {
            storage: std::sync::Arc::clone(&self.storage),
            shape,
            strides,
            dtype: self.dtype,
            name: self.name.clone(),
        }
    }

    /// Reinterprets this tensor's elements under `new_shape`. Requires a
    /// contiguous tensor and an identical element count.
    pub fn reshape(&self, new_shape: impl Into<Shape>) -> TensorResult<Tensor> {
        if !self.is_contiguous() {
            return Err(TensorError::NotContiguous);
        }
        let new_shape = new_shape.into();
        if new_shape.numel() != self.numel() {
            return Err(TensorError::ElementCountMismatch { from: self.numel(), to: new_shape.numel() });
        }
        let strides = new_shape.contiguous_strides();
        Ok(self.view_with(new_shape, strides))
    }

    /// Swaps two axes by swapping their shape/stride entries — no data
    /// movement, so the result is generally non-contiguous.
    pub fn transpose(&self, axis_a: usize, axis_b: usize) -> TensorResult<Tensor> {
        self.shape.check_axis(axis_a)?;
        self.shape.check_axis(axis_b)?;
        let mut dims = self.shape.dims().to_vec();
        let mut strides = self.strides.clone();
        dims.swap(axis_a, axis_b);
        strides.swap(axis_a, axis_b);
        Ok(self.view_with(Shape::new(dims), strides))
    }

    /// General axis reordering; `axes` must be a permutation of
    /// `0..rank()`.
    pub fn permute(&self, axes: &[usize]) -> TensorResult<Tensor> {
        if axes.len() != self.shape.rank() {
            return Err(TensorError::ShapeMismatch {
                expected: (0..self.shape.rank()).collect(),
                got: axes.to_vec(),
            });
        }
        for &axis in axes {
            self.shape.check_axis(axis)?;
        }
        let dims: Vec<usize> = axes.iter().map(|&a| self.shape.dims()[a]).collect();
        let strides: Vec<usize> = axes.iter().map(|&a| self.strides[a]).collect();
        Ok(self.view_with(Shape::new(dims), strides))
    }

    /// Inserts a size-1 axis at `axis`.
    pub fn expand_dims(&self, axis: usize) -> TensorResult<Tensor> {
        if axis > self.shape.rank() {
            return Err(TensorError::InvalidAxis(axis, self.shape.rank()));
        }
        let mut dims = self.shape.dims().to_vec();
        let mut strides = self.strides.clone();
        dims.insert(axis, 1);
        // A size-1 axis' stride is conventionally set to the stride one
        // axis over (or 1 at the innermost position) so it composes
        // cleanly with further reshapes; it's never read since the
        // extent is 1.
        let stride_fill = strides.get(axis).copied().unwrap_or(1);
        strides.insert(axis, stride_fill);
        Ok(self.view_with(Shape::new(dims), strides))
    }

    /// Removes `axis` if it has extent 1 (or every size-1 axis when
    /// `axis` is `None`).
    pub fn squeeze(&self, axis: Option<usize>) -> TensorResult<Tensor> {
        let dims = self.shape.dims();
        match axis {
            Some(axis) => {
                self.shape.check_axis(axis)?;
                if dims[axis] != 1 {
                    return Ok(self.view_with(self.shape.clone(), self.strides.clone()));
                }
                let mut new_dims = dims.to_vec();
                let mut new_strides = self.strides.clone();
                new_dims.remove(axis);
                new_strides.remove(axis);
                Ok(self.view_with(Shape::new(new_dims), new_strides))
            }
            None => {
                let mut new_dims = Vec::new();
                let mut new_strides = Vec::new();
                for (i, &d) in dims.iter().enumerate() {
                    if d != 1 {
                        new_dims.push(d);
                        new_strides.push(self.strides[i]);
                    }
                }
                Ok(self.view_with(Shape::new(new_dims), new_strides))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;
    use libetude_pool::Pool;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn test_pool() -> Arc<Mutex<Pool>> {
        Arc::new(Mutex::new(Pool::create(1 << 20, 32).unwrap()))
    }

    #[test]
    fn reshape_preserves_element_order() {
        let pool = test_pool();
        let t = Tensor::zeros(pool, Shape::new(vec![2, 3]), DType::Float32).unwrap();
        for i in 0..2 {
            for j in 0..3 {
                t.set_f32(&[i, j], (i * 3 + j) as f32);
            }
        }
        let flat = t.reshape(vec![6]).unwrap();
        for k in 0..6 {
            assert_eq!(flat.get_f32(&[k]), k as f32);
        }
    }

    #[test]
    fn reshape_rejects_element_count_mismatch() {
        let pool = test_pool();
        let t = Tensor::zeros(pool, Shape::new(vec![2, 3]), DType::Float32).unwrap();
        assert!(t.reshape(vec![4]).is_err());
    }

    #[test]
    fn transpose_makes_tensor_non_contiguous() {
        let pool = test_pool();
        let t = Tensor::zeros(pool, Shape::new(vec![2, 3]), DType::Float32).unwrap();
        let tt = t.transpose(0, 1).unwrap();
        assert_eq!(tt.shape().dims(), &[3, 2]);
        assert!(!tt.is_contiguous());
    }

    #[test]
    fn squeeze_removes_size_one_axes() {
        let pool = test_pool();
        let t = Tensor::zeros(pool, Shape::new(vec![1, 4, 1]), DType::Float32).unwrap();
        let squeezed = t.squeeze(None).unwrap();
        assert_eq!(squeezed.shape().dims(), &[4]);
    }

    #[test]
    fn expand_dims_then_squeeze_is_identity() {
        let pool = test_pool();
        let t = Tensor::zeros(pool, Shape::new(vec![4]), DType::Float32).unwrap();
        let expanded = t.expand_dims(0).unwrap();
        assert_eq!(expanded.shape().dims(), &[1, 4]);
        let back = expanded.squeeze(Some(0)).unwrap();
        assert_eq!(back.shape().dims(), &[4]);
    }
}
