//! Shape and row-major stride bookkeeping.

use crate::error::{TensorError, TensorResult};

/// A tensor's dimensions, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape(Vec<usize>);

impl Shape {
    pub fn new(dims: impl Into<Vec<usize>>) -> Self {
        Self(dims.into())
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    pub fn numel(&self) -> usize {
        self.0.iter().product()
    }

    /// Row-major (C-order) strides for a densely packed tensor of this
    /// shape, in elements (not bytes).
    pub fn contiguous_strides(&self) -> Vec<usize> {
        let mut strides = vec![1usize; self.0.len()];
        for i in (0..self.0.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.0[i + 1];
        }
        strides
    }

    pub fn check_axis(&self, axis: usize) -> TensorResult<()> {
        if axis >= self.rank() {
            Err(TensorError::InvalidAxis(axis, self.rank()))
        } else {
            Ok(())
        }
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self(dims.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contiguous_strides_match_row_major_layout() {
        let shape = Shape::new(vec![2, 3, 4]);
        assert_eq!(shape.contiguous_strides(), vec![12, 4, 1]);
        assert_eq!(shape.numel(), 24);
    }

    #[test]
    fn scalar_shape_has_no_strides() {
        let shape = Shape::new(Vec::<usize>::new());
        assert_eq!(shape.numel(), 1);
        assert!(shape.contiguous_strides().is_empty());
    }
}
