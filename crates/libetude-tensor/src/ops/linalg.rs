//! Linear algebra. Scoped to rank-2 matrix multiplication, the one
//! linear-algebra primitive the graph executor's Linear/Attention
//! operators need; higher-rank batched matmul is intentionally out of
//! scope here.

use crate::error::{TensorError, TensorResult};
use crate::shape::Shape;
use crate::tensor::Tensor;

impl Tensor {
    /// `self (m x k) @ other (k x n) -> (m x n)`.
    pub fn matmul(&self, other: &Tensor) -> TensorResult<Tensor> {
        if self.shape().rank() != 2 || other.shape().rank() != 2 {
            return Err(TensorError::MatmulRankMismatch { lhs: self.shape().rank(), rhs: other.shape().rank() });
        }
        let (m, k) = (self.shape().dims()[0], self.shape().dims()[1]);
        let (k2, n) = (other.shape().dims()[0], other.shape().dims()[1]);
        if k != k2 {
            return Err(TensorError::MatmulShapeMismatch { lhs: k, rhs: k2 });
        }

        let out = Tensor::create(self.pool(), Shape::new(vec![m, n]), self.dtype())?;
        for i in 0..m {
            for j in 0..n {
                let mut acc = 0.0f32;
                for p in 0..k {
                    acc += self.get_f32(&[i, p]) * other.get_f32(&[p, j]);
                }
                out.set_f32(&[i, j], acc);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;
    use libetude_pool::Pool;
    use parking_lot::Mutex;

    fn test_pool() -> std::sync::Arc<Mutex<Pool>> {
        std::sync::Arc::new(Mutex::new(Pool::create(1 << 20, 32).unwrap()))
    }

    #[test]
    fn s3_matmul_scenario() {
        let pool = test_pool();
        let a = Tensor::zeros(std::sync::Arc::clone(&pool), Shape::new(vec![2, 3]), DType::Float32).unwrap();
        let b = Tensor::zeros(pool, Shape::new(vec![3, 2]), DType::Float32).unwrap();
        for i in 0..2 {
            for j in 0..3 {
                a.set_f32(&[i, j], (i * 3 + j + 1) as f32);
            }
        }
        for i in 0..3 {
            for j in 0..2 {
                b.set_f32(&[i, j], (i * 2 + j + 1) as f32);
            }
        }
        let c = a.matmul(&b).unwrap();
        assert_eq!(c.shape().dims(), &[2, 2]);
        // Row 0 of a = [1, 2, 3]; column 0 of b = [1, 3, 5].
        assert_eq!(c.get_f32(&[0, 0]), 1.0 * 1.0 + 2.0 * 3.0 + 3.0 * 5.0);
    }

    #[test]
    fn matmul_rejects_inner_dimension_mismatch() {
        let pool = test_pool();
        let a = Tensor::zeros(std::sync::Arc::clone(&pool), Shape::new(vec![2, 3]), DType::Float32).unwrap();
        let b = Tensor::zeros(pool, Shape::new(vec![4, 2]), DType::Float32).unwrap();
        assert!(a.matmul(&b).is_err());
    }

    #[test]
    fn matmul_rejects_non_rank_2_operands() {
        let pool = test_pool();
        let a = Tensor::zeros(std::sync::Arc::clone(&pool), Shape::new(vec![2, 3, 4]), DType::Float32).unwrap();
        let b = Tensor::zeros(pool, Shape::new(vec![4, 2]), DType::Float32).unwrap();
        assert!(a.matmul(&b).is_err());
    }
}
