//! Reductions along one axis, or over the whole tensor when `axis` is
//! `None`.

use crate::dtype::DType;
use crate::error::TensorResult;
use crate::shape::Shape;
use crate::tensor::Tensor;

enum Reduction {
    Sum,
    Max,
    Min,
}

fn reduce(t: &Tensor, axis: Option<usize>, keepdims: bool, kind: Reduction) -> TensorResult<Tensor> {
    let dims = t.shape().dims();
    match axis {
        None => {
            let mut acc = match kind {
                Reduction::Sum => 0.0f32,
                Reduction::Max => f32::NEG_INFINITY,
                Reduction::Min => f32::INFINITY,
            };
            let mut idx = vec![0usize; dims.len()];
            let total = t.numel();
            for linear in 0..total {
                let mut rem = linear;
                for (axis_i, &d) in dims.iter().enumerate().rev() {
                    idx[axis_i] = rem % d;
                    rem /= d;
                }
                let v = t.get_f32(&idx);
                acc = match kind {
                    Reduction::Sum => acc + v,
                    Reduction::Max => acc.max(v),
                    Reduction::Min => acc.min(v),
                };
            }
            // Whole-tensor reductions always collapse to a 1-D single-element
            // tensor, independent of `keepdims` (spec.md's reduction contract).
            let out = Tensor::create(t.pool(), Shape::new(vec![1]), DType::Float32)?;
            out.set_f32(&[0], acc);
            Ok(out)
        }
        Some(axis) => {
            t.shape().check_axis(axis)?;
            let mut out_dims = dims.to_vec();
            out_dims[axis] = 1;
            let extent = dims[axis];

            let out = Tensor::create(t.pool(), Shape::new(out_dims.clone()), DType::Float32)?;
            let mut idx = vec![0usize; dims.len()];
            let outer_total: usize = out_dims.iter().product();
            for linear in 0..outer_total {
                let mut rem = linear;
                for (axis_i, &d) in out_dims.iter().enumerate().rev() {
                    idx[axis_i] = rem % d;
                    rem /= d;
                }
                let mut acc = match kind {
                    Reduction::Sum => 0.0f32,
                    Reduction::Max => f32::NEG_INFINITY,
                    Reduction::Min => f32::INFINITY,
                };
                for k in 0..extent {
                    idx[axis] = k;
                    let v = t.get_f32(&idx);
                    acc = match kind {
                        Reduction::Sum => acc + v,
                        Reduction::Max => acc.max(v),
                        Reduction::Min => acc.min(v),
                    };
                }
                idx[axis] = 0;
                out.set_f32(&idx, acc);
            }

            if keepdims {
                Ok(out)
            } else {
                out.squeeze(Some(axis))
            }
        }
    }
}

impl Tensor {
    pub fn sum(&self, axis: Option<usize>, keepdims: bool) -> TensorResult<Tensor> {
        reduce(self, axis, keepdims, Reduction::Sum)
    }

    pub fn mean(&self, axis: Option<usize>, keepdims: bool) -> TensorResult<Tensor> {
        let count = match axis {
            None => self.numel(),
            Some(a) => self.shape().dims()[a],
        } as f32;
        let summed = self.sum(axis, keepdims)?;
        summed.mul_scalar(1.0 / count)
    }

    pub fn max(&self, axis: Option<usize>, keepdims: bool) -> TensorResult<Tensor> {
        reduce(self, axis, keepdims, Reduction::Max)
    }

    pub fn min(&self, axis: Option<usize>, keepdims: bool) -> TensorResult<Tensor> {
        reduce(self, axis, keepdims, Reduction::Min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libetude_pool::Pool;
    use parking_lot::Mutex;

    fn test_pool() -> std::sync::Arc<Mutex<Pool>> {
        std::sync::Arc::new(Mutex::new(Pool::create(1 << 20, 32).unwrap()))
    }

    fn matrix_2x3(pool: std::sync::Arc<Mutex<Pool>>) -> Tensor {
        let t = Tensor::zeros(pool, Shape::new(vec![2, 3]), DType::Float32).unwrap();
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut i = 0;
        for r in 0..2 {
            for c in 0..3 {
                t.set_f32(&[r, c], values[i]);
                i += 1;
            }
        }
        t
    }

    #[test]
    fn s4_reduction_scenario_sum_all() {
        let pool = test_pool();
        let t = matrix_2x3(pool);
        let total = t.sum(None, false).unwrap();
        assert_eq!(total.shape().dims(), &[1]);
        assert_eq!(total.get_f32(&[0]), 21.0);
    }

    #[test]
    fn sum_along_axis_drops_or_keeps_dim() {
        let pool = test_pool();
        let t = matrix_2x3(pool);
        let summed = t.sum(Some(1), false).unwrap();
        assert_eq!(summed.shape().dims(), &[2]);
        assert_eq!(summed.get_f32(&[0]), 6.0);
        assert_eq!(summed.get_f32(&[1]), 15.0);

        let kept = t.sum(Some(1), true).unwrap();
        assert_eq!(kept.shape().dims(), &[2, 1]);
    }

    #[test]
    fn mean_max_min_along_axis() {
        let pool = test_pool();
        let t = matrix_2x3(pool);
        let mean = t.mean(Some(0), false).unwrap();
        assert_eq!(mean.get_f32(&[0]), 2.5);

        let max = t.max(None, false).unwrap();
        assert_eq!(max.get_f32(&[0]), 6.0);

        let min = t.min(None, false).unwrap();
        assert_eq!(min.get_f32(&[0]), 1.0);
    }
}
