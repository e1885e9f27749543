//! Blend modes: how an extension layer's (already diff-reconstructed)
//! tensor combines with the base layer's tensor. Built entirely from
//! `libetude_tensor::Tensor`'s existing elementwise ops — no new tensor
//! primitive needed.

use libetude_tensor::Tensor;

use crate::error::LefxResult;
use crate::layer::BlendMode;

/// `weight` is the layer header's primary `blend_weight` (used by
/// `Interpolate`); `weight_secondary` is `blend_weight_secondary` (the
/// second of `WeightedSum`'s two weights). Both are ignored by modes
/// that don't use them.
pub fn blend(base: &Tensor, ext: &Tensor, mode: BlendMode, weight: f32, weight_secondary: f32) -> LefxResult<Tensor> {
    let out = match mode {
        BlendMode::Replace => ext.copy(true)?,
        BlendMode::Add => base.add(ext)?,
        BlendMode::Multiply => base.mul(ext)?,
        BlendMode::Interpolate => base.mul_scalar(1.0 - weight)?.add(&ext.mul_scalar(weight)?)?,
        BlendMode::WeightedSum => base.mul_scalar(weight)?.add(&ext.mul_scalar(weight_secondary)?)?,
        BlendMode::Unknown(v) => return Err(crate::error::LefxError::InvalidFormat(format!("unknown blend mode {v}"))),
    };
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use libetude_pool::Pool;
    use libetude_tensor::{DType, Shape};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn test_pool() -> Arc<Mutex<Pool>> {
        Arc::new(Mutex::new(Pool::create(1 << 20, 32).unwrap()))
    }

    fn filled(pool: Arc<Mutex<Pool>>, values: &[f32]) -> Tensor {
        let t = Tensor::zeros(pool, Shape::new(vec![values.len()]), DType::Float32).unwrap();
        for (i, v) in values.iter().enumerate() {
            t.set_f32(&[i], *v);
        }
        t
    }

    #[test]
    fn replace_yields_extension_values() {
        let pool = test_pool();
        let base = filled(Arc::clone(&pool), &[1.0, 2.0]);
        let ext = filled(pool, &[10.0, 20.0]);
        let out = blend(&base, &ext, BlendMode::Replace, 0.0, 0.0).unwrap();
        assert_eq!(out.get_f32(&[0]), 10.0);
        assert_eq!(out.get_f32(&[1]), 20.0);
    }

    #[test]
    fn add_sums_base_and_extension() {
        let pool = test_pool();
        let base = filled(Arc::clone(&pool), &[1.0, 2.0]);
        let ext = filled(pool, &[10.0, 20.0]);
        let out = blend(&base, &ext, BlendMode::Add, 0.0, 0.0).unwrap();
        assert_eq!(out.get_f32(&[0]), 11.0);
        assert_eq!(out.get_f32(&[1]), 22.0);
    }

    #[test]
    fn multiply_is_pointwise_product() {
        let pool = test_pool();
        let base = filled(Arc::clone(&pool), &[2.0, 3.0]);
        let ext = filled(pool, &[4.0, 5.0]);
        let out = blend(&base, &ext, BlendMode::Multiply, 0.0, 0.0).unwrap();
        assert_eq!(out.get_f32(&[0]), 8.0);
        assert_eq!(out.get_f32(&[1]), 15.0);
    }

    #[test]
    fn interpolate_at_half_weight_averages() {
        let pool = test_pool();
        let base = filled(Arc::clone(&pool), &[0.0, 10.0]);
        let ext = filled(pool, &[10.0, 0.0]);
        let out = blend(&base, &ext, BlendMode::Interpolate, 0.5, 0.0).unwrap();
        assert_eq!(out.get_f32(&[0]), 5.0);
        assert_eq!(out.get_f32(&[1]), 5.0);
    }

    #[test]
    fn weighted_sum_uses_both_header_weights() {
        let pool = test_pool();
        let base = filled(Arc::clone(&pool), &[1.0]);
        let ext = filled(pool, &[1.0]);
        let out = blend(&base, &ext, BlendMode::WeightedSum, 0.2, 0.8).unwrap();
        assert!((out.get_f32(&[0]) - 1.0).abs() < 1e-6);
    }
}
