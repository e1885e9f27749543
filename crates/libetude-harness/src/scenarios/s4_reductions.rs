use std::sync::Arc;

use libetude_pool::Pool;
use libetude_tensor::{DType, Shape, Tensor};
use parking_lot::Mutex;

use crate::error::{HarnessError, HarnessResult};

fn approx(got: f32, expected: f32) -> bool {
    (got - expected).abs() < 1e-6
}

fn assert_scalar(t: &Tensor, expected: f32, label: &str) -> HarnessResult<()> {
    let got = t.get_f32(&vec![0usize; t.shape().rank()]);
    if approx(got, expected) { Ok(()) } else { Err(HarnessError::Assertion(format!("{label}: got {got}, expected {expected}"))) }
}

fn assert_vec(t: &Tensor, expected: &[f32], label: &str) -> HarnessResult<()> {
    for (i, &e) in expected.iter().enumerate() {
        let got = t.get_f32(&[i]);
        if !approx(got, e) {
            return Err(HarnessError::Assertion(format!("{label}[{i}]: got {got}, expected {e}")));
        }
    }
    Ok(())
}

/// Tensor `[[1,2,3],[4,5,6]]`. `sum(axis=-1) = 21` (spec.md's `-1` here
/// means "over every axis", i.e. this crate's `axis: None`);
/// `sum(axis=0) = [5,7,9]`; `sum(axis=1) = [6,15]`; `mean(axis=-1) =
/// 3.5`.
pub fn run() -> HarnessResult<()> {
    let pool = Arc::new(Mutex::new(Pool::create(1 << 16, 32)?));
    let t = Tensor::zeros(Arc::clone(&pool), Shape::new(vec![2, 3]), DType::Float32)?;
    for (i, v) in [1.0, 2.0, 3.0, 4.0, 5.0, 6.0].into_iter().enumerate() {
        t.set_f32(&[i / 3, i % 3], v);
    }

    assert_scalar(&t.sum(None, false)?, 21.0, "sum(all)")?;
    assert_vec(&t.sum(Some(0), false)?, &[5.0, 7.0, 9.0], "sum(axis=0)")?;
    assert_vec(&t.sum(Some(1), false)?, &[6.0, 15.0], "sum(axis=1)")?;
    assert_scalar(&t.mean(None, false)?, 3.5, "mean(all)")
}
