use std::sync::Arc;

use libetude_pool::Pool;
use libetude_tensor::{DType, Shape, Tensor};
use parking_lot::Mutex;

use crate::error::{HarnessError, HarnessResult};

fn tensor_from(pool: &Arc<Mutex<Pool>>, dims: &[usize], values: &[f32]) -> HarnessResult<Tensor> {
    let t = Tensor::zeros(Arc::clone(pool), Shape::new(dims.to_vec()), DType::Float32)?;
    for (i, &v) in values.iter().enumerate() {
        let row = i / dims[1];
        let col = i % dims[1];
        t.set_f32(&[row, col], v);
    }
    Ok(t)
}

/// `A = [[1,2],[3,4]]`, `B = [[2,3],[4,5]]` (float32).
/// `matmul(A,B) = [[10,13],[22,29]]`.
pub fn run() -> HarnessResult<()> {
    let pool = Arc::new(Mutex::new(Pool::create(1 << 16, 32)?));
    let a = tensor_from(&pool, &[2, 2], &[1.0, 2.0, 3.0, 4.0])?;
    let b = tensor_from(&pool, &[2, 2], &[2.0, 3.0, 4.0, 5.0])?;

    let c = a.matmul(&b)?;
    let expected = [[10.0, 13.0], [22.0, 29.0]];
    for row in 0..2 {
        for col in 0..2 {
            let got = c.get_f32(&[row, col]);
            if (got - expected[row][col]).abs() > 1e-6 {
                return Err(HarnessError::Assertion(format!("matmul[{row}][{col}] = {got}, expected {}", expected[row][col])));
            }
        }
    }
    Ok(())
}
