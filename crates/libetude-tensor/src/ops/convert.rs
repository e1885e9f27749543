//! Dtype conversion: always a deep copy into freshly allocated storage,
//! since different dtypes need different byte widths.

use crate::dtype::DType;
use crate::error::TensorResult;
use crate::tensor::Tensor;

impl Tensor {
    /// Converts every element to `target`'s representation in a new
    /// tensor. `Int4` is unsupported as a target here — it is written
    /// via the dedicated `libetude-lefx` delta-quantization path, which
    /// needs the neighboring nibble to pack a byte.
    pub fn to_dtype(&self, target: DType) -> TensorResult<Tensor> {
        if target == DType::Int4 {
            return Err(crate::error::TensorError::UnsupportedConversion { from: self.dtype(), to: target });
        }
        let out = Tensor::create(self.pool(), self.shape().clone(), target)?;
        let numel = self.numel();
        let dims = self.shape().dims();
        let mut idx = vec![0usize; dims.len()];
        for linear in 0..numel {
            let mut rem = linear;
            for (axis, &d) in dims.iter().enumerate().rev() {
                idx[axis] = rem % d;
                rem /= d;
            }
            out.set_f32(&idx, self.get_f32(&idx));
        }
        Ok(out)
    }
}
