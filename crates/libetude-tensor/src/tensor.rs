//! The `Tensor` type: a view (shape, strides, dtype) over pool-backed
//! storage.
//!
//! Storage is reference-counted through `Arc`, not a hand-rolled
//! counter: [`Tensor::copy`] in shallow mode and every shape-only op
//! (`reshape`, `transpose`, `permute`, `expand_dims`, `squeeze`) clone
//! the `Arc` rather than the bytes, so many `Tensor` views can share one
//! allocation. The allocation is returned to the pool exactly once, when
//! the last `Arc<Storage>` drops. The pool itself sits behind a
//! `parking_lot::Mutex` rather than a `RefCell` — the same primitive
//! `libetude-pool::ThreadSafePool` uses — so a `Tensor` is `Send`/`Sync`
//! and can cross into the graph executor's worker threads.

use std::sync::Arc;

use parking_lot::Mutex;

use libetude_pool::{Pool, PoolHandle};

use crate::dtype::DType;
use crate::error::{TensorError, TensorResult};
use crate::shape::Shape;

pub(crate) struct Storage {
    pub(crate) pool: Arc<Mutex<Pool>>,
    pub(crate) handle: PoolHandle,
}

impl Drop for Storage {
    fn drop(&mut self) {
        // Best-effort: a pool already reset out from under this storage
        // (engine teardown order) makes this a no-op, not a panic.
        let _ = self.pool.lock().free(self.handle);
    }
}

/// A (possibly non-contiguous, possibly shared) view over pool-backed
/// tensor storage.
#[derive(Clone)]
pub struct Tensor {
    pub(crate) storage: Arc<Storage>,
    pub(crate) shape: Shape,
    pub(crate) strides: Vec<usize>,
    pub(crate) dtype: DType,
    pub(crate) name: Option<String>,
}

impl Tensor {
    /// Allocates uninitialized (zeroed, since the pool zeroes fresh
    /// memory) storage for `shape` elements of `dtype`.
    pub fn create(pool: Arc<Mutex<Pool>>, shape: Shape, dtype: DType) -> TensorResult<Self> {
        if dtype == DType::Int4 {
            return Err(TensorError::UnsupportedConversion { from: dtype, to: dtype });
        }
        let numel = shape.numel();
        let bytes = dtype.bytes_for(numel);
        let handle = pool.lock().alloc(bytes.max(1))?;
        let strides = shape.contiguous_strides();
        Ok(Self {
            storage: Arc::new(Storage { pool, handle }),
            shape,
            strides,
            dtype,
            name: None,
        })
    }

    pub fn zeros(pool: Arc<Mutex<Pool>>, shape: Shape, dtype: DType) -> TensorResult<Self> {
        // Fresh pool allocations are already zeroed (`AlignedBuffer::new`
        // uses `alloc_zeroed`), so this is just `create`.
        Self::create(pool, shape, dtype)
    }

    pub fn ones(pool: Arc<Mutex<Pool>>, shape: Shape, dtype: DType) -> TensorResult<Self> {
        let tensor = Self::create(pool, shape, dtype)?;
        tensor.fill(1.0)?;
        Ok(tensor)
    }

    pub fn named(pool: Arc<Mutex<Pool>>, shape: Shape, dtype: DType, name: impl Into<String>) -> TensorResult<Self> {
        let mut tensor = Self::create(pool, shape, dtype)?;
        tensor.name = Some(name.into());
        Ok(tensor)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// The pool this tensor's storage was allocated from, for callers
    /// that need to allocate a sibling tensor (e.g. an operator's
    /// output) from the same pool.
    pub fn pool(&self) -> Arc<Mutex<Pool>> {
        Arc::clone(&self.storage.pool)
    }

    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    pub fn is_contiguous(&self) -> bool {
        self.strides == self.shape.contiguous_strides()
    }

    pub fn same_shape(&self, other: &Tensor) -> bool {
        self.shape == other.shape
    }

    /// Creates a new `Tensor` sharing this one's storage: either a deep
    /// copy (fresh allocation, bytes copied) or a shallow copy (same
    /// storage, reference count bumped).
    pub fn copy(&self, deep: bool) -> TensorResult<Tensor> {
        if !deep {
            return Ok(Tensor {
                storage: Arc::clone(&self.storage),
                shape: self.shape.clone(),
                strides: self.strides.clone(),
                dtype: self.dtype,
                name: self.name.clone(),
            });
        }
        let mut out = Tensor::create(Arc::clone(&self.storage.pool), self.shape.clone(), self.dtype)?;
        out.name = self.name.clone();
        // `self` and `out` may share the same underlying `Mutex<Pool>`,
        // so lock it once (read), release, then lock again (write)
        // rather than nesting two locks of the same mutex.
        let bytes = self.with_bytes(|src| src.to_vec());
        out.with_bytes_mut(|dst| dst.copy_from_slice(&bytes));
        Ok(out)
    }

    fn byte_offset(&self, indices: &[usize]) -> usize {
        let elem_index: usize = indices.iter().zip(&self.strides).map(|(i, s)| i * s).sum();
        elem_index * element_width(self.dtype)
    }

    /// Runs `f` with a read-only view of this tensor's raw bytes.
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        let pool = self.storage.pool.lock();
        let bytes = pool.get(&self.storage.handle).expect("tensor storage handle must be valid");
        f(bytes)
    }

    pub fn with_bytes_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        let mut pool = self.storage.pool.lock();
        let bytes = pool.get_mut(&self.storage.handle).expect("tensor storage handle must be valid");
        f(bytes)
    }

    pub fn get_f32(&self, indices: &[usize]) -> f32 {
        let offset = self.byte_offset(indices);
        let width = element_width(self.dtype);
        self.with_bytes(|bytes| read_f32(&bytes[offset..offset + width], self.dtype))
    }

    pub fn set_f32(&self, indices: &[usize], value: f32) {
        let offset = self.byte_offset(indices);
        let width = element_width(self.dtype);
        self.with_bytes_mut(|bytes| write_f32(&mut bytes[offset..offset + width], self.dtype, value));
    }

    /// Fills every element with `value`. Requires a contiguous tensor.
    pub fn fill(&self, value: f32) -> TensorResult<()> {
        if !self.is_contiguous() {
            return Err(TensorError::NotContiguous);
        }
        let numel = self.numel();
        let width = element_width(self.dtype);
        self.with_bytes_mut(|bytes| {
            for i in 0..numel {
                write_f32(&mut bytes[i * width..(i + 1) * width], self.dtype, value);
            }
        });
        Ok(())
    }
}

pub(crate) fn element_width(dtype: DType) -> usize {
    match dtype {
        DType::Float32 | DType::Int32 => 4,
        DType::Float16 | DType::BFloat16 => 2,
        DType::Int8 => 1,
        DType::Int4 => panic!("Int4 is sub-byte; index element-wise via the dtype module helpers"),
    }
}

pub(crate) fn read_f32(bytes: &[u8], dtype: DType) -> f32 {
    match dtype {
        DType::Float32 => f32::from_le_bytes(bytes.try_into().unwrap()),
        DType::Float16 => crate::dtype::f16_bits_to_f32(u16::from_le_bytes(bytes.try_into().unwrap())),
        DType::BFloat16 => crate::dtype::bf16_bits_to_f32(u16::from_le_bytes(bytes.try_into().unwrap())),
        DType::Int32 => i32::from_le_bytes(bytes.try_into().unwrap()) as f32,
        DType::Int8 => bytes[0] as i8 as f32,
        DType::Int4 => unreachable!(),
    }
}

pub(crate) fn write_f32(bytes: &mut [u8], dtype: DType, value: f32) {
    match dtype {
        DType::Float32 => bytes.copy_from_slice(&value.to_le_bytes()),
        DType::Float16 => bytes.copy_from_slice(&crate::dtype::f32_to_f16_bits(value).to_le_bytes()),
        DType::BFloat16 => bytes.copy_from_slice(&crate::dtype::f32_to_bf16_bits(value).to_le_bytes()),
        DType::Int32 => bytes.copy_from_slice(&(value.round() as i32).to_le_bytes()),
        DType::Int8 => bytes[0] = crate::dtype::f32_to_i8(value) as u8,
        DType::Int4 => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libetude_pool::Pool;

    fn test_pool() -> Arc<Mutex<Pool>> {
        Arc::new(Mutex::new(Pool::create(1 << 20, 32).unwrap()))
    }

    #[test]
    fn create_zeros_and_reads_back() {
        let pool = test_pool();
        let t = Tensor::zeros(pool, Shape::new(vec![2, 2]), DType::Float32).unwrap();
        assert_eq!(t.get_f32(&[0, 0]), 0.0);
        assert_eq!(t.get_f32(&[1, 1]), 0.0);
    }

    #[test]
    fn set_and_get_roundtrip() {
        let pool = test_pool();
        let t = Tensor::zeros(pool, Shape::new(vec![3]), DType::Float32).unwrap();
        t.set_f32(&[1], 42.5);
        assert_eq!(t.get_f32(&[1]), 42.5);
        assert_eq!(t.get_f32(&[0]), 0.0);
    }

    #[test]
    fn shallow_copy_shares_storage_deep_copy_does_not() {
        let pool = test_pool();
        let t = Tensor::zeros(pool, Shape::new(vec![2]), DType::Float32).unwrap();
        t.set_f32(&[0], 1.0);

        let shallow = t.copy(false).unwrap();
        assert_eq!(shallow.get_f32(&[0]), 1.0);
        t.set_f32(&[0], 2.0);
        assert_eq!(shallow.get_f32(&[0]), 2.0, "shallow copy must observe writes through the shared storage");

        let deep = t.copy(true).unwrap();
        t.set_f32(&[0], 3.0);
        assert_eq!(deep.get_f32(&[0]), 2.0, "deep copy must not observe subsequent writes");
    }

    #[test]
    fn dropping_last_tensor_frees_the_pool_allocation() {
        let pool = test_pool();
        {
            let t = Tensor::zeros(Arc::clone(&pool), Shape::new(vec![100]), DType::Float32).unwrap();
            assert!(pool.lock().stats().used > 0);
            drop(t);
        }
        assert_eq!(pool.lock().stats().used, 0);
    }

    #[test]
    fn float16_storage_roundtrips_through_get_set() {
        let pool = test_pool();
        let t = Tensor::zeros(pool, Shape::new(vec![1]), DType::Float16).unwrap();
        t.set_f32(&[0], 3.5);
        assert_eq!(t.get_f32(&[0]), 3.5);
    }

    #[test]
    fn tensor_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Tensor>();
    }
}
