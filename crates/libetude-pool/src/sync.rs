//! Thread-safe pool wrapper.
//!
//! Gates every mutating operation behind a single `parking_lot::Mutex`,
//! the same primitive the teacher workspace standardizes on over
//! `std::sync::Mutex` for its fairness and smaller footprint. This is a
//! coarse-grained lock by design: the pool's own invariants (contiguous,
//! sorted block list) are not designed for lock-free concurrent mutation,
//! and spec.md only asks for correctness under contention, not lock-free
//! scalability.

use parking_lot::Mutex;

use crate::error::PoolResult;
use crate::handle::PoolHandle;
use crate::pool::{Pool, PoolStats};

/// A [`Pool`] safe to share across threads via `Arc<ThreadSafePool>`.
pub struct ThreadSafePool {
    inner: Mutex<Pool>,
}

impl ThreadSafePool {
    pub fn new(pool: Pool) -> Self {
        Self { inner: Mutex::new(pool) }
    }

    pub fn alloc(&self, size: usize) -> PoolResult<PoolHandle> {
        self.inner.lock().alloc(size)
    }

    pub fn alloc_aligned(&self, size: usize, alignment: usize) -> PoolResult<PoolHandle> {
        self.inner.lock().alloc_aligned(size, alignment)
    }

    pub fn free(&self, handle: PoolHandle) -> PoolResult<()> {
        self.inner.lock().free(handle)
    }

    pub fn reset(&self) {
        self.inner.lock().reset()
    }

    pub fn compact(&self) {
        self.inner.lock().compact()
    }

    pub fn stats(&self) -> PoolStats {
        self.inner.lock().stats()
    }

    pub fn validate(&self) -> bool {
        self.inner.lock().validate()
    }

    /// Runs `f` with the bytes behind `handle`, holding the pool lock for
    /// the duration of the closure. Avoids handing out a reference tied
    /// to a `MutexGuard` the caller would otherwise need to keep alive.
    pub fn with_bytes<R>(&self, handle: &PoolHandle, f: impl FnOnce(&[u8]) -> R) -> PoolResult<R> {
        let guard = self.inner.lock();
        guard.get(handle).map(f)
    }

    pub fn with_bytes_mut<R>(&self, handle: &PoolHandle, f: impl FnOnce(&mut [u8]) -> R) -> PoolResult<R> {
        let mut guard = self.inner.lock();
        guard.get_mut(handle).map(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolOptions;
    use std::sync::Arc;

    #[test]
    fn concurrent_alloc_free_stays_consistent() {
        let pool = Pool::create_with_options(1 << 20, PoolOptions::default()).unwrap();
        let shared = Arc::new(ThreadSafePool::new(pool));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || {
                    let mut local = Vec::new();
                    for _ in 0..50 {
                        local.push(shared.alloc(64).unwrap());
                    }
                    for h in local {
                        shared.free(h).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert!(shared.validate());
        assert_eq!(shared.stats().used, 0);
    }
}
