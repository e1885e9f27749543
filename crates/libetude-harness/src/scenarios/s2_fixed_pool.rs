use libetude_pool::{FixedPool, PoolError};

use crate::error::{HarnessError, HarnessResult};

fn assert_that(ok: bool, detail: impl Into<String>) -> HarnessResult<()> {
    if ok { Ok(()) } else { Err(HarnessError::Assertion(detail.into())) }
}

/// 64 KiB pool, 256-byte block. Allocate 10 blocks => `free_blocks =
/// total_blocks - 10`. Allocating 512 bytes => oversize rejection. Free
/// 5 => `free_blocks` rebounds by 5.
pub fn run() -> HarnessResult<()> {
    let mut pool = FixedPool::create(256, 64 * 1024 / 256, 32)?;
    let total_blocks = pool.stats().slot_count;

    let handles: Vec<_> = (0..10).map(|_| pool.alloc(256)).collect::<Result<_, _>>()?;
    let stats = pool.stats();
    assert_that(stats.free_slots == total_blocks - 10, format!("free_slots {} != {}", stats.free_slots, total_blocks - 10))?;

    match pool.alloc(512) {
        Err(PoolError::OutOfMemory { .. }) => {}
        Err(other) => return Err(HarnessError::Assertion(format!("expected OutOfMemory, got {other}"))),
        Ok(_) => return Err(HarnessError::Assertion("oversize allocation unexpectedly succeeded".into())),
    }

    for handle in handles.into_iter().take(5) {
        pool.free(handle)?;
    }
    let stats = pool.stats();
    assert_that(stats.free_slots == total_blocks - 5, format!("free_slots {} != {} after freeing 5", stats.free_slots, total_blocks - 5))
}
