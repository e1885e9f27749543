use libetude_pool::Pool;

use crate::error::{HarnessError, HarnessResult};

fn assert_that(ok: bool, detail: impl Into<String>) -> HarnessResult<()> {
    if ok { Ok(()) } else { Err(HarnessError::Assertion(detail.into())) }
}

/// Create a 1 MiB pool, align 32. Alloc 256 => non-null, aligned to 32,
/// `used >= 256`. Free => `num_frees=1`. Reset => `used=0`, `num_resets=1`.
pub fn run() -> HarnessResult<()> {
    let mut pool = Pool::create(1024 * 1024, 32)?;
    let handle = pool.alloc(256)?;
    assert_that(handle.offset() % 32 == 0, format!("allocation offset {} is not 32-aligned", handle.offset()))?;

    let stats = pool.stats();
    assert_that(stats.used >= 256, format!("used {} < 256", stats.used))?;

    pool.free(handle)?;
    let stats = pool.stats();
    assert_that(stats.frees == 1, format!("frees {} != 1", stats.frees))?;

    pool.reset();
    let stats = pool.stats();
    assert_that(stats.used == 0, format!("used {} != 0 after reset", stats.used))?;
    assert_that(stats.resets == 1, format!("resets {} != 1", stats.resets))
}
