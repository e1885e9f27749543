//! Engine-level pool manager.
//!
//! The engine core needs exactly three pools with different lifetimes
//! (spec.md §4.4): a long-lived *analysis* pool (feature extraction
//! scratch space), a long-lived *synthesis* pool (vocoder/waveform
//! buffers), and a *cache* pool that is expected to sit idle between
//! utterances and should give its memory back when it does. This module
//! owns all three, watches their usage ratio, and can rebuild a pool
//! sized for its observed peak instead of its conservatively-guessed
//! initial size.

use crate::error::{PoolError, PoolResult};
use crate::handle::PoolHandle;
use crate::pool::{Pool, PoolOptions, PoolStats};

/// Which of the manager's three pools an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolKind {
    Analysis,
    Synthesis,
    Cache,
}

#[derive(Debug, Clone, Copy)]
pub struct PoolManagerConfig {
    pub analysis_size: usize,
    pub synthesis_size: usize,
    pub cache_size: usize,
    pub alignment: usize,
    /// Fraction of a pool's capacity in use at which
    /// [`PoolManager::usage_warnings`] starts reporting it.
    pub warning_threshold: f64,
    /// How long the cache pool may sit with zero live allocations before
    /// [`PoolManager::advance_clock_ms`] resets it.
    pub cache_idle_timeout_ms: u64,
    /// Minimum size a pool may be rebuilt to by [`PoolManager::auto_tune`].
    pub min_pool_size: usize,
}

impl Default for PoolManagerConfig {
    fn default() -> Self {
        Self {
            analysis_size: 16 * 1024 * 1024,
            synthesis_size: 32 * 1024 * 1024,
            cache_size: 8 * 1024 * 1024,
            alignment: 32,
            warning_threshold: 0.85,
            cache_idle_timeout_ms: 5_000,
            min_pool_size: 1024 * 1024,
        }
    }
}

/// A pool whose usage ratio has crossed [`PoolManagerConfig::warning_threshold`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolUsageWarning {
    pub kind: PoolKind,
    pub usage_ratio: f64,
}

pub struct PoolManager {
    analysis: Pool,
    synthesis: Pool,
    cache: Pool,
    config: PoolManagerConfig,
    clock_ms: u64,
    cache_idle_since_ms: Option<u64>,
}

impl PoolManager {
    pub fn new(config: PoolManagerConfig) -> PoolResult<Self> {
        let options = PoolOptions { alignment: config.alignment, ..PoolOptions::default() };
        Ok(Self {
            analysis: Pool::create_with_options(config.analysis_size, options)?,
            synthesis: Pool::create_with_options(config.synthesis_size, options)?,
            cache: Pool::create_with_options(config.cache_size, options)?,
            config,
            clock_ms: 0,
            cache_idle_since_ms: None,
        })
    }

    fn pool(&self, kind: PoolKind) -> &Pool {
        match kind {
            PoolKind::Analysis => &self.analysis,
            PoolKind::Synthesis => &self.synthesis,
            PoolKind::Cache => &self.cache,
        }
    }

    fn pool_mut(&mut self, kind: PoolKind) -> &mut Pool {
        match kind {
            PoolKind::Analysis => &mut self.analysis,
            PoolKind::Synthesis => &mut self.synthesis,
            PoolKind::Cache => &mut self.cache,
        }
    }

    pub fn alloc(&mut self, kind: PoolKind, size: usize) -> PoolResult<PoolHandle> {
        let handle = self.pool_mut(kind).alloc(size)?;
        if kind == PoolKind::Cache {
            self.cache_idle_since_ms = None;
        }
        Ok(handle)
    }

    pub fn free(&mut self, kind: PoolKind, handle: PoolHandle) -> PoolResult<()> {
        self.pool_mut(kind).free(handle)?;
        if kind == PoolKind::Cache && self.cache.stats().used == 0 {
            self.cache_idle_since_ms = Some(self.clock_ms);
        }
        Ok(())
    }

    pub fn stats(&self, kind: PoolKind) -> PoolStats {
        self.pool(kind).stats()
    }

    pub fn get(&self, kind: PoolKind, handle: &PoolHandle) -> PoolResult<&[u8]> {
        self.pool(kind).get(handle)
    }

    pub fn get_mut(&mut self, kind: PoolKind, handle: &PoolHandle) -> PoolResult<&mut [u8]> {
        self.pool_mut(kind).get_mut(handle)
    }

    /// Advances the manager's clock, which in turn resets the cache pool
    /// once it has been idle (zero live allocations) for at least
    /// `cache_idle_timeout_ms`.
    pub fn advance_clock_ms(&mut self, delta_ms: u64) {
        self.clock_ms += delta_ms;
        self.analysis.advance_clock_ms(delta_ms);
        self.synthesis.advance_clock_ms(delta_ms);
        self.cache.advance_clock_ms(delta_ms);

        if let Some(idle_since) = self.cache_idle_since_ms {
            if self.clock_ms - idle_since >= self.config.cache_idle_timeout_ms {
                self.cache.reset();
                self.cache_idle_since_ms = None;
            }
        }
    }

    /// Reports every pool currently at or above the configured warning
    /// threshold.
    pub fn usage_warnings(&self) -> Vec<PoolUsageWarning> {
        [PoolKind::Analysis, PoolKind::Synthesis, PoolKind::Cache]
            .into_iter()
            .filter_map(|kind| {
                let stats = self.pool(kind).stats();
                let ratio = stats.used as f64 / stats.total as f64;
                (ratio >= self.config.warning_threshold)
                    .then_some(PoolUsageWarning { kind, usage_ratio: ratio })
            })
            .collect()
    }

    /// Coalesces `kind`'s pool in place: merges adjacent free blocks
    /// without touching any live allocation, so outstanding handles stay
    /// valid. Unlike [`PoolManager::auto_tune`], this never destroys or
    /// resizes the pool and is safe to call while allocations are live.
    pub fn compact(&mut self, kind: PoolKind) {
        self.pool_mut(kind).compact();
    }

    /// Rebuilds `kind`'s pool at `1.2 *` its observed peak usage,
    /// clamped to `min_pool_size`. Only valid while the pool is
    /// completely empty (rebuilding would otherwise orphan live
    /// handles), and is a no-op if the new size would not differ
    /// meaningfully (within 5%) from the current size.
    pub fn auto_tune(&mut self, kind: PoolKind) -> PoolResult<bool> {
        let stats = self.pool(kind).stats();
        if stats.used != 0 {
            return Err(PoolError::Busy);
        }
        let target = ((stats.peak as f64 * 1.2) as usize).max(self.config.min_pool_size);
        if target == 0 || (target as f64 - stats.total as f64).abs() / stats.total as f64 <= 0.05 {
            return Ok(false);
        }
        let options = PoolOptions { alignment: self.config.alignment, ..PoolOptions::default() };
        let rebuilt = Pool::create_with_options(target, options)?;
        *self.pool_mut(kind) = rebuilt;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_warning_triggers_near_capacity() {
        let mut manager = PoolManager::new(PoolManagerConfig {
            analysis_size: 1024,
            synthesis_size: 1024,
            cache_size: 1024,
            warning_threshold: 0.5,
            ..PoolManagerConfig::default()
        })
        .unwrap();
        manager.alloc(PoolKind::Analysis, 700).unwrap();
        let warnings = manager.usage_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, PoolKind::Analysis);
    }

    #[test]
    fn idle_cache_pool_resets_after_timeout() {
        let mut manager = PoolManager::new(PoolManagerConfig {
            cache_idle_timeout_ms: 1_000,
            ..PoolManagerConfig::default()
        })
        .unwrap();
        let handle = manager.alloc(PoolKind::Cache, 128).unwrap();
        manager.free(PoolKind::Cache, handle).unwrap();
        manager.advance_clock_ms(500);
        assert!(manager.stats(PoolKind::Cache).resets == 0);
        manager.advance_clock_ms(600);
        assert_eq!(manager.stats(PoolKind::Cache).resets, 1);
    }

    #[test]
    fn auto_tune_rejects_while_pool_in_use() {
        let mut manager = PoolManager::new(PoolManagerConfig::default()).unwrap();
        let handle = manager.alloc(PoolKind::Synthesis, 64).unwrap();
        assert!(manager.auto_tune(PoolKind::Synthesis).is_err());
        manager.free(PoolKind::Synthesis, handle).unwrap();
        assert!(manager.auto_tune(PoolKind::Synthesis).is_ok());
    }

    #[test]
    fn compact_merges_free_blocks_without_touching_live_allocations() {
        let mut manager = PoolManager::new(PoolManagerConfig::default()).unwrap();
        let a = manager.alloc(PoolKind::Analysis, 128).unwrap();
        let b = manager.alloc(PoolKind::Analysis, 128).unwrap();
        let c = manager.alloc(PoolKind::Analysis, 128).unwrap();
        manager.free(PoolKind::Analysis, a).unwrap();
        manager.free(PoolKind::Analysis, c).unwrap();
        manager.compact(PoolKind::Analysis);
        // b is still live and readable; compacting never relocates it.
        assert!(manager.get(PoolKind::Analysis, &b).is_ok());
    }

    #[test]
    fn auto_tune_rebuilds_to_120_percent_of_peak() {
        let mut manager = PoolManager::new(PoolManagerConfig {
            analysis_size: 1 << 20,
            min_pool_size: 1024,
            ..PoolManagerConfig::default()
        })
        .unwrap();
        let handle = manager.alloc(PoolKind::Analysis, 100_000).unwrap();
        manager.free(PoolKind::Analysis, handle).unwrap();
        let resized = manager.auto_tune(PoolKind::Analysis).unwrap();
        assert!(resized);
        let new_total = manager.stats(PoolKind::Analysis).total;
        assert!(new_total < 1 << 20);
        assert!(new_total >= (100_000f64 * 1.2) as usize);
    }
}
