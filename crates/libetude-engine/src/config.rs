//! Configuration ingested from device-class policy layers (thermal,
//! power, desktop/mobile optimizers): the external contract those
//! layers tune, not their implementation.

use serde::{Deserialize, Serialize};

/// Per-purpose pool sizes, in bytes, forwarded to
/// [`libetude_pool::PoolManagerConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSizeConfig {
    pub analysis: usize,
    pub synthesis: usize,
    pub cache: usize,
}

impl Default for PoolSizeConfig {
    fn default() -> Self {
        Self { analysis: 16 * 1024 * 1024, synthesis: 32 * 1024 * 1024, cache: 8 * 1024 * 1024 }
    }
}

/// `{worker_count, max_pool_sizes[analysis|synthesis|cache],
/// simd_alignment (16|32|64), compaction_enabled,
/// streaming_cache_budget_bytes}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub worker_count: usize,
    pub max_pool_sizes: PoolSizeConfig,
    pub simd_alignment: u32,
    pub compaction_enabled: bool,
    pub streaming_cache_budget_bytes: usize,
}

impl Default for EngineConfig {
    /// Worker pool defaults to `min(available_parallelism, 8)`; pool
    /// alignment defaults to 32.
    fn default() -> Self {
        let worker_count = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1).min(8);
        Self {
            worker_count,
            max_pool_sizes: PoolSizeConfig::default(),
            simd_alignment: 32,
            compaction_enabled: true,
            streaming_cache_budget_bytes: 16 * 1024 * 1024,
        }
    }
}

impl EngineConfig {
    /// Parses a config from JSON, as a policy layer would load it from
    /// a device profile file.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_alignment_and_pool_sizes_match_spec() {
        let config = EngineConfig::default();
        assert_eq!(config.simd_alignment, 32);
        assert_eq!(config.max_pool_sizes.analysis, 16 * 1024 * 1024);
    }

    #[test]
    fn round_trips_through_json() {
        let config = EngineConfig::default();
        let json = config.to_json().unwrap();
        let parsed = EngineConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
