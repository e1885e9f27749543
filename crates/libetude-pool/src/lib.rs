//! Pooled, aligned, leak-tracked memory allocation for the LibEtude
//! engine core.
//!
//! This crate is the engine's only source of heap memory: tensors,
//! graph execution scratch space, and loaded model layers all live in
//! offsets handed out by a [`Pool`] or [`FixedPool`], never in ad hoc
//! `Vec`/`Box` allocations. Two variants cover the two access patterns
//! the engine needs:
//!
//! - [`Pool`]: a general first-fit free-list allocator for variable-size,
//!   variable-lifetime allocations (tensor storage, layer buffers).
//! - [`FixedPool`]: a bitmap-indexed slot allocator for fixed-size,
//!   high-churn allocations (per-frame audio chunks).
//!
//! [`PoolManager`] wraps the three pools the engine needs at runtime
//! (analysis / synthesis / cache) and adds usage monitoring, idle-driven
//! cache reclamation, and size auto-tuning.

mod block;
mod buffer;
mod diagnostics;
mod error;
mod fixed;
mod handle;
mod manager;
mod pool;
mod sync;

pub use block::BlockDebugInfo;
pub use diagnostics::{LeakInfo, PoolLogLevel, PoolLogRecord};
pub use error::{PoolError, PoolResult};
pub use fixed::{FixedPool, FixedPoolStats};
pub use handle::PoolHandle;
pub use manager::{PoolKind, PoolManager, PoolManagerConfig, PoolUsageWarning};
pub use pool::{Pool, PoolOptions, PoolStats, DEFAULT_ALIGNMENT, DEFAULT_MIN_BLOCK_SIZE};
pub use sync::ThreadSafePool;
