//! Error kinds shared by every pool variant.

/// Failure modes for pool construction and allocation.
///
/// Mirrors the error taxonomy of the engine core (spec §7): allocation
/// exhaustion is reported, never panicked on, and API misuse is always
/// `InvalidParameter`.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// A caller-supplied parameter was invalid (bad alignment, zero size,
    /// unknown handle).
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// The pool cannot satisfy the allocation: no free block large enough.
    #[error("pool exhausted: requested {requested} bytes, {available} available")]
    OutOfMemory { requested: usize, available: usize },

    /// The mutex guarding a thread-safe pool could not be acquired without
    /// blocking (`try_*` APIs only).
    #[error("pool is busy")]
    Busy,
}

/// Result alias used throughout the pool crate.
pub type PoolResult<T> = Result<T, PoolError>;
