//! Block bookkeeping for the dynamic pool variant.
//!
//! Blocks are kept in a single `Vec<Block>`, always sorted by `offset`
//! and always contiguous (no gaps, no overlaps) — the vector itself is
//! the free-list *and* the used-list, distinguished by `Block::free`.
//! This mirrors the teacher allocator's offset-based bookkeeping
//! (`frankenlibc-core/src/malloc/allocator.rs::MallocState`, which
//! tracks allocations by logical offset in a `HashMap` rather than by
//! real pointer) while adding the doubly-linked neighbor structure
//! spec.md's block header describes, expressed as vector adjacency
//! instead of `prev`/`next` pointers.

/// Conceptual per-block bookkeeping overhead, used only to decide
/// whether a split leaves a usable remainder. The engine does not store
/// this many bytes in the buffer itself — it is accounting, not layout.
pub const BLOCK_HEADER_SIZE: u32 = 32;

/// Optional debug metadata attached to a block when leak detection is on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDebugInfo {
    /// Caller-supplied source location tag (e.g. `"file.rs:42"`).
    pub source_location: String,
    /// Milliseconds since the pool's leak-detection clock was armed.
    pub allocated_at_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub offset: u32,
    pub size: u32,
    pub free: bool,
    /// Bumped every time this offset range transitions free -> allocated.
    /// A [`crate::PoolHandle`] captured at allocation time must match this
    /// value or the handle is stale.
    pub generation: u32,
    pub debug: Option<BlockDebugInfo>,
}

impl Block {
    pub fn end(&self) -> u32 {
        self.offset + self.size
    }
}
