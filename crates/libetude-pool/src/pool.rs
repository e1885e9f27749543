//! The dynamic (free-list) pool variant.
//!
//! Allocation strategy: first-fit over a single `Vec<Block>` kept sorted
//! by offset and always contiguous — this *is* the free-list and the
//! used-list at once, distinguished by `Block::free` (see `block.rs`).
//! First-fit is chosen over best-fit for O(1) average-case allocation on
//! typical workloads, per spec.md's stated rationale. Splitting leaves a
//! free remainder only when it is at least `min_block_size +
//! BLOCK_HEADER_SIZE`; freeing coalesces with both address neighbors.

use crate::block::{Block, BlockDebugInfo, BLOCK_HEADER_SIZE};
use crate::buffer::AlignedBuffer;
use crate::diagnostics::{Diagnostics, LeakInfo, PoolLogLevel};
use crate::error::{PoolError, PoolResult};
use crate::handle::PoolHandle;

/// Default SIMD-friendly alignment (spec.md §3).
pub const DEFAULT_ALIGNMENT: usize = 32;

/// Default minimum remainder size kept when splitting a block.
pub const DEFAULT_MIN_BLOCK_SIZE: usize = 64;

/// Construction options for [`Pool::create_with_options`].
#[derive(Debug, Clone, Copy)]
pub struct PoolOptions {
    pub alignment: usize,
    pub min_block_size: usize,
    pub thread_safety: bool,
    pub leak_detection: bool,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            alignment: DEFAULT_ALIGNMENT,
            min_block_size: DEFAULT_MIN_BLOCK_SIZE,
            thread_safety: false,
            leak_detection: false,
        }
    }
}

/// Point-in-time usage snapshot (spec.md §4.1 `stats`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolStats {
    pub total: usize,
    pub used: usize,
    pub peak: usize,
    pub free: usize,
    pub allocations: u64,
    pub frees: u64,
    pub resets: u64,
    /// External fragmentation: `largest_free_block / total_free`, in
    /// `[0, 1]`. `1.0` means free space is one contiguous block (no
    /// fragmentation); values near `0.0` mean free space is scattered
    /// across many small blocks.
    pub fragmentation_ratio: f64,
    pub leaked_bytes: usize,
    pub active_blocks: usize,
}

/// A contiguous, aligned, first-fit free-list allocator.
pub struct Pool {
    buffer: AlignedBuffer,
    blocks: Vec<Block>,
    alignment: u32,
    min_block_size: u32,
    used: usize,
    peak: usize,
    num_allocations: u64,
    num_frees: u64,
    num_resets: u64,
    next_generation: u32,
    diagnostics: Diagnostics,
    leak_cache: Vec<LeakInfo>,
}

fn round_up(value: usize, align: usize) -> usize {
    (value + align - 1) / align * align
}

fn align_up(offset: u32, align: u32) -> u32 {
    (offset + align - 1) / align * align
}

impl Pool {
    /// Creates a pool of `size` bytes aligned to `alignment` (must be a
    /// power of two). Fails with [`PoolError::OutOfMemory`] if the host
    /// allocator cannot satisfy the request.
    pub fn create(size: usize, alignment: usize) -> PoolResult<Self> {
        Self::create_with_options(
            size,
            PoolOptions {
                alignment,
                ..PoolOptions::default()
            },
        )
    }

    pub fn create_with_options(size: usize, options: PoolOptions) -> PoolResult<Self> {
        if size == 0 {
            return Err(PoolError::InvalidParameter("pool size must be non-zero"));
        }
        if !options.alignment.is_power_of_two() {
            return Err(PoolError::InvalidParameter("alignment must be a power of two"));
        }
        let buffer = AlignedBuffer::new(size, options.alignment)
            .ok_or(PoolError::OutOfMemory { requested: size, available: 0 })?;
        let total = buffer.len() as u32;
        Ok(Self {
            buffer,
            blocks: vec![Block { offset: 0, size: total, free: true, generation: 0, debug: None }],
            alignment: options.alignment as u32,
            min_block_size: options.min_block_size as u32,
            used: 0,
            peak: 0,
            num_allocations: 0,
            num_frees: 0,
            num_resets: 0,
            next_generation: 1,
            diagnostics: Diagnostics { enabled: options.leak_detection, ..Diagnostics::default() },
            leak_cache: Vec::new(),
        })
    }

    pub fn total_size(&self) -> usize {
        self.buffer.len()
    }

    pub fn alignment(&self) -> usize {
        self.alignment as usize
    }

    /// Advances the pool's internal clock, used by `check_leaks`'
    /// age calculation. The engine core has no wall-clock of its own
    /// (spec.md §6: a monotonic millisecond clock is a platform
    /// collaborator) so callers drive it explicitly.
    pub fn advance_clock_ms(&mut self, delta_ms: u64) {
        self.diagnostics.clock_ms += delta_ms;
    }

    fn find_block_index(&self, offset: u32) -> Option<usize> {
        self.blocks
            .binary_search_by(|b| {
                if offset < b.offset {
                    std::cmp::Ordering::Greater
                } else if offset >= b.end() {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .ok()
    }

    fn alloc_in_block(&mut self, idx: usize, aligned_offset: u32, consumed_end: u32) -> PoolHandle {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1).max(1);

        let block_start = self.blocks[idx].offset;
        let block_end = self.blocks[idx].end();
        let remainder = block_end - consumed_end;

        if remainder >= self.min_block_size + BLOCK_HEADER_SIZE {
            self.blocks[idx].size = consumed_end - block_start;
            self.blocks.insert(
                idx + 1,
                Block { offset: consumed_end, size: remainder, free: true, generation: 0, debug: None },
            );
        }
        self.blocks[idx].free = false;
        self.blocks[idx].generation = generation;

        self.used += self.blocks[idx].size as usize;
        self.peak = self.peak.max(self.used);
        self.num_allocations += 1;
        self.diagnostics.record(
            PoolLogLevel::Trace,
            "alloc",
            Some(aligned_offset),
            Some(consumed_end - aligned_offset),
            "success",
        );

        PoolHandle { offset: aligned_offset, len: consumed_end - aligned_offset, generation }
    }

    /// Allocates `size` bytes aligned to the pool's default alignment.
    pub fn alloc(&mut self, size: usize) -> PoolResult<PoolHandle> {
        self.alloc_aligned(size, self.alignment as usize)
    }

    /// Allocates `size` bytes aligned to `alignment` (a power of two,
    /// not required to equal the pool's default). Internally
    /// over-allocates and aligns within the chosen block.
    pub fn alloc_aligned(&mut self, size: usize, alignment: usize) -> PoolResult<PoolHandle> {
        if size == 0 {
            return Err(PoolError::InvalidParameter("allocation size must be non-zero"));
        }
        if !alignment.is_power_of_two() {
            return Err(PoolError::InvalidParameter("alignment must be a power of two"));
        }
        let alignment = alignment as u32;
        let extra = alignment.saturating_sub(self.alignment.min(alignment));
        let required = round_up(size + extra as usize, self.alignment as usize) as u32;

        let idx = self
            .blocks
            .iter()
            .position(|b| b.free && b.size >= required);

        let Some(idx) = idx else {
            let available = self.blocks.iter().filter(|b| b.free).map(|b| b.size as usize).sum();
            return Err(PoolError::OutOfMemory { requested: size, available });
        };

        let block_start = self.blocks[idx].offset;
        let aligned_offset = align_up(block_start, alignment);
        let consumed_end = round_up((aligned_offset as usize) + size, self.alignment as usize) as u32;
        debug_assert!(consumed_end <= self.blocks[idx].end());

        let handle = self.alloc_in_block(idx, aligned_offset, consumed_end);
        Ok(PoolHandle { offset: handle.offset, len: size as u32, generation: handle.generation })
    }

    /// Same as [`Pool::alloc`] but records `source_location` for leak
    /// reporting (only meaningful once [`Pool::enable_leak_detection`]
    /// is on).
    pub fn alloc_tracked(&mut self, size: usize, source_location: &str) -> PoolResult<PoolHandle> {
        let handle = self.alloc(size)?;
        if self.diagnostics.enabled {
            if let Some(idx) = self.find_block_index(handle.offset) {
                self.blocks[idx].debug = Some(BlockDebugInfo {
                    source_location: source_location.to_string(),
                    allocated_at_ms: self.diagnostics.clock_ms,
                });
            }
        }
        Ok(handle)
    }

    /// Frees a previously allocated handle. Fails with
    /// [`PoolError::InvalidParameter`] if the handle does not belong to
    /// this pool, has already been freed, or is stale (the pool was
    /// reset, or that region was freed and reallocated, since the
    /// handle was issued).
    pub fn free(&mut self, handle: PoolHandle) -> PoolResult<()> {
        let idx = self
            .find_block_index(handle.offset)
            .ok_or(PoolError::InvalidParameter("pointer does not belong to this pool"))?;

        if self.blocks[idx].free {
            return Err(PoolError::InvalidParameter("double free"));
        }
        if self.blocks[idx].generation != handle.generation {
            return Err(PoolError::InvalidParameter("stale handle (pool was reset or block reused)"));
        }

        self.used -= self.blocks[idx].size as usize;
        self.blocks[idx].free = true;
        self.blocks[idx].debug = None;
        self.coalesce_around(idx);
        self.num_frees += 1;
        self.diagnostics.record(PoolLogLevel::Trace, "free", Some(handle.offset), Some(handle.len), "success");
        Ok(())
    }

    fn coalesce_around(&mut self, idx: usize) {
        let mut idx = idx;
        if idx + 1 < self.blocks.len() && self.blocks[idx + 1].free {
            let next_size = self.blocks[idx + 1].size;
            self.blocks[idx].size += next_size;
            self.blocks.remove(idx + 1);
        }
        if idx > 0 && self.blocks[idx - 1].free {
            let this_size = self.blocks[idx].size;
            self.blocks[idx - 1].size += this_size;
            self.blocks.remove(idx);
            idx -= 1;
        }
        let _ = idx;
    }

    /// Returns every block to a single free block. `peak` is retained;
    /// `used` resets to zero. Every [`PoolHandle`] issued before the
    /// reset becomes permanently stale (generations are never reused).
    pub fn reset(&mut self) {
        let total = self.buffer.len() as u32;
        self.blocks = vec![Block { offset: 0, size: total, free: true, generation: 0, debug: None }];
        self.used = 0;
        self.num_resets += 1;
        self.diagnostics.record(PoolLogLevel::Info, "reset", None, None, "success");
    }

    /// Best-effort defragmentation: merges any adjacent free blocks.
    /// Never relocates a live allocation, so outstanding handles remain
    /// valid.
    pub fn compact(&mut self) {
        let mut i = 0;
        while i + 1 < self.blocks.len() {
            if self.blocks[i].free && self.blocks[i + 1].free {
                let next_size = self.blocks[i + 1].size;
                self.blocks[i].size += next_size;
                self.blocks.remove(i + 1);
            } else {
                i += 1;
            }
        }
        self.diagnostics.record(PoolLogLevel::Debug, "compact", None, None, "success");
    }

    pub fn enable_leak_detection(&mut self, on: bool) {
        self.diagnostics.enabled = on;
    }

    /// Flags every active allocation whose age is at least
    /// `threshold_ms` and returns the count. Results are cached for
    /// [`Pool::get_leaks`].
    pub fn check_leaks(&mut self, threshold_ms: u64) -> usize {
        if !self.diagnostics.enabled {
            self.leak_cache.clear();
            return 0;
        }
        let now = self.diagnostics.clock_ms;
        self.leak_cache = self
            .blocks
            .iter()
            .filter(|b| !b.free)
            .filter_map(|b| {
                let debug = b.debug.as_ref()?;
                let age = now.saturating_sub(debug.allocated_at_ms);
                (age >= threshold_ms).then(|| LeakInfo {
                    offset: b.offset,
                    size: b.size,
                    age_ms: age,
                    source_location: Some(debug.source_location.clone()),
                })
            })
            .collect();
        self.leak_cache.len()
    }

    pub fn get_leaks(&self) -> &[LeakInfo] {
        &self.leak_cache
    }

    /// Walks every block checking contiguity, alignment, and that no two
    /// adjacent free blocks slipped past coalescing.
    pub fn validate(&self) -> bool {
        if self.blocks.is_empty() {
            return false;
        }
        if self.blocks[0].offset != 0 {
            return false;
        }
        for (i, block) in self.blocks.iter().enumerate() {
            if block.size == 0 {
                return false;
            }
            if block.offset % self.alignment != 0 {
                return false;
            }
            if let Some(next) = self.blocks.get(i + 1) {
                if block.end() != next.offset {
                    return false;
                }
                if block.free && next.free {
                    return false;
                }
            }
        }
        self.blocks.last().unwrap().end() == self.buffer.len() as u32
    }

    pub fn stats(&self) -> PoolStats {
        let total = self.buffer.len();
        let free_blocks: Vec<u32> = self.blocks.iter().filter(|b| b.free).map(|b| b.size).collect();
        let total_free: u32 = free_blocks.iter().sum();
        let largest_free = free_blocks.iter().copied().max().unwrap_or(0);
        let fragmentation_ratio = if total_free == 0 {
            1.0
        } else {
            largest_free as f64 / total_free as f64
        };
        PoolStats {
            total,
            used: self.used,
            peak: self.peak,
            free: total - self.used,
            allocations: self.num_allocations,
            frees: self.num_frees,
            resets: self.num_resets,
            fragmentation_ratio,
            leaked_bytes: self.leak_cache.iter().map(|l| l.size as usize).sum(),
            active_blocks: self.blocks.iter().filter(|b| !b.free).count(),
        }
    }

    /// Borrows the bytes behind `handle`, validating it belongs to this
    /// pool and has not gone stale.
    pub fn get(&self, handle: &PoolHandle) -> PoolResult<&[u8]> {
        let idx = self
            .find_block_index(handle.offset)
            .ok_or(PoolError::InvalidParameter("pointer does not belong to this pool"))?;
        let block = &self.blocks[idx];
        if block.free || block.generation != handle.generation {
            return Err(PoolError::InvalidParameter("stale or freed handle"));
        }
        let start = handle.offset as usize;
        let end = start + handle.len as usize;
        Ok(&self.buffer.as_slice()[start..end])
    }

    pub fn get_mut(&mut self, handle: &PoolHandle) -> PoolResult<&mut [u8]> {
        let idx = self
            .find_block_index(handle.offset)
            .ok_or(PoolError::InvalidParameter("pointer does not belong to this pool"))?;
        let block = &self.blocks[idx];
        if block.free || block.generation != handle.generation {
            return Err(PoolError::InvalidParameter("stale or freed handle"));
        }
        let start = handle.offset as usize;
        let end = start + handle.len as usize;
        Ok(&mut self.buffer.as_mut_slice()[start..end])
    }
}
