//! Structured allocator lifecycle logging and leak reporting.
//!
//! Grounded on `frankenlibc-core/src/malloc/allocator.rs`'s
//! `AllocatorLogLevel` / `AllocatorLogRecord`: rather than writing to a
//! global logger, the pool accumulates typed records a caller can query,
//! so tests and leak detectors don't need to capture stdout.

/// Severity of a pool lifecycle record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolLogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// One allocator lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolLogRecord {
    /// Monotonic event id within this pool.
    pub decision_id: u64,
    pub level: PoolLogLevel,
    /// `"alloc"`, `"free"`, `"reset"`, `"compact"`.
    pub event: &'static str,
    pub offset: Option<u32>,
    pub size: Option<u32>,
    pub outcome: &'static str,
}

/// A single suspected leak: an allocation older than the caller's
/// threshold that has not been freed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeakInfo {
    pub offset: u32,
    pub size: u32,
    pub age_ms: u64,
    pub source_location: Option<String>,
}

#[derive(Default)]
pub(crate) struct Diagnostics {
    pub(crate) enabled: bool,
    pub(crate) next_decision_id: u64,
    pub(crate) log: Vec<PoolLogRecord>,
    /// Monotonic clock, advanced only by the caller (via
    /// [`crate::Pool::advance_clock_ms`]) so leak-age tests are
    /// deterministic rather than wall-clock dependent.
    pub(crate) clock_ms: u64,
}

impl Diagnostics {
    pub(crate) fn record(
        &mut self,
        level: PoolLogLevel,
        event: &'static str,
        offset: Option<u32>,
        size: Option<u32>,
        outcome: &'static str,
    ) {
        if !self.enabled {
            return;
        }
        let decision_id = self.next_decision_id;
        self.next_decision_id += 1;
        self.log.push(PoolLogRecord {
            decision_id,
            level,
            event,
            offset,
            size,
            outcome,
        });
    }
}
