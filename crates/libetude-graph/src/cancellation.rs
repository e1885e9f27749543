//! Cooperative cancellation.
//!
//! Resolves spec.md's open question on how a caller aborts a long
//! `execute` call: a shared flag, checked between nodes (sequential
//! runner) or between dispatch batches (parallel runner). There is no
//! forceful cancellation — an operator that blocks forever blocks the
//! flag-check too — matching a cooperative-cancellation style rather
//! than an OS-level interrupt the graph executor has no business doing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A shareable cancel flag. Clone to hand to the runner and keep a copy
/// to call [`CancellationToken::cancel`] from elsewhere (another
/// thread, a UI event handler).
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
