use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Cancellation hook polled between units of work.
///
/// Polled before every cell, after every image load, and before every batch. Once it reports
/// `true` no further sheet is started or encoded.
pub trait CancelToken {
    /// Return `true` once the run should stop.
    fn is_cancelled(&self) -> bool;
}

/// A token that never cancels.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverCancel;

impl CancelToken for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

impl CancelToken for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl<F> CancelToken for F
where
    F: Fn() -> bool,
{
    fn is_cancelled(&self) -> bool {
        self()
    }
}

/// Shareable cancellation flag; clones observe the same state.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A flag in the "not cancelled" state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

impl CancelToken for CancelFlag {
    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Cooperative pacing between units of work.
pub trait Pacer {
    /// Give other work a chance to run; called every few cells and before each retry.
    fn yield_now(&self);
    /// Pause between batches so released memory can be reclaimed.
    fn settle(&self);
}

/// Pacer backed by the current thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThreadPacer {
    /// Pause inserted between batches.
    pub settle: Duration,
}

impl ThreadPacer {
    /// Default between-batch pause.
    pub const DEFAULT_SETTLE: Duration = Duration::from_millis(50);
}

impl Default for ThreadPacer {
    fn default() -> Self {
        Self {
            settle: Self::DEFAULT_SETTLE,
        }
    }
}

impl Pacer for ThreadPacer {
    fn yield_now(&self) {
        std::thread::yield_now();
    }

    fn settle(&self) {
        if !self.settle.is_zero() {
            std::thread::sleep(self.settle);
        }
    }
}

/// Pacer that never yields or settles, for tests and synchronous callers.
///
/// Retry delays are not pacing and are still waited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoPacer;

impl Pacer for NoPacer {
    fn yield_now(&self) {}

    fn settle(&self) {}
}

#[cfg(test)]
#[path = "../../tests/unit/session/pacing.rs"]
mod tests;
