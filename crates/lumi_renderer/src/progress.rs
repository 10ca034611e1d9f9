//! Shared progress counter and cancellation flag.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct ProgressState {
    completed: AtomicU64,
    total: AtomicU64,
    cancelled: AtomicBool,
}

/// Clonable handle observed by a UI thread while a trace runs.
///
/// The unit of work is one cache-seeding sample or one shaded pixel; a pixel
/// counts once however many sub-pixel rays it takes. A trace's total is
/// therefore `seed samples + width * height`, and it is complete when
/// `completed == total`. Cancelling is cooperative: workers check the flag
/// before every unit.
#[derive(Debug, Clone, Default)]
pub struct TraceProgress {
    state: Arc<ProgressState>,
}

impl TraceProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting towards `total`. A pending cancellation is kept.
    pub fn begin(&self, total: u64) {
        self.state.completed.store(0, Ordering::Relaxed);
        self.state.total.store(total, Ordering::Relaxed);
    }

    /// Clear the counter and any cancellation.
    pub fn reset(&self) {
        self.begin(0);
        self.resume();
    }

    #[inline]
    pub fn advance(&self, amount: u64) {
        self.state.completed.fetch_add(amount, Ordering::Relaxed);
    }

    pub fn completed(&self) -> u64 {
        self.state.completed.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.state.total.load(Ordering::Relaxed)
    }

    /// Completed share in `[0, 1]`; an empty trace counts as done.
    pub fn fraction(&self) -> f32 {
        let total = self.total();
        if total == 0 {
            return 1.0;
        }
        (self.completed() as f64 / total as f64).min(1.0) as f32
    }

    pub fn is_complete(&self) -> bool {
        self.completed() >= self.total()
    }

    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::Relaxed);
    }

    /// Clear a cancellation so the next trace runs normally.
    pub fn resume(&self) {
        self.state.cancelled.store(false, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Relaxed)
    }
}
