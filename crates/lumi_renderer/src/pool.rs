//! Fixed-size worker pool over contiguous index ranges.
//!
//! Each worker owns one range of work items and runs it to completion.
//! Results come back over a channel; the calling thread blocks on it and
//! logs progress whenever nothing arrives for one progress interval.

use std::any::Any;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use crate::config::MAX_WORKERS;
use crate::error::{TraceError, TraceResult};
use crate::progress::TraceProgress;

/// Split `0..total` into at most `workers` contiguous ranges.
///
/// Every range but the last holds `total / workers` items; the last one
/// absorbs the remainder. Never returns empty ranges.
pub fn partition(total: usize, workers: usize) -> Vec<Range<usize>> {
    if total == 0 {
        return Vec::new();
    }
    let workers = workers.clamp(1, total);
    let chunk = total / workers;

    (0..workers)
        .map(|i| {
            let start = i * chunk;
            let end = if i + 1 == workers { total } else { start + chunk };
            start..end
        })
        .collect()
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub struct WorkerPool {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl WorkerPool {
    /// Pool of `workers` named threads (clamped to `1..=MAX_WORKERS`).
    pub fn new(workers: usize) -> TraceResult<Self> {
        let workers = workers.clamp(1, MAX_WORKERS);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("lumi-worker-{}", i))
            .build()?;
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `job` once per range of [`partition`]`(total, workers)` and
    /// collect the results in range order.
    ///
    /// A panicking worker cancels `progress` so the others stop early, and
    /// the whole run fails with [`TraceError::WorkerPanicked`].
    pub fn run<T, F>(
        &self,
        total: usize,
        progress: &TraceProgress,
        progress_interval: Duration,
        job: F,
    ) -> TraceResult<Vec<T>>
    where
        T: Send + 'static,
        F: Fn(Range<usize>, &TraceProgress) -> T + Send + Sync + 'static,
    {
        let ranges = partition(total, self.workers);
        let job = Arc::new(job);
        let (tx, rx) = mpsc::channel();

        for (worker, range) in ranges.iter().cloned().enumerate() {
            let tx = tx.clone();
            let job = Arc::clone(&job);
            let progress = progress.clone();

            self.pool.spawn(move || {
                log::debug!("Worker {} started on items {:?}", worker, range);
                let result = panic::catch_unwind(AssertUnwindSafe(|| job(range, &progress)))
                    .map_err(panic_message);
                if result.is_err() {
                    progress.cancel();
                }
                // The receiver only disappears if the caller itself unwound
                let _ = tx.send((worker, result));
                log::debug!("Worker {} finished", worker);
            });
        }
        drop(tx);

        let mut slots: Vec<Option<T>> = (0..ranges.len()).map(|_| None).collect();
        let mut failure = None;
        let mut pending = ranges.len();

        while pending > 0 {
            match rx.recv_timeout(progress_interval) {
                Ok((worker, Ok(value))) => {
                    slots[worker] = Some(value);
                    pending -= 1;
                }
                Ok((worker, Err(message))) => {
                    log::warn!("Worker {} panicked: {}", worker, message);
                    if failure.is_none() {
                        failure = Some(TraceError::WorkerPanicked { worker, message });
                    }
                    pending -= 1;
                }
                Err(RecvTimeoutError::Timeout) => {
                    log::info!(
                        "Progress: {:.1}% ({}/{})",
                        progress.fraction() * 100.0,
                        progress.completed(),
                        progress.total()
                    );
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        if let Some(err) = failure {
            return Err(err);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(worker, slot)| {
                slot.ok_or_else(|| TraceError::WorkerPanicked {
                    worker,
                    message: "worker exited without reporting".to_string(),
                })
            })
            .collect()
    }
}
