//! Concurrent execution of watermark jobs.
//!
//! ```text
//!                  ┌─ worker 1 ─┐
//! coordinator ──▶ jobs ─ worker 2 ─▶ results ──▶ Batch (Iterator)
//!  (discovery      └─ worker K ─┘   (2K slots)
//!   order, K slots)
//! ```
//!
//! - The coordinator feeds a bounded FIFO queue in discovery order and
//!   checks the [`CancelToken`] before every enqueue. It never blocks
//!   for long without looking at the token again.
//! - Each worker loops over the queue. Once the token is set, every job it
//!   still dequeues is reported as [`JobOutcome::Cancelled`] without being
//!   run, so each dispatched job produces exactly one [`JobResult`].
//! - Runner errors and panics stay inside the worker and become
//!   [`JobOutcome::Failed`].
//! - The result stream ends after the last worker exits. Completion order is
//!   not discovery order.

use crate::pipeline::{WatermarkError, WatermarkRequest};
use crossbeam_channel::{Receiver, SendTimeoutError, Sender, bounded};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// How long an enqueue waits for a free slot before re-checking cancellation.
const ENQUEUE_POLL: Duration = Duration::from_millis(50);

/// Shared, cloneable cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// The underlying flag, for signal handlers that set it directly.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

#[derive(Debug)]
pub enum JobOutcome {
    Written(PathBuf),
    Failed(WatermarkError),
    Cancelled,
}

#[derive(Debug)]
pub struct JobResult {
    pub source: PathBuf,
    pub outcome: JobOutcome,
}

/// Runs one job. Shared by reference between all workers.
pub trait JobRunner: Sync {
    fn run(&self, request: &WatermarkRequest) -> Result<PathBuf, WatermarkError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    /// Jobs handed to workers; each produced one result.
    pub dispatched: usize,
}

/// A running batch. Iterate it for results as they complete.
pub struct Batch {
    results: Receiver<JobResult>,
    coordinator: JoinHandle<usize>,
}

impl Iterator for Batch {
    type Item = JobResult;

    fn next(&mut self) -> Option<JobResult> {
        self.results.recv().ok()
    }
}

impl Batch {
    /// Wait for the batch to end, discarding results not yet consumed.
    pub fn finish(self) -> BatchSummary {
        for _ in self.results.iter() {}
        let dispatched = self.coordinator.join().unwrap_or_else(|_| {
            warn!("batch coordinator panicked");
            0
        });
        BatchSummary { dispatched }
    }
}

/// Start processing `jobs` on `concurrency` workers (at least one).
pub fn run<R>(
    jobs: Vec<WatermarkRequest>,
    runner: R,
    concurrency: usize,
    cancel: CancelToken,
) -> Batch
where
    R: JobRunner + Send + 'static,
{
    let workers = concurrency.max(1);
    let (job_tx, job_rx) = bounded::<WatermarkRequest>(workers);
    let (result_tx, result_rx) = bounded::<JobResult>(workers * 2);

    let coordinator = thread::spawn(move || {
        thread::scope(|s| {
            for _ in 0..workers {
                let queue = job_rx.clone();
                let results = result_tx.clone();
                let (runner, cancel) = (&runner, &cancel);
                s.spawn(move || work(runner, queue, results, cancel));
            }
            drop(job_rx);
            drop(result_tx);

            let dispatched = dispatch(jobs, &job_tx, &cancel);
            drop(job_tx);
            dispatched
        })
    });

    Batch {
        results: result_rx,
        coordinator,
    }
}

/// Enqueue `jobs` in order until done, cancelled, or no worker is left.
fn dispatch(
    jobs: Vec<WatermarkRequest>,
    queue: &Sender<WatermarkRequest>,
    cancel: &CancelToken,
) -> usize {
    let total = jobs.len();
    let mut dispatched = 0;
    for mut job in jobs {
        loop {
            if cancel.is_cancelled() {
                debug!(dispatched, total, "cancelled, stopping dispatch");
                return dispatched;
            }
            match queue.send_timeout(job, ENQUEUE_POLL) {
                Ok(()) => {
                    dispatched += 1;
                    break;
                }
                Err(SendTimeoutError::Timeout(back)) => job = back,
                Err(SendTimeoutError::Disconnected(_)) => return dispatched,
            }
        }
    }
    dispatched
}

fn work<R: JobRunner>(
    runner: &R,
    jobs: Receiver<WatermarkRequest>,
    results: Sender<JobResult>,
    cancel: &CancelToken,
) {
    for request in jobs.iter() {
        let outcome = if cancel.is_cancelled() {
            JobOutcome::Cancelled
        } else {
            run_guarded(runner, &request)
        };
        let result = JobResult {
            source: request.source,
            outcome,
        };
        if results.send(result).is_err() {
            // Nobody is listening any more.
            break;
        }
    }
}

fn run_guarded<R: JobRunner>(runner: &R, request: &WatermarkRequest) -> JobOutcome {
    match panic::catch_unwind(AssertUnwindSafe(|| runner.run(request))) {
        Ok(Ok(path)) => JobOutcome::Written(path),
        Ok(Err(e)) => JobOutcome::Failed(e),
        Err(payload) => JobOutcome::Failed(WatermarkError::Panicked(panic_message(&*payload))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
