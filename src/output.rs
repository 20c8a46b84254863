//! CLI output formatting.
//!
//! One line per finished job, then a summary in directory mode:
//!
//! ```text
//! ==> Stamping 3 photos from photos/ (4 workers)
//! wrote out/a_watermarked.jpg
//! failed photos/sub/broken.jpg: Failed to decode image: ...
//! wrote out/sub/b_watermarked.png
//! Stamped 2 photos, 1 failed
//! ```
//!
//! Each `format_*` function is pure and returns the text; the `print_*`
//! wrappers do the writing. Successes go to stdout, failures and
//! cancellations to stderr.

use crate::batch::{JobOutcome, JobResult};
use std::path::Path;

/// Tally of finished jobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub written: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl BatchStats {
    pub fn record(&mut self, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Written(_) => self.written += 1,
            JobOutcome::Failed(_) => self.failed += 1,
            JobOutcome::Cancelled => self.cancelled += 1,
        }
    }

    pub fn finished(&self) -> usize {
        self.written + self.failed + self.cancelled
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{n} {}", if n == 1 { one } else { many })
}

/// Header printed before a directory run starts.
pub fn format_start(jobs: usize, root: &Path, workers: usize) -> String {
    format!(
        "==> Stamping {} from {} ({})",
        plural(jobs, "photo", "photos"),
        root.display(),
        plural(workers, "worker", "workers")
    )
}

/// The outcome line for one job.
pub fn format_result(result: &JobResult) -> String {
    match &result.outcome {
        JobOutcome::Written(path) => format!("wrote {}", path.display()),
        JobOutcome::Failed(err) => format!("failed {}: {}", result.source.display(), err),
        JobOutcome::Cancelled => format!("cancelled {}", result.source.display()),
    }
}

/// Closing line of a directory run.
///
/// `planned` is the number of jobs discovered; any that were never
/// dispatched because of cancellation are reported as not started.
pub fn format_summary(stats: &BatchStats, planned: usize) -> String {
    let mut line = format!("Stamped {}", plural(stats.written, "photo", "photos"));
    if stats.failed > 0 {
        line.push_str(&format!(", {} failed", stats.failed));
    }
    if stats.cancelled > 0 {
        line.push_str(&format!(", {} cancelled", stats.cancelled));
    }
    let not_started = planned.saturating_sub(stats.finished());
    if not_started > 0 {
        line.push_str(&format!(", {not_started} not started"));
    }
    line
}

pub fn print_start(jobs: usize, root: &Path, workers: usize) {
    println!("{}", format_start(jobs, root, workers));
}

/// Print a job's outcome line to stdout or stderr.
pub fn print_result(result: &JobResult) {
    let line = format_result(result);
    match result.outcome {
        JobOutcome::Written(_) => println!("{line}"),
        JobOutcome::Failed(_) | JobOutcome::Cancelled => eprintln!("{line}"),
    }
}

pub fn print_summary(stats: &BatchStats, planned: usize) {
    println!("{}", format_summary(stats, planned));
}
