//! Progress reporting for pool runs
//!
//! The worker pool calls [`ProgressReporter::report`] once per completed
//! unit of work with a monotonically increasing `completed` count and a
//! fixed `total`. Reporters only render; nothing in the pipeline depends on
//! them for correctness.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// Number of cells in the rendered bar
const BAR_WIDTH: usize = 50;

/// Receives completion counts from a running pool
pub trait ProgressReporter {
    /// Called once per completion; `completed == total` ends the run
    fn report(&self, completed: usize, total: usize);
}

/// Completed fraction clamped to `[0, 1]`
///
/// An empty run (`total == 0`) counts as finished.
///
/// # Examples
///
/// ```
/// use awsusers::progress::fraction;
///
/// assert_eq!(fraction(5, 10), 0.5);
/// assert_eq!(fraction(12, 10), 1.0);
/// assert_eq!(fraction(0, 0), 1.0);
/// ```
pub fn fraction(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 1.0;
    }
    (completed as f64 / total as f64).clamp(0.0, 1.0)
}

/// Interactive bar drawn on stderr
pub struct BarReporter {
    bar: ProgressBar,
}

impl BarReporter {
    pub fn new() -> Self {
        let style = ProgressStyle::with_template(&format!(
            "[{{bar:{}}}] {{pos}}/{{len}} {{msg}}",
            BAR_WIDTH
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#.");

        let bar = ProgressBar::new(0);
        bar.set_style(style);

        Self { bar }
    }

    /// True once a `completed == total` report has been received
    pub fn is_finished(&self) -> bool {
        self.bar.is_finished()
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl Default for BarReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for BarReporter {
    fn report(&self, completed: usize, total: usize) {
        if self.bar.is_finished() {
            return;
        }

        let completed = completed.min(total);
        self.bar.set_length(total as u64);
        self.bar.set_position(completed as u64);
        self.bar
            .set_message(format!("({:.1}%)", fraction(completed, total) * 100.0));

        if completed == total {
            self.bar.finish();
        }
    }
}

/// Non-interactive reporter that logs every 10% step
#[derive(Debug, Default)]
pub struct LogReporter {
    /// Highest decile already logged, plus one (0 means nothing logged yet)
    logged: AtomicUsize,
}

impl LogReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressReporter for LogReporter {
    fn report(&self, completed: usize, total: usize) {
        let ratio = fraction(completed, total);
        let decile = match total {
            0 => 11,
            _ => completed.min(total) * 10 / total + 1,
        };

        if self.logged.fetch_max(decile, Ordering::Relaxed) < decile {
            info!(
                "Progress: {}/{} ({:.1}%)",
                completed.min(total),
                total,
                ratio * 100.0
            );
        }
    }
}

/// Reporter that renders nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn report(&self, _completed: usize, _total: usize) {}
}
