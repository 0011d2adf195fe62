//! Run counters and throughput sampling

use crate::rewrite::RowOutcome;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Totals accumulated over one pass of the input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub lines_processed: u64,
    pub cells_processed: u64,
    pub cells_changed: u64,
    pub replacements_made: u64,
}

impl RunStatistics {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one transformed row to the totals
    pub fn record_row(&mut self, row: &RowOutcome) {
        self.lines_processed += 1;
        self.cells_processed += row.cells.len() as u64;
        self.cells_changed += row.cells_changed as u64;
        self.replacements_made += row.replacements;
    }
}

/// One throughput measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputSample {
    /// Lines processed when the sample was taken
    pub lines: u64,
    /// Cells per second over the last interval
    pub cells_per_sec: f64,
    /// Exponential moving average of `cells_per_sec`
    pub smoothed: f64,
}

/// Periodic cells-per-second sampler
///
/// Every `every` lines the rate over the interval since the previous sample
/// is folded into an exponential moving average with
/// `alpha = 2 / (window + 1)`.
#[derive(Debug, Clone)]
pub struct ThroughputMeter {
    every: u64,
    alpha: f64,
    mark: Instant,
    cells_at_mark: u64,
    smoothed: Option<f64>,
}

impl ThroughputMeter {
    /// Sample every `every` lines, smoothing over `window` samples
    pub fn new(every: u64, window: usize, start: Instant) -> Self {
        Self {
            every: every.max(1),
            alpha: 2.0 / (window.max(1) as f64 + 1.0),
            mark: start,
            cells_at_mark: 0,
            smoothed: None,
        }
    }

    /// Feed the running totals; returns a sample on every `every`-th line
    pub fn observe(&mut self, stats: &RunStatistics, now: Instant) -> Option<ThroughputSample> {
        if stats.lines_processed == 0 || stats.lines_processed % self.every != 0 {
            return None;
        }

        let elapsed = now.saturating_duration_since(self.mark);
        let cells = stats.cells_processed - self.cells_at_mark;
        let rate = rate_per_sec(cells, elapsed);

        let smoothed = match self.smoothed {
            Some(prev) => prev + self.alpha * (rate - prev),
            None => rate,
        };

        self.smoothed = Some(smoothed);
        self.mark = now;
        self.cells_at_mark = stats.cells_processed;

        Some(ThroughputSample {
            lines: stats.lines_processed,
            cells_per_sec: rate,
            smoothed,
        })
    }
}

fn rate_per_sec(cells: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        cells as f64 / secs
    } else {
        0.0
    }
}
