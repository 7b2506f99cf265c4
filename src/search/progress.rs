// Progress tracking: global and per-worker counters, smoothed rate and ETA.
//
// The tracker never does I/O. The monitor thread feeds it totals, asks
// `should_display()`, and hands immutable snapshots to whatever renders
// them (the CLI's single-line progress bar, or nothing at all). The C
// original interleaved ANSI cursor movement with solution printing from
// inside the search; none of that survives here.

use std::time::{Duration, Instant};

/// EMA smoothing factor for the test rate.
const ALPHA_RATE: f64 = 0.2;

/// EMA smoothing factor for the ETA (heavier smoothing for stability).
const ALPHA_ETA: f64 = 0.5;

/// A worker with no update for this long is classified stalled.
const STALL_THRESHOLD: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// EMA helper
// ---------------------------------------------------------------------------

/// Exponential moving average; seeds with the sample on the first non-zero
/// observation and preserves the previous value for non-positive samples.
fn exponential_moving_average(sample: f64, previous: f64, alpha: f64) -> f64 {
    if previous == 0.0 {
        return sample.max(0.0);
    }
    if sample <= 0.0 {
        return previous;
    }
    alpha * sample + (1.0 - alpha) * previous
}

// ---------------------------------------------------------------------------
// Per-worker state
// ---------------------------------------------------------------------------

/// Snapshot-friendly per-worker progress record.
#[derive(Debug, Clone)]
pub struct WorkerProgress {
    pub local_completed: u64,
    pub local_rate: f64,
    pub start_time: Instant,
    pub last_update: Instant,
    pub completed_flag: bool,
    pub solutions_found: u64,
}

impl WorkerProgress {
    fn new(now: Instant) -> WorkerProgress {
        WorkerProgress {
            local_completed: 0,
            local_rate: 0.0,
            start_time: now,
            last_update: now,
            completed_flag: false,
            solutions_found: 0,
        }
    }

    /// Stalled: still running but silent past the threshold.
    pub fn is_stalled(&self, now: Instant) -> bool {
        !self.completed_flag && now.duration_since(self.last_update) >= STALL_THRESHOLD
    }
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Progress state for one search run.
#[derive(Debug)]
pub struct ProgressTracker {
    total_estimate: u128,
    completed: u64,
    completed_at_last_update: u64,
    start_time: Instant,
    last_update: Instant,
    last_display: Option<Instant>,
    smoothed_rate: f64,
    smoothed_eta: f64,
    solution_count: u64,
    progress_interval: Duration,
    workers: Vec<WorkerProgress>,
}

impl ProgressTracker {
    pub fn new(total_estimate: u128, progress_interval_ms: u64, worker_count: usize) -> Self {
        let now = Instant::now();
        ProgressTracker {
            total_estimate,
            completed: 0,
            completed_at_last_update: 0,
            start_time: now,
            last_update: now,
            last_display: None,
            smoothed_rate: 0.0,
            smoothed_eta: 0.0,
            solution_count: 0,
            progress_interval: Duration::from_millis(progress_interval_ms),
            workers: (0..worker_count).map(|_| WorkerProgress::new(now)).collect(),
        }
    }

    pub fn total_estimate(&self) -> u128 {
        self.total_estimate
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn solution_count(&self) -> u64 {
        self.solution_count
    }

    /// Record new global totals and refresh the smoothed rate and ETA.
    pub fn record(&mut self, completed: u64, solutions: u64) {
        let now = Instant::now();
        self.record_at(completed, solutions, now);
    }

    // Time-injected variant so the smoothing math is testable.
    fn record_at(&mut self, completed: u64, solutions: u64, now: Instant) {
        self.completed = completed;
        self.solution_count = solutions;

        let dt = now.duration_since(self.last_update).as_secs_f64();
        let instantaneous = if dt > 0.0 {
            completed.saturating_sub(self.completed_at_last_update) as f64 / dt
        } else {
            0.0
        };
        self.smoothed_rate =
            exponential_moving_average(instantaneous, self.smoothed_rate, ALPHA_RATE);

        if self.completed as u128 >= self.total_estimate {
            self.smoothed_eta = 0.0;
        } else if self.smoothed_rate > 0.0 {
            let remaining = self.total_estimate - self.completed as u128;
            let raw_eta = remaining as f64 / self.smoothed_rate;
            self.smoothed_eta = exponential_moving_average(raw_eta, self.smoothed_eta, ALPHA_ETA);
        }
        // Otherwise the previous smoothed ETA stands.

        self.completed_at_last_update = completed;
        self.last_update = now;
    }

    /// Record one worker's published progress.
    pub fn record_worker(&mut self, index: usize, local_completed: u64, solutions_found: u64) {
        let now = Instant::now();
        if let Some(worker) = self.workers.get_mut(index) {
            let dt = now.duration_since(worker.last_update).as_secs_f64();
            if dt > 0.0 {
                let delta = local_completed.saturating_sub(worker.local_completed) as f64;
                worker.local_rate = delta / dt;
            }
            worker.local_completed = local_completed;
            worker.solutions_found = solutions_found;
            worker.last_update = now;
        }
    }

    /// Mark a worker as done.
    pub fn finish_worker(&mut self, index: usize) {
        if let Some(worker) = self.workers.get_mut(index) {
            worker.completed_flag = true;
            worker.last_update = Instant::now();
        }
    }

    /// Render gate: true at most once per progress interval.
    pub fn should_display(&mut self) -> bool {
        let now = Instant::now();
        match self.last_display {
            Some(last) if now.duration_since(last) < self.progress_interval => false,
            _ => {
                self.last_display = Some(now);
                true
            }
        }
    }

    /// Immutable snapshot for rendering.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let now = Instant::now();
        ProgressSnapshot {
            total_estimate: self.total_estimate,
            completed: self.completed,
            percent: if self.total_estimate > 0 {
                (self.completed as f64 / self.total_estimate as f64 * 100.0).min(100.0)
            } else {
                100.0
            },
            rate: self.smoothed_rate,
            eta_seconds: self.smoothed_eta,
            elapsed: now.duration_since(self.start_time),
            solutions: self.solution_count,
            workers: self
                .workers
                .iter()
                .map(|w| WorkerSnapshot {
                    completed: w.local_completed,
                    rate: w.local_rate,
                    done: w.completed_flag,
                    stalled: w.is_stalled(now),
                    solutions_found: w.solutions_found,
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Point-in-time view of a worker, safe to hand to a renderer.
#[derive(Debug, Clone)]
pub struct WorkerSnapshot {
    pub completed: u64,
    pub rate: f64,
    pub done: bool,
    pub stalled: bool,
    pub solutions_found: u64,
}

/// Point-in-time view of the whole search, safe to hand to a renderer.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub total_estimate: u128,
    pub completed: u64,
    pub percent: f64,
    pub rate: f64,
    pub eta_seconds: f64,
    pub elapsed: Duration,
    pub solutions: u64,
    pub workers: Vec<WorkerSnapshot>,
}

/// Format a duration as its two most significant units (`2h 13m`, `45s`).
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "unknown".to_string();
    }
    let total = seconds as u64;
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let secs = total % 60;
    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

/// Format a count with a scale suffix (`1.5M`, `2.3B`).
pub fn format_count(value: u128) -> String {
    const SCALES: [(u128, &str); 4] = [
        (1_000_000_000_000, "T"),
        (1_000_000_000, "B"),
        (1_000_000, "M"),
        (1_000, "K"),
    ];
    for (scale, suffix) in SCALES {
        if value >= scale {
            return format!("{:.1}{suffix}", value as f64 / scale as f64);
        }
    }
    value.to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
