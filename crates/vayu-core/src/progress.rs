//! Progress accounting for a run (bytes done, active time, rate, ETA).
//!
//! Rate and ETA are computed against *active* elapsed time: intervals spent
//! paused are excluded, so a long pause does not drag the rate down.

use std::time::{Duration, Instant};

/// Immutable view of a run's progress, published after every chunk and on
/// state transitions.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    /// Bytes copied so far across the run (never above `total_bytes`).
    pub copied_bytes: u64,
    /// Sum of the sizes of every job enqueued for the run.
    pub total_bytes: u64,
    /// Seconds spent actually copying, excluding paused intervals.
    pub active_elapsed_secs: f64,
    pub throughput_bytes_per_sec: f64,
    /// Estimated seconds remaining (None while the rate is unknown).
    pub eta_secs: Option<f64>,
    pub paused: bool,
    /// True once, when the queue has fully drained.
    pub completed: bool,
    /// Set on the last snapshot of a run that ended in `cancel()`.
    pub cancelled: bool,
}

impl ProgressSnapshot {
    pub fn idle() -> Self {
        Self {
            copied_bytes: 0,
            total_bytes: 0,
            active_elapsed_secs: 0.0,
            throughput_bytes_per_sec: 0.0,
            eta_secs: None,
            paused: false,
            completed: false,
            cancelled: false,
        }
    }

    /// Fraction complete in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.copied_bytes as f64 / self.total_bytes as f64).min(1.0)
    }
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}

/// Mutable accumulator behind the snapshots. Callers pass `now` explicitly so
/// the arithmetic is independent of the wall clock.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    total_bytes: u64,
    /// Sizes of jobs already finished in this run.
    finished_bytes: u64,
    current_job_size: u64,
    current_job_bytes: u64,
    accumulated_active: Duration,
    /// Start of the open active interval; None while paused or stopped.
    active_since: Option<Instant>,
    paused: bool,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset every counter for a new run of `total_bytes`.
    pub fn start_run(&mut self, total_bytes: u64, now: Instant) {
        *self = Self {
            total_bytes,
            active_since: Some(now),
            ..Self::default()
        };
    }

    /// Jobs were enqueued while the run was in progress.
    pub fn extend_total(&mut self, bytes: u64) {
        self.total_bytes += bytes;
    }

    /// The in-flight job failed. Bytes it already wrote stay counted; only the
    /// unwritten rest leaves the total, so neither counter moves backwards and
    /// a drained run still ends at 100%.
    pub fn fail_job(&mut self) {
        let unwritten = self.current_job_size - self.current_job_bytes;
        self.finished_bytes += self.current_job_bytes;
        self.total_bytes = self.total_bytes.saturating_sub(unwritten);
        self.current_job_size = 0;
        self.current_job_bytes = 0;
    }

    pub fn begin_job(&mut self, size_bytes: u64) {
        self.current_job_size = size_bytes;
        self.current_job_bytes = 0;
    }

    /// Cumulative bytes of the in-flight job, capped at its declared size.
    pub fn job_progress(&mut self, bytes_in_job: u64) {
        self.current_job_bytes = bytes_in_job.min(self.current_job_size);
    }

    pub fn finish_job(&mut self) {
        self.finished_bytes += self.current_job_size;
        self.current_job_size = 0;
        self.current_job_bytes = 0;
    }

    /// Close the open active interval. Returns false if already paused.
    pub fn pause(&mut self, now: Instant) -> bool {
        if self.paused {
            return false;
        }
        self.close_interval(now);
        self.paused = true;
        true
    }

    /// Open a new active interval. Returns false if not paused.
    pub fn resume(&mut self, now: Instant) -> bool {
        if !self.paused {
            return false;
        }
        self.paused = false;
        self.active_since = Some(now);
        true
    }

    /// Freeze the clock at the end of a run.
    pub fn stop(&mut self, now: Instant) {
        self.close_interval(now);
        self.paused = false;
    }

    fn close_interval(&mut self, now: Instant) {
        if let Some(since) = self.active_since.take() {
            self.accumulated_active += now.saturating_duration_since(since);
        }
    }

    pub fn copied_bytes(&self) -> u64 {
        (self.finished_bytes + self.current_job_bytes).min(self.total_bytes)
    }

    pub fn active_elapsed(&self, now: Instant) -> Duration {
        match self.active_since {
            Some(since) => self.accumulated_active + now.saturating_duration_since(since),
            None => self.accumulated_active,
        }
    }

    pub fn snapshot(&self, now: Instant, completed: bool) -> ProgressSnapshot {
        let copied_bytes = self.copied_bytes();
        let active_elapsed_secs = self.active_elapsed(now).as_secs_f64();
        let throughput_bytes_per_sec = if active_elapsed_secs > 0.0 {
            copied_bytes as f64 / active_elapsed_secs
        } else {
            0.0
        };
        let remaining = self.total_bytes - copied_bytes;
        let eta_secs = if remaining == 0 {
            Some(0.0)
        } else if throughput_bytes_per_sec > 0.0 {
            Some(remaining as f64 / throughput_bytes_per_sec)
        } else {
            None
        };
        ProgressSnapshot {
            copied_bytes,
            total_bytes: self.total_bytes,
            active_elapsed_secs,
            throughput_bytes_per_sec,
            eta_secs,
            paused: self.paused,
            completed,
            cancelled: false,
        }
    }
}
