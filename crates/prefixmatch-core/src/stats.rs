//! Live throughput statistics

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use prefixmatch_pattern::{format_count, format_duration, format_rate};

/// Thread-safe check counter with a start time
#[derive(Debug)]
pub struct ThroughputStats {
    /// Total checks performed
    pub checks: AtomicU64,
    start_time: Instant,
    /// Cleared to ask workers to stop
    pub running: AtomicBool,
    /// Elapsed nanoseconds captured by `stop`, 0 while running
    stopped_nanos: AtomicU64,
}

impl ThroughputStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_checks(&self, count: u64) {
        self.checks.fetch_add(count, Ordering::Relaxed);
    }

    pub fn total_checks(&self) -> u64 {
        self.checks.load(Ordering::Relaxed)
    }

    /// Time since start, frozen once stopped
    pub fn elapsed(&self) -> Duration {
        match self.stopped_nanos.load(Ordering::Relaxed) {
            0 => self.start_time.elapsed(),
            nanos => Duration::from_nanos(nanos),
        }
    }

    pub fn checks_per_second(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.total_checks() as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stop workers and freeze the elapsed time. Later calls keep the first stop time.
    pub fn stop(&self) {
        let nanos = (self.start_time.elapsed().as_nanos() as u64).max(1);
        let _ = self
            .stopped_nanos
            .compare_exchange(0, nanos, Ordering::Relaxed, Ordering::Relaxed);
        self.running.store(false, Ordering::Relaxed);
    }

    /// Get formatted stats string
    pub fn format(&self) -> String {
        format!(
            "[{}][Total {}][Elapsed {}]",
            format_rate(self.checks_per_second()),
            format_count(self.total_checks()),
            format_duration(self.elapsed().as_secs_f64())
        )
    }
}

impl Default for ThroughputStats {
    fn default() -> Self {
        Self {
            checks: AtomicU64::new(0),
            start_time: Instant::now(),
            running: AtomicBool::new(true),
            stopped_nanos: AtomicU64::new(0),
        }
    }
}
