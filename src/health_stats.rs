//! Running statistics about the collector, rendered on `/health`.

use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Point-in-time view of one running statistic.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatSnapshot {
    pub last: f64,
    pub avg: f64,
    pub max: f64,
    pub min: f64,
    pub count: u64,
}

#[derive(Clone, Copy, Default)]
struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
    }

    fn snapshot(&self) -> StatSnapshot {
        let avg = if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        };
        StatSnapshot {
            last: self.last,
            avg,
            max: self.max,
            min: self.min,
            count: self.count,
        }
    }
}

/// A `RunningStat` shared between the collector and readers.
#[derive(Default)]
struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    fn lock(&self) -> MutexGuard<'_, RunningStat> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn add_sample(&self, value: f64) {
        self.lock().add(value);
    }

    fn snapshot(&self) -> StatSnapshot {
        self.lock().snapshot()
    }
}

/// Collector statistics shared between the collector task and HTTP handlers.
pub struct HealthStats {
    samples_per_cycle: Stat,
    cycle_duration_seconds: Stat,
    lines_per_cycle: Stat,
    total_cycles: AtomicU64,
    failed_cycles: AtomicU64,
    samples_ingested: AtomicU64,
    lines_skipped: AtomicU64,
    samples_evicted: AtomicU64,
    started: Instant,
}

impl Default for HealthStats {
    fn default() -> Self {
        Self {
            samples_per_cycle: Stat::default(),
            cycle_duration_seconds: Stat::default(),
            lines_per_cycle: Stat::default(),
            total_cycles: AtomicU64::new(0),
            failed_cycles: AtomicU64::new(0),
            samples_ingested: AtomicU64::new(0),
            lines_skipped: AtomicU64::new(0),
            samples_evicted: AtomicU64::new(0),
            started: Instant::now(),
        }
    }
}

impl HealthStats {
    pub fn new() -> Self {
        Default::default()
    }

    /// Records a cycle whose batch was acquired and ingested.
    pub fn record_cycle(&self, lines: u64, samples: u64, skipped: u64, evicted: u64, duration: f64) {
        self.lines_per_cycle.add_sample(lines as f64);
        self.samples_per_cycle.add_sample(samples as f64);
        self.cycle_duration_seconds.add_sample(duration);
        self.samples_ingested.fetch_add(samples, Ordering::Relaxed);
        self.lines_skipped.fetch_add(skipped, Ordering::Relaxed);
        self.samples_evicted.fetch_add(evicted, Ordering::Relaxed);
        self.total_cycles.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a cycle skipped because acquisition failed.
    pub fn record_failure(&self, duration: f64) {
        self.cycle_duration_seconds.add_sample(duration);
        self.failed_cycles.fetch_add(1, Ordering::Relaxed);
        self.total_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles.load(Ordering::Relaxed)
    }

    pub fn failed_cycles(&self) -> u64 {
        self.failed_cycles.load(Ordering::Relaxed)
    }

    pub fn samples_ingested(&self) -> u64 {
        self.samples_ingested.load(Ordering::Relaxed)
    }

    pub fn lines_skipped(&self) -> u64 {
        self.lines_skipped.load(Ordering::Relaxed)
    }

    pub fn samples_evicted(&self) -> u64 {
        self.samples_evicted.load(Ordering::Relaxed)
    }

    /// Duration of the most recent cycle in seconds.
    pub fn last_cycle_duration(&self) -> f64 {
        self.cycle_duration_seconds.snapshot().last
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    pub fn render_table(&self) -> String {
        let left_col = 26usize;
        let col_w = 12usize;

        let mut out = String::new();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "metric",
            "current",
            "average",
            "max",
            "min",
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(out, "{}", "-".repeat(left_col + 3 + (col_w + 3) * 4)).ok();

        for (label, stat, precision) in [
            ("lines per cycle", self.lines_per_cycle.snapshot(), 0usize),
            ("samples per cycle", self.samples_per_cycle.snapshot(), 0),
            ("cycle duration (s)", self.cycle_duration_seconds.snapshot(), 3),
        ] {
            writeln!(
                out,
                "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
                label,
                format!("{:.p$}", stat.last, p = precision),
                format!("{:.p$}", stat.avg, p = precision.max(1)),
                format!("{:.p$}", stat.max, p = precision),
                format!("{:.p$}", stat.min, p = precision),
                left = left_col,
                col = col_w
            )
            .ok();
        }

        writeln!(out).ok();
        writeln!(out, "cycles: {} ({} failed)", self.total_cycles(), self.failed_cycles()).ok();
        writeln!(out, "samples ingested: {}", self.samples_ingested()).ok();
        writeln!(out, "samples evicted: {}", self.samples_evicted()).ok();
        writeln!(out, "lines skipped: {}", self.lines_skipped()).ok();
        writeln!(out, "uptime (s): {}", self.uptime_seconds()).ok();

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stat_tracks_min_max_avg() {
        let mut stat = RunningStat::default();
        for v in [4.0, 1.0, 7.0] {
            stat.add(v);
        }
        let snap = stat.snapshot();
        assert_eq!(snap.min, 1.0);
        assert_eq!(snap.max, 7.0);
        assert_eq!(snap.last, 7.0);
        assert_eq!(snap.count, 3);
        assert!((snap.avg - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_stat_snapshot_is_zeroed() {
        assert_eq!(Stat::default().snapshot(), StatSnapshot::default());
    }

    #[test]
    fn test_last_cycle_duration() {
        let stats = HealthStats::new();
        stats.record_cycle(1, 1, 0, 0, 0.5);
        stats.record_cycle(1, 1, 0, 0, 0.25);
        assert_eq!(stats.last_cycle_duration(), 0.25);
    }

    #[test]
    fn test_counters_and_table() {
        let stats = HealthStats::new();
        stats.record_cycle(10, 8, 2, 0, 0.05);
        stats.record_failure(0.01);

        assert_eq!(stats.total_cycles(), 2);
        assert_eq!(stats.failed_cycles(), 1);
        assert_eq!(stats.samples_ingested(), 8);
        assert_eq!(stats.lines_skipped(), 2);

        let table = stats.render_table();
        assert!(table.contains("samples per cycle"));
        assert!(table.contains("cycles: 2 (1 failed)"));
    }
}
