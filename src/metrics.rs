//! Prometheus metrics definitions for proc-power-sampler.
//!
//! Collector counters are mirrored from `HealthStats` at scrape time; the
//! top-N gauges are recomputed from the retention buffer on every scrape.

use std::time::Duration;

use prometheus::{Gauge, GaugeVec, Opts, Registry};
use proc_power_sampler::query::top_processes;
use proc_power_sampler::{HealthStats, RetentionBuffer};

/// Window used for the top-N gauges.
pub const TOP_METRICS_WINDOW: Duration = Duration::from_secs(60);

/// Collection of Prometheus metrics describing the collector.
#[derive(Clone)]
pub struct SamplerMetrics {
    pub buffer_records: Gauge,
    pub buffer_capacity: Gauge,
    pub cycles_total: Gauge,
    pub acquire_failures_total: Gauge,
    pub samples_ingested_total: Gauge,
    pub samples_evicted_total: Gauge,
    pub lines_skipped_total: Gauge,
    pub cycle_duration: Gauge,

    // Top-N over TOP_METRICS_WINDOW
    pub top_cpu_usage: GaugeVec,
    pub top_mem_usage: GaugeVec,
}

impl SamplerMetrics {
    /// Creates and registers all Prometheus metrics with the registry.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let buffer_records = Gauge::new(
            "proc_power_buffer_records",
            "Number of samples currently retained",
        )?;
        let buffer_capacity = Gauge::new(
            "proc_power_buffer_capacity",
            "Maximum number of samples retained",
        )?;
        let cycles_total = Gauge::new(
            "proc_power_cycles_total",
            "Collector cycles run since start",
        )?;
        let acquire_failures_total = Gauge::new(
            "proc_power_acquire_failures_total",
            "Collector cycles skipped because acquisition failed",
        )?;
        let samples_ingested_total = Gauge::new(
            "proc_power_samples_ingested_total",
            "Samples appended to the retention buffer",
        )?;
        let samples_evicted_total = Gauge::new(
            "proc_power_samples_evicted_total",
            "Samples evicted by capacity pressure",
        )?;
        let lines_skipped_total = Gauge::new(
            "proc_power_lines_skipped_total",
            "Source lines that were not data lines",
        )?;
        let cycle_duration = Gauge::new(
            "proc_power_cycle_duration_seconds",
            "Duration of the most recent collector cycle",
        )?;

        let top_cpu_usage = GaugeVec::new(
            Opts::new(
                "proc_power_top_cpu_usage",
                "Top-N samples by CPU usage over the last minute",
            ),
            &["rank", "name"],
        )?;
        let top_mem_usage = GaugeVec::new(
            Opts::new(
                "proc_power_top_mem_usage",
                "Memory usage of the top-N CPU samples over the last minute",
            ),
            &["rank", "name"],
        )?;

        registry.register(Box::new(buffer_records.clone()))?;
        registry.register(Box::new(buffer_capacity.clone()))?;
        registry.register(Box::new(cycles_total.clone()))?;
        registry.register(Box::new(acquire_failures_total.clone()))?;
        registry.register(Box::new(samples_ingested_total.clone()))?;
        registry.register(Box::new(samples_evicted_total.clone()))?;
        registry.register(Box::new(lines_skipped_total.clone()))?;
        registry.register(Box::new(cycle_duration.clone()))?;
        registry.register(Box::new(top_cpu_usage.clone()))?;
        registry.register(Box::new(top_mem_usage.clone()))?;

        Ok(Self {
            buffer_records,
            buffer_capacity,
            cycles_total,
            acquire_failures_total,
            samples_ingested_total,
            samples_evicted_total,
            lines_skipped_total,
            cycle_duration,
            top_cpu_usage,
            top_mem_usage,
        })
    }

    /// Refreshes every metric from the collector state.
    pub fn update(&self, buffer: &RetentionBuffer, stats: &HealthStats, top_n: usize) {
        self.buffer_records.set(buffer.len() as f64);
        self.buffer_capacity.set(buffer.capacity() as f64);
        self.cycles_total.set(stats.total_cycles() as f64);
        self.acquire_failures_total.set(stats.failed_cycles() as f64);
        self.samples_ingested_total.set(stats.samples_ingested() as f64);
        self.samples_evicted_total.set(stats.samples_evicted() as f64);
        self.lines_skipped_total.set(stats.lines_skipped() as f64);
        self.cycle_duration.set(stats.last_cycle_duration());

        // Stale rank/name pairs must not survive into the next scrape.
        self.top_cpu_usage.reset();
        self.top_mem_usage.reset();

        let (_, rows) = top_processes(buffer, TOP_METRICS_WINDOW, top_n, chrono::Utc::now());
        for (i, sample) in rows.iter().enumerate() {
            let rank = (i + 1).to_string();
            let labels = [rank.as_str(), sample.name.as_str()];
            self.top_cpu_usage
                .with_label_values(&labels)
                .set(sample.cpu_usage);
            self.top_mem_usage
                .with_label_values(&labels)
                .set(sample.mem_usage);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{Encoder, TextEncoder};
    use proc_power_sampler::Sample;

    #[test]
    fn test_update_exports_buffer_and_top_metrics() {
        let registry = Registry::new();
        let metrics = SamplerMetrics::new(&registry).unwrap();

        let buffer = RetentionBuffer::new(8);
        let now = chrono::Utc::now();
        buffer.append(Sample::new("busy", 80.0, 5.0, now));
        buffer.append(Sample::new("idle", 0.5, 1.0, now));

        let stats = HealthStats::new();
        stats.record_cycle(3, 2, 1, 0, 0.02);

        metrics.update(&buffer, &stats, 10);

        let mut out = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut out)
            .unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("proc_power_buffer_records 2"));
        assert!(text.contains("proc_power_buffer_capacity 8"));
        assert!(text.contains("proc_power_lines_skipped_total 1"));
        assert!(text.contains(r#"proc_power_top_cpu_usage{name="busy",rank="1"} 80"#));
    }
}
