//! The periodic collector loop.
//!
//! Each cycle acquires one batch from the metrics source, parses it and
//! appends the samples to the retention buffer. The buffer lock is only
//! taken for the append itself. Failures are absorbed per cycle: a bad line
//! is skipped and a failed acquisition skips the cycle.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::buffer::RetentionBuffer;
use crate::health_stats::HealthStats;
use crate::parser::{parse_batch, LineFormat};
use crate::source::MetricsSource;

/// What happened during one collector cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Ingested {
        lines: usize,
        samples: usize,
        skipped: usize,
        evicted: usize,
    },
    AcquireFailed,
}

/// Drives periodic acquisition into a shared retention buffer.
pub struct Collector<S> {
    source: S,
    format: LineFormat,
    buffer: Arc<RetentionBuffer>,
    stats: Arc<HealthStats>,
    interval: Duration,
}

impl<S: MetricsSource> Collector<S> {
    pub fn new(
        source: S,
        format: LineFormat,
        buffer: Arc<RetentionBuffer>,
        stats: Arc<HealthStats>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            format,
            buffer,
            stats,
            interval,
        }
    }

    /// Runs one acquisition, parse and append cycle.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let start = Instant::now();

        let lines = match self.source.acquire().await {
            Ok(lines) => lines,
            Err(e) => {
                warn!("Acquisition from {} failed: {:#}", self.source.describe(), e);
                self.stats.record_failure(start.elapsed().as_secs_f64());
                return CycleOutcome::AcquireFailed;
            }
        };

        let batch = parse_batch(&lines, self.format, Utc::now());
        if batch.skipped > 0 {
            trace!("Skipped {} non-data lines", batch.skipped);
        }

        let samples = batch.samples.len();
        let evicted = self.buffer.extend(batch.samples);

        self.stats.record_cycle(
            lines.len() as u64,
            samples as u64,
            batch.skipped as u64,
            evicted as u64,
            start.elapsed().as_secs_f64(),
        );

        debug!(
            "Cycle ingested {} samples from {} lines ({} skipped, {} evicted, buffer {}/{})",
            samples,
            lines.len(),
            batch.skipped,
            evicted,
            self.buffer.len(),
            self.buffer.capacity()
        );

        CycleOutcome::Ingested {
            lines: lines.len(),
            samples,
            skipped: batch.skipped,
            evicted,
        }
    }

    /// Runs cycles until `cancel` fires. Cancellation is observed between
    /// cycles, so an in-flight cycle always completes.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            "Collector started: {} every {}s, capacity {}",
            self.source.describe(),
            self.interval.as_secs_f64(),
            self.buffer.capacity()
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            self.run_cycle().await;

            // Fixed sleep after each cycle; drift is acceptable.
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!(
            "Collector stopped after {} cycles ({} samples retained)",
            self.stats.total_cycles(),
            self.buffer.len()
        );
    }
}
