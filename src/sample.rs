//! Per-process resource readings.
//!
//! A `Sample` is created once by the collector at parse time and never
//! mutated afterwards. The retention buffer stores samples behind `Arc` so
//! snapshots can share them without copying the process name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One process's resource reading at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub name: String,
    pub cpu_usage: f64,
    pub mem_usage: f64,
    /// Only reported by the richer (powermetrics) line format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_usage: Option<f64>,
    /// Only reported by the richer (powermetrics) line format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_wake: Option<f64>,
    /// Assigned by the collector when the batch was acquired.
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    /// Creates a sample with only CPU and memory readings.
    pub fn new(
        name: impl Into<String>,
        cpu_usage: f64,
        mem_usage: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            cpu_usage,
            mem_usage,
            gpu_usage: None,
            idle_wake: None,
            timestamp,
        }
    }

    /// Adds the energy readings reported by powermetrics.
    pub fn with_energy(mut self, idle_wake: f64, gpu_usage: f64) -> Self {
        self.idle_wake = Some(idle_wake);
        self.gpu_usage = Some(gpu_usage);
        self
    }
}
