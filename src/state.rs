//! Application state management for the collector daemon.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers and shared with the background collector task.

use prometheus::Registry;
use proc_power_sampler::config::Config;
use proc_power_sampler::{HealthStats, RetentionBuffer};
use std::sync::Arc;

use crate::metrics::SamplerMetrics;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// State shared across requests and the collector task.
pub struct AppState {
    pub registry: Registry,
    pub metrics: SamplerMetrics,
    /// The one retention buffer of this process.
    pub buffer: Arc<RetentionBuffer>,
    pub config: Arc<Config>,
    pub health_stats: Arc<HealthStats>,
}
