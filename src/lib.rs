//! Sampling-and-retention engine for per-process CPU, memory and energy usage.
//!
//! A [`collector::Collector`] acquires batches from a [`source::MetricsSource`]
//! once per interval and appends the parsed [`Sample`]s to a bounded
//! [`RetentionBuffer`]. [`query::top_processes`] ranks a trailing window of
//! that buffer.

pub mod buffer;
pub mod collector;
pub mod config;
pub mod health_stats;
pub mod parser;
pub mod query;
pub mod report;
pub mod sample;
pub mod source;

pub use buffer::RetentionBuffer;
pub use health_stats::HealthStats;
pub use query::{QueryError, TopReport};
pub use sample::Sample;
