//! HTTP endpoint handlers for the collector daemon.
//!
//! - `/top`: Top-N query over a trailing window (JSON)
//! - `/metrics`: Prometheus metrics endpoint
//! - `/health`: Health check endpoint
//! - `/doc`: Documentation endpoint

pub mod doc;
pub mod health;
pub mod metrics;
pub mod top;

// Re-export handlers
pub use doc::doc_handler;
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use top::top_handler;
