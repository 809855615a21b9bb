//! Health check endpoint handler.
//!
//! This module provides the `/health` endpoint handler that returns
//! collector statistics and retention buffer fill.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use proc_power_sampler::RetentionBuffer;
use std::fmt::Write as FmtWrite;
use tracing::{debug, instrument};

use crate::state::SharedState;

/// Handler for the /health endpoint.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");

    let stats = &state.health_stats;
    let total = stats.total_cycles();
    let failed = stats.failed_cycles();

    // Unhealthy once cycles have run and none of them succeeded.
    let (status, message) = if total == 0 {
        (StatusCode::OK, "OK - Waiting for first cycle")
    } else if failed == total {
        (StatusCode::SERVICE_UNAVAILABLE, "Acquisition failing")
    } else {
        (StatusCode::OK, "OK")
    };

    let table = stats.render_table();
    let buffer_section = render_buffer_health(&state.buffer);

    debug!("Health check: {} - {}", status, message);
    (
        status,
        [("Content-Type", "text/plain; charset=utf-8")],
        format!("{message}\n\n{table}\n{buffer_section}"),
    )
}

/// Renders retention buffer fill as plain text.
fn render_buffer_health(buffer: &RetentionBuffer) -> String {
    let len = buffer.len();
    let capacity = buffer.capacity();
    let mut out = String::new();
    writeln!(out, "RETENTION BUFFER").ok();
    writeln!(out, "================").ok();
    writeln!(out).ok();
    writeln!(out, "{:>10} | {:>10} | {:>6}", "Records", "Capacity", "Fill").ok();
    writeln!(out, "{}", "-".repeat(32)).ok();
    writeln!(
        out,
        "{:>10} | {:>10} | {:>5.1}%",
        len,
        capacity,
        len as f64 * 100.0 / capacity as f64
    )
    .ok();
    out
}
