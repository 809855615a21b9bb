//! Documentation endpoint handler.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::{debug, instrument};

use crate::state::SharedState;

/// Handler for the /doc endpoint.
#[instrument(skip(state))]
pub async fn doc_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /doc request");

    let version = env!("CARGO_PKG_VERSION");
    let doc = format!(
        r#"PROC POWER SAMPLER - DOCUMENTATION
==================================

VERSION: {}
DESCRIPTION: Samples per-process CPU, memory and energy usage and reports the top consumers

HTTP ENDPOINTS
--------------
GET /top?window=5m&limit=10  - Top processes by CPU over the trailing window (JSON)
GET /metrics                 - Prometheus metrics endpoint
GET /health                  - Collector statistics (plain text)
GET /doc                     - This documentation (plain text)

WINDOW SYNTAX
-------------
A positive time span with unit suffixes: 30s, 5m, 2h, 1h30m.
Samples recorded strictly after (now - window) are ranked by CPU usage,
ties keep collection order.

CURRENT SETTINGS
----------------
max_records:    {}
interval_secs:  {}
source:         {:?}
top_n:          {}
"#,
        version,
        state.buffer.capacity(),
        state.config.interval().as_secs(),
        state.config.line_format(),
        state.config.top_n(),
    );

    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        doc,
    )
}
