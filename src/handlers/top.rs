//! Top-N query endpoint.
//!
//! `GET /top?window=5m&limit=10` answers with a JSON `TopReport`.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use proc_power_sampler::query::{parse_window, top_report};
use proc_power_sampler::{QueryError, TopReport};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::state::SharedState;

/// Query string of `/top`.
#[derive(Debug, Deserialize)]
pub struct TopParams {
    pub window: String,
    pub limit: Option<usize>,
}

/// Error type for rejected top queries.
#[derive(Debug)]
pub struct TopError(QueryError);

impl IntoResponse for TopError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.0.to_string()).into_response()
    }
}

/// Handler for the /top endpoint.
#[instrument(skip(state))]
pub async fn top_handler(
    State(state): State<SharedState>,
    Query(params): Query<TopParams>,
) -> Result<Json<TopReport>, TopError> {
    let window = parse_window(&params.window).map_err(TopError)?;
    let limit = params.limit.unwrap_or_else(|| state.config.top_n());

    let report = top_report(&state.buffer, window, limit);
    debug!(
        "Top query over {:?}: {} rows of {} matched",
        window,
        report.rows.len(),
        report.matched
    );
    Ok(Json(report))
}
