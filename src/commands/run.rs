//! Run command implementation: the collector daemon.
//!
//! One process owns the retention buffer. The collector task appends to it
//! and the HTTP handlers query it, so `top` sees live data.

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use prometheus::Registry;
use proc_power_sampler::collector::Collector;
use proc_power_sampler::config::Config;
use proc_power_sampler::source::{CommandSource, FileSource, MetricsSource};
use proc_power_sampler::{HealthStats, RetentionBuffer};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{net::TcpListener, signal, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::handlers::{doc_handler, health_handler, metrics_handler, top_handler};
use crate::metrics::SamplerMetrics;
use crate::state::{AppState, SharedState};

/// Starts the collector and HTTP API; returns after SIGINT/SIGTERM.
pub async fn command_run(config: Config) -> Result<()> {
    info!("Starting proc-power-sampler collector");

    let buffer = Arc::new(RetentionBuffer::new(config.max_records()));
    let health_stats = Arc::new(HealthStats::new());

    let registry = Registry::new();
    let metrics = SamplerMetrics::new(&registry).context("failed to register metrics")?;
    debug!("Prometheus registry initialized");

    let state: SharedState = Arc::new(AppState {
        registry,
        metrics,
        buffer: Arc::clone(&buffer),
        config: Arc::new(config.clone()),
        health_stats: Arc::clone(&health_stats),
    });

    let cancel = CancellationToken::new();

    let collector_task = match &config.source_file {
        Some(path) => spawn_collector(FileSource::new(path), &config, &state, cancel.clone()),
        None => {
            let (program, args) = config.command();
            let source = CommandSource::new(program, args, config.acquire_timeout());
            spawn_collector(source, &config, &state, cancel.clone())
        }
    };

    let addr: SocketAddr = config
        .listen_addr()
        .parse()
        .with_context(|| format!("invalid listen address {}", config.listen_addr()))?;

    let app = router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("proc-power-sampler listening on http://{}", addr);

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            cancel.cancel();
        });
    }

    let server = axum::serve(listener, app).with_graceful_shutdown(cancel.clone().cancelled_owned());
    if let Err(e) = server.await {
        error!("Server error: {}", e);
        cancel.cancel();
        if let Err(join_err) = collector_task.await {
            error!("Collector task failed: {}", join_err);
        }
        return Err(e.into());
    }

    // Let the in-flight cycle finish before exiting.
    cancel.cancel();
    if let Err(e) = collector_task.await {
        error!("Collector task failed: {}", e);
    }

    info!("proc-power-sampler stopped gracefully");
    Ok(())
}

/// HTTP API of the collector daemon.
pub(crate) fn router(state: SharedState) -> Router {
    Router::new()
        .route("/top", get(top_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/doc", get(doc_handler))
        .with_state(state)
}

fn spawn_collector<S>(
    source: S,
    config: &Config,
    state: &SharedState,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    S: MetricsSource + 'static,
{
    let collector = Collector::new(
        source,
        config.line_format(),
        Arc::clone(&state.buffer),
        Arc::clone(&state.health_stats),
        config.interval(),
    );
    tokio::spawn(collector.run(cancel))
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::top::fetch_top;
    use chrono::Utc;
    use proc_power_sampler::Sample;
    use std::time::Duration;

    async fn serve_buffer(samples: &[(&str, f64)], top_n: usize) -> String {
        let buffer = Arc::new(RetentionBuffer::new(100));
        let now = Utc::now();
        for (name, cpu) in samples {
            buffer.append(Sample::new(*name, *cpu, 1.0, now));
        }

        let mut config = Config::default();
        config.top_n = Some(top_n);
        let registry = Registry::new();
        let metrics = SamplerMetrics::new(&registry).unwrap();
        let state: SharedState = Arc::new(AppState {
            registry,
            metrics,
            buffer,
            config: Arc::new(config),
            health_stats: Arc::new(HealthStats::new()),
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router(state)).await });
        format!("http://{addr}")
    }

    fn names(report: &proc_power_sampler::TopReport) -> Vec<&str> {
        report.rows.iter().map(|s| s.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_top_endpoint_rejects_bad_windows() {
        let base = serve_buffer(&[("a", 1.0)], 10).await;
        let client = reqwest::Client::new();

        for window in ["soon", "0s"] {
            let response = client
                .get(format!("{base}/top?window={window}"))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_top_endpoint_ranks_and_truncates() {
        let base = serve_buffer(&[("A", 10.0), ("B", 90.0), ("C", 50.0), ("D", 20.0)], 2).await;

        let report = fetch_top(&base, Duration::from_secs(60), 3).await.unwrap();
        assert_eq!(report.matched, 4);
        assert_eq!(names(&report), vec!["B", "C", "D"]);

        let report = fetch_top(&base, Duration::from_secs(60), 0).await.unwrap();
        assert!(report.rows.is_empty());
    }

    #[tokio::test]
    async fn test_top_endpoint_defaults_to_configured_top_n() {
        let base = serve_buffer(&[("A", 10.0), ("B", 90.0), ("C", 50.0)], 2).await;

        let report: proc_power_sampler::TopReport = reqwest::get(format!("{base}/top?window=1m"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(names(&report), vec!["B", "C"]);
    }

    #[tokio::test]
    async fn test_fetch_top_reports_rejections() {
        let base = serve_buffer(&[], 10).await;
        let err = fetch_top(&format!("{base}/nope"), Duration::from_secs(1), 1)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }
}
