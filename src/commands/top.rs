//! Top command implementation.
//!
//! Asks a running collector for its top report and prints it.

use anyhow::{bail, Context, Result};
use proc_power_sampler::config::Config;
use proc_power_sampler::report::render_report;
use proc_power_sampler::TopReport;
use std::io::IsTerminal;
use std::time::Duration;
use tracing::debug;

/// Options of one `top` invocation.
#[derive(Debug, Clone)]
pub struct TopOptions {
    pub window: Duration,
    pub limit: Option<usize>,
    pub server: Option<String>,
    pub json: bool,
    pub no_color: bool,
}

/// Queries the collector and prints the report.
pub async fn command_top(config: &Config, opts: TopOptions) -> Result<()> {
    let base = opts
        .server
        .clone()
        .unwrap_or_else(|| format!("http://{}", config.listen_addr()));
    let limit = opts.limit.unwrap_or_else(|| config.top_n());
    let report = fetch_top(&base, opts.window, limit).await?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let color = !opts.no_color && std::io::stdout().is_terminal();
        print!("{}", render_report(&report, color));
    }
    Ok(())
}

/// Fetches a top report from the collector at `base`.
pub async fn fetch_top(base: &str, window: Duration, limit: usize) -> Result<TopReport> {
    let url = top_url(base, window, limit);
    debug!("Requesting {}", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("building HTTP client")?;

    let response = client.get(&url).send().await.with_context(|| {
        format!("could not reach the collector at {base} (is `proc-power-sampler run` running?)")
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("collector answered {}: {}", status, body.trim());
    }

    response
        .json()
        .await
        .context("collector sent an invalid report")
}

/// Builds the `/top` URL; the window is sent in whole seconds.
fn top_url(base: &str, window: Duration, limit: usize) -> String {
    // Sub-second windows round up so they stay positive.
    let secs = window.as_secs() + u64::from(window.subsec_nanos() > 0);
    format!(
        "{}/top?window={}s&limit={}",
        base.trim_end_matches('/'),
        secs,
        limit
    )
}
