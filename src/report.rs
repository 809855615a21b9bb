//! Plain-text rendering of top reports.

use std::fmt::Write as FmtWrite;

use crate::query::TopReport;
use crate::sample::Sample;

const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

/// Color for a CPU reading: red above 50, yellow above 20, green otherwise.
fn cpu_color(cpu_usage: f64) -> &'static str {
    if cpu_usage > 50.0 {
        RED
    } else if cpu_usage > 20.0 {
        YELLOW
    } else {
        GREEN
    }
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

/// Renders the ranked rows as a table, optionally with ANSI colors.
pub fn render_table(rows: &[Sample], color: bool) -> String {
    let (bold, reset) = if color { (BOLD, RESET) } else { ("", "") };
    let mut out = String::new();

    writeln!(out, "{bold}Top Processes by Power Usage:{reset}").ok();
    writeln!(
        out,
        "{bold}{:<30} {:<10} {:<10} {:<10} {:<10}{reset}",
        "Process", "CPU", "Idle Wake", "GPU", "Memory"
    )
    .ok();

    for sample in rows {
        let cpu = format!("{:<10.2}", sample.cpu_usage);
        let cpu = if color {
            format!("{}{cpu}{RESET}", cpu_color(sample.cpu_usage))
        } else {
            cpu
        };
        writeln!(
            out,
            "{:<30} {} {:<10} {:<10} {:<10.2}",
            truncate_name(&sample.name, 30),
            cpu,
            optional(sample.idle_wake),
            optional(sample.gpu_usage),
            sample.mem_usage
        )
        .ok();
    }

    out
}

/// Renders a full report including a summary line.
pub fn render_report(report: &TopReport, color: bool) -> String {
    let mut out = render_table(&report.rows, color);
    if report.rows.is_empty() {
        writeln!(out, "(no samples in the last {}s)", report.window_secs).ok();
    } else {
        writeln!(
            out,
            "\n{} of {} samples in the last {}s",
            report.rows.len(),
            report.matched,
            report.window_secs
        )
        .ok();
    }
    out
}

fn truncate_name(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        name.to_string()
    } else {
        let mut short: String = name.chars().take(width - 1).collect();
        short.push('…');
        short
    }
}
