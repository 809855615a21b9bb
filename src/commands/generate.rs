//! Generate testdata command implementation.
//!
//! Writes a synthetic metrics capture that `run --source-file` can replay.

use anyhow::{Context, Result};
use chrono::Utc;
use proc_power_sampler::parser::LineFormat;
use rand::Rng;
use std::fmt::Write as FmtWrite;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Process names used for generated lines.
const PROCESS_NAMES: &[&str] = &[
    "WindowServer",
    "kernel_task",
    "Google Chrome Helper",
    "Safari",
    "Xcode",
    "mds_stores",
    "Finder",
    "Dock",
    "Spotlight",
    "cargo",
    "rustc",
    "node",
    "postgres",
    "Slack Helper",
    "coreaudiod",
];

/// Generates a synthetic capture with `processes` data lines.
pub fn command_generate_testdata(
    output: PathBuf,
    processes: usize,
    format: LineFormat,
) -> Result<()> {
    debug!(
        "Generating test data: processes={}, format={:?}, output={}",
        processes,
        format,
        output.display()
    );

    let content = generate_capture(&mut rand::thread_rng(), processes, format);
    fs::write(&output, &content)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "✅ Generated test data: {} processes in {}",
        processes,
        output.display()
    );

    Ok(())
}

/// Builds the capture text, including the header noise real sources print.
fn generate_capture(rng: &mut impl Rng, processes: usize, format: LineFormat) -> String {
    let mut out = String::new();
    match format {
        LineFormat::Powermetrics => {
            writeln!(
                out,
                "*** Sampled system activity ({}) (1000.00ms elapsed) ***",
                Utc::now().format("%a %b %e %H:%M:%S %Y")
            )
            .ok();
            writeln!(out).ok();
            writeln!(out, "*** Running tasks ***").ok();
            writeln!(out).ok();
        }
        LineFormat::Ps => {
            writeln!(out, "%CPU %MEM COMMAND").ok();
        }
    }

    for i in 0..processes {
        let base = PROCESS_NAMES[i % PROCESS_NAMES.len()];
        let name = if i < PROCESS_NAMES.len() {
            base.to_string()
        } else {
            format!("{} {}", base, i / PROCESS_NAMES.len() + 1)
        };

        // Mostly idle processes with a few heavy ones.
        let cpu: f64 = if rng.gen_bool(0.15) {
            rng.gen_range(20.0..100.0)
        } else {
            rng.gen_range(0.0..5.0)
        };
        let mem: f64 = rng.gen_range(0.1..8.0);

        match format {
            LineFormat::Powermetrics => {
                let idle_wake: f64 = rng.gen_range(0.0..300.0);
                let gpu: f64 = rng.gen_range(0.0..15.0);
                writeln!(
                    out,
                    "Process: {}, {:.2}, {:.2}, {:.2}, {:.2}",
                    name, cpu, idle_wake, gpu, mem
                )
                .ok();
            }
            LineFormat::Ps => {
                writeln!(out, "{:5.1} {:4.1} {}", cpu, mem, name).ok();
            }
        }
    }

    out
}
