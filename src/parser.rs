//! Line parsers for the external metrics sources.
//!
//! Two formats are understood:
//! - `powermetrics`: `Process: <name>, <cpu>, <idle wake>, <gpu>, <memory>`
//! - `ps`: `<pcpu> <pmem> <command...>` as printed by `ps -Ao pcpu=,pmem=,comm=`
//!
//! Parsing never fails loudly: a line is either a sample or "not a data line".

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::sample::Sample;

const PROCESS_PREFIX: &str = "Process: ";

/// First decimal or integer number inside a column.
static NUMBER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-+]?\d*\.\d+|\d+").expect("Invalid number regex"));

/// Line format emitted by the metrics source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LineFormat {
    Powermetrics,
    Ps,
}

impl LineFormat {
    /// Format of the default source on the current platform.
    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            LineFormat::Powermetrics
        } else {
            LineFormat::Ps
        }
    }
}

/// Result of parsing one acquired batch.
#[derive(Debug, Default)]
pub struct ParsedBatch {
    pub samples: Vec<Sample>,
    pub skipped: usize,
}

/// Parses one line into a sample stamped with `timestamp`.
pub fn parse_line(line: &str, format: LineFormat, timestamp: DateTime<Utc>) -> Option<Sample> {
    match format {
        LineFormat::Powermetrics => parse_powermetrics_line(line, timestamp),
        LineFormat::Ps => parse_ps_line(line, timestamp),
    }
}

/// Parses every line of a batch, keeping acquisition order.
pub fn parse_batch(lines: &[String], format: LineFormat, timestamp: DateTime<Utc>) -> ParsedBatch {
    let samples: Vec<Sample> = lines
        .par_iter()
        .filter_map(|line| parse_line(line, format, timestamp))
        .collect();
    let skipped = lines.len() - samples.len();
    ParsedBatch { samples, skipped }
}

fn parse_powermetrics_line(line: &str, timestamp: DateTime<Utc>) -> Option<Sample> {
    let rest = line.trim_end().strip_prefix(PROCESS_PREFIX)?;
    let parts: Vec<&str> = rest.split(',').collect();
    if parts.len() < 5 {
        return None;
    }

    let name = parts[0].trim();
    if name.is_empty() {
        return None;
    }

    // CPU is the ranking key, so a line without it is not a data line.
    let cpu_usage = extract_number(parts[1])?;
    let idle_wake = extract_number(parts[2]).unwrap_or(0.0);
    let gpu_usage = extract_number(parts[3]).unwrap_or(0.0);
    let mem_usage = extract_number(parts[4]).unwrap_or(0.0);

    Some(Sample::new(name, cpu_usage, mem_usage, timestamp).with_energy(idle_wake, gpu_usage))
}

fn parse_ps_line(line: &str, timestamp: DateTime<Utc>) -> Option<Sample> {
    let mut fields = line.split_whitespace();
    let cpu_field = fields.next()?;
    let mem_field = fields.next()?;
    let name = fields.collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        return None;
    }

    // Header lines ("%CPU %MEM COMMAND") fail here.
    let cpu_usage = cpu_field.parse::<f64>().ok()?;
    let mem_usage = mem_field.parse::<f64>().unwrap_or(0.0);

    Some(Sample::new(name, cpu_usage, mem_usage, timestamp))
}

fn extract_number(column: &str) -> Option<f64> {
    NUMBER_REGEX
        .find(column)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}
