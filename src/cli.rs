//! CLI arguments and subcommands for proc-power-sampler.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use proc_power_sampler::config::ConfigFormat;
use proc_power_sampler::parser::LineFormat;
use proc_power_sampler::query::parse_window;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "proc-power-sampler",
    about = "Samples per-process CPU, memory and energy usage and reports the top consumers",
    long_about = "Samples per-process CPU, memory and energy usage and reports the top consumers.\n\n\
                  `run` starts the background collector together with a small HTTP API; \
                  `top <duration>` asks the running collector for the heaviest processes \
                  over the trailing window.",
    author = "Michael Moll <proc-mem@herakles.io> - Herakles IO",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log level (default: `log_level` from the settings file, else info)
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    /// Settings file (JSON/YAML/TOML); created with defaults when missing
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "json")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the collector and its HTTP API (runs until SIGINT/SIGTERM)
    Run {
        /// Bind to specific interface/IP
        #[arg(long)]
        bind: Option<IpAddr>,

        /// HTTP listen port
        #[arg(short = 'p', long)]
        port: Option<u16>,

        /// Number of samples kept in memory (values below 1 mean 1)
        #[arg(long, allow_negative_numbers = true)]
        max_records: Option<i64>,

        /// Seconds to sleep between collection cycles
        #[arg(long)]
        interval_secs: Option<u64>,

        /// Line format of the metrics source
        #[arg(long, value_enum)]
        source: Option<LineFormat>,

        /// Replay this captured output file instead of running a command
        #[arg(short = 't', long)]
        source_file: Option<PathBuf>,
    },

    /// Show the top processes of the running collector over a trailing window
    Top {
        /// Trailing window, e.g. 30s, 5m, 2h
        #[arg(value_parser = parse_window_arg)]
        duration: Duration,

        /// Number of rows to show
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Base URL of the collector (default: from config bind/port)
        #[arg(long)]
        server: Option<String>,

        /// Print the raw JSON report
        #[arg(long)]
        json: bool,

        /// Disable ANSI colors
        #[arg(long)]
        no_color: bool,
    },

    /// Acquire and parse one batch from the configured source
    Check {
        /// Print every parsed sample
        #[arg(long)]
        verbose: bool,
    },

    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: ConfigFormat,

        /// Include comments (YAML only)
        #[arg(long)]
        commented: bool,
    },

    /// Generate a synthetic metrics capture for --source-file
    GenerateTestdata {
        /// Output file path
        #[arg(short = 'o', long, default_value = "testdata.txt")]
        output: PathBuf,

        /// Number of process lines to generate
        #[arg(long, default_value_t = 40)]
        processes: usize,

        /// Line format to generate
        #[arg(long, value_enum, default_value = "powermetrics")]
        format: LineFormat,
    },
}

fn parse_window_arg(input: &str) -> Result<Duration, String> {
    parse_window(input).map_err(|e| e.to_string())
}
