//! CLI command implementations for proc-power-sampler.
//!
//! This module provides implementations for all CLI subcommands:
//! - `run`: Collector daemon with HTTP API
//! - `top`: Query a running collector
//! - `check`: One-shot source acquisition
//! - `config`: Configuration file generation
//! - `generate-testdata`: Synthetic source captures

pub mod check;
pub mod config;
pub mod generate;
pub mod run;
pub mod top;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use generate::command_generate_testdata;
pub use run::command_run;
pub use top::command_top;
