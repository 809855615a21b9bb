//! Settings file handling.
//!
//! The settings file is optional and self-healing: when it is missing or
//! cannot be parsed, defaults are used and written back in the format given
//! by the file extension (`.json`, `.yaml`/`.yml`, `.toml`).

use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::buffer::DEFAULT_MAX_RECORDS;
use crate::parser::LineFormat;
use crate::source::default_command;

/// Settings file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "proc-power-sampler.json";

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 9216;
pub const DEFAULT_INTERVAL_SECS: u64 = 1;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_TOP_N: usize = 10;

/// Serialization format of a settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    /// Picks the format from a file extension, defaulting to JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            Some("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Sampler settings. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Retention buffer capacity; values below 1 are treated as 1.
    pub max_records: Option<i64>,
    pub interval_secs: Option<u64>,
    pub acquire_timeout_secs: Option<u64>,

    // HTTP API of the running collector
    pub bind: Option<String>,
    pub port: Option<u16>,

    // Metrics source
    pub source: Option<LineFormat>,
    pub source_command: Option<String>,
    pub source_args: Option<Vec<String>>,
    /// Replay this file every cycle instead of running a command.
    pub source_file: Option<PathBuf>,

    pub top_n: Option<usize>,
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_records: Some(DEFAULT_MAX_RECORDS as i64),
            interval_secs: Some(DEFAULT_INTERVAL_SECS),
            acquire_timeout_secs: Some(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            port: Some(DEFAULT_PORT),
            source: Some(LineFormat::platform_default()),
            source_command: None,
            source_args: None,
            source_file: None,
            top_n: Some(DEFAULT_TOP_N),
            log_level: Some("info".into()),
        }
    }
}

impl Config {
    /// Buffer capacity, clamped to at least one record.
    pub fn max_records(&self) -> usize {
        let raw = self.max_records.unwrap_or(DEFAULT_MAX_RECORDS as i64);
        usize::try_from(raw).unwrap_or(0).max(1)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS))
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(
            self.acquire_timeout_secs
                .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        )
    }

    pub fn line_format(&self) -> LineFormat {
        self.source.unwrap_or_else(LineFormat::platform_default)
    }

    /// Command and arguments used for acquisition.
    pub fn command(&self) -> (String, Vec<String>) {
        let (program, args) = default_command(self.line_format());
        (
            self.source_command.clone().unwrap_or(program),
            self.source_args.clone().unwrap_or(args),
        )
    }

    pub fn top_n(&self) -> usize {
        self.top_n.unwrap_or(DEFAULT_TOP_N)
    }

    /// Address of the collector's HTTP API.
    pub fn listen_addr(&self) -> String {
        format!(
            "{}:{}",
            self.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR),
            self.port.unwrap_or(DEFAULT_PORT)
        )
    }

    /// Renders the config in the given format.
    pub fn to_string_as(&self, format: ConfigFormat) -> Result<String> {
        Ok(match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
            ConfigFormat::Yaml => serde_yaml::to_string(self)?,
        })
    }

    /// Parses a config in the given format.
    pub fn from_str_as(content: &str, format: ConfigFormat) -> Result<Self> {
        Ok(match format {
            ConfigFormat::Json => serde_json::from_str(content)?,
            ConfigFormat::Toml => toml::from_str(content)?,
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
        })
    }

    /// Writes the config to `path` in the format of its extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_string_as(ConfigFormat::from_path(path))?;
        fs::write(path, content)
            .with_context(|| format!("failed to write config file {}", path.display()))
    }
}

/// Loads the settings file, falling back to defaults when it is missing or
/// malformed. The defaults are persisted so the next start finds a valid file.
pub fn load_or_heal(path: &Path) -> Config {
    let reason = match fs::read_to_string(path) {
        Ok(content) => match Config::from_str_as(&content, ConfigFormat::from_path(path)) {
            Ok(config) => {
                info!("Loaded configuration from: {}", path.display());
                return config;
            }
            Err(e) => format!("failed to parse: {e}"),
        },
        Err(e) => format!("failed to read: {e}"),
    };

    warn!(
        "Config file {} {}; using defaults and rewriting it",
        path.display(),
        reason
    );

    let config = Config::default();
    if let Err(e) = config.save(path) {
        warn!("Could not persist default config: {:#}", e);
    }
    config
}

/// Validates the effective config (used by --check-config and at startup).
pub fn validate_effective_config(cfg: &Config) -> Result<()> {
    if cfg.interval_secs == Some(0) {
        bail!("interval_secs must be > 0");
    }
    if cfg.acquire_timeout_secs == Some(0) {
        bail!("acquire_timeout_secs must be > 0");
    }
    if cfg.top_n == Some(0) {
        bail!("top_n must be > 0");
    }
    if let Some(bind) = cfg.bind.as_deref() {
        bind.parse::<IpAddr>()
            .with_context(|| format!("invalid bind address '{bind}'"))?;
    }
    if cfg.source_file.is_none() && cfg.command().0.trim().is_empty() {
        bail!("source_command must not be empty");
    }
    Ok(())
}
