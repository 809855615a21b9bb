//! Config command implementation.

use anyhow::{Context, Result};
use proc_power_sampler::config::{Config, ConfigFormat, DEFAULT_CONFIG_FILE};
use std::fs;
use std::path::PathBuf;

/// Writes a default configuration file.
pub fn command_config(output: Option<PathBuf>, format: ConfigFormat, commented: bool) -> Result<()> {
    let config = Config::default();
    let output = output.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut content = config.to_string_as(format)?;
    if commented && format == ConfigFormat::Yaml {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)
            .with_context(|| format!("failed to write {}", output.display()))?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# Proc Power Sampler Configuration
# =================================
#
# Retention
# ---------
# max_records: 10000           # Samples kept in memory (values below 1 mean 1)
#
# Collection
# ----------
# interval_secs: 1             # Sleep between collection cycles
# acquire_timeout_secs: 10     # Kill the source command after N seconds
# source: "ps"                 # "powermetrics" (macOS, needs root) or "ps"
# source_command: null         # Override the source program
# source_args: null            # Override the source arguments
# source_file: null            # Replay a captured output file instead
#
# HTTP API
# --------
# bind: "127.0.0.1"            # Bind IP of the running collector
# port: 9216                   # HTTP port
#
# Reports
# -------
# top_n: 10                    # Rows per top report
# log_level: "info"            # off, error, warn, info, debug, trace
"#;

    format!("{comments}\n{yaml}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_written_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        for (name, format) in [
            ("c.json", ConfigFormat::Json),
            ("c.yaml", ConfigFormat::Yaml),
            ("c.toml", ConfigFormat::Toml),
        ] {
            let path = dir.path().join(name);
            command_config(Some(path.clone()), format, true).unwrap();
            let content = fs::read_to_string(&path).unwrap();
            assert_eq!(
                Config::from_str_as(&content, format).unwrap(),
                Config::default()
            );
        }
    }
}
