//! Acquisition of raw metrics text.
//!
//! A source produces one batch of lines per collector cycle. The subprocess
//! source drains the child's stdout to EOF line by line, so large outputs
//! are never truncated at a fixed read size.

use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::parser::LineFormat;

/// Produces batches of raw lines for the collector.
pub trait MetricsSource: Send + Sync {
    /// Acquires one complete batch of lines.
    fn acquire(&self) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Human readable description used in logs.
    fn describe(&self) -> String;
}

/// Default command and arguments for a line format.
pub fn default_command(format: LineFormat) -> (String, Vec<String>) {
    match format {
        LineFormat::Powermetrics => (
            "powermetrics".to_string(),
            [
                "--samplers",
                "cpu_power,gpu_power,disk_power,network_power",
                "--show-process-energy",
                "--show-process-gpu",
                "--show-process-network",
                "--show-process-disk",
                "-i",
                "1000",
                "-n",
                "1",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        ),
        LineFormat::Ps => (
            "ps".to_string(),
            ["-Ao", "pcpu=,pmem=,comm="]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        ),
    }
}

/// Runs an external command once per cycle and collects its stdout.
#[derive(Debug, Clone)]
pub struct CommandSource {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSource {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    async fn run_once(&self) -> Result<Vec<String>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start {}", self.program))?;

        let stdout = child
            .stdout
            .take()
            .context("child stdout was not captured")?;

        // Raw segments: process names are not guaranteed to be UTF-8.
        let mut reader = BufReader::new(stdout).split(b'\n');
        let mut lines = Vec::new();
        while let Some(raw) = reader
            .next_segment()
            .await
            .with_context(|| format!("failed to read output of {}", self.program))?
        {
            lines.push(decode_line(&raw));
        }

        let status = child
            .wait()
            .await
            .with_context(|| format!("failed to wait for {}", self.program))?;
        if !status.success() {
            bail!("{} exited with {}", self.program, status);
        }

        debug!("{} produced {} lines", self.program, lines.len());
        Ok(lines)
    }
}

impl MetricsSource for CommandSource {
    async fn acquire(&self) -> Result<Vec<String>> {
        match tokio::time::timeout(self.timeout, self.run_once()).await {
            Ok(result) => result,
            // Dropping the future kills the child (kill_on_drop).
            Err(_) => bail!(
                "{} did not finish within {}s",
                self.program,
                self.timeout.as_secs_f64()
            ),
        }
    }

    fn describe(&self) -> String {
        format!("command `{} {}`", self.program, self.args.join(" "))
    }
}

/// Decodes one output line; invalid UTF-8 becomes U+FFFD instead of failing
/// the whole batch.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Replays a captured output file on every cycle.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MetricsSource for FileSource {
    async fn acquire(&self) -> Result<Vec<String>> {
        let content = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("failed to read source file {}", self.path.display()))?;
        Ok(String::from_utf8_lossy(&content)
            .lines()
            .map(str::to_string)
            .collect())
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_file_source_reads_every_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 0..5_000 {
            writeln!(file, "Process: p{i}, {i}.0, 0, 0, 1").unwrap();
        }

        let source = FileSource::new(file.path());
        let lines = source.acquire().await.unwrap();
        assert_eq!(lines.len(), 5_000);
        assert_eq!(lines[4_999], "Process: p4999, 4999.0, 0, 0, 1");
    }

    #[tokio::test]
    async fn test_file_source_keeps_lines_around_invalid_utf8() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"Process: a, 10, 0, 0, 1\nProcess: caf\xff, 5, 0, 0, 1\nProcess: b, 20, 0, 0, 1\n")
            .unwrap();

        let lines = FileSource::new(file.path()).acquire().await.unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Process: a, 10, 0, 0, 1");
        assert_eq!(lines[1], "Process: caf\u{FFFD}, 5, 0, 0, 1");
        assert_eq!(lines[2], "Process: b, 20, 0, 0, 1");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_source_keeps_lines_around_invalid_utf8() {
        let source = CommandSource::new(
            "sh",
            vec![
                "-c".to_string(),
                "printf 'Process: a, 10, 0, 0, 1\\nProcess: caf\\377, 5, 0, 0, 1\\r\\nProcess: b, 20, 0, 0, 1\\n'"
                    .to_string(),
            ],
            Duration::from_secs(5),
        );
        let lines = source.acquire().await.unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "Process: caf\u{FFFD}, 5, 0, 0, 1");
        assert_eq!(lines[2], "Process: b, 20, 0, 0, 1");
    }

    #[test]
    fn test_decode_line() {
        assert_eq!(decode_line(b"ps line\r"), "ps line");
        assert_eq!(decode_line(b"\xfe\xff"), "\u{FFFD}\u{FFFD}");
    }

    #[tokio::test]
    async fn test_file_source_missing_file_is_an_error() {
        let source = FileSource::new("/nonexistent/proc-power-sampler/input.txt");
        assert!(source.acquire().await.is_err());
    }

    #[tokio::test]
    async fn test_missing_command_is_an_error() {
        let source = CommandSource::new(
            "proc-power-sampler-no-such-binary",
            Vec::new(),
            Duration::from_secs(1),
        );
        assert!(source.acquire().await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_output_is_drained_past_64k() {
        // ~190 KB of output, well past a single fixed-size read.
        let source = CommandSource::new(
            "sh",
            vec![
                "-c".to_string(),
                "i=0; while [ $i -lt 10000 ]; do echo \"Process: p$i, 1.0, 0, 0, 1\"; i=$((i+1)); done"
                    .to_string(),
            ],
            Duration::from_secs(30),
        );
        let lines = source.acquire().await.unwrap();
        assert_eq!(lines.len(), 10_000);
        assert_eq!(lines[9_999], "Process: p9999, 1.0, 0, 0, 1");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_an_error() {
        let source = CommandSource::new(
            "sh",
            vec!["-c".to_string(), "echo partial; exit 3".to_string()],
            Duration::from_secs(5),
        );
        assert!(source.acquire().await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_command_times_out() {
        let source = CommandSource::new(
            "sleep",
            vec!["5".to_string()],
            Duration::from_millis(100),
        );
        let err = source.acquire().await.unwrap_err();
        assert!(err.to_string().contains("did not finish"));
    }
}
