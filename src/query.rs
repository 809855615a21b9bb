//! Top-N queries over a trailing window of the retention buffer.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::buffer::RetentionBuffer;
use crate::sample::Sample;

/// User errors in a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    InvalidDuration(String),
    ZeroDuration,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::InvalidDuration(msg) => {
                write!(f, "invalid duration ({msg}); expected e.g. 30s, 5m, 2h, 1h30m")
            }
            QueryError::ZeroDuration => write!(f, "duration must be greater than zero"),
        }
    }
}

impl std::error::Error for QueryError {}

/// Parses a positive, unit-suffixed time span such as `30s`, `5m` or `2h`.
pub fn parse_window(input: &str) -> Result<Duration, QueryError> {
    let window = humantime::parse_duration(input.trim())
        .map_err(|e| QueryError::InvalidDuration(e.to_string()))?;
    if window.is_zero() {
        return Err(QueryError::ZeroDuration);
    }
    Ok(window)
}

/// Ranked result of one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopReport {
    pub window_secs: f64,
    pub generated_at: DateTime<Utc>,
    /// Samples inside the window before truncation.
    pub matched: usize,
    pub rows: Vec<Sample>,
}

/// Sorts by CPU usage, highest first, and keeps the first `limit` entries.
/// The sort is stable, so equal CPU values keep their insertion order.
pub fn rank(mut samples: Vec<Arc<Sample>>, limit: usize) -> Vec<Arc<Sample>> {
    samples.sort_by(|a, b| b.cpu_usage.total_cmp(&a.cpu_usage));
    samples.truncate(limit);
    samples
}

/// Returns the `limit` heaviest samples recorded in `(now - window, now]`.
pub fn top_processes(
    buffer: &RetentionBuffer,
    window: Duration,
    limit: usize,
    now: DateTime<Utc>,
) -> (usize, Vec<Arc<Sample>>) {
    // Windows beyond chrono's range include everything.
    let since = chrono::Duration::from_std(window)
        .ok()
        .and_then(|w| now.checked_sub_signed(w))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let snapshot = buffer.snapshot(since);
    let matched = snapshot.len();
    (matched, rank(snapshot, limit))
}

/// Runs a query and packages it for serialization.
pub fn top_report(buffer: &RetentionBuffer, window: Duration, limit: usize) -> TopReport {
    let now = Utc::now();
    let (matched, rows) = top_processes(buffer, window, limit, now);
    TopReport {
        window_secs: window.as_secs_f64(),
        generated_at: now,
        matched,
        rows: rows.iter().map(|s| (**s).clone()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn names(samples: &[Arc<Sample>]) -> Vec<String> {
        samples.iter().map(|s| s.name.clone()).collect()
    }

    #[test]
    fn test_parse_window() {
        assert_eq!(parse_window("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_window("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_window("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_window("1h30m").unwrap(), Duration::from_secs(5400));
        assert!(matches!(parse_window("soon"), Err(QueryError::InvalidDuration(_))));
        assert!(matches!(parse_window(""), Err(QueryError::InvalidDuration(_))));
        assert_eq!(parse_window("0s"), Err(QueryError::ZeroDuration));
    }

    #[test]
    fn test_example_scenario_ranks_after_eviction() {
        let buffer = RetentionBuffer::new(3);
        buffer.append(Sample::new("A", 10.0, 0.0, at(1)));
        buffer.append(Sample::new("B", 90.0, 0.0, at(2)));
        buffer.append(Sample::new("C", 50.0, 0.0, at(3)));
        buffer.append(Sample::new("D", 20.0, 0.0, at(4)));

        let (matched, rows) = top_processes(&buffer, Duration::from_secs(3600), 10, at(5));
        assert_eq!(matched, 3);
        assert_eq!(names(&rows), vec!["B", "C", "D"]);
    }

    #[test]
    fn test_window_excludes_old_samples() {
        let buffer = RetentionBuffer::new(100);
        buffer.append(Sample::new("old", 99.0, 0.0, at(0)));
        buffer.append(Sample::new("edge", 98.0, 0.0, at(40)));
        buffer.append(Sample::new("new", 1.0, 0.0, at(90)));

        // since = 40, strictly after: "edge" is out.
        let (matched, rows) = top_processes(&buffer, Duration::from_secs(60), 10, at(100));
        assert_eq!(matched, 1);
        assert_eq!(names(&rows), vec!["new"]);
    }

    #[test]
    fn test_truncation() {
        let buffer = RetentionBuffer::new(100);
        for i in 0..15 {
            buffer.append(Sample::new(format!("p{i}"), i as f64, 0.0, at(i)));
        }
        let (_, rows) = top_processes(&buffer, Duration::from_secs(3600), 10, at(20));
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0].name, "p14");
        assert_eq!(rows[9].name, "p5");

        // since = 11: p12, p13 and p14 qualify.
        let (_, rows) = top_processes(&buffer, Duration::from_secs(4), 10, at(15));
        assert_eq!(names(&rows), vec!["p14", "p13", "p12"]);

        let (matched, rows) = top_processes(&buffer, Duration::from_secs(3), 10, at(500));
        assert_eq!(matched, 0);
        assert!(rows.is_empty());
    }

    #[test]
    fn test_empty_buffer_is_not_an_error() {
        let buffer = RetentionBuffer::new(10);
        let report = top_report(&buffer, Duration::from_secs(60), 10);
        assert_eq!(report.matched, 0);
        assert!(report.rows.is_empty());
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let samples: Vec<Arc<Sample>> = ["first", "second", "third", "fourth"]
            .iter()
            .zip([5.0, 7.0, 5.0, 5.0])
            .enumerate()
            .map(|(i, (name, cpu))| Arc::new(Sample::new(*name, cpu, 0.0, at(i as i64))))
            .collect();

        let ranked = rank(samples, 10);
        assert_eq!(names(&ranked), vec!["second", "first", "third", "fourth"]);
    }

    #[test]
    fn test_ranking_is_deterministic() {
        let buffer = RetentionBuffer::new(50);
        for i in 0..30 {
            buffer.append(Sample::new(format!("p{i}"), (i % 4) as f64, 0.0, at(i)));
        }
        let first = top_processes(&buffer, Duration::from_secs(100), 10, at(40));
        let second = top_processes(&buffer, Duration::from_secs(100), 10, at(40));
        assert_eq!(first, second);
    }

    #[test]
    fn test_huge_window_includes_everything() {
        let buffer = RetentionBuffer::new(10);
        buffer.append(Sample::new("a", 1.0, 0.0, at(0)));
        let (matched, _) = top_processes(&buffer, Duration::from_secs(u64::MAX), 10, at(1));
        assert_eq!(matched, 1);
    }
}
