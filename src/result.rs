//! Benchmark result types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Measurement produced by one call to the iteration controller.
///
/// Only `ops` and `duration` are stored; per-op latency and throughput are
/// always derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Iterations performed by the final run.
    pub ops: u64,
    /// Measured time of the final run.
    #[serde(rename = "duration_ns", with = "duration_serde")]
    pub duration: Duration,
    /// Standard deviation of ns/op from the variance pass.
    #[serde(rename = "stddev_ns", skip_serializing_if = "Option::is_none", default)]
    pub stddev: Option<f64>,
    /// Bytes processed by a single op (for throughput calculation).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bytes_per_op: Option<u64>,
}

impl BenchmarkResult {
    pub fn new(ops: u64, duration: Duration) -> Self {
        Self {
            ops,
            duration,
            stddev: None,
            bytes_per_op: None,
        }
    }

    /// Nanoseconds per op, or 0 when no ops ran.
    pub fn ns_per_op(&self) -> f64 {
        if self.ops == 0 {
            return 0.0;
        }
        self.duration.as_nanos() as f64 / self.ops as f64
    }

    /// Ops per second, or 0 when no time was measured.
    pub fn ops_per_sec(&self) -> f64 {
        if self.duration.is_zero() {
            return 0.0;
        }
        self.ops as f64 / self.duration.as_secs_f64()
    }

    /// Bytes per second, when bytes per op were recorded.
    pub fn bytes_per_sec(&self) -> Option<f64> {
        self.bytes_per_op
            .map(|bytes| bytes as f64 * self.ops_per_sec())
    }

    /// Compare against a baseline result.
    ///
    /// Returns the ratio of ns/op: `self / baseline`.
    /// - `< 1.0` means faster (improvement)
    /// - `> 1.0` means slower (regression)
    ///
    /// A baseline with zero ns/op compares as 1.0 so it never reports a
    /// regression.
    pub fn compare(&self, baseline: &BenchmarkResult) -> f64 {
        let base = baseline.ns_per_op();
        if base == 0.0 {
            return 1.0;
        }
        self.ns_per_op() / base
    }

    /// Check if this result is more than `threshold` slower than `baseline`.
    ///
    /// `threshold` is a fraction: 0.05 means 5%.
    pub fn is_regression(&self, baseline: &BenchmarkResult, threshold: f64) -> bool {
        self.compare(baseline) > 1.0 + threshold
    }
}

/// Unit chosen by [`readable_time`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Milliseconds,
    Nanoseconds,
}

impl TimeUnit {
    pub fn label(self) -> &'static str {
        match self {
            TimeUnit::Seconds => "s",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Nanoseconds => "ns",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A nanosecond quantity scaled to a human-friendly unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadableTime {
    pub value: f64,
    pub unit: TimeUnit,
}

/// Scale `ns` to seconds when it is at least one second, to milliseconds
/// when it is strictly more than one millisecond, else leave it in ns.
pub fn readable_time(ns: f64) -> ReadableTime {
    let secs = ns / 1e9;
    if secs >= 1.0 {
        return ReadableTime {
            value: secs,
            unit: TimeUnit::Seconds,
        };
    }
    let millis = ns / 1e6;
    if millis > 1.0 {
        return ReadableTime {
            value: millis,
            unit: TimeUnit::Milliseconds,
        };
    }
    ReadableTime {
        value: ns,
        unit: TimeUnit::Nanoseconds,
    }
}

/// A named result inside a suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchRecord {
    /// Full name including suite: "suite/benchmark"
    pub name: String,
    #[serde(flatten)]
    pub result: BenchmarkResult,
}

/// A benchmark that returned an error or panicked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchFailure {
    pub name: String,
    pub error: String,
}

/// Results for an entire benchmark suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    /// Suite name
    pub suite: String,
    /// Successful benchmarks, in run order
    pub results: Vec<BenchRecord>,
    /// Benchmarks that failed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<BenchFailure>,
    /// Total suite wall-clock time
    #[serde(rename = "total_duration_ns", with = "duration_serde")]
    pub total_duration: Duration,
    /// Milliseconds since the Unix epoch when the suite started
    pub started_at: String,
    /// Git commit hash (if available)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub git_sha: Option<String>,
    /// Custom metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl SuiteResult {
    /// Load a suite result from JSON file.
    pub fn load(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Look up a successful benchmark by its full name.
    pub fn get(&self, name: &str) -> Option<&BenchRecord> {
        self.results.iter().find(|r| r.name == name)
    }

    /// Compare this suite against a baseline.
    ///
    /// Returns a map of benchmark name to ratio (self/baseline) for every
    /// benchmark present in both.
    pub fn compare(&self, baseline: &SuiteResult) -> HashMap<String, f64> {
        let baseline_map = baseline.by_name();
        self.results
            .iter()
            .filter_map(|r| {
                baseline_map
                    .get(r.name.as_str())
                    .map(|b| (r.name.clone(), r.result.compare(&b.result)))
            })
            .collect()
    }

    /// Find benchmarks more than `threshold` slower than the baseline.
    pub fn find_regressions(
        &self,
        baseline: &SuiteResult,
        threshold: f64,
    ) -> Vec<(&BenchRecord, f64)> {
        let baseline_map = baseline.by_name();
        self.results
            .iter()
            .filter_map(|r| {
                let b = baseline_map.get(r.name.as_str())?;
                let ratio = r.result.compare(&b.result);
                (ratio > 1.0 + threshold).then_some((r, ratio))
            })
            .collect()
    }

    fn by_name(&self) -> HashMap<&str, &BenchRecord> {
        self.results.iter().map(|r| (r.name.as_str(), r)).collect()
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        u64::try_from(d.as_nanos()).unwrap_or(u64::MAX).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_nanos)
    }
}
