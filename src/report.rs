//! Pluggable reporters for benchmark output.
//!
//! All reporters implement the `Reporter` trait and are designed to be:
//! - Non-panicking: errors are logged but never propagate
//! - Atomic: each benchmark is written as one complete line

use crate::config::RunnerConfig;
use crate::result::{readable_time, BenchFailure, BenchRecord, SuiteResult};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// Trait for benchmark result reporters.
pub trait Reporter: Send + Sync {
    /// Called when a suite starts.
    fn suite_start(&self, _suite: &str, _config: &RunnerConfig) {}

    /// Called when a benchmark starts.
    fn bench_start(&self, _name: &str) {}

    /// Called when a benchmark completes.
    fn bench_end(&self, _record: &BenchRecord) {}

    /// Called when a benchmark errors or panics.
    fn bench_failed(&self, _failure: &BenchFailure) {}

    /// Called when a suite completes.
    fn suite_end(&self, _result: &SuiteResult) {}
}

/// Destination for formatted report lines.
pub trait LineSink: Send + Sync {
    fn write_line(&self, line: &str);
}

impl<F> LineSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn write_line(&self, line: &str) {
        self(line)
    }
}

/// Writes lines to stdout, one lock per line.
#[derive(Debug, Default)]
pub struct StdoutSink {
    output_lock: Mutex<()>,
}

impl LineSink for StdoutSink {
    fn write_line(&self, line: &str) {
        // Ignore poison: another thread panicked mid-write.
        let _guard = self.output_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", line) {
            tracing::warn!("failed to write to stdout: {}", e);
        }
    }
}

/// Width each right-aligned column is padded to.
const COLUMN_WIDTH: usize = 20;

/// Format one benchmark as a console line:
/// name, op count, scaled time per op, ops/sec.
///
/// A stddev and a byte throughput are appended when present.
pub fn format_record(record: &BenchRecord) -> String {
    let r = &record.result;
    let time = readable_time(r.ns_per_op());
    let mut line = format!(
        "{}:\t{:>w$}{:>w$}{:>w$}",
        record.name,
        format!("{} ops\t", r.ops),
        format!("{:.3} {}/op\t", time.value, time.unit),
        format!("{:.3} ops/sec", r.ops_per_sec()),
        w = COLUMN_WIDTH,
    );
    if let Some(stddev) = r.stddev {
        line.push_str(&format!("\t± {:.3} ns/op", stddev));
    }
    if let Some(bps) = r.bytes_per_sec() {
        line.push_str(&format!("\t{:.2} MB/s", bps / 1_000_000.0));
    }
    line
}

/// Console reporter: one line per benchmark pushed to a [`LineSink`].
pub struct ConsoleReporter {
    sink: Box<dyn LineSink>,
}

impl ConsoleReporter {
    /// Report to stdout.
    pub fn new() -> Self {
        Self::with_sink(StdoutSink::default())
    }

    /// Report to any line sink, e.g. a closure collecting lines.
    pub fn with_sink(sink: impl LineSink + 'static) -> Self {
        Self {
            sink: Box::new(sink),
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for ConsoleReporter {
    fn suite_start(&self, suite: &str, config: &RunnerConfig) {
        let target = readable_time(config.launch.target.as_nanos() as f64);
        self.sink.write_line(&format!(
            "benchmark suite {} (target {} {}, max {} iterations)",
            suite, target.value, target.unit, config.launch.max_iterations
        ));
    }

    fn bench_end(&self, record: &BenchRecord) {
        self.sink.write_line(&format_record(record));
    }

    fn bench_failed(&self, failure: &BenchFailure) {
        self.sink
            .write_line(&format!("{}:\tFAILED: {}", failure.name, failure.error));
    }

    fn suite_end(&self, result: &SuiteResult) {
        let total = readable_time(result.total_duration.as_nanos() as f64);
        let mut footer = format!(
            "completed {} benchmarks in {:.2} {}",
            result.results.len(),
            total.value,
            total.unit
        );
        if !result.failures.is_empty() {
            footer.push_str(&format!(", {} failed", result.failures.len()));
        }
        self.sink.write_line(&footer);
    }
}

/// JSON reporter that writes results to a file.
///
/// Writes timestamped results files organized by suite:
/// - `{suite}/{timestamp}.json` - Machine-readable results
/// - `{suite}/{timestamp}.txt` - Human-readable summary
/// - `{suite}/latest.json` and `latest.txt` - Most recent results
pub struct JsonReporter {
    output_dir: PathBuf,
}

impl JsonReporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Never panics; logs a warning on failure.
    fn write_results(&self, result: &SuiteResult) {
        match self.write_results_inner(result) {
            Ok(path) => tracing::info!(path = %path.display(), "results written"),
            Err(e) => tracing::warn!("failed to write results: {}", e),
        }
    }

    fn write_results_inner(&self, result: &SuiteResult) -> std::io::Result<PathBuf> {
        let sanitized_name = result.suite.replace(['/', '\\'], "_");
        let suite_dir = self.output_dir.join(&sanitized_name);
        std::fs::create_dir_all(&suite_dir)?;

        let json = serde_json::to_string_pretty(result).map_err(std::io::Error::other)?;
        let summary = format_summary(result);

        let json_path = suite_dir.join(format!("{}.json", result.started_at));
        std::fs::write(&json_path, &json)?;
        std::fs::write(suite_dir.join(format!("{}.txt", result.started_at)), &summary)?;

        std::fs::write(suite_dir.join("latest.json"), &json)?;
        std::fs::write(suite_dir.join("latest.txt"), &summary)?;

        Ok(json_path)
    }
}

impl Reporter for JsonReporter {
    fn suite_end(&self, result: &SuiteResult) {
        self.write_results(result);
    }
}

fn format_summary(result: &SuiteResult) -> String {
    let mut output = String::new();
    output.push_str(&format!("Benchmark Suite: {}\n", result.suite));
    output.push_str(&format!("Started:   {}\n", result.started_at));
    if let Some(sha) = &result.git_sha {
        output.push_str(&format!("Git SHA:   {}\n", sha));
    }
    output.push('\n');

    for record in &result.results {
        output.push_str(&format_record(record));
        output.push('\n');
    }
    for failure in &result.failures {
        output.push_str(&format!("{}:\tFAILED: {}\n", failure.name, failure.error));
    }

    output.push_str(&format!(
        "\nBenchmarks: {} ok, {} failed\n",
        result.results.len(),
        result.failures.len()
    ));
    output
}

/// Combines multiple reporters.
///
/// A panic inside one reporter does not stop the others.
pub struct MultiReporter {
    reporters: Vec<Box<dyn Reporter>>,
}

impl MultiReporter {
    pub fn new(reporters: Vec<Box<dyn Reporter>>) -> Self {
        Self { reporters }
    }

    fn each(&self, f: impl Fn(&dyn Reporter)) {
        for r in &self.reporters {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(r.as_ref())));
        }
    }
}

impl Reporter for MultiReporter {
    fn suite_start(&self, suite: &str, config: &RunnerConfig) {
        self.each(|r| r.suite_start(suite, config));
    }

    fn bench_start(&self, name: &str) {
        self.each(|r| r.bench_start(name));
    }

    fn bench_end(&self, record: &BenchRecord) {
        self.each(|r| r.bench_end(record));
    }

    fn bench_failed(&self, failure: &BenchFailure) {
        self.each(|r| r.bench_failed(failure));
    }

    fn suite_end(&self, result: &SuiteResult) {
        self.each(|r| r.suite_end(result));
    }
}
