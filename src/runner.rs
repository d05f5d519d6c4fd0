//! The suite runner.

use crate::config::RunnerConfig;
use crate::launch::{Launcher, Outcome};
use crate::report::{ConsoleReporter, JsonReporter, Reporter};
use crate::result::{BenchFailure, BenchRecord, SuiteResult};
use crate::timer::Bench;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;
use tracing::{error, info, warn};

/// Runs benchmarks one after another and collects their results.
///
/// Each benchmark is isolated: an error or panic is recorded as a failure and
/// the suite carries on with the next one.
///
/// # Example
///
/// ```rust,no_run
/// use benchpress::Runner;
///
/// let mut runner = Runner::new("my_suite");
///
/// runner.run("vec_push", |b| {
///     let mut v = Vec::with_capacity(b.n() as usize);
///     b.iter(|| v.push(1u8));
/// });
///
/// let suite = runner.finish();
/// ```
pub struct Runner {
    suite: String,
    config: RunnerConfig,
    launcher: Launcher,
    results: Vec<BenchRecord>,
    failures: Vec<BenchFailure>,
    suite_start: Instant,
    started_at: String,
    announced: bool,
    reporters: Vec<Box<dyn Reporter>>,
    metadata: HashMap<String, String>,
}

impl Runner {
    /// Create a new runner with default config from environment.
    pub fn new(suite: &str) -> Self {
        Self::with_config(suite, RunnerConfig::from_env())
    }

    /// Create a new runner with explicit config.
    ///
    /// Reports to the console and to JSON files under `config.output_dir`.
    pub fn with_config(suite: &str, config: RunnerConfig) -> Self {
        let reporters: Vec<Box<dyn Reporter>> = vec![
            Box::new(ConsoleReporter::new()),
            Box::new(JsonReporter::new(config.output_dir.clone())),
        ];

        Self {
            suite: suite.to_string(),
            launcher: Launcher::new(config.launch.clone()),
            config,
            results: Vec::new(),
            failures: Vec::new(),
            suite_start: Instant::now(),
            started_at: unix_millis(),
            announced: false,
            reporters,
            metadata: HashMap::new(),
        }
    }

    /// Replace the launcher, e.g. to install a clock or collection hint.
    ///
    /// The launcher's own config wins over `RunnerConfig::launch`.
    pub fn launcher(&mut self, launcher: Launcher) -> &mut Self {
        self.config.launch = launcher.config().clone();
        self.launcher = launcher;
        self
    }

    /// Add custom metadata to the suite results.
    pub fn metadata(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Replace reporters with a custom set.
    pub fn reporters(&mut self, reporters: Vec<Box<dyn Reporter>>) -> &mut Self {
        self.reporters = reporters;
        self
    }

    /// Add an additional reporter.
    pub fn add_reporter(&mut self, reporter: Box<dyn Reporter>) -> &mut Self {
        self.reporters.push(reporter);
        self
    }

    pub fn suite(&self) -> &str {
        &self.suite
    }

    fn should_run(&self, name: &str) -> bool {
        match &self.config.filter {
            Some(f) => name.contains(f.as_str()),
            None => true,
        }
    }

    /// Reporters see `suite_start` once, before the first benchmark.
    fn announce(&mut self) {
        if !self.announced {
            self.announced = true;
            self.notify(|r| r.suite_start(&self.suite, &self.config));
        }
    }

    fn notify(&self, f: impl Fn(&dyn Reporter)) {
        for r in &self.reporters {
            f(r.as_ref());
        }
    }

    /// Measure one benchmark.
    ///
    /// Returns `true` when it was measured, `false` when it was filtered out
    /// or failed.
    pub fn run<F, R>(&mut self, name: &str, f: F) -> bool
    where
        F: FnMut(&mut Bench) -> R,
        R: Outcome,
    {
        if !self.should_run(name) {
            return false;
        }

        self.announce();

        let full_name = format!("{}/{}", self.suite, name);
        self.notify(|r| r.bench_start(&full_name));

        let launcher = &self.launcher;
        let outcome = catch_unwind(AssertUnwindSafe(|| launcher.launch(f)));

        let error = match outcome {
            Ok(Ok(result)) => {
                info!(
                    name = %full_name,
                    ops = result.ops,
                    ns_per_op = result.ns_per_op(),
                    "benchmark finished"
                );
                let record = BenchRecord {
                    name: full_name,
                    result,
                };
                self.notify(|r| r.bench_end(&record));
                self.results.push(record);
                return true;
            }
            Ok(Err(e)) => format!("{:#}", e),
            Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
        };

        error!(name = %full_name, %error, "benchmark failed");
        let failure = BenchFailure {
            name: full_name,
            error,
        };
        self.notify(|r| r.bench_failed(&failure));
        self.failures.push(failure);
        false
    }

    /// Run multiple related benchmarks as a group.
    ///
    /// Groups are just for organization/reporting.
    pub fn group<F>(&mut self, group_name: &str, f: F)
    where
        F: FnOnce(&mut BenchGroup<'_>),
    {
        let mut group = BenchGroup {
            runner: self,
            prefix: group_name.to_string(),
        };
        f(&mut group);
    }

    /// Finish the suite and return its results.
    ///
    /// Reporters see the complete suite (JSON files are written here).
    pub fn finish(mut self) -> SuiteResult {
        self.announce();

        let suite_result = SuiteResult {
            suite: self.suite.clone(),
            results: self.results,
            failures: self.failures,
            total_duration: self.suite_start.elapsed(),
            started_at: self.started_at,
            git_sha: self.config.git_sha.clone(),
            metadata: self.metadata,
        };

        for r in &self.reporters {
            r.suite_end(&suite_result);
        }

        suite_result
    }

    /// Finish and compare against a baseline file.
    ///
    /// Returns the suite and every benchmark more than `threshold` slower
    /// than its baseline counterpart. An unreadable baseline is logged and
    /// yields no regressions.
    pub fn finish_with_baseline(
        self,
        baseline_path: impl AsRef<std::path::Path>,
        threshold: f64,
    ) -> (SuiteResult, Vec<(BenchRecord, f64)>) {
        let suite = self.finish();
        let path = baseline_path.as_ref();

        let regressions = match SuiteResult::load(path) {
            Ok(baseline) => suite
                .find_regressions(&baseline, threshold)
                .into_iter()
                .map(|(r, ratio)| (r.clone(), ratio))
                .collect(),
            Err(e) => {
                warn!(path = %path.display(), "failed to load baseline: {}", e);
                Vec::new()
            }
        };

        (suite, regressions)
    }
}

/// A benchmark group for organizing related benchmarks.
pub struct BenchGroup<'a> {
    runner: &'a mut Runner,
    prefix: String,
}

impl BenchGroup<'_> {
    /// Run a benchmark within this group.
    pub fn run<F, R>(&mut self, name: &str, f: F) -> bool
    where
        F: FnMut(&mut Bench) -> R,
        R: Outcome,
    {
        let full_name = format!("{}/{}", self.prefix, name);
        self.runner.run(&full_name, f)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn unix_millis() -> String {
    let since_epoch = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    since_epoch.as_millis().to_string()
}
