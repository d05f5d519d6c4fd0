//! Configuration for the iteration controller and the benchmark runner.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default amount of measured time to aim for per benchmark.
pub const DEFAULT_TARGET: Duration = Duration::from_secs(1);

/// Default iteration count at which the controller stops growing N.
pub const DEFAULT_MAX_ITERATIONS: u64 = 1_000_000_000;

/// Settings for one call to the iteration controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Measured time a run must reach before the controller stops growing `N`.
    pub target: Duration,
    /// Hard stop on `N`, reached even if the target never is.
    pub max_iterations: u64,
    /// Run the 20-segment variance pass after convergence.
    pub estimate_stddev: bool,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            estimate_stddev: true,
        }
    }
}

impl LaunchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse config from environment variables.
    ///
    /// Supported variables:
    /// - `BENCH_TARGET_NS`: target measured time in nanoseconds
    /// - `BENCH_MAX_ITERATIONS`: iteration cap
    /// - `BENCH_STDDEV`: run the variance pass (default: true)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(ns) = parse_var::<u64>(&lookup, "BENCH_TARGET_NS") {
            cfg.target = Duration::from_nanos(ns);
        }
        if let Some(n) = parse_var(&lookup, "BENCH_MAX_ITERATIONS") {
            cfg.max_iterations = n;
        }
        if let Some(v) = lookup("BENCH_STDDEV") {
            cfg.estimate_stddev = parse_flag(&v);
        }
        cfg
    }

    /// Set the target measured time.
    pub fn target(mut self, target: Duration) -> Self {
        self.target = target;
        self
    }

    /// Set the iteration cap.
    pub fn max_iterations(mut self, n: u64) -> Self {
        self.max_iterations = n;
        self
    }

    /// Enable or disable the variance pass.
    pub fn estimate_stddev(mut self, enabled: bool) -> Self {
        self.estimate_stddev = enabled;
        self
    }

    pub(crate) fn target_ns(&self) -> u64 {
        u64::try_from(self.target.as_nanos()).unwrap_or(u64::MAX)
    }
}

/// Configuration for a [`Runner`](crate::Runner) suite.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Controller settings applied to every benchmark.
    pub launch: LaunchConfig,
    /// Output directory for JSON results.
    pub output_dir: PathBuf,
    /// Filter benchmarks by name substring.
    pub filter: Option<String>,
    /// Git SHA to include in results (for regression tracking).
    pub git_sha: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            launch: LaunchConfig::default(),
            output_dir: PathBuf::from("target/benchpress"),
            filter: None,
            git_sha: None,
        }
    }
}

impl RunnerConfig {
    /// Create a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse config from environment variables.
    ///
    /// Reads everything [`LaunchConfig::from_env`] reads, plus:
    /// - `BENCH_OUTPUT_DIR`: output directory
    /// - `BENCH_FILTER`: filter benchmarks by name
    /// - `BENCH_GIT_SHA`: git commit hash (detected with `git` when unset)
    pub fn from_env() -> Self {
        let mut cfg = Self::from_lookup(|key| std::env::var(key).ok());
        if cfg.git_sha.is_none() {
            cfg.git_sha = detect_git_sha();
        }
        cfg
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self {
            launch: LaunchConfig::from_lookup(&lookup),
            ..Self::default()
        };
        if let Some(v) = lookup("BENCH_OUTPUT_DIR") {
            cfg.output_dir = PathBuf::from(v);
        }
        cfg.filter = lookup("BENCH_FILTER");
        cfg.git_sha = lookup("BENCH_GIT_SHA");
        cfg
    }

    /// Replace the controller settings.
    pub fn launch(mut self, launch: LaunchConfig) -> Self {
        self.launch = launch;
        self
    }

    /// Set the output directory.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    /// Set filter pattern.
    pub fn filter(mut self, pattern: impl Into<String>) -> Self {
        self.filter = Some(pattern.into());
        self
    }

    /// Clear filter pattern.
    pub fn no_filter(mut self) -> Self {
        self.filter = None;
        self
    }

    /// Set git SHA.
    pub fn git_sha(mut self, sha: impl Into<String>) -> Self {
        self.git_sha = Some(sha.into());
        self
    }
}

fn parse_var<T: FromStr>(lookup: impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable environment value");
            None
        }
    }
}

fn parse_flag(v: &str) -> bool {
    let v = v.trim();
    v != "0" && !v.eq_ignore_ascii_case("false") && !v.eq_ignore_ascii_case("off")
}

fn detect_git_sha() -> Option<String> {
    std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn should_use_defaults_when_env_not_set() {
        let cfg = LaunchConfig::default();
        assert_eq!(cfg.target, Duration::from_secs(1));
        assert_eq!(cfg.max_iterations, 1_000_000_000);
        assert!(cfg.estimate_stddev);
        assert_eq!(cfg.target_ns(), 1_000_000_000);
    }

    #[test]
    fn should_build_config_with_builder() {
        let cfg = LaunchConfig::new()
            .target(Duration::from_millis(20))
            .max_iterations(1_000)
            .estimate_stddev(false);

        assert_eq!(cfg.target, Duration::from_millis(20));
        assert_eq!(cfg.max_iterations, 1_000);
        assert!(!cfg.estimate_stddev);
    }

    #[test]
    fn should_read_launch_settings_when_vars_present() {
        let cfg = LaunchConfig::from_lookup(lookup_from(&[
            ("BENCH_TARGET_NS", "5000000"),
            ("BENCH_MAX_ITERATIONS", "1000"),
            ("BENCH_STDDEV", "false"),
        ]));
        assert_eq!(cfg.target, Duration::from_millis(5));
        assert_eq!(cfg.max_iterations, 1_000);
        assert!(!cfg.estimate_stddev);
    }

    #[test]
    fn should_keep_default_when_value_unparseable() {
        let cfg = LaunchConfig::from_lookup(lookup_from(&[("BENCH_MAX_ITERATIONS", "lots")]));
        assert_eq!(cfg.max_iterations, DEFAULT_MAX_ITERATIONS);
    }

    #[test]
    fn should_read_runner_settings_when_vars_present() {
        let cfg = RunnerConfig::from_lookup(lookup_from(&[
            ("BENCH_OUTPUT_DIR", "/tmp/out"),
            ("BENCH_FILTER", "parse"),
            ("BENCH_GIT_SHA", "abc123"),
            ("BENCH_TARGET_NS", "100"),
        ]));
        assert_eq!(cfg.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(cfg.filter.as_deref(), Some("parse"));
        assert_eq!(cfg.git_sha.as_deref(), Some("abc123"));
        assert_eq!(cfg.launch.target, Duration::from_nanos(100));
    }

    #[test]
    fn should_clear_filter_when_requested() {
        let cfg = RunnerConfig::new().filter("x").no_filter();
        assert_eq!(cfg.filter, None);
    }
}
