//! Explicit benchmark registration and the entry point for bench binaries.
//!
//! A bench binary builds a [`Registry`] (usually through
//! [`benchpress_main!`](crate::benchpress_main)) and hands it to
//! [`run_main`], which parses the command line, runs the selected benchmarks
//! through a [`Runner`] and turns failures or regressions into a non-zero
//! exit code.

use crate::config::{LaunchConfig, RunnerConfig};
use crate::launch::Outcome;
use crate::runner::Runner;
use crate::timer::Bench;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

type BenchFn = Box<dyn FnMut(&mut Bench) -> anyhow::Result<()>>;

/// A registered benchmark.
pub struct BenchmarkEntry {
    name: String,
    func: BenchFn,
    ignored: bool,
}

impl BenchmarkEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ignored benchmarks only run when explicitly requested.
    pub fn is_ignored(&self) -> bool {
        self.ignored
    }
}

/// Which registered benchmarks to run.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Glob pattern matched against benchmark names.
    pub workload: Option<String>,
    /// Include benchmarks registered with [`Registry::register_ignored`].
    pub include_ignored: bool,
}

impl Selection {
    fn accepts(&self, entry: &BenchmarkEntry) -> bool {
        if entry.ignored && !self.include_ignored {
            return false;
        }
        match &self.workload {
            Some(pattern) => matches_glob(&entry.name, pattern),
            None => true,
        }
    }
}

/// Name-to-benchmark table, in registration order.
///
/// # Example
///
/// ```rust,no_run
/// use benchpress::{Bench, Registry, Runner};
///
/// fn bench_format(b: &mut Bench) {
///     b.iter(|| format!("{}", 42));
/// }
///
/// let mut registry = Registry::new();
/// registry.register("format", bench_format);
///
/// let mut runner = Runner::new("fmt");
/// registry.run_all(&mut runner, &Default::default());
/// runner.finish();
/// ```
#[derive(Default)]
pub struct Registry {
    entries: Vec<BenchmarkEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a benchmark under `name`.
    pub fn register<F, R>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: FnMut(&mut Bench) -> R + 'static,
        R: Outcome,
    {
        self.push(name.into(), f, false)
    }

    /// Add a benchmark that is skipped unless ignored benchmarks are included.
    pub fn register_ignored<F, R>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: FnMut(&mut Bench) -> R + 'static,
        R: Outcome,
    {
        self.push(name.into(), f, true)
    }

    fn push<F, R>(&mut self, name: String, mut f: F, ignored: bool) -> &mut Self
    where
        F: FnMut(&mut Bench) -> R + 'static,
        R: Outcome,
    {
        self.entries.push(BenchmarkEntry {
            name,
            func: Box::new(move |b: &mut Bench| f(b).into_result()),
            ignored,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &BenchmarkEntry> {
        self.entries.iter()
    }

    /// Names of the benchmarks `selection` would run.
    pub fn selected_names(&self, selection: &Selection) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| selection.accepts(e))
            .map(|e| e.name.as_str())
            .collect()
    }

    /// Run every selected benchmark through `runner`.
    ///
    /// Returns how many were selected.
    pub fn run_all(&mut self, runner: &mut Runner, selection: &Selection) -> usize {
        let mut selected = 0;
        for entry in self.entries.iter_mut().filter(|e| selection.accepts(e)) {
            selected += 1;
            runner.run(&entry.name, &mut entry.func);
        }
        selected
    }
}

/// Command-line arguments understood by bench binaries.
#[derive(Debug, Clone, Parser)]
#[command(about = "Run registered benchmarks")]
pub struct BenchArgs {
    /// Filter benchmarks by glob pattern (e.g. "parse*", "*insert*")
    #[arg(value_name = "FILTER")]
    pub filter: Option<String>,

    /// Filter benchmarks by glob pattern; overrides the positional filter
    #[arg(long)]
    pub workload: Option<String>,

    /// Include benchmarks registered as ignored
    #[arg(long)]
    pub include_ignored: bool,

    /// List benchmarks without running them
    #[arg(long)]
    pub list: bool,

    /// Target measured time per benchmark, in milliseconds
    #[arg(long)]
    pub target_ms: Option<u64>,

    /// Stop growing the iteration count once it reaches this value
    #[arg(long)]
    pub max_iterations: Option<u64>,

    /// Skip the variance pass
    #[arg(long)]
    pub no_stddev: bool,

    /// Output directory for JSON results
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Do not write JSON result files
    #[arg(long)]
    pub no_json: bool,

    /// Baseline JSON file for regression comparison
    #[arg(long)]
    pub baseline: Option<PathBuf>,

    /// Regression threshold as a fraction (0.05 = 5%)
    #[arg(long, default_value_t = 0.05)]
    pub threshold: f64,

    /// Passed by `cargo bench`; ignored
    #[arg(long, hide = true)]
    pub bench: bool,
}

impl BenchArgs {
    /// Selection implied by the filter flags.
    pub fn selection(&self) -> Selection {
        Selection {
            workload: self.workload.clone().or_else(|| self.filter.clone()),
            include_ignored: self.include_ignored,
        }
    }

    /// Layer the flags over `base` (usually read from the environment).
    pub fn apply(&self, mut base: RunnerConfig) -> RunnerConfig {
        let mut launch: LaunchConfig = base.launch.clone();
        if let Some(ms) = self.target_ms {
            launch = launch.target(Duration::from_millis(ms));
        }
        if let Some(n) = self.max_iterations {
            launch = launch.max_iterations(n);
        }
        if self.no_stddev {
            launch = launch.estimate_stddev(false);
        }
        base = base.launch(launch);
        if let Some(dir) = &self.output_dir {
            base = base.output_dir(dir.clone());
        }
        base
    }
}

/// Entry point for bench binaries: parse arguments from the process command
/// line and run `registry`.
pub fn run_main(registry: Registry) -> ExitCode {
    run_with_args(registry, BenchArgs::parse())
}

/// Run `registry` with already-parsed arguments.
///
/// Exit code 1 means at least one benchmark failed or regressed.
pub fn run_with_args(mut registry: Registry, args: BenchArgs) -> ExitCode {
    init_tracing();

    let selection = args.selection();

    if args.list {
        let names = registry.selected_names(&selection);
        if names.is_empty() {
            println!("No benchmarks registered.");
        } else {
            println!("Registered benchmarks ({}):", names.len());
            for name in names {
                println!("  {}", name);
            }
        }
        return ExitCode::SUCCESS;
    }

    let config = args.apply(RunnerConfig::from_env());
    let mut runner = Runner::with_config(&suite_name(), config);
    if args.no_json {
        runner.reporters(vec![Box::new(crate::report::ConsoleReporter::new())]);
    }

    if registry.run_all(&mut runner, &selection) == 0 {
        if selection.workload.is_some() {
            eprintln!("No benchmarks matched the workload pattern");
        } else {
            eprintln!("No benchmarks registered.");
        }
        return ExitCode::SUCCESS;
    }

    let (suite, regressions) = match &args.baseline {
        Some(path) => runner.finish_with_baseline(path, args.threshold),
        None => (runner.finish(), Vec::new()),
    };

    for (record, ratio) in &regressions {
        eprintln!(
            "regression: {} is {:.1}% slower",
            record.name,
            (ratio - 1.0) * 100.0
        );
    }

    if suite.failures.is_empty() && regressions.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Install a stderr subscriber honouring `RUST_LOG` (default `warn`).
/// Does nothing if a global subscriber is already set.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Suite name from the executable name, minus cargo's `-<16 hex>` suffix.
fn suite_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .map(|stem| strip_cargo_hash(&stem).replace('_', "-"))
        .unwrap_or_else(|| "benchpress".to_string())
}

fn strip_cargo_hash(stem: &str) -> &str {
    match stem.rsplit_once('-') {
        Some((name, hash)) if hash.len() == 16 && hash.chars().all(|c| c.is_ascii_hexdigit()) => {
            name
        }
        _ => stem,
    }
}

/// Case-insensitive glob match supporting `*` and `?`.
///
/// A pattern without wildcards matches as a substring.
fn matches_glob(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.to_lowercase().chars().collect();
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();

    if !pattern.iter().any(|&c| c == '*' || c == '?') {
        let needle: String = pattern.iter().collect();
        let haystack: String = text.iter().collect();
        return haystack.contains(&needle);
    }

    // Backtrack to the last `*` on mismatch.
    let (mut t, mut p) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            t += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, t));
            p += 1;
        } else if let Some((sp, st)) = star {
            p = sp + 1;
            t = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn should_match_substring_when_pattern_has_no_wildcard() {
        assert!(matches_glob("btree_insert_sorted", "insert"));
        assert!(!matches_glob("btree_insert_sorted", "remove"));
    }

    #[test]
    fn should_anchor_ends_when_pattern_has_star() {
        assert!(matches_glob("btree_insert_sorted", "btree*sorted"));
        assert!(matches_glob("btree_insert_sorted", "btree_*"));
        assert!(matches_glob("btree_insert_sorted", "*_sorted"));
        assert!(!matches_glob("btree_insert_sorted", "*insert"));
        assert!(!matches_glob("btree_insert_sorted", "hash*"));
    }

    #[test]
    fn should_backtrack_when_star_prefix_repeats() {
        assert!(matches_glob("aaab", "*ab"));
        assert!(matches_glob("parse_parse_json", "*parse_json"));
        assert!(matches_glob("anything", "**"));
    }

    #[test]
    fn should_match_one_char_when_pattern_has_question_mark() {
        assert!(matches_glob("fib_20", "fib_2?"));
        assert!(!matches_glob("fib_200", "fib_2?"));
        assert!(!matches_glob("fib_2", "fib_2?"));
    }

    #[test]
    fn should_ignore_case_when_matching() {
        assert!(matches_glob("Vec_Push", "vec_push"));
        assert!(matches_glob("vec_push", "VEC_*"));
    }

    #[test]
    fn should_strip_cargo_hash_suffix() {
        assert_eq!(strip_cargo_hash("parse-0123456789abcdef"), "parse");
        assert_eq!(strip_cargo_hash("parse-fast"), "parse-fast");
        assert_eq!(strip_cargo_hash("parse"), "parse");
    }

    #[test]
    fn should_skip_ignored_unless_included() {
        let mut registry = Registry::new();
        registry.register("fast", |_b: &mut Bench| {});
        registry.register_ignored("slow", |_b: &mut Bench| {});

        assert_eq!(registry.selected_names(&Selection::default()), vec!["fast"]);
        let all = Selection {
            include_ignored: true,
            ..Default::default()
        };
        assert_eq!(registry.selected_names(&all), vec!["fast", "slow"]);
    }

    #[test]
    fn should_select_by_workload_pattern() {
        let mut registry = Registry::new();
        registry
            .register("parse_small", |_b: &mut Bench| {})
            .register("parse_large", |_b: &mut Bench| {})
            .register("encode", |_b: &mut Bench| {});

        let selection = Selection {
            workload: Some("parse_*".to_string()),
            include_ignored: false,
        };
        assert_eq!(
            registry.selected_names(&selection),
            vec!["parse_small", "parse_large"]
        );
    }

    #[test]
    fn should_run_only_selected_benchmarks() {
        let calls = Rc::new(Cell::new(0));
        let counted = calls.clone();

        let mut registry = Registry::new();
        registry.register("a", move |b: &mut Bench| counted.set(counted.get() + b.n()));
        registry.register("b", |_b: &mut Bench| -> anyhow::Result<()> {
            anyhow::bail!("should not run")
        });

        let config = RunnerConfig::new().launch(
            LaunchConfig::new()
                .target(Duration::ZERO)
                .estimate_stddev(false),
        );
        let mut runner = Runner::with_config("reg", config);
        runner.reporters(vec![]);

        let selection = Selection {
            workload: Some("a".to_string()),
            include_ignored: false,
        };
        assert_eq!(registry.run_all(&mut runner, &selection), 1);

        let suite = runner.finish();
        assert_eq!(calls.get(), 1);
        assert_eq!(suite.results.len(), 1);
        assert!(suite.failures.is_empty());
    }

    #[test]
    fn should_layer_flags_over_config() {
        let args = BenchArgs::parse_from([
            "bench",
            "--target-ms",
            "250",
            "--max-iterations",
            "1000",
            "--no-stddev",
            "--output-dir",
            "out",
            "--bench",
        ]);
        let cfg = args.apply(RunnerConfig::new());
        assert_eq!(cfg.launch.target, Duration::from_millis(250));
        assert_eq!(cfg.launch.max_iterations, 1000);
        assert!(!cfg.launch.estimate_stddev);
        assert_eq!(cfg.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn should_prefer_workload_over_positional_filter() {
        let args = BenchArgs::parse_from(["bench", "pos", "--workload", "flag*"]);
        assert_eq!(args.selection().workload.as_deref(), Some("flag*"));

        let args = BenchArgs::parse_from(["bench", "pos"]);
        assert_eq!(args.selection().workload.as_deref(), Some("pos"));
    }
}
