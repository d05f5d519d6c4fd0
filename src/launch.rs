//! Adaptive iteration controller.
//!
//! [`Launcher::launch`] runs a benchmark with growing iteration counts until a
//! single run takes at least the configured target time, then optionally
//! re-runs it in fixed-size segments to estimate the spread of ns/op.
//!
//! Each proposed count is the projection `target / ns_per_op` with 1.5x
//! headroom, limited to 100x the previous count, never less than the previous
//! count plus one, and rounded up to a 1/2/5 value.

use crate::clock::{Clock, SystemClock};
use crate::config::LaunchConfig;
use crate::result::BenchmarkResult;
use crate::round::round_up_nice;
use crate::timer::Bench;
use anyhow::Context;
use std::sync::Arc;
use tracing::{debug, trace};

/// Number of fixed-size segments run by the variance pass.
pub const STDDEV_SEGMENTS: u32 = 20;

/// Return value of a benchmark body.
///
/// Implemented for `()` so plain closures work, and for `Result<(), E>` so a
/// benchmark can abort its measurement with an error.
pub trait Outcome {
    fn into_result(self) -> anyhow::Result<()>;
}

impl Outcome for () {
    fn into_result(self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<E> Outcome for Result<(), E>
where
    E: Into<anyhow::Error>,
{
    fn into_result(self) -> anyhow::Result<()> {
        self.map_err(Into::into)
    }
}

type CollectHint = Box<dyn Fn() + Send + Sync>;

/// Drives a benchmark to a stable iteration count.
///
/// # Example
///
/// ```rust,no_run
/// use benchpress::{LaunchConfig, Launcher};
/// use std::time::Duration;
///
/// let launcher = Launcher::new(LaunchConfig::new().target(Duration::from_millis(200)));
/// let result = launcher
///     .launch(|b| b.iter(|| (0..64u64).product::<u64>()))
///     .unwrap();
/// println!("{:.1} ns/op", result.ns_per_op());
/// ```
pub struct Launcher {
    config: LaunchConfig,
    clock: Arc<dyn Clock>,
    collect_hint: Option<CollectHint>,
}

impl Launcher {
    /// Create a launcher on the system clock.
    pub fn new(config: LaunchConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            collect_hint: None,
        }
    }

    /// Use a different clock source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Install a hook called before every run, for hosts that can reclaim
    /// memory left over from earlier runs. Best effort; its outcome is ignored.
    pub fn with_collect_hint(mut self, hint: impl Fn() + Send + Sync + 'static) -> Self {
        self.collect_hint = Some(Box::new(hint));
        self
    }

    /// The configuration this launcher measures with.
    pub fn config(&self) -> &LaunchConfig {
        &self.config
    }

    /// Measure `benchmark`.
    ///
    /// The first run uses `N = 1`. Every later run starts from a fresh timer,
    /// so only the final run's timing is reported. Stops once a run reaches
    /// the target time or `N` reaches the iteration cap.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by the benchmark; the measurement is
    /// abandoned at that point.
    pub fn launch<F, R>(&self, mut benchmark: F) -> anyhow::Result<BenchmarkResult>
    where
        F: FnMut(&mut Bench) -> R,
        R: Outcome,
    {
        let target = self.config.target_ns();
        let cap = self.config.max_iterations.max(1);

        let mut b = Bench::with_clock(0, self.clock.clone());
        let mut n = 1;
        self.run_n(&mut b, &mut benchmark, n)?;

        while b.elapsed_ns() < target && n < cap {
            let last = n;
            n = next_iterations(last, b.ns_per_op(), target, cap);
            debug!(
                last,
                next = n,
                elapsed_ns = b.elapsed_ns(),
                ns_per_op = b.ns_per_op(),
                "growing iteration count"
            );
            self.run_n(&mut b, &mut benchmark, n)?;
        }

        let mut result = BenchmarkResult::new(n, b.elapsed());
        result.bytes_per_op = b.bytes();

        if self.config.estimate_stddev {
            let stddev = self.estimate_stddev(&mut benchmark, n, b.ns_per_op())?;
            result.stddev = Some(stddev);
        }

        Ok(result)
    }

    /// Re-run the benchmark in [`STDDEV_SEGMENTS`] runs of equal size and
    /// return the root mean square deviation of their ns/op from `expected`.
    ///
    /// The deviation is taken against the converged estimate, not against
    /// the mean of the segments.
    pub fn estimate_stddev<F, R>(
        &self,
        benchmark: &mut F,
        final_n: u64,
        expected: f64,
    ) -> anyhow::Result<f64>
    where
        F: FnMut(&mut Bench) -> R,
        R: Outcome,
    {
        let segment_n = round_up_nice((final_n / u64::from(STDDEV_SEGMENTS)).max(1));
        let mut reps = Bench::with_clock(0, self.clock.clone());
        let mut sum_sq = 0.0;

        for segment in 0..STDDEV_SEGMENTS {
            self.run_n(&mut reps, benchmark, segment_n)
                .with_context(|| format!("variance segment {segment}"))?;
            let deviation = expected - reps.ns_per_op();
            sum_sq += deviation * deviation;
        }

        let stddev = (sum_sq / f64::from(STDDEV_SEGMENTS)).sqrt();
        debug!(segment_n, expected, stddev, "variance pass done");
        Ok(stddev)
    }

    fn run_n<F, R>(&self, b: &mut Bench, benchmark: &mut F, n: u64) -> anyhow::Result<()>
    where
        F: FnMut(&mut Bench) -> R,
        R: Outcome,
    {
        if let Some(hint) = &self.collect_hint {
            hint();
        }

        b.set_n(n);
        b.reset_timer();
        b.start_timer();
        let outcome = benchmark(b).into_result();
        b.stop_timer();
        trace!(n, elapsed_ns = b.elapsed_ns(), "run finished");

        outcome.with_context(|| format!("benchmark failed at N={n}"))
    }
}

/// Measure `benchmark` on the system clock with `config`.
pub fn launch<F, R>(benchmark: F, config: &LaunchConfig) -> anyhow::Result<BenchmarkResult>
where
    F: FnMut(&mut Bench) -> R,
    R: Outcome,
{
    Launcher::new(config.clone()).launch(benchmark)
}

/// Iteration count for the run after one of `last` iterations at `ns_per_op`.
///
/// Always greater than `last` and always a nice value. May exceed `cap`; the
/// caller stops once the count reaches it.
fn next_iterations(last: u64, ns_per_op: f64, target_ns: u64, cap: u64) -> u64 {
    let projected = if ns_per_op == 0.0 {
        cap as f64
    } else {
        target_ns as f64 / ns_per_op
    };
    let grown = (projected * 1.5)
        .min(last as f64 * 100.0)
        .max(last as f64 + 1.0);
    // f64 -> u64 casts saturate.
    round_up_nice(grown.ceil() as u64)
}
