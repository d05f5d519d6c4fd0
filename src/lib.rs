//! # benchpress
//!
//! An adaptive micro-benchmark harness.
//!
//! A benchmark is a function that performs its operation `b.n()` times. The
//! harness calls it with N = 1, then grows N until one run takes at least the
//! target time (one second by default) or N reaches the iteration cap, and reports
//! the last run. An optional second pass splits the final N into twenty
//! segments to estimate the standard deviation of the per-op time.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use benchpress::{black_box, Bench, Runner};
//!
//! fn sum_squares(b: &mut Bench) {
//!     let data: Vec<u64> = (0..1024).collect();
//!     b.reset_timer();
//!     b.iter(|| data.iter().map(|x| x * x).sum::<u64>());
//! }
//!
//! let mut runner = Runner::new("math");
//! runner.run("sum_squares", sum_squares);
//! runner.run("parse_int", |b| {
//!     for _ in 0..b.n() {
//!         black_box("12345".parse::<u32>())?;
//!     }
//!     Ok::<(), std::num::ParseIntError>(())
//! });
//! runner.finish();
//! ```
//!
//! ## Bench binaries
//!
//! With `harness = false` in `Cargo.toml`, a bench file only needs its
//! functions and one macro call:
//!
//! ```rust,ignore
//! use benchpress::Bench;
//!
//! fn clone_string(b: &mut Bench) {
//!     let s = "hello".repeat(16);
//!     b.iter(|| s.clone());
//! }
//!
//! benchpress::benchpress_main!(clone_string);
//! ```
//!
//! `cargo bench -- <pattern>` then runs the benchmarks whose names match the
//! glob pattern. See [`BenchArgs`] for the remaining flags.

mod clock;
mod config;
mod launch;
mod registry;
mod report;
mod result;
mod round;
mod runner;
mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{LaunchConfig, RunnerConfig, DEFAULT_MAX_ITERATIONS, DEFAULT_TARGET};
pub use launch::{launch, Launcher, Outcome, STDDEV_SEGMENTS};
pub use registry::{run_main, run_with_args, BenchArgs, BenchmarkEntry, Registry, Selection};
pub use report::{
    format_record, ConsoleReporter, JsonReporter, LineSink, MultiReporter, Reporter, StdoutSink,
};
pub use result::{
    readable_time, BenchFailure, BenchRecord, BenchmarkResult, ReadableTime, SuiteResult,
    TimeUnit,
};
pub use round::{round_down_pow10, round_up_nice};
pub use runner::{BenchGroup, Runner};
pub use timer::Bench;

pub use std::hint::black_box;

/// Generate a `main` that registers the given benchmark functions and hands
/// them to [`run_main`].
///
/// Each benchmark is registered under its path as written.
#[macro_export]
macro_rules! benchpress_main {
    ($($bench:path),+ $(,)?) => {
        fn main() -> ::std::process::ExitCode {
            let mut registry = $crate::Registry::new();
            $(
                registry.register(stringify!($bench), $bench);
            )+
            $crate::run_main(registry)
        }
    };
}
