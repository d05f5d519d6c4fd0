//! Benchmark timer handed to benchmark bodies.

use crate::clock::{Clock, SystemClock};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

/// Timer state for one benchmark run.
///
/// The harness sets [`n`](Bench::n) before each run and starts the timer
/// before calling the benchmark. The benchmark must perform `n` units of work
/// and may pause the timer around setup that should not be measured.
///
/// # Example
///
/// ```rust
/// use benchpress::Bench;
///
/// fn bench_sum(b: &mut Bench) {
///     b.stop_timer();
///     let data: Vec<u64> = (0..1024).collect(); // Not timed
///     b.start_timer();
///
///     b.iter(|| data.iter().sum::<u64>());
/// }
/// # let mut b = Bench::new(10);
/// # bench_sum(&mut b);
/// ```
pub struct Bench {
    n: u64,
    elapsed_ns: u64,
    start_ns: u64,
    running: bool,
    bytes: Option<u64>,
    clock: Arc<dyn Clock>,
}

impl Bench {
    /// Create a stopped timer configured for `n` iterations on the system clock.
    pub fn new(n: u64) -> Self {
        Self::with_clock(n, Arc::new(SystemClock))
    }

    /// Create a stopped timer reading from `clock`.
    pub fn with_clock(n: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            n,
            elapsed_ns: 0,
            start_ns: 0,
            running: false,
            bytes: None,
            clock,
        }
    }

    /// Number of iterations this run must perform.
    pub fn n(&self) -> u64 {
        self.n
    }

    pub(crate) fn set_n(&mut self, n: u64) {
        self.n = n;
    }

    /// Start (or resume) timing. No-op if already running.
    pub fn start_timer(&mut self) {
        if !self.running {
            self.start_ns = self.clock.now_ns();
            self.running = true;
        }
    }

    /// Pause timing, keeping what has accumulated. No-op if not running.
    pub fn stop_timer(&mut self) {
        if self.running {
            let now = self.clock.now_ns();
            self.elapsed_ns = self
                .elapsed_ns
                .saturating_add(now.saturating_sub(self.start_ns));
            self.running = false;
        }
    }

    /// Discard accumulated time.
    ///
    /// A running timer keeps running from the current instant.
    pub fn reset_timer(&mut self) {
        if self.running {
            self.start_ns = self.clock.now_ns();
        }
        self.elapsed_ns = 0;
    }

    /// Whether the timer is currently accumulating.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Accumulated measured time. Excludes the current interval while running.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_ns)
    }

    /// [`elapsed`](Bench::elapsed) in whole nanoseconds.
    pub fn elapsed_ns(&self) -> u64 {
        self.elapsed_ns
    }

    /// Nanoseconds per iteration, or 0 when `n` is 0.
    pub fn ns_per_op(&self) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        self.elapsed_ns as f64 / self.n as f64
    }

    /// Iterations per second, or 0 when nothing has been measured.
    pub fn ops_per_sec(&self) -> f64 {
        if self.elapsed_ns == 0 {
            return 0.0;
        }
        self.n as f64 / (self.elapsed_ns as f64 / 1e9)
    }

    /// Record the number of bytes processed by a single iteration.
    ///
    /// This enables bytes/sec reporting in results.
    pub fn set_bytes(&mut self, bytes: u64) {
        self.bytes = Some(bytes);
    }

    /// Bytes per iteration, if [`set_bytes`](Bench::set_bytes) was called.
    pub fn bytes(&self) -> Option<u64> {
        self.bytes
    }

    /// Call `f` exactly [`n`](Bench::n) times, passing each result through
    /// [`black_box`] so the work is not optimised away.
    pub fn iter<F, R>(&mut self, mut f: F)
    where
        F: FnMut() -> R,
    {
        for _ in 0..self.n {
            black_box(f());
        }
    }
}

impl std::fmt::Debug for Bench {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bench")
            .field("n", &self.n)
            .field("elapsed_ns", &self.elapsed_ns)
            .field("running", &self.running)
            .field("bytes", &self.bytes)
            .finish_non_exhaustive()
    }
}
