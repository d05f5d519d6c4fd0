//! Monotonic nanosecond clock sources.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

/// A monotonic, nanosecond-resolution time source.
///
/// Readings are nanoseconds since an arbitrary fixed origin and must never go
/// backwards between two calls within the same process.
pub trait Clock: Send + Sync {
    fn now_ns(&self) -> u64;
}

/// Clock backed by [`std::time::Instant`].
///
/// All instances share one process-wide origin, so readings from different
/// `SystemClock` values are comparable.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ns(&self) -> u64 {
        static ORIGIN: OnceLock<Instant> = OnceLock::new();
        let nanos = ORIGIN.get_or_init(Instant::now).elapsed().as_nanos();
        u64::try_from(nanos).unwrap_or(u64::MAX)
    }
}

/// A clock that only moves when told to.
///
/// Useful for testing benchmark logic deterministically: the benchmark body
/// advances the clock by the amount of "work" it pretends to do.
///
/// ```
/// use benchpress::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// clock.advance(250);
/// assert_eq!(clock.now_ns(), 250);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `ns` nanoseconds.
    pub fn advance(&self, ns: u64) {
        self.now.fetch_add(ns, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ns(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn should_never_go_backwards_when_read_repeatedly() {
        let clock = SystemClock;
        let mut last = clock.now_ns();
        for _ in 0..1000 {
            let now = clock.now_ns();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn should_advance_when_time_passes() {
        let clock = SystemClock;
        let before = clock.now_ns();
        std::thread::sleep(Duration::from_millis(5));
        assert!(clock.now_ns() - before >= 5_000_000);
    }

    #[test]
    fn should_only_move_manual_clock_when_advanced() {
        let clock = ManualClock::new();
        assert_eq!(clock.now_ns(), 0);
        clock.advance(10);
        clock.advance(5);
        assert_eq!(clock.now_ns(), 15);
        assert_eq!(clock.now_ns(), 15);
    }
}
