//! Monotonic tick source used to time chunk transfers and whole phases.
//!
//! Durations are kept in raw ticks end to end; only the reporting layer
//! converts them, using [`Clock::frequency`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// A free-running monotonic counter.
pub trait Clock: Send + Sync {
    /// Current counter value. Differences are taken with wrapping arithmetic.
    fn now(&self) -> u64;

    /// Counter ticks per second.
    fn frequency(&self) -> u64;
}

/// [`Instant`]-backed clock with nanosecond ticks.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Ticks per second.
    pub const FREQUENCY: u64 = 1_000_000_000;

    /// A clock whose zero is "now".
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    fn frequency(&self) -> u64 {
        Self::FREQUENCY
    }
}

/// Deterministic clock: every call to [`now`](Clock::now) advances the
/// counter by a fixed step.
///
/// With this clock a chunk transfer measures exactly `step` ticks, which
/// makes statistics reproducible in tests.
#[derive(Debug)]
pub struct StepClock {
    ticks: AtomicU64,
    step: u64,
    frequency: u64,
}

impl StepClock {
    /// Start at zero, advance `step` ticks per reading, report `frequency`.
    #[must_use]
    pub const fn new(step: u64, frequency: u64) -> Self {
        Self {
            ticks: AtomicU64::new(0),
            step,
            frequency,
        }
    }

    /// Number of ticks handed out so far.
    #[must_use]
    pub fn elapsed(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}

impl Clock for StepClock {
    fn now(&self) -> u64 {
        self.ticks.fetch_add(self.step, Ordering::Relaxed) + self.step
    }

    fn frequency(&self) -> u64 {
        self.frequency
    }
}
