//! Time sources for measuring the simulation phase.
//!
//! The divisor controller compares how long the substep loop took against the
//! step budget. [`SystemClock`] measures real time; [`ManualClock`] lets tests
//! and replays decide exactly how long every measurement takes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A monotonic time source.
pub trait Clock: Send {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Wall-clock time via [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A deterministic clock.
///
/// Every call to [`now`](Clock::now) first advances the clock by the
/// configured auto-advance step, so a measurement bracketed by two reads
/// always lasts exactly one step. Clones share the same time, which lets a
/// test keep a handle after moving the clock into the runtime.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
    auto_advance: Arc<AtomicU64>,
}

impl ManualClock {
    /// A clock frozen at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock that advances by `step` on every read.
    pub fn with_auto_advance(step: Duration) -> Self {
        let clock = Self::new();
        clock.set_auto_advance(step);
        clock
    }

    pub fn set_auto_advance(&self, step: Duration) {
        self.auto_advance
            .store(step.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Current time without advancing.
    pub fn peek(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        let step = self.auto_advance.load(Ordering::SeqCst);
        Duration::from_nanos(self.nanos.fetch_add(step, Ordering::SeqCst) + step)
    }
}
