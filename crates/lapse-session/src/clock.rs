//! Time sources for entry timestamps.
//!
//! All timestamps are whole seconds since the Unix epoch.

use std::sync::atomic::{AtomicI64, Ordering};

use tokio::time::Instant;

/// Source of the current time in seconds since the Unix epoch.
pub trait Clock: Send + Sync + 'static {
    /// Current time in whole epoch seconds.
    fn now(&self) -> i64;
}

/// Wall clock backed by the system time.
///
/// May step backwards if the system time is adjusted.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Wall-clock anchored, monotonically advancing clock.
///
/// Reads the system time once at construction and advances with
/// [`tokio::time::Instant`] afterwards, so it never goes backwards and it
/// follows tokio's paused clock in tests.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    anchor_secs: i64,
    anchor: Instant,
}

impl MonotonicClock {
    /// Create a clock anchored at the current wall time.
    pub fn new() -> Self {
        Self {
            anchor_secs: chrono::Utc::now().timestamp(),
            anchor: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> i64 {
        let elapsed = i64::try_from(self.anchor.elapsed().as_secs()).unwrap_or(i64::MAX);
        self.anchor_secs.saturating_add(elapsed)
    }
}

/// Manually driven clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    secs: AtomicI64,
}

impl ManualClock {
    /// Create a clock that reads `secs` until changed.
    pub fn new(secs: i64) -> Self {
        Self {
            secs: AtomicI64::new(secs),
        }
    }

    /// Set the current time.
    pub fn set(&self, secs: i64) {
        self.secs.store(secs, Ordering::SeqCst);
    }

    /// Move the clock forward (or backward, with a negative delta).
    pub fn advance(&self, delta: i64) {
        self.secs.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.secs.load(Ordering::SeqCst)
    }
}

impl<C: Clock> Clock for std::sync::Arc<C> {
    fn now(&self) -> i64 {
        (**self).now()
    }
}
