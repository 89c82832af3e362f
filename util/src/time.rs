//! General time utility functions
//!
//! Besides the conversion helpers this module provides the elapsed time
//! tracking used to gate sampled control loops. A tracker is built on top of
//! a [`Clock`], which is either the monotonic wall clock or a [`ManualClock`]
//! that is only advanced when told to, allowing loops to be run against
//! simulated time.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use chrono;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A source of time.
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's own epoch.
    fn now(&self) -> Duration;
}

/// Measures elapsed time for a single consumer.
///
/// Two kinds of marks are provided. A normal mark is moved every time it is
/// placed. A hard mark is only placed if there is no hard mark already, and
/// stays put until it is explicitly cleared. Sampled loops use the hard mark
/// so that a sample is only accepted once a full period has passed since the
/// first call after the previous accepted sample.
pub trait ElapsedTimeTracker: Send {
    /// Time elapsed since the tracker was created.
    fn elapsed(&self) -> Duration;

    /// Time elapsed since the previous call to `read_dt`, or since creation
    /// for the first call.
    fn read_dt(&mut self) -> Duration;

    /// Place the mark at the current time.
    fn place_mark(&mut self);

    /// Remove the mark.
    fn clear_mark(&mut self);

    /// Time since the mark, or zero if there is no mark.
    fn get_dt_from_mark(&self) -> Duration;

    /// Place the hard mark at the current time if it is not already placed.
    fn place_hard_mark(&mut self);

    /// Remove the hard mark.
    fn clear_hard_mark(&mut self);

    /// Time since the hard mark, or zero if there is no hard mark.
    fn get_dt_from_hard_mark(&self) -> Duration;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The monotonic wall clock.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

/// A clock which only moves when advanced.
///
/// Clones share the same time, so one handle can be kept to drive the time
/// seen by any number of trackers.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

/// Default elapsed time tracker.
#[derive(Debug, Clone)]
pub struct Timer<C: Clock = MonotonicClock> {
    clock: C,
    start: Duration,
    last_dt_read: Duration,
    mark: Option<Duration>,
    hard_mark: Option<Duration>,
}

/// A timer driven by a [`ManualClock`].
pub type ManualTimer = Timer<ManualClock>;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for MonotonicClock {
    fn default() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

impl ManualClock {
    /// Create a new clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward.
    pub fn advance(&self, dt: Duration) {
        self.nanos.fetch_add(dt.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Set the clock to an absolute time since its epoch.
    pub fn set(&self, t: Duration) {
        self.nanos.store(t.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

impl Timer<MonotonicClock> {
    /// Create a new timer on the monotonic clock.
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock::default())
    }
}

impl Default for Timer<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Timer<C> {
    /// Create a new timer reading from the given clock.
    pub fn with_clock(clock: C) -> Self {
        let now = clock.now();
        Self {
            clock,
            start: now,
            last_dt_read: now,
            mark: None,
            hard_mark: None,
        }
    }
}

impl<C: Clock> ElapsedTimeTracker for Timer<C> {
    fn elapsed(&self) -> Duration {
        self.clock.now().saturating_sub(self.start)
    }

    fn read_dt(&mut self) -> Duration {
        let now = self.clock.now();
        let dt = now.saturating_sub(self.last_dt_read);
        self.last_dt_read = now;
        dt
    }

    fn place_mark(&mut self) {
        self.mark = Some(self.clock.now());
    }

    fn clear_mark(&mut self) {
        self.mark = None;
    }

    fn get_dt_from_mark(&self) -> Duration {
        match self.mark {
            Some(m) => self.clock.now().saturating_sub(m),
            None => Duration::ZERO,
        }
    }

    fn place_hard_mark(&mut self) {
        if self.hard_mark.is_none() {
            self.hard_mark = Some(self.clock.now());
        }
    }

    fn clear_hard_mark(&mut self) {
        self.hard_mark = None;
    }

    fn get_dt_from_hard_mark(&self) -> Duration {
        match self.hard_mark {
            Some(m) => self.clock.now().saturating_sub(m),
            None => Duration::ZERO,
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a chrono duration into a number of seconds, or `None` if overflow
pub fn chrono_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Convert a duration into fractional milliseconds.
pub fn duration_to_millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_read_dt() {
        let clock = ManualClock::new();
        let mut timer = ManualTimer::with_clock(clock.clone());

        clock.advance(ms(5));
        assert_eq!(timer.read_dt(), ms(5));
        assert_eq!(timer.read_dt(), ms(0));

        clock.advance(ms(3));
        assert_eq!(timer.read_dt(), ms(3));
        assert_eq!(timer.elapsed(), ms(8));
    }

    #[test]
    fn test_hard_mark_only_placed_once() {
        let clock = ManualClock::new();
        let mut timer = ManualTimer::with_clock(clock.clone());

        assert_eq!(timer.get_dt_from_hard_mark(), ms(0));

        timer.place_hard_mark();
        clock.advance(ms(4));
        timer.place_hard_mark();
        clock.advance(ms(4));
        assert_eq!(timer.get_dt_from_hard_mark(), ms(8));

        timer.clear_hard_mark();
        assert_eq!(timer.get_dt_from_hard_mark(), ms(0));

        timer.place_hard_mark();
        clock.advance(ms(1));
        assert_eq!(timer.get_dt_from_hard_mark(), ms(1));
    }

    #[test]
    fn test_mark_moves() {
        let clock = ManualClock::new();
        let mut timer = ManualTimer::with_clock(clock.clone());

        timer.place_mark();
        clock.advance(ms(4));
        timer.place_mark();
        clock.advance(ms(4));
        assert_eq!(timer.get_dt_from_mark(), ms(4));

        timer.clear_mark();
        assert_eq!(timer.get_dt_from_mark(), ms(0));
    }

    #[test]
    fn test_clock_clones_share_time() {
        let clock = ManualClock::new();
        let other = clock.clone();

        clock.set(ms(250));
        assert_eq!(other.now(), ms(250));
        assert_eq!(duration_to_millis(other.now()), 250.0);
    }
}
