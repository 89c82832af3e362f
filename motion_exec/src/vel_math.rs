//! # Velocity estimation
//!
//! Converts raw encoder positions into a smoothed velocity (RPM) and an
//! acceleration (RPM per millisecond). The velocity PID controller consumes
//! estimators through the [`VelocityEstimator`] trait; [`VelMath`] is the
//! default implementation.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::VecDeque;

use log::trace;
use util::time::{duration_to_millis, ElapsedTimeTracker};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Milliseconds in a minute, used to get RPM from ticks per millisecond.
const MS_PER_MINUTE: f64 = 60_000.0;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Estimates velocity and acceleration from raw position samples.
pub trait VelocityEstimator: Send {
    /// Feed a new raw position sample in, returning the new velocity.
    fn step(&mut self, raw_sample: f64) -> f64;

    /// The most recent velocity estimate.
    fn get_velocity(&self) -> f64;

    /// The most recent acceleration estimate.
    fn get_accel(&self) -> f64;

    /// Set the number of encoder ticks per revolution.
    fn set_ticks_per_rev(&mut self, tpr: f64);
}

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Moving average filter over the last `size` inputs.
#[derive(Debug, Clone)]
pub struct AverageFilter {
    size: usize,
    window: VecDeque<f64>,
    sum: f64,
}

/// Default velocity estimator.
pub struct VelMath {
    ticks_per_rev: f64,
    last_pos: f64,
    vel: f64,
    last_vel: f64,
    accel: f64,
    filter: AverageFilter,
    loop_dt_timer: Box<dyn ElapsedTimeTracker>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl AverageFilter {
    /// Create a new filter. A size of zero is treated as one (no filtering).
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            window: VecDeque::with_capacity(size),
            sum: 0.0,
        }
    }

    /// Add a new input and return the filtered value.
    pub fn filter(&mut self, input: f64) -> f64 {
        if self.window.len() == self.size {
            if let Some(old) = self.window.pop_front() {
                self.sum -= old;
            }
        }
        self.window.push_back(input);
        self.sum += input;

        self.sum / self.window.len() as f64
    }

    /// The current filtered value, or zero if nothing has been filtered yet.
    pub fn get_output(&self) -> f64 {
        if self.window.is_empty() {
            0.0
        } else {
            self.sum / self.window.len() as f64
        }
    }
}

impl VelMath {
    /// Create a new estimator.
    ///
    /// `loop_dt_timer` measures the time between successive steps.
    pub fn new(
        ticks_per_rev: f64,
        filter_size: usize,
        loop_dt_timer: Box<dyn ElapsedTimeTracker>,
    ) -> Self {
        Self {
            ticks_per_rev,
            last_pos: 0.0,
            vel: 0.0,
            last_vel: 0.0,
            accel: 0.0,
            filter: AverageFilter::new(filter_size),
            loop_dt_timer,
        }
    }

    /// The number of encoder ticks per revolution.
    pub fn get_ticks_per_rev(&self) -> f64 {
        self.ticks_per_rev
    }
}

impl VelocityEstimator for VelMath {
    fn step(&mut self, raw_sample: f64) -> f64 {
        let dt_ms = duration_to_millis(self.loop_dt_timer.read_dt());

        // No time has passed, so there is nothing to differentiate over
        if dt_ms <= 0.0 {
            return self.vel;
        }

        let raw_vel = (raw_sample - self.last_pos) * (MS_PER_MINUTE / self.ticks_per_rev) / dt_ms;
        self.vel = self.filter.filter(raw_vel);
        self.accel = (self.vel - self.last_vel) / dt_ms;

        trace!(
            "VelMath: dt = {:.3} ms, raw = {:.3}, vel = {:.3}, accel = {:.5}",
            dt_ms,
            raw_vel,
            self.vel,
            self.accel
        );

        self.last_vel = self.vel;
        self.last_pos = raw_sample;

        self.vel
    }

    fn get_velocity(&self) -> f64 {
        self.vel
    }

    fn get_accel(&self) -> f64 {
        self.accel
    }

    fn set_ticks_per_rev(&mut self, tpr: f64) {
        if tpr > 0.0 {
            self.ticks_per_rev = tpr;
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
