//! Velocity PID controller implementation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::time::Duration;
use log::trace;

// Internal
use super::{BoundedOutput, ControllerGains, ControllerState, SampledController};
use crate::{settled::SettlingPredicate, vel_math::VelocityEstimator};
use util::time::ElapsedTimeTracker;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A sampled velocity PID controller.
///
/// The controller only owns its collaborators, it does not create them. Use
/// [`super::VelPidControllerBuilder`] to get one with the default velocity
/// estimator, timer and settling predicate.
pub struct VelPidController {
    gains: ControllerGains,
    state: ControllerState,

    /// Converts raw measurements into velocity and acceleration
    vel_math: Box<dyn VelocityEstimator>,

    /// Gates sampling to the sample period
    loop_dt_timer: Box<dyn ElapsedTimeTracker>,

    /// Decides when the error has settled
    settled_util: Box<dyn SettlingPredicate>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VelPidController {
    /// Create a new controller from its gains and collaborators.
    ///
    /// `k_d` is given per second and scaled by the default sample period.
    pub fn new(
        k_p: f64,
        k_d: f64,
        vel_math: Box<dyn VelocityEstimator>,
        loop_dt_timer: Box<dyn ElapsedTimeTracker>,
        settled_util: Box<dyn SettlingPredicate>,
    ) -> Self {
        let mut ctrl = Self {
            gains: ControllerGains::default(),
            state: ControllerState::default(),
            vel_math,
            loop_dt_timer,
            settled_util,
        };

        ctrl.set_gains(k_p, k_d);

        ctrl
    }

    /// Set the gains. `k_d` is scaled by the current sample period.
    pub fn set_gains(&mut self, k_p: f64, k_d: f64) {
        self.gains.k_p = k_p;
        self.gains.k_d = k_d * self.state.sample_time_ms as f64 / 1000.0;
    }

    /// The stored gains, with `k_d` scaled by the sample period.
    pub fn get_gains(&self) -> ControllerGains {
        self.gains
    }

    /// The last derivative, which is the estimated acceleration.
    pub fn get_derivative(&self) -> f64 {
        self.state.derivative
    }

    pub fn get_target(&self) -> f64 {
        self.state.target
    }

    /// Set the ticks per revolution of the velocity estimator.
    pub fn set_ticks_per_rev(&mut self, tpr: f64) {
        self.vel_math.set_ticks_per_rev(tpr);
    }

    /// The current velocity estimate.
    pub fn get_vel(&self) -> f64 {
        self.vel_math.get_velocity()
    }

    /// A copy of the controller's internal state, for archiving.
    pub fn get_state(&self) -> ControllerState {
        self.state
    }

    fn step_vel(&mut self, reading: f64) -> f64 {
        self.vel_math.step(reading)
    }
}

impl SampledController for VelPidController {
    fn step(&mut self, measurement: f64) -> f64 {
        if !self.state.enabled {
            // The output is an accumulation, so it is kept to resume from
            return 0.0;
        }

        self.loop_dt_timer.place_hard_mark();

        let sample_time = Duration::from_millis(self.state.sample_time_ms as u64);
        if self.loop_dt_timer.get_dt_from_hard_mark() >= sample_time {
            self.step_vel(measurement);
            self.state.error = self.state.target - self.vel_math.get_velocity();

            // Derivative on measurement, so target changes don't kick the output
            self.state.derivative = self.vel_math.get_accel();

            self.state.output +=
                self.gains.k_p * self.state.error - self.gains.k_d * self.state.derivative;
            self.state.output = self
                .state
                .output
                .clamp(self.state.output_min, self.state.output_max);

            self.state.last_error = self.state.error;

            // Only cleared once a full period has passed
            self.loop_dt_timer.clear_hard_mark();

            self.settled_util.is_settled(self.state.error);

            trace!(
                "VelPid: target = {:.3}, error = {:.3}, deriv = {:.5}, output = {:.4}",
                self.state.target,
                self.state.error,
                self.state.derivative,
                self.state.output
            );
        }

        self.state.output
    }

    fn set_target(&mut self, target: f64) {
        self.state.target = target;
    }

    fn get_output(&self) -> f64 {
        if self.state.enabled {
            self.state.output
        } else {
            0.0
        }
    }

    fn get_error(&self) -> f64 {
        self.state.error
    }

    fn is_settled(&mut self) -> bool {
        self.settled_util.is_settled(self.state.error)
    }

    fn reset(&mut self) {
        self.state.error = 0.0;
        self.state.last_error = 0.0;
        self.state.output = 0.0;
    }

    fn flip_disable(&mut self) {
        self.state.enabled = !self.state.enabled;
    }

    fn flip_disable_to(&mut self, disabled: bool) {
        self.state.enabled = !disabled;
    }

    fn is_disabled(&self) -> bool {
        !self.state.enabled
    }

    fn set_sample_time(&mut self, sample_time_ms: u32) {
        if sample_time_ms > 0 {
            self.gains.k_d *= self.state.sample_time_ms as f64 / sample_time_ms as f64;
            self.state.sample_time_ms = sample_time_ms;
        }
    }

    fn get_sample_time(&self) -> u32 {
        self.state.sample_time_ms
    }
}

impl BoundedOutput for VelPidController {
    fn set_output_limits(&mut self, a: f64, b: f64) {
        let (min, max) = if a > b { (b, a) } else { (a, b) };

        self.state.output_min = min;
        self.state.output_max = max;

        self.state.output = self.state.output.clamp(min, max);
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
