//! # Velocity PID control module
//!
//! The velocity PID controller drives a measured velocity towards a target
//! velocity at a fixed sample period. It is a velocity-form controller: each
//! accepted sample adds `k_p * error - k_d * derivative` onto the output, so
//! the output itself behaves like an integrator. The derivative is taken on
//! the measurement (the estimated acceleration) rather than on the error, so
//! that step changes in the target do not kick the output.
//!
//! Controllers are used through two small capability traits,
//! [`SampledController`] and [`BoundedOutput`], and are assembled with a
//! [`VelPidControllerBuilder`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod builder;
mod controller;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
pub use builder::*;
pub use controller::*;
pub use params::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Sample period used until one is set.
pub const DEFAULT_SAMPLE_TIME_MS: u32 = 10;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A controller which is stepped at a fixed sample period.
pub trait SampledController {
    /// Step the controller with a new measurement, returning the output.
    fn step(&mut self, measurement: f64) -> f64;

    /// Set the target.
    fn set_target(&mut self, target: f64);

    /// The last computed output, or zero if the controller is disabled.
    fn get_output(&self) -> f64;

    /// The last computed error.
    fn get_error(&self) -> f64;

    /// Whether the controller has settled on its target.
    fn is_settled(&mut self) -> bool;

    /// Reset the error and output, keeping the target and gains.
    fn reset(&mut self);

    /// Toggle whether the controller is disabled.
    fn flip_disable(&mut self);

    /// Set whether the controller is disabled.
    fn flip_disable_to(&mut self, disabled: bool);

    /// Whether the controller is disabled.
    fn is_disabled(&self) -> bool;

    /// Set the sample period. Zero is ignored.
    fn set_sample_time(&mut self, sample_time_ms: u32);

    /// The sample period in milliseconds.
    fn get_sample_time(&self) -> u32;
}

/// A controller whose output is clamped to a range.
pub trait BoundedOutput {
    /// Set the output limits. The bounds may be given in either order.
    fn set_output_limits(&mut self, a: f64, b: f64);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Controller gains.
///
/// `k_d` is stored scaled by the sample period in seconds, so that the
/// derivative contribution has the same meaning whatever the loop rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerGains {
    /// Proportional gain
    pub k_p: f64,

    /// Derivative gain, scaled by the sample period
    pub k_d: f64,
}

/// Internal state of a velocity PID controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControllerState {
    pub target: f64,
    pub error: f64,
    pub last_error: f64,
    pub derivative: f64,
    pub output: f64,
    pub output_min: f64,
    pub output_max: f64,
    pub enabled: bool,
    pub sample_time_ms: u32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            target: 0.0,
            error: 0.0,
            last_error: 0.0,
            derivative: 0.0,
            output: 0.0,
            output_min: -1.0,
            output_max: 1.0,
            enabled: true,
            sample_time_ms: DEFAULT_SAMPLE_TIME_MS,
        }
    }
}
