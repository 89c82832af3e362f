//! # Chassis control module
//!
//! Moves a differential drive chassis around the odometry frame. Rather than
//! telling the robot to drive forward or turn by some amount, callers give a
//! point to drive to or a heading to face, and the [`OdomChassisController`]
//! works out the relative motion from the live pose estimate.
//!
//! The drivetrain itself and the per-side position controllers are provided
//! by the surrounding system through the [`ChassisModel`] and
//! [`AsyncPositionController`] traits.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod odom_ctrl;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use odom_ctrl::*;
pub use params::*;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A handle on the drivetrain.
///
/// The model is shared between the pose estimator thread and the chassis
/// controller, so implementations use interior mutability where needed.
pub trait ChassisModel: Send + Sync {
    /// Current encoder counts as `[left, right]`.
    fn get_sensor_vals(&self) -> [f64; 2];

    /// Stop all actuators.
    fn stop(&self);

    /// Zero the encoder counts.
    fn reset_sensors(&self);
}

/// A position controller for one side of the drivetrain, typically running
/// on the actuator itself.
pub trait AsyncPositionController: Send {
    /// Set the target position, in encoder counts.
    fn set_target(&mut self, target: f64);

    /// The last error.
    fn get_error(&self) -> f64;

    /// Whether the controller has settled on its target.
    fn is_settled(&mut self) -> bool;

    /// Reset the controller's internal state.
    fn reset(&mut self);

    /// Set whether the controller is disabled.
    fn flip_disable(&mut self, disabled: bool);

    /// Whether the controller is disabled.
    fn is_disabled(&self) -> bool;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A motion target in the odometry frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NavigationTarget {
    /// Drive straight to a point.
    Point {
        x: f64,
        y: f64,

        /// Drive to the point backwards.
        backwards: bool,

        /// Stop this far short of the point.
        offset: f64,
    },

    /// Turn in place to face a heading (rad).
    Angle { angle: f64 },
}
