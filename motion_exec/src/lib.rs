//! # Motion control library.
//!
//! This library holds the closed-loop motion control core, and allows the
//! executable (and any other crate in the workspace) to access it.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Chassis control - drives the robot to points and headings in the odometry frame
pub mod chassis;

/// Flywheel simulator - a single rotating link used in place of real actuators
pub mod flywheel_sim;

/// Odometry - integrates drivetrain encoder counts into a pose
pub mod odom;

/// Settling detection for sampled controllers
pub mod settled;

/// Tuning - closes a velocity controller around the flywheel simulator
pub mod tuning;

/// Velocity estimation from raw encoder counts
pub mod vel_math;

/// Velocity PID control
pub mod vel_pid;
