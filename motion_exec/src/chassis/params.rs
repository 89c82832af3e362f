//! Chassis control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;
use std::time::Duration;

// Internal
use crate::odom::ChassisScales;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for odometry and odometry based chassis control.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct OdomParams {
    /// Encoder counts per unit distance, used by the pose estimator
    pub straight_scale: f64,

    /// Wheel track width, used by the pose estimator
    pub turn_scale: f64,

    /// Moves shorter than this are skipped
    pub move_threshold: f64,

    /// Turns smaller than this are skipped when driving to a point
    pub turn_threshold_rad: f64,

    /// Position controller counts per unit distance driven
    pub drive_scale: f64,

    /// Position controller counts per radian of chassis rotation
    pub drive_turn_scale: f64,

    /// Period of the pose estimator
    pub odom_period_ms: u64,

    /// How often to poll the position controllers while waiting to settle
    pub settle_poll_ms: u64,
}

impl OdomParams {
    pub fn scales(&self) -> ChassisScales {
        ChassisScales {
            straight: self.straight_scale,
            turn: self.turn_scale,
        }
    }

    pub fn odom_period(&self) -> Duration {
        Duration::from_millis(self.odom_period_ms)
    }

    pub fn settle_poll(&self) -> Duration {
        Duration::from_millis(self.settle_poll_ms)
    }
}

impl Default for OdomParams {
    fn default() -> Self {
        Self {
            straight_scale: 1.0,
            turn_scale: 1.0,
            move_threshold: 10.0,
            turn_threshold_rad: 1f64.to_radians(),
            drive_scale: 1.0,
            drive_turn_scale: 1.0,
            odom_period_ms: 10,
            settle_poll_ms: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
