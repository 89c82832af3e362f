//! Velocity PID parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use crate::settled::SettledParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for a velocity PID controller and its default collaborators.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct VelPidParams {
    /// Proportional gain
    pub k_p: f64,

    /// Derivative gain, per second
    pub k_d: f64,

    /// Sample period
    pub sample_time_ms: u32,

    /// Output lower limit
    pub output_min: f64,

    /// Output upper limit
    pub output_max: f64,

    /// Encoder ticks per revolution of the measured shaft
    pub ticks_per_rev: f64,

    /// Number of samples in the velocity moving average
    pub vel_filter_size: usize,

    /// Settling detection parameters
    pub settle: SettledParams,
}

impl Default for VelPidParams {
    fn default() -> Self {
        Self {
            k_p: 0.0,
            k_d: 0.0,
            sample_time_ms: super::DEFAULT_SAMPLE_TIME_MS,
            output_min: -1.0,
            output_max: 1.0,
            ticks_per_rev: 1800.0,
            vel_filter_size: 5,
            settle: SettledParams::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
