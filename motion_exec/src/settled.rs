//! # Settling detection
//!
//! A controller is settled when its error has stayed small, and stopped
//! changing, for long enough. [`SettledUtil`] implements this as:
//!
//! - `|error| <= at_target_error`, and
//! - `|error - previous_error| <= at_target_derivative`,
//!
//! both holding continuously for at least `at_target_time`. Breaking either
//! condition restarts the window.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::Duration;

use log::trace;
use serde::Deserialize;
use util::time::ElapsedTimeTracker;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Decides whether a controlled quantity has converged.
pub trait SettlingPredicate: Send {
    /// Feed the latest error in and return whether the controller is settled.
    fn is_settled(&mut self, error: f64) -> bool;

    /// Forget any accumulated settling history.
    fn reset(&mut self);
}

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Parameters for [`SettledUtil`].
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct SettledParams {
    /// Maximum absolute error to be considered at the target.
    pub at_target_error: f64,

    /// Maximum change in error between samples to be considered at the target.
    pub at_target_derivative: f64,

    /// How long both conditions must hold, in milliseconds.
    pub at_target_time_ms: u64,
}

/// Default settling predicate.
pub struct SettledUtil {
    params: SettledParams,
    last_error: f64,
    timer: Box<dyn ElapsedTimeTracker>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SettledParams {
    fn default() -> Self {
        Self {
            at_target_error: 50.0,
            at_target_derivative: 5.0,
            at_target_time_ms: 250,
        }
    }
}

impl SettledUtil {
    /// Create a new predicate using `timer` to measure time at the target.
    pub fn new(params: SettledParams, timer: Box<dyn ElapsedTimeTracker>) -> Self {
        Self {
            params,
            last_error: 0.0,
            timer,
        }
    }

    pub fn params(&self) -> &SettledParams {
        &self.params
    }
}

impl SettlingPredicate for SettledUtil {
    fn is_settled(&mut self, error: f64) -> bool {
        let derivative = error - self.last_error;
        self.last_error = error;

        if error.abs() <= self.params.at_target_error
            && derivative.abs() <= self.params.at_target_derivative
        {
            self.timer.place_hard_mark();
        } else {
            self.timer.clear_hard_mark();
            return false;
        }

        let at_target = self.timer.get_dt_from_hard_mark();
        trace!("SettledUtil: error = {:.3}, at target for {:?}", error, at_target);

        at_target >= Duration::from_millis(self.params.at_target_time_ms)
    }

    fn reset(&mut self) {
        self.last_error = 0.0;
        self.timer.clear_hard_mark();
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
