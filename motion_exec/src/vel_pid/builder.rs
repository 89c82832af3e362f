//! Velocity PID controller builder
//!
//! All default collaborators are assembled here so that
//! [`VelPidController::new`] stays a plain aggregation of its dependencies.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;

// Internal
use super::{BoundedOutput, SampledController, VelPidController, VelPidParams};
use crate::{
    settled::{SettledUtil, SettlingPredicate},
    vel_math::{VelMath, VelocityEstimator},
};
use util::time::{Clock, ElapsedTimeTracker, Timer};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

type TimerFactory = Box<dyn Fn() -> Box<dyn ElapsedTimeTracker>>;

/// Builds a [`VelPidController`], filling in any collaborator that was not
/// given explicitly.
pub struct VelPidControllerBuilder {
    params: VelPidParams,
    timer_factory: TimerFactory,
    vel_math: Option<Box<dyn VelocityEstimator>>,
    loop_dt_timer: Option<Box<dyn ElapsedTimeTracker>>,
    settled_util: Option<Box<dyn SettlingPredicate>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VelPidControllerBuilder {
    /// Start a builder with the given gains and default parameters.
    pub fn new(k_p: f64, k_d: f64) -> Self {
        Self::from_params(&VelPidParams {
            k_p,
            k_d,
            ..Default::default()
        })
    }

    /// Start a builder from a full parameter set.
    pub fn from_params(params: &VelPidParams) -> Self {
        Self {
            params: params.clone(),
            timer_factory: Box::new(|| Box::new(Timer::new())),
            vel_math: None,
            loop_dt_timer: None,
            settled_util: None,
        }
    }

    /// Read time from `clock` in every default timer.
    pub fn with_clock<C>(mut self, clock: C) -> Self
    where
        C: Clock + Clone + 'static,
    {
        self.timer_factory = Box::new(move || Box::new(Timer::with_clock(clock.clone())));
        self
    }

    /// Use the given velocity estimator.
    pub fn with_vel_math(mut self, vel_math: Box<dyn VelocityEstimator>) -> Self {
        self.vel_math = Some(vel_math);
        self
    }

    /// Use the given timer to gate the sample period.
    pub fn with_timer(mut self, timer: Box<dyn ElapsedTimeTracker>) -> Self {
        self.loop_dt_timer = Some(timer);
        self
    }

    /// Use the given settling predicate.
    pub fn with_settled_util(mut self, settled_util: Box<dyn SettlingPredicate>) -> Self {
        self.settled_util = Some(settled_util);
        self
    }

    /// Build the controller.
    pub fn build(self) -> VelPidController {
        let params = self.params;
        let timer_factory = self.timer_factory;

        let vel_math = match self.vel_math {
            Some(v) => v,
            None => Box::new(VelMath::new(
                params.ticks_per_rev,
                params.vel_filter_size,
                timer_factory(),
            )),
        };
        let loop_dt_timer = match self.loop_dt_timer {
            Some(t) => t,
            None => timer_factory(),
        };
        let settled_util = match self.settled_util {
            Some(s) => s,
            None => Box::new(SettledUtil::new(params.settle, timer_factory())),
        };

        let mut ctrl =
            VelPidController::new(params.k_p, params.k_d, vel_math, loop_dt_timer, settled_util);

        // Gains are set after the period so k_d is scaled by the final period
        ctrl.set_sample_time(params.sample_time_ms);
        ctrl.set_gains(params.k_p, params.k_d);
        ctrl.set_output_limits(params.output_min, params.output_max);

        debug!(
            "Built VelPidController: k_p = {}, k_d = {}, sample time = {} ms, limits = [{}, {}]",
            params.k_p,
            params.k_d,
            ctrl.get_sample_time(),
            params.output_min,
            params.output_max
        );

        ctrl
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
