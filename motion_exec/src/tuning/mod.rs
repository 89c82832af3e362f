//! # Tuning module
//!
//! Closes a [`VelPidController`] around a [`FlywheelSimulator`] so that gains
//! can be tried out without hardware. Time is simulated: a shared
//! [`ManualClock`] is advanced by the simulator timestep after every step, so
//! a run is fully deterministic and runs as fast as the host allows.
//!
//! The simulator angle is converted into encoder ticks using the controller's
//! ticks per revolution, and the controller output (normalised to [-1, 1]) is
//! mapped onto the simulator's torque range.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::{f64::consts::TAU, time::Duration};
use thiserror::Error;

// Internal
use crate::{
    flywheel_sim::{FlywheelSimParams, FlywheelSimulator},
    vel_pid::{SampledController, VelPidController, VelPidControllerBuilder, VelPidParams},
};
use util::{
    archive::{ArchiveError, Archiver},
    maths::lin_map,
    time::{Clock, ManualClock},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Seconds per minute, for converting rad/s into RPM.
const SECS_PER_MINUTE: f64 = 60.0;

/// Controller output range mapped onto the full torque range.
const NORM_OUTPUT_RANGE: (f64, f64) = (-1.0, 1.0);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of a tuning run.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TuningParams {
    /// Velocity target
    ///
    /// Units: RPM
    pub target_rpm: f64,

    /// Length of simulated time to run for
    ///
    /// Units: seconds
    pub run_time_s: f64,

    /// Trace file path relative to the session archive directory. No trace
    /// is written if this is not set.
    pub trace_path: Option<String>,

    pub vel_pid: VelPidParams,

    pub sim: FlywheelSimParams,
}

/// One row of the tuning trace, written every simulator step.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct TraceRow {
    pub time_s: f64,
    pub target_rpm: f64,
    pub measured_rpm: f64,
    pub sim_rpm: f64,
    pub output: f64,
    pub torque_nm: f64,
    pub angle_rad: f64,
}

/// Outcome of a tuning run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuningSummary {
    /// Velocity estimate at the end of the run, RPM
    pub final_rpm: f64,

    /// Time after which the velocity estimate stayed within the settling
    /// error band until the end of the run, or `None` if it never did
    pub settling_time_s: Option<f64>,

    /// Largest excursion of the simulated velocity past the target, in the
    /// direction of the target, RPM
    pub peak_overshoot_rpm: f64,

    /// Number of simulator steps taken
    pub num_steps: usize,
}

/// A controller and simulator closed into a loop on simulated time.
pub struct TuningSession {
    clock: ManualClock,
    timestep: Duration,
    sim: FlywheelSimulator,
    ctrl: VelPidController,
    target_rpm: f64,
    ticks_per_rev: f64,
    settle_band_rpm: f64,
    in_band_since_s: Option<f64>,
    peak_overshoot_rpm: f64,
    num_steps: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors that can occur during a tuning run.
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("The run time must be positive and finite, got {0} s")]
    InvalidRunTime(f64),

    #[error("The simulator timestep cannot be used as a clock step, got {0} s")]
    InvalidTimestep(f64),

    #[error("Failed to write the tuning trace: {0}")]
    TraceError(#[from] ArchiveError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for TuningParams {
    fn default() -> Self {
        Self {
            target_rpm: 100.0,
            run_time_s: 2.0,
            trace_path: Some("tuning_trace.csv".into()),
            vel_pid: VelPidParams::default(),
            sim: FlywheelSimParams::default(),
        }
    }
}

impl TuningSession {
    /// Create a new session with the flywheel at rest and simulated time at
    /// zero.
    ///
    /// Fails if the simulator timestep is too large to advance the clock by.
    pub fn new(params: &TuningParams) -> Result<Self, TuningError> {
        let clock = ManualClock::new();
        let sim = FlywheelSimulator::from_params(&params.sim);

        let timestep = Duration::try_from_secs_f64(sim.get_timestep())
            .map_err(|_| TuningError::InvalidTimestep(params.sim.timestep_s))?;

        let mut ctrl = VelPidControllerBuilder::from_params(&params.vel_pid)
            .with_clock(clock.clone())
            .build();
        ctrl.set_target(params.target_rpm);

        Ok(Self {
            clock,
            timestep,
            sim,
            ctrl,
            target_rpm: params.target_rpm,
            ticks_per_rev: params.vel_pid.ticks_per_rev,
            settle_band_rpm: params.vel_pid.settle.at_target_error,
            in_band_since_s: None,
            peak_overshoot_rpm: 0.0,
            num_steps: 0,
        })
    }

    /// Run the controller once, apply its output to the simulator and step
    /// the simulator, then advance time by one timestep.
    pub fn step(&mut self) -> TraceRow {
        let time_s = self.clock_s();

        let ticks = self.sim.get_angle() / TAU * self.ticks_per_rev;
        let output = self.ctrl.step(ticks);

        let max_torque = self.sim.get_max_torque();
        let torque_nm = lin_map(NORM_OUTPUT_RANGE, (-max_torque, max_torque), output);
        self.sim.set_torque(torque_nm);
        let angle_rad = self.sim.step();

        self.clock.advance(self.timestep);
        self.num_steps += 1;

        let measured_rpm = self.ctrl.get_vel();
        let sim_rpm = self.sim.get_omega() * SECS_PER_MINUTE / TAU;

        if (self.target_rpm - measured_rpm).abs() <= self.settle_band_rpm {
            self.in_band_since_s.get_or_insert(time_s);
        } else {
            self.in_band_since_s = None;
        }

        let overshoot = (sim_rpm - self.target_rpm) * self.target_rpm.signum();
        if overshoot > self.peak_overshoot_rpm {
            self.peak_overshoot_rpm = overshoot;
        }

        TraceRow {
            time_s,
            target_rpm: self.target_rpm,
            measured_rpm,
            sim_rpm,
            output,
            torque_nm,
            angle_rad,
        }
    }

    /// Summary of the run so far.
    pub fn summary(&self) -> TuningSummary {
        TuningSummary {
            final_rpm: self.ctrl.get_vel(),
            settling_time_s: self.in_band_since_s,
            peak_overshoot_rpm: self.peak_overshoot_rpm,
            num_steps: self.num_steps,
        }
    }

    pub fn controller(&self) -> &VelPidController {
        &self.ctrl
    }

    pub fn simulator(&self) -> &FlywheelSimulator {
        &self.sim
    }

    /// Current simulated time in seconds.
    fn clock_s(&self) -> f64 {
        self.clock.now().as_secs_f64()
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Run a full tuning session, writing every step to `trace` if given.
pub fn run_tuning(
    params: &TuningParams,
    mut trace: Option<&mut Archiver>,
) -> Result<TuningSummary, TuningError> {
    if !(params.run_time_s.is_finite() && params.run_time_s > 0.0) {
        return Err(TuningError::InvalidRunTime(params.run_time_s));
    }

    let mut session = TuningSession::new(params)?;
    let num_steps = ((params.run_time_s / session.sim.get_timestep()).round() as usize).max(1);

    debug!(
        "Starting tuning run: target = {} RPM, {} steps of {:?}",
        params.target_rpm, num_steps, session.timestep
    );

    for _ in 0..num_steps {
        let row = session.step();

        if let Some(ref mut arch) = trace {
            arch.serialise(row)?;
        }
    }

    let summary = session.summary();

    info!(
        "Tuning run complete: final velocity = {:.3} RPM (target {:.3} RPM)",
        summary.final_rpm, params.target_rpm
    );
    match summary.settling_time_s {
        Some(t) => info!("Settled within {} RPM after {:.4} s", session.settle_band_rpm, t),
        None => info!("Did not settle within {} RPM", session.settle_band_rpm),
    }
    info!("Peak overshoot: {:.3} RPM", summary.peak_overshoot_rpm);

    Ok(summary)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
