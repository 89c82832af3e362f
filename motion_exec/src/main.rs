//! Tuning session executable entry point.
//!
//! Runs a velocity controller against the flywheel simulator with the gains
//! from a parameter file, archives a trace of every simulator step, and logs
//! a summary of how well the controller tracked its target.
//!
//! # Usage
//!
//!     motion_exec [--params <file>] [--target-rpm <rpm>] [--run-time <s>] [--trace]
//!
//! The parameter file is relative to `$MOTION_SW_ROOT/params`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Result};
use log::{debug, info};
use structopt::StructOpt;

// Internal
use motion_lib::tuning::{run_tuning, TuningParams};
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Tune a velocity PID controller against a simulated flywheel.
#[derive(Debug, StructOpt)]
#[structopt(name = "motion_exec")]
struct Args {
    /// Tuning parameter file, relative to the params directory.
    #[structopt(short, long, default_value = "tuning.toml")]
    params: String,

    /// Override the target velocity in the parameter file (RPM).
    #[structopt(long)]
    target_rpm: Option<f64>,

    /// Override the simulated run time in the parameter file (s).
    #[structopt(long)]
    run_time: Option<f64>,

    /// Log every controller and simulator step.
    #[structopt(long)]
    trace: bool,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("motion_exec", "sessions")
        .wrap_err("Failed to create the session")?;

    // Initialise logger
    let level = if args.trace {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    logger_init(level, &session).wrap_err("Failed to initialise logging")?;

    info!("Motion Tuning Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI arguments: {:?}", args);

    // ---- LOAD PARAMETERS ----

    let mut params: TuningParams = util::params::load(&args.params)
        .wrap_err_with(|| format!("Could not load tuning params from {}", args.params))?;

    if let Some(target_rpm) = args.target_rpm {
        params.target_rpm = target_rpm;
    }
    if let Some(run_time) = args.run_time {
        params.run_time_s = run_time;
    }

    info!("Tuning parameters loaded: {:#?}", params);

    // ---- RUN ----

    let mut archiver = match params.trace_path {
        Some(ref path) => Some(
            Archiver::from_path(&session, path)
                .wrap_err_with(|| format!("Could not create the trace archive {}", path))?,
        ),
        None => None,
    };

    let summary =
        run_tuning(&params, archiver.as_mut()).wrap_err("The tuning run failed")?;

    info!("Summary: {:#?}", summary);
    info!("End of execution");

    Ok(())
}
