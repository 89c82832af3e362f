//! Background pose estimation
//!
//! The [`PoseEstimator`] owns a thread which periodically samples the
//! drivetrain encoders and integrates them into the shared pose. The thread is
//! the only periodic writer of the pose. Readers take a snapshot under a read
//! lock, so x, y and theta are always read from the same update.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, RwLock,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, info, warn};

use super::{ChassisScales, Odometry, Pose};
use crate::chassis::ChassisModel;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Name given to the estimator thread.
const THREAD_NAME: &str = "pose_estimator";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Runs odometry in a background thread.
pub struct PoseEstimator {
    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,
    pose: Arc<RwLock<Pose>>,
    reset_odom: Arc<AtomicBool>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum OdomError {
    #[error("Could not spawn the pose estimator thread: {0}")]
    ThreadSpawnError(std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PoseEstimator {
    /// Start estimating the pose of `model`, sampling it every `period`.
    ///
    /// The pose starts at the origin.
    pub fn start(
        model: Arc<dyn ChassisModel>,
        scales: ChassisScales,
        period: Duration,
    ) -> Result<Self, OdomError> {
        let bg_run = Arc::new(AtomicBool::new(true));
        let pose = Arc::new(RwLock::new(Pose::default()));
        let reset_odom = Arc::new(AtomicBool::new(false));

        let run = bg_run.clone();
        let shared_pose = pose.clone();
        let reset = reset_odom.clone();

        let bg_jh = thread::Builder::new()
            .name(THREAD_NAME.into())
            .spawn(move || {
                bg_thread(model, Odometry::new(scales), period, run, shared_pose, reset)
            })
            .map_err(OdomError::ThreadSpawnError)?;

        info!(
            "Pose estimator started (period = {:?}, scales = {:?})",
            period, scales
        );

        Ok(Self {
            bg_jh: Some(bg_jh),
            bg_run,
            pose,
            reset_odom,
        })
    }

    /// A consistent snapshot of the current pose.
    pub fn get_pose(&self) -> Pose {
        match self.pose.read() {
            Ok(p) => *p,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Overwrite the current pose.
    ///
    /// Encoder motion between the last sample and now is discarded.
    pub fn set_pose(&self, pose: Pose) {
        // The reset flag is raised under the lock so the estimator can't
        // apply motion from before the reset onto the new pose
        match self.pose.write() {
            Ok(mut p) => {
                *p = pose;
                self.reset_odom.store(true, Ordering::SeqCst);
            }
            Err(poisoned) => {
                *poisoned.into_inner() = pose;
                self.reset_odom.store(true, Ordering::SeqCst);
            }
        }

        debug!("Pose set to {:?}", pose);
    }

    /// Whether the background thread is still running.
    pub fn is_running(&self) -> bool {
        match self.bg_jh {
            Some(ref jh) => self.bg_run.load(Ordering::Relaxed) && !jh.is_finished(),
            None => false,
        }
    }

    /// Stop the background thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.bg_run.store(false, Ordering::Relaxed);

        if let Some(jh) = self.bg_jh.take() {
            if jh.join().is_err() {
                warn!("Pose estimator thread panicked");
            }
            info!("Pose estimator stopped");
        }
    }
}

impl Drop for PoseEstimator {
    fn drop(&mut self) {
        self.stop();
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn bg_thread(
    model: Arc<dyn ChassisModel>,
    mut odom: Odometry,
    period: Duration,
    run: Arc<AtomicBool>,
    pose: Arc<RwLock<Pose>>,
    reset: Arc<AtomicBool>,
) {
    while run.load(Ordering::Relaxed) {
        let ticks = model.get_sensor_vals();

        {
            let mut guard = match pose.write() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };

            if reset.swap(false, Ordering::SeqCst) {
                odom.reset();
            }

            odom.step(ticks, &mut guard);
        }

        thread::sleep(period);
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
