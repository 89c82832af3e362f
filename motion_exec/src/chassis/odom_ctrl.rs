//! Odometry based chassis controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::{f64::consts::PI, sync::Arc, thread};
use log::{debug, info};

// Internal
use super::{AsyncPositionController, ChassisModel, NavigationTarget, OdomParams};
use crate::odom::{compute_distance_and_angle_to_point, OdomError, Pose, PoseEstimator};
use util::maths::{get_ang_dist_2pi, wrap_to_pi};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drives the chassis to points and headings in the odometry frame using the
/// per-side position controllers.
///
/// A pose estimator thread is started on construction and runs for the life
/// of the controller, whether or not any motion is commanded.
///
/// Motions block until both sides report settled. There is no timeout, so a
/// stalled side will block forever. To abort a motion from another thread the
/// position controllers themselves must be commanded, as the controller is
/// borrowed for the duration of the motion.
pub struct OdomChassisController {
    model: Arc<dyn ChassisModel>,
    estimator: PoseEstimator,
    left_ctrl: Box<dyn AsyncPositionController>,
    right_ctrl: Box<dyn AsyncPositionController>,
    params: OdomParams,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl OdomChassisController {
    /// Create a new controller and start the pose estimator.
    pub fn new(
        model: Arc<dyn ChassisModel>,
        left_ctrl: Box<dyn AsyncPositionController>,
        right_ctrl: Box<dyn AsyncPositionController>,
        params: OdomParams,
    ) -> Result<Self, OdomError> {
        let estimator =
            PoseEstimator::start(model.clone(), params.scales(), params.odom_period())?;

        Ok(Self {
            model,
            estimator,
            left_ctrl,
            right_ctrl,
            params,
        })
    }

    pub fn params(&self) -> &OdomParams {
        &self.params
    }

    /// The current pose estimate.
    pub fn get_pose(&self) -> Pose {
        self.estimator.get_pose()
    }

    /// Overwrite the current pose estimate.
    pub fn set_pose(&self, pose: Pose) {
        self.estimator.set_pose(pose);
    }

    /// Execute a navigation target.
    pub fn navigate(&mut self, target: NavigationTarget) {
        match target {
            NavigationTarget::Point {
                x,
                y,
                backwards,
                offset,
            } => self.drive_to_point(x, y, backwards, offset),
            NavigationTarget::Angle { angle } => self.turn_to_angle(angle),
        }
    }

    /// Drive straight to the point `(x, y)`.
    ///
    /// The robot first turns to face the point (or face away from it when
    /// `backwards` is set) and then drives, stopping `offset` short of the
    /// point. If the distance to drive is below the move threshold nothing
    /// is done.
    pub fn drive_to_point(&mut self, x: f64, y: f64, backwards: bool, offset: f64) {
        let pose = self.get_pose();
        let daa = compute_distance_and_angle_to_point(x, y, &pose);

        let mut travel = daa.distance - offset;
        if travel.abs() < self.params.move_threshold {
            debug!(
                "Skipping drive to ({}, {}), {} from {:?} is under the move threshold",
                x, y, travel, pose
            );
            return;
        }

        let mut angle = daa.angle;
        if backwards {
            angle = wrap_to_pi(angle + PI);
            travel = -travel;
        }

        info!(
            "Driving to ({}, {}) from {:?}: turn {:.4} rad, drive {:.4}",
            x, y, pose, angle, travel
        );

        if angle.abs() > self.params.turn_threshold_rad {
            self.turn_angle(angle);
        }

        self.move_distance(travel);
    }

    /// Turn in place to face `angle` (rad), taking the shortest direction.
    pub fn turn_to_angle(&mut self, angle: f64) {
        let pose = self.get_pose();
        let delta = get_ang_dist_2pi(pose.theta, angle);

        info!("Turning to {:.4} rad from {:?}: turn {:.4} rad", angle, pose, delta);

        self.turn_angle(delta);
    }

    /// Drive straight by `distance`, blocking until settled.
    pub fn move_distance(&mut self, distance: f64) {
        let target = distance * self.params.drive_scale;
        let ticks = self.model.get_sensor_vals();

        self.left_ctrl.flip_disable(false);
        self.right_ctrl.flip_disable(false);

        self.left_ctrl.set_target(ticks[0] + target);
        self.right_ctrl.set_target(ticks[1] + target);

        self.wait_until_settled();
    }

    /// Turn in place by `angle` (rad, counter-clockwise positive), blocking
    /// until settled.
    pub fn turn_angle(&mut self, angle: f64) {
        let target = angle * self.params.drive_turn_scale;
        let ticks = self.model.get_sensor_vals();

        self.left_ctrl.flip_disable(false);
        self.right_ctrl.flip_disable(false);

        self.left_ctrl.set_target(ticks[0] - target);
        self.right_ctrl.set_target(ticks[1] + target);

        self.wait_until_settled();
    }

    /// Block until both sides have settled, then disable them and stop the
    /// drivetrain.
    pub fn wait_until_settled(&mut self) {
        while !(self.left_ctrl.is_settled() && self.right_ctrl.is_settled()) {
            thread::sleep(self.params.settle_poll());
        }

        debug!(
            "Chassis settled (errors: left {:.3}, right {:.3})",
            self.left_ctrl.get_error(),
            self.right_ctrl.get_error()
        );

        self.stop();
    }

    /// Disable both sides and stop the drivetrain.
    pub fn stop(&mut self) {
        self.left_ctrl.flip_disable(true);
        self.right_ctrl.flip_disable(true);
        self.model.stop();
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeChassis {
        ticks: Mutex<[f64; 2]>,
        stops: Mutex<usize>,
    }

    impl ChassisModel for FakeChassis {
        fn get_sensor_vals(&self) -> [f64; 2] {
            *self.ticks.lock().unwrap()
        }

        fn stop(&self) {
            *self.stops.lock().unwrap() += 1;
        }

        fn reset_sensors(&self) {
            *self.ticks.lock().unwrap() = [0.0, 0.0];
        }
    }

    /// Everything a fake position controller was asked to do.
    #[derive(Default, Debug)]
    struct Record {
        targets: Vec<f64>,
        disabled: bool,
        settle_polls: usize,
    }

    /// Position controller that settles after a number of polls.
    struct FakePosCtrl {
        record: Arc<Mutex<Record>>,
        polls_to_settle: usize,
        polls: usize,
    }

    impl FakePosCtrl {
        fn new(polls_to_settle: usize) -> (Self, Arc<Mutex<Record>>) {
            let record = Arc::new(Mutex::new(Record {
                disabled: true,
                ..Default::default()
            }));
            (
                Self {
                    record: record.clone(),
                    polls_to_settle,
                    polls: 0,
                },
                record,
            )
        }
    }

    impl AsyncPositionController for FakePosCtrl {
        fn set_target(&mut self, target: f64) {
            self.polls = 0;
            self.record.lock().unwrap().targets.push(target);
        }

        fn get_error(&self) -> f64 {
            0.0
        }

        fn is_settled(&mut self) -> bool {
            self.polls += 1;
            self.record.lock().unwrap().settle_polls += 1;
            self.polls > self.polls_to_settle
        }

        fn reset(&mut self) {}

        fn flip_disable(&mut self, disabled: bool) {
            self.record.lock().unwrap().disabled = disabled;
        }

        fn is_disabled(&self) -> bool {
            self.record.lock().unwrap().disabled
        }
    }

    struct Rig {
        ctrl: OdomChassisController,
        chassis: Arc<FakeChassis>,
        left: Arc<Mutex<Record>>,
        right: Arc<Mutex<Record>>,
    }

    fn rig(start_ticks: [f64; 2], polls_to_settle: usize) -> Rig {
        let chassis = Arc::new(FakeChassis::default());
        *chassis.ticks.lock().unwrap() = start_ticks;

        let (left_ctrl, left) = FakePosCtrl::new(polls_to_settle);
        let (right_ctrl, right) = FakePosCtrl::new(polls_to_settle);

        let ctrl = OdomChassisController::new(
            chassis.clone(),
            Box::new(left_ctrl),
            Box::new(right_ctrl),
            OdomParams {
                move_threshold: 10.0,
                drive_scale: 2.0,
                drive_turn_scale: 100.0,
                odom_period_ms: 1,
                settle_poll_ms: 1,
                ..Default::default()
            },
        )
        .unwrap();

        Rig {
            ctrl,
            chassis,
            left,
            right,
        }
    }

    fn targets(record: &Arc<Mutex<Record>>) -> Vec<f64> {
        record.lock().unwrap().targets.clone()
    }

    fn stops(chassis: &FakeChassis) -> usize {
        *chassis.stops.lock().unwrap()
    }

    #[test]
    fn test_drive_straight_ahead() {
        let mut rig = rig([0.0, 0.0], 0);

        rig.ctrl.drive_to_point(100.0, 0.0, false, 0.0);

        // No turn is needed, only the drive
        assert_eq!(targets(&rig.left), vec![200.0]);
        assert_eq!(targets(&rig.right), vec![200.0]);
        assert!(rig.left.lock().unwrap().disabled);
        assert!(rig.right.lock().unwrap().disabled);
        assert_eq!(stops(&rig.chassis), 1);
    }

    #[test]
    fn test_turn_then_drive() {
        let mut rig = rig([1000.0, 2000.0], 3);

        rig.ctrl.drive_to_point(0.0, 50.0, false, 0.0);

        let left = targets(&rig.left);
        let right = targets(&rig.right);
        assert_eq!(left.len(), 2);
        assert_eq!(right.len(), 2);

        // Counter-clockwise quarter turn, relative to the current counts
        assert_abs_diff_eq!(left[0], 1000.0 - FRAC_PI_2 * 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(right[0], 2000.0 + FRAC_PI_2 * 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(left[1], 1100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(right[1], 2100.0, epsilon = 1e-9);

        // Each motion waited for settling
        assert!(rig.left.lock().unwrap().settle_polls >= 8);
        assert_eq!(stops(&rig.chassis), 2);
    }

    #[test]
    fn test_drive_backwards() {
        let mut rig = rig([0.0, 0.0], 0);

        rig.ctrl.drive_to_point(-100.0, 0.0, true, 0.0);

        assert_eq!(targets(&rig.left), vec![-200.0]);
        assert_eq!(targets(&rig.right), vec![-200.0]);
    }

    #[test]
    fn test_offset_stops_short() {
        let mut rig = rig([0.0, 0.0], 0);

        rig.ctrl.drive_to_point(100.0, 0.0, false, 30.0);

        assert_eq!(targets(&rig.left), vec![140.0]);
        assert_eq!(targets(&rig.right), vec![140.0]);
    }

    #[test]
    fn test_drive_backwards_with_offset() {
        let mut rig = rig([500.0, -500.0], 0);

        // Point is behind, so no turn. Back up 70 and stop 30 short.
        rig.ctrl.drive_to_point(-100.0, 0.0, true, 30.0);

        assert_eq!(targets(&rig.left), vec![500.0 - 140.0]);
        assert_eq!(targets(&rig.right), vec![-500.0 - 140.0]);
        assert_eq!(stops(&rig.chassis), 1);
    }

    #[test]
    fn test_under_threshold_is_noop() {
        let mut rig = rig([0.0, 0.0], 0);

        rig.ctrl.drive_to_point(5.0, 5.0, false, 0.0);
        rig.ctrl.drive_to_point(100.0, 0.0, false, 95.0);
        rig.ctrl.navigate(NavigationTarget::Point {
            x: -3.0,
            y: 0.0,
            backwards: true,
            offset: 0.0,
        });

        assert!(targets(&rig.left).is_empty());
        assert!(targets(&rig.right).is_empty());
        assert_eq!(rig.left.lock().unwrap().settle_polls, 0);
        assert_eq!(stops(&rig.chassis), 0);
    }

    #[test]
    fn test_turn_to_angle_shortest_way() {
        let mut rig = rig([0.0, 0.0], 0);
        rig.ctrl.set_pose(Pose::new(0.0, 0.0, FRAC_PI_2));
        thread::sleep(Duration::from_millis(10));

        rig.ctrl.navigate(NavigationTarget::Angle { angle: 0.0 });

        // Clockwise quarter turn rather than three quarters anticlockwise
        assert_abs_diff_eq!(targets(&rig.left)[0], FRAC_PI_2 * 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(targets(&rig.right)[0], -FRAC_PI_2 * 100.0, epsilon = 1e-9);
        assert_eq!(stops(&rig.chassis), 1);
    }

    #[test]
    fn test_pose_is_tracked() {
        let rig = rig([0.0, 0.0], 0);
        thread::sleep(Duration::from_millis(10));

        *rig.chassis.ticks.lock().unwrap() = [30.0, 30.0];

        let start = std::time::Instant::now();
        while rig.ctrl.get_pose().x < 29.999 && start.elapsed() < Duration::from_secs(2) {
            thread::sleep(Duration::from_millis(1));
        }
        assert_abs_diff_eq!(rig.ctrl.get_pose().x, 30.0, epsilon = 1e-9);
    }
}
