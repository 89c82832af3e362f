//! # Odometry module
//!
//! Dead reckoning for a differential drive. The drivetrain's left and right
//! encoder counts are integrated into a pose in the odometry frame, which is
//! fixed at the pose the robot was in when odometry started.
//!
//! Frame conventions: `theta` is measured from the +X axis, counter-clockwise
//! positive, in the range (-pi, pi]. Driving forwards at `theta = 0` increases
//! X.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod estimator;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// Internal
pub use estimator::*;
use util::maths::wrap_to_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The pose of the robot in the odometry frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position along the odometry frame X axis
    pub x: f64,

    /// Position along the odometry frame Y axis
    pub y: f64,

    /// Heading, counter-clockwise from +X
    ///
    /// Units: radians
    pub theta: f64,
}

/// Scales relating encoder counts to motion of the chassis.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChassisScales {
    /// Encoder counts per unit of distance travelled by a wheel
    pub straight: f64,

    /// Distance between the left and right wheels
    pub turn: f64,
}

/// The distance and heading change needed to reach a point.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct DistanceAndAngle {
    /// Straight line distance to the point
    pub distance: f64,

    /// Angle to turn through to face the point, in (-pi, pi]
    pub angle: f64,
}

/// Integrates encoder counts into pose changes.
#[derive(Debug, Clone)]
pub struct Odometry {
    scales: ChassisScales,
    last_ticks: Option<[f64; 2]>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self { x, y, theta }
    }

    /// Position as a vector.
    pub fn position(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }
}

impl Default for ChassisScales {
    fn default() -> Self {
        Self {
            straight: 1.0,
            turn: 1.0,
        }
    }
}

impl Odometry {
    pub fn new(scales: ChassisScales) -> Self {
        Self {
            scales,
            last_ticks: None,
        }
    }

    pub fn scales(&self) -> &ChassisScales {
        &self.scales
    }

    /// Forget the previous encoder counts, so that the next step only records
    /// the counts without moving the pose.
    pub fn reset(&mut self) {
        self.last_ticks = None;
    }

    /// Integrate the change in encoder counts since the last step into `pose`.
    ///
    /// The first step after creation or a reset only records the counts.
    pub fn step(&mut self, ticks: [f64; 2], pose: &mut Pose) {
        let last = match self.last_ticks.replace(ticks) {
            Some(l) => l,
            None => return,
        };

        let d_left = (ticks[0] - last[0]) / self.scales.straight;
        let d_right = (ticks[1] - last[1]) / self.scales.straight;

        let d_dist = (d_left + d_right) / 2.0;
        let d_theta = (d_right - d_left) / self.scales.turn;

        // Translate along the mean heading of the step
        let mid_theta = pose.theta + d_theta / 2.0;
        pose.x += d_dist * mid_theta.cos();
        pose.y += d_dist * mid_theta.sin();
        pose.theta = wrap_to_pi(pose.theta + d_theta);
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the distance and turn angle from `pose` to the point `(x, y)`.
pub fn compute_distance_and_angle_to_point(x: f64, y: f64, pose: &Pose) -> DistanceAndAngle {
    let delta = Vector2::new(x, y) - pose.position();

    let distance = delta.norm();
    let angle = if distance == 0.0 {
        0.0
    } else {
        wrap_to_pi(delta[1].atan2(delta[0]) - pose.theta)
    };

    DistanceAndAngle { distance, angle }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn odom() -> Odometry {
        Odometry::new(ChassisScales {
            straight: 100.0,
            turn: 2.0,
        })
    }

    #[test]
    fn test_first_step_only_records() {
        let mut odom = odom();
        let mut pose = Pose::default();

        odom.step([500.0, 700.0], &mut pose);
        assert_eq!(pose, Pose::default());
    }

    #[test]
    fn test_straight_line() {
        let mut odom = odom();
        let mut pose = Pose::default();

        odom.step([0.0, 0.0], &mut pose);
        odom.step([250.0, 250.0], &mut pose);
        assert_abs_diff_eq!(pose.x, 2.5);
        assert_abs_diff_eq!(pose.y, 0.0);
        assert_abs_diff_eq!(pose.theta, 0.0);

        // Drive along +Y
        pose.theta = FRAC_PI_2;
        odom.step([350.0, 350.0], &mut pose);
        assert_abs_diff_eq!(pose.x, 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(pose.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_point_turn() {
        let mut odom = odom();
        let mut pose = Pose::default();

        // Each wheel moves pi/2 in opposite directions on a track of 2, which
        // turns the chassis through pi/2 counter-clockwise
        odom.step([0.0, 0.0], &mut pose);
        odom.step([-50.0 * PI, 50.0 * PI], &mut pose);
        assert_abs_diff_eq!(pose.x, 0.0);
        assert_abs_diff_eq!(pose.y, 0.0);
        assert_abs_diff_eq!(pose.theta, FRAC_PI_2, epsilon = 1e-12);

        // Keep turning and the heading wraps
        odom.step([-150.0 * PI, 150.0 * PI], &mut pose);
        assert_abs_diff_eq!(pose.theta, -FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_arc() {
        let mut odom = odom();
        let mut pose = Pose::default();

        // Quarter circle of radius 1 about (0, 1), split into small steps
        // Left wheel radius 0, right wheel radius 2
        let steps = 1000;
        odom.step([0.0, 0.0], &mut pose);
        for i in 1..=steps {
            let right = 100.0 * PI * i as f64 / steps as f64;
            odom.step([0.0, right], &mut pose);
        }

        assert_abs_diff_eq!(pose.x, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(pose.y, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(pose.theta, FRAC_PI_2, epsilon = 1e-9);
    }

    #[test]
    fn test_reset_skips_jump() {
        let mut odom = odom();
        let mut pose = Pose::default();

        odom.step([0.0, 0.0], &mut pose);
        odom.reset();
        odom.step([10_000.0, 10_000.0], &mut pose);
        assert_eq!(pose, Pose::default());
    }

    #[test]
    fn test_distance_and_angle() {
        let pose = Pose::new(1.0, 1.0, 0.0);

        let daa = compute_distance_and_angle_to_point(4.0, 5.0, &pose);
        assert_abs_diff_eq!(daa.distance, 5.0);
        assert_abs_diff_eq!(daa.angle, (4.0f64).atan2(3.0));

        // Behind the robot
        let daa = compute_distance_and_angle_to_point(-1.0, 1.0, &pose);
        assert_abs_diff_eq!(daa.distance, 2.0);
        assert_abs_diff_eq!(daa.angle, PI);

        // Heading is taken into account and the result wrapped
        let pose = Pose::new(0.0, 0.0, 3.0 * PI / 4.0);
        let daa = compute_distance_and_angle_to_point(0.0, -1.0, &pose);
        assert_abs_diff_eq!(daa.angle, 3.0 * PI / 4.0, epsilon = 1e-12);

        // Already there
        let daa = compute_distance_and_angle_to_point(0.0, 0.0, &pose);
        assert_eq!(daa, DistanceAndAngle::default());
    }
}
