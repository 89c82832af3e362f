//! # Flywheel simulator
//!
//! Simulates a single link rotating about one end, driven by an input torque
//! and opposed by Coulomb friction. The link is modelled as a uniform rod, so
//! its moment of inertia about the pivot is `m * l^2 / 3`.
//!
//! Each step is an explicit Euler integration:
//!
//! ```text
//! torque = clamp(input, -max, max) - friction
//! accel  = torque / I
//! omega += accel * dt
//! angle += omega * dt
//! ```
//!
//! While the link is at rest the applied torque has to exceed the static
//! friction to break it away. Once moving, dynamic friction opposes the
//! direction of rotation. If dynamic friction alone would reverse the
//! rotation within a step the link is stopped instead.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use params::FlywheelSimParams;

use log::trace;
use serde::Serialize;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Smallest allowed timestep, 1 us.
pub const MIN_TIMESTEP_S: f64 = 0.000_001;

/// Smallest allowed moment of inertia (kg*m^2). A massless or zero length
/// link is simulated with this inertia so that stepping stays finite.
pub const MIN_MOMENT_OF_INERTIA: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single rotating link.
#[derive(Debug, Clone, Serialize)]
pub struct FlywheelSimulator {
    /// Requested torque, recorded as given
    input_torque: f64,

    max_torque: f64,

    /// Units: radians
    angle: f64,

    /// Units: radians/second
    omega: f64,

    /// Units: radians/second^2
    accel: f64,

    mass: f64,
    link_len: f64,
    mu_static: f64,
    mu_dynamic: f64,
    timestep: f64,

    /// Derived from mass and link length
    moment_of_inertia: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for FlywheelSimulator {
    fn default() -> Self {
        Self::from_params(&FlywheelSimParams::default())
    }
}

impl FlywheelSimulator {
    /// Create a new simulator at rest.
    pub fn new(mass: f64, link_len: f64, mu_static: f64, mu_dynamic: f64, timestep: f64) -> Self {
        let mut sim = Self {
            input_torque: 0.0,
            max_torque: FlywheelSimParams::default().max_torque,
            angle: 0.0,
            omega: 0.0,
            accel: 0.0,
            mass,
            link_len,
            mu_static,
            mu_dynamic,
            timestep: MIN_TIMESTEP_S,
            moment_of_inertia: 0.0,
        };

        sim.set_timestep(timestep);
        sim.update_moment_of_inertia();

        sim
    }

    /// Create a new simulator at rest from parameters.
    pub fn from_params(params: &FlywheelSimParams) -> Self {
        let mut sim = Self::new(
            params.mass_kg,
            params.link_len_m,
            params.mu_static,
            params.mu_dynamic,
            params.timestep_s,
        );
        sim.set_max_torque(params.max_torque);
        sim
    }

    /// Step the simulation by the timestep, returning the new angle.
    pub fn step(&mut self) -> f64 {
        let applied = self.input_torque.clamp(-self.max_torque, self.max_torque);

        let net_torque = if self.omega == 0.0 {
            // Static regime, the link stays put until friction is overcome
            if applied.abs() > self.mu_static {
                applied - self.mu_static * applied.signum()
            } else {
                0.0
            }
        } else {
            applied - self.mu_dynamic * self.omega.signum()
        };

        self.accel = net_torque / self.moment_of_inertia;

        let new_omega = self.omega + self.accel * self.timestep;

        // Friction can stop the link but never drive it backwards
        let friction_reversal = self.omega != 0.0
            && new_omega.signum() != self.omega.signum()
            && applied.abs() <= self.mu_dynamic;
        self.omega = if friction_reversal || new_omega == 0.0 {
            0.0
        } else {
            new_omega
        };

        self.angle += self.omega * self.timestep;

        trace!(
            "FlywheelSim: torque = {:.4}, accel = {:.4}, omega = {:.4}, angle = {:.4}",
            net_torque,
            self.accel,
            self.omega,
            self.angle
        );

        self.angle
    }

    /// Set the input torque. It is bounded by the max torque when stepping.
    pub fn set_torque(&mut self, torque: f64) {
        self.input_torque = torque;
    }

    /// Set the max torque. Negative values are taken as their magnitude.
    pub fn set_max_torque(&mut self, max_torque: f64) {
        self.max_torque = max_torque.abs();
    }

    /// Set the mass (kg). The moment of inertia never drops below
    /// [`MIN_MOMENT_OF_INERTIA`].
    pub fn set_mass(&mut self, mass: f64) {
        self.mass = mass;
        self.update_moment_of_inertia();
    }

    /// Set the link length (m). The moment of inertia never drops below
    /// [`MIN_MOMENT_OF_INERTIA`].
    pub fn set_link_length(&mut self, link_len: f64) {
        self.link_len = link_len;
        self.update_moment_of_inertia();
    }

    /// Set the static friction (N*m).
    pub fn set_static_friction(&mut self, mu_static: f64) {
        self.mu_static = mu_static;
    }

    /// Set the dynamic friction (N*m).
    pub fn set_dynamic_friction(&mut self, mu_dynamic: f64) {
        self.mu_dynamic = mu_dynamic;
    }

    /// Set the timestep (s). Values below [`MIN_TIMESTEP_S`] are raised to it.
    pub fn set_timestep(&mut self, timestep: f64) {
        // NaN also falls back to the floor
        self.timestep = if timestep >= MIN_TIMESTEP_S {
            timestep
        } else {
            MIN_TIMESTEP_S
        };
    }

    /// Current angle (rad).
    pub fn get_angle(&self) -> f64 {
        self.angle
    }

    /// Current angular velocity (rad/s).
    pub fn get_omega(&self) -> f64 {
        self.omega
    }

    /// Current angular acceleration (rad/s^2).
    pub fn get_acceleration(&self) -> f64 {
        self.accel
    }

    /// The input torque as it was set, before any clamping.
    pub fn get_torque(&self) -> f64 {
        self.input_torque
    }

    pub fn get_max_torque(&self) -> f64 {
        self.max_torque
    }

    pub fn get_timestep(&self) -> f64 {
        self.timestep
    }

    pub fn get_moment_of_inertia(&self) -> f64 {
        self.moment_of_inertia
    }

    fn update_moment_of_inertia(&mut self) {
        let inertia = self.mass * self.link_len.powi(2) / 3.0;

        // NaN also falls back to the floor
        self.moment_of_inertia = if inertia >= MIN_MOMENT_OF_INERTIA {
            inertia
        } else {
            MIN_MOMENT_OF_INERTIA
        };
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn frictionless() -> FlywheelSimulator {
        FlywheelSimulator::new(0.3, 0.5, 0.0, 0.0, 0.001)
    }

    #[test]
    fn test_constant_torque_integrates() {
        let mut sim = frictionless();
        let torque = 2.0;
        sim.set_torque(torque);

        let n = 500;
        for _ in 0..n {
            sim.step();
        }

        let inertia = sim.get_moment_of_inertia();
        let dt = sim.get_timestep();
        assert_relative_eq!(sim.get_acceleration(), torque / inertia, max_relative = 1e-12);
        assert_relative_eq!(
            sim.get_omega(),
            torque / inertia * n as f64 * dt,
            max_relative = 1e-9
        );

        // Semi-implicit Euler: angle = a * dt^2 * n(n+1)/2
        assert_relative_eq!(
            sim.get_angle(),
            torque / inertia * dt * dt * (n * (n + 1)) as f64 / 2.0,
            max_relative = 1e-9
        );
    }

    #[test]
    fn test_moment_of_inertia() {
        let mut sim = FlywheelSimulator::default();
        assert_relative_eq!(sim.get_moment_of_inertia(), 0.01 / 3.0);

        sim.set_mass(3.0);
        assert_relative_eq!(sim.get_moment_of_inertia(), 1.0);

        sim.set_link_length(2.0);
        assert_relative_eq!(sim.get_moment_of_inertia(), 4.0);
    }

    #[test]
    fn test_moment_of_inertia_floor() {
        let mut sim = FlywheelSimulator::new(0.0, 1.0, 0.5, 0.3, 0.001);
        assert_eq!(sim.get_moment_of_inertia(), MIN_MOMENT_OF_INERTIA);

        sim.set_torque(1.0);
        sim.step();
        assert!(sim.get_acceleration().is_finite());
        assert!(sim.get_omega().is_finite());
        assert!(sim.get_angle().is_finite());

        sim.set_mass(1.0);
        sim.set_link_length(0.0);
        assert_eq!(sim.get_moment_of_inertia(), MIN_MOMENT_OF_INERTIA);

        sim.set_link_length(f64::NAN);
        assert_eq!(sim.get_moment_of_inertia(), MIN_MOMENT_OF_INERTIA);

        // Physical values are untouched by the floor
        sim.set_link_length(1.0);
        assert_relative_eq!(sim.get_moment_of_inertia(), 1.0 / 3.0);
    }

    #[test]
    fn test_timestep_floor() {
        let mut sim = FlywheelSimulator::default();
        assert_eq!(sim.get_timestep(), 0.0005);

        sim.set_timestep(0.0);
        assert_eq!(sim.get_timestep(), MIN_TIMESTEP_S);

        sim.set_timestep(-1.0);
        assert_eq!(sim.get_timestep(), MIN_TIMESTEP_S);

        sim.set_timestep(1e-9);
        assert_eq!(sim.get_timestep(), MIN_TIMESTEP_S);

        sim.set_timestep(0.01);
        assert_eq!(sim.get_timestep(), 0.01);

        let sim = FlywheelSimulator::new(1.0, 1.0, 0.0, 0.0, 0.0);
        assert_eq!(sim.get_timestep(), MIN_TIMESTEP_S);
    }

    #[test]
    fn test_torque_clamped_at_step() {
        let mut sim = frictionless();
        sim.set_max_torque(1.0);
        sim.set_torque(50.0);

        // Recorded verbatim
        assert_eq!(sim.get_torque(), 50.0);

        sim.step();
        assert_relative_eq!(sim.get_acceleration(), 1.0 / sim.get_moment_of_inertia());

        sim.set_torque(-50.0);
        sim.step();
        assert_relative_eq!(sim.get_acceleration(), -1.0 / sim.get_moment_of_inertia());
        assert_eq!(sim.get_torque(), -50.0);
    }

    #[test]
    fn test_static_friction_holds() {
        let mut sim = FlywheelSimulator::new(1.0, 1.0, 0.5, 0.3, 0.001);
        sim.set_torque(0.4);

        for _ in 0..100 {
            sim.step();
        }

        assert_eq!(sim.get_omega(), 0.0);
        assert_eq!(sim.get_angle(), 0.0);
        assert_eq!(sim.get_acceleration(), 0.0);
    }

    #[test]
    fn test_breakaway_then_dynamic_friction() {
        let mut sim = FlywheelSimulator::new(3.0, 1.0, 0.5, 0.3, 0.001);
        sim.set_torque(1.0);

        // Breakaway uses static friction
        sim.step();
        assert_relative_eq!(sim.get_acceleration(), 0.5);
        assert!(sim.get_omega() > 0.0);

        // Once moving, dynamic friction applies
        sim.step();
        assert_relative_eq!(sim.get_acceleration(), 0.7);
    }

    #[test]
    fn test_friction_stops_link() {
        let mut sim = FlywheelSimulator::new(3.0, 1.0, 0.5, 0.3, 0.01);
        sim.set_torque(-2.0);
        for _ in 0..10 {
            sim.step();
        }
        assert!(sim.get_omega() < 0.0);

        // Remove drive, friction decelerates then stops the link
        sim.set_torque(0.0);
        for _ in 0..1000 {
            sim.step();
        }
        assert_eq!(sim.get_omega(), 0.0);

        let angle = sim.get_angle();
        sim.step();
        assert_eq!(sim.get_angle(), angle);
    }
}
