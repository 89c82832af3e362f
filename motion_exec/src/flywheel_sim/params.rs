//! Flywheel simulator parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Physical parameters of the simulated link.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct FlywheelSimParams {
    /// Mass of the link
    ///
    /// Units: kilograms
    pub mass_kg: f64,

    /// Length of the link
    ///
    /// Units: meters
    pub link_len_m: f64,

    /// Static friction torque
    ///
    /// Units: newton meters
    pub mu_static: f64,

    /// Dynamic friction torque
    ///
    /// Units: newton meters
    pub mu_dynamic: f64,

    /// Integration timestep
    ///
    /// Units: seconds
    pub timestep_s: f64,

    /// Maximum torque that can be applied to the link
    ///
    /// Units: newton meters
    pub max_torque: f64,
}

impl Default for FlywheelSimParams {
    fn default() -> Self {
        Self {
            mass_kg: 0.01,
            link_len_m: 1.0,
            mu_static: 0.5,
            mu_dynamic: 0.3,
            timestep_s: 0.0005,
            max_torque: 20.0,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_load_params_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../params/flywheel_sim.toml");
        let params: FlywheelSimParams = util::params::load_from_path(path).unwrap();

        assert_eq!(params, FlywheelSimParams::default());
    }
}
