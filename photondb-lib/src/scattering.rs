//! Differential scattering cross sections (cm²/sr per electron or per
//! material formula unit) from the tabulated scattering factors.
//!
//! Angles are in radians, energies in MeV.

use photondb_data::MaterialRecord;

use crate::constants::{ELECTRON_MASS_MEV, PLANCK_HC_MEV_CM, R_ELECTRON_CM};
use crate::interp::interp_one;

/// Ratio of scattered to incident photon energy for Compton scattering.
pub fn compton_energy_ratio(energy: f64, theta: f64) -> f64 {
    1.0 / (1.0 + (energy / ELECTRON_MASS_MEV) * (1.0 - theta.cos()))
}

/// Thomson differential cross section of a free electron.
pub fn thomson(theta: f64) -> f64 {
    let cos = theta.cos();
    R_ELECTRON_CM * R_ELECTRON_CM * 0.5 * (1.0 + cos * cos)
}

/// Klein-Nishina differential cross section of a free electron.
pub fn klein_nishina(energy: f64, theta: f64) -> f64 {
    let p = compton_energy_ratio(energy, theta);
    let sin = theta.sin();
    0.5 * R_ELECTRON_CM * R_ELECTRON_CM * p * p * (p + 1.0 / p - sin * sin)
}

/// Momentum transfer variable `x = sin(θ/2) / λ` in cm⁻¹, the abscissa of
/// the form factor and scattering function tables.
pub fn momentum_transfer(energy: f64, theta: f64) -> f64 {
    (theta / 2.0).sin() * energy / PLANCK_HC_MEV_CM
}

/// Rayleigh differential cross section: `dσ_T · F(x)²`.
///
/// Anomalous scattering is not included.
pub fn rayleigh(material: &MaterialRecord, energy: f64, theta: f64) -> f64 {
    let x = momentum_transfer(energy, theta);
    let f = interp_one(x, &material.x, &material.form_factor);
    thomson(theta) * f * f
}

/// Compton differential cross section: `dσ_KN · S(x)`.
pub fn compton(material: &MaterialRecord, energy: f64, theta: f64) -> f64 {
    let x = momentum_transfer(energy, theta);
    let s = interp_one(x, &material.x, &material.scattering_func);
    klein_nishina(energy, theta) * s
}
