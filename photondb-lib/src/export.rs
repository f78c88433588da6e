//! Serializable material tables for the simulator's physics file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cascade::MaterialEmissions;
use crate::materials::Material;

/// One characteristic emission row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FluorescenceLine {
    /// Binding energy of the vacancy, eV.
    pub binding_energy: f64,
    /// Emitted photon energy, eV; `None` for the no-emission outcome.
    pub emission_energy: Option<f64>,
    pub probability: f64,
}

/// A composed material as written to the physics file.
///
/// Attenuation stays in cm²/g; the reader multiplies by `density`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialTable {
    pub index: u32,
    /// g/cm³
    pub density: f64,
    pub sensitive: bool,
    pub z_eff: f64,
    pub atomic_weight: f64,
    pub energy: Vec<f64>,
    #[serde(rename = "matten_phot")]
    pub matten_photoelectric: Vec<f64>,
    #[serde(rename = "matten_comp")]
    pub matten_compton: Vec<f64>,
    #[serde(rename = "matten_rayl")]
    pub matten_rayleigh: Vec<f64>,
    pub x: Vec<f64>,
    pub form_factor: Vec<f64>,
    pub scattering_func: Vec<f64>,
    pub edges: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fluorescence: Vec<FluorescenceLine>,
}

impl MaterialTable {
    pub fn new(material: &Material, index: u32, density: f64, sensitive: bool) -> Self {
        MaterialTable {
            index,
            density,
            sensitive,
            z_eff: material.z_eff,
            atomic_weight: material.atomic_weight,
            energy: material.energy.clone(),
            matten_photoelectric: material.matten_photoelectric.clone(),
            matten_compton: material.matten_compton.clone(),
            matten_rayleigh: material.matten_rayleigh.clone(),
            x: material.x.clone(),
            form_factor: material.form_factor.clone(),
            scattering_func: material.scattering_func.clone(),
            edges: material.edges.clone(),
            fluorescence: Vec::new(),
        }
    }

    pub fn with_emissions(mut self, emissions: &MaterialEmissions) -> Self {
        self.fluorescence = emissions.lines();
        self
    }
}

/// Provenance block of the physics file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsInfo {
    /// Seconds since the Unix epoch.
    pub created: u64,
    pub generator: String,
    /// Path of the materials list the file was built from.
    pub materials_source: String,
}

/// Top level of the physics file: materials keyed by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsFile {
    pub materials: BTreeMap<String, MaterialTable>,
    pub info: PhysicsInfo,
}
