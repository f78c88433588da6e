#![no_std]

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use serde::{Deserialize, Serialize};

/// A tabulated `(x, y)` curve, kept on its own abscissa.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Curve {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Self {
        Curve { x, y }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Photon interaction data for one element, re-gridded onto the element's
/// photoelectric energy axis.
///
/// Energies are in MeV and attenuation values in cm²/g. Absorption edges
/// appear in `energy` as two adjacent samples at the same energy, pre-edge
/// first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub atomic_number: u16,
    pub atomic_weight: f64,
    pub energy: Vec<f64>,
    pub matten_rayleigh: Vec<f64>,
    pub matten_compton: Vec<f64>,
    pub matten_photoelectric: Vec<f64>,
    pub edges: Vec<f64>,
    pub edge_select: Vec<bool>,
    pub x: Vec<f64>,
    pub form_factor: Vec<f64>,
    pub scattering_func: Vec<f64>,
    pub anomalous_real: Curve,
    pub anomalous_imag: Curve,
}

/// A compound material mixed from elemental data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRecord {
    /// Atomic number to normalized mass fraction.
    pub composition: BTreeMap<u16, f64>,
    pub z_eff: f64,
    pub atomic_weight: f64,
    pub density: Option<f64>,
    pub index: Option<u32>,
    pub energy: Vec<f64>,
    pub matten_rayleigh: Vec<f64>,
    pub matten_compton: Vec<f64>,
    pub matten_photoelectric: Vec<f64>,
    pub edges: Vec<f64>,
    pub x: Vec<f64>,
    pub form_factor: Vec<f64>,
    pub scattering_func: Vec<f64>,
}

/// One row of an exported attenuation table: linear attenuation (1/cm) per
/// process at `energy` (MeV).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttenuationRow {
    pub energy: f64,
    pub photoelectric: f64,
    pub incoherent: f64,
    pub coherent: f64,
}

impl MaterialRecord {
    /// Attenuation rows scaled by `density` (g/cm³).
    pub fn attenuation_rows(&self, density: f64) -> Vec<AttenuationRow> {
        self.energy
            .iter()
            .zip(&self.matten_photoelectric)
            .zip(&self.matten_compton)
            .zip(&self.matten_rayleigh)
            .map(|(((&energy, &phot), &comp), &rayl)| AttenuationRow {
                energy,
                photoelectric: phot * density,
                incoherent: comp * density,
                coherent: rayl * density,
            })
            .collect()
    }
}

const SUBSHELL_NAMES: [&str; 39] = [
    "K", "L1", "L2", "L3", "M1", "M2", "M3", "M4", "M5", "N1", "N2", "N3", "N4", "N5", "N6",
    "N7", "O1", "O2", "O3", "O4", "O5", "O6", "O7", "O8", "O9", "P1", "P2", "P3", "P4", "P5",
    "P6", "P7", "P8", "P9", "P10", "P11", "Q1", "Q2", "Q3",
];

/// Electron subshell, identified by its ENDF-6 designator (K = 1 .. Q3 = 39).
///
/// Ordering follows the designator, so `K` sorts first and the outermost
/// shells last.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8")]
pub struct Subshell(u8);

/// A designator outside K..=Q3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidSubshell(pub u8);

impl fmt::Display for InvalidSubshell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid subshell designator {}", self.0)
    }
}

impl TryFrom<u8> for Subshell {
    type Error = InvalidSubshell;

    fn try_from(designator: u8) -> Result<Self, Self::Error> {
        Subshell::from_designator(designator).ok_or(InvalidSubshell(designator))
    }
}

impl Subshell {
    pub const K: Subshell = Subshell(1);
    pub const L1: Subshell = Subshell(2);
    pub const L2: Subshell = Subshell(3);
    pub const L3: Subshell = Subshell(4);
    pub const M1: Subshell = Subshell(5);
    pub const Q3: Subshell = Subshell(39);

    pub fn from_designator(designator: u8) -> Option<Self> {
        if (1..=39).contains(&designator) {
            Some(Subshell(designator))
        } else {
            None
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        SUBSHELL_NAMES
            .iter()
            .position(|&n| n.eq_ignore_ascii_case(name))
            .map(|i| Subshell(i as u8 + 1))
    }

    pub fn designator(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        SUBSHELL_NAMES[self.0 as usize - 1]
    }

    /// All subshells from K outwards.
    pub fn all() -> impl DoubleEndedIterator<Item = Subshell> {
        (1..=39u8).map(Subshell)
    }
}

impl fmt::Display for Subshell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One relaxation transition filling a vacancy.
///
/// `ejected == None` is a radiative transition; otherwise an Auger or
/// Coster-Kronig electron leaves a second vacancy in `ejected`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub source: Subshell,
    pub ejected: Option<Subshell>,
    /// Transition energy in eV.
    pub energy: f64,
    pub probability: f64,
}

impl TransitionRecord {
    pub fn is_radiative(&self) -> bool {
        self.ejected.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellRecord {
    pub subshell: Subshell,
    /// Binding energy in eV.
    pub binding_energy: f64,
    pub number_electrons: f64,
    pub transitions: Vec<TransitionRecord>,
}

/// Subshell photoionization cross section (energies in eV, barns).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubshellCrossSection {
    pub subshell: Subshell,
    pub binding_energy: f64,
    pub fluorescence_yield: Option<f64>,
    pub energy: Vec<f64>,
    pub cross_section: Vec<f64>,
}

/// Atomic relaxation and subshell photoionization data for one element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AtomicRecord {
    pub atomic_number: u16,
    pub symbol: String,
    /// Mass in units of the neutron mass (ENDF-6 AWR).
    pub mass: f64,
    pub shells: Vec<ShellRecord>,
    pub photoionization: Vec<SubshellCrossSection>,
}

impl AtomicRecord {
    pub fn shell(&self, subshell: Subshell) -> Option<&ShellRecord> {
        self.shells.iter().find(|s| s.subshell == subshell)
    }

    pub fn cross_section(&self, subshell: Subshell) -> Option<&SubshellCrossSection> {
        self.photoionization.iter().find(|s| s.subshell == subshell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subshell_names() {
        assert_eq!(Subshell::K.name(), "K");
        assert_eq!(Subshell::Q3.name(), "Q3");
        assert_eq!(Subshell::from_name("m5").map(Subshell::designator), Some(9));
        assert_eq!(Subshell::all().count(), 39);
    }

    #[test]
    fn test_subshell_deserialize_checks_designator() {
        let l3: Subshell = serde_json::from_str("4").unwrap();
        assert_eq!(l3, Subshell::L3);
        assert_eq!(serde_json::to_string(&l3).unwrap(), "4");
        assert!(serde_json::from_str::<Subshell>("0").is_err());
        assert!(serde_json::from_str::<Subshell>("40").is_err());
    }
}
