use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use photondb_data::ElementRecord;

use crate::elements;
use crate::epdl;
use crate::error::{PhotonDbError, Result};
use crate::interp::{interp, interp_loglog};

/// Mass attenuation coefficients (cm²/g) by process, sampled at caller
/// energies.
#[derive(Debug, Clone, PartialEq)]
pub struct Attenuation {
    pub rayleigh: Vec<f64>,
    pub compton: Vec<f64>,
    pub photoelectric: Vec<f64>,
}

impl Attenuation {
    pub fn total(&self) -> Vec<f64> {
        self.rayleigh
            .iter()
            .zip(&self.compton)
            .zip(&self.photoelectric)
            .map(|((r, c), p)| r + c + p)
            .collect()
    }
}

/// Elemental photon data loaded from EPDL.
///
/// The tables are immutable once built and shared behind an `Arc`, so
/// clones are cheap and may be handed to independent composition requests.
#[derive(Debug, Clone)]
pub struct PhotonDb {
    elements: Arc<BTreeMap<u16, ElementRecord>>,
}

impl PhotonDb {
    pub fn new(elements: BTreeMap<u16, ElementRecord>) -> Self {
        PhotonDb {
            elements: Arc::new(elements),
        }
    }

    pub fn from_epdl_str(content: &str) -> Result<Self> {
        epdl::parse_epdl(content).map(Self::new)
    }

    /// Load an EPDL file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        epdl::load_epdl(path).map(Self::new)
    }

    /// Resolve an element identifier (symbol, name, or atomic number) to Z.
    ///
    /// The element must be present in the loaded library.
    pub fn resolve_element(&self, element: &str) -> Result<u16> {
        let z = elements::atomic_number(element)?;
        if self.elements.contains_key(&z) {
            Ok(z)
        } else {
            Err(PhotonDbError::UnknownElement(element.to_string()))
        }
    }

    pub fn element(&self, element: &str) -> Result<&ElementRecord> {
        let z = self.resolve_element(element)?;
        self.element_by_z(z)
    }

    pub fn element_by_z(&self, atomic_number: u16) -> Result<&ElementRecord> {
        self.elements
            .get(&atomic_number)
            .ok_or_else(|| PhotonDbError::UnknownElement(atomic_number.to_string()))
    }

    /// Loaded elements in order of atomic number.
    pub fn elements(&self) -> impl Iterator<Item = &ElementRecord> {
        self.elements.values()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn atomic_weight(&self, element: &str) -> Result<f64> {
        Ok(self.element(element)?.atomic_weight)
    }

    /// Re-key a symbol-keyed composition by atomic number.
    pub fn composition_from_symbols(
        &self,
        composition: &BTreeMap<String, f64>,
    ) -> Result<BTreeMap<u16, f64>> {
        let mut out = BTreeMap::new();
        for (sym, &n) in composition {
            *out.entry(self.resolve_element(sym)?).or_insert(0.0) += n;
        }
        Ok(out)
    }

    /// Mass attenuation of one element at `energies` (MeV).
    ///
    /// At an absorption edge the photoelectric value is the post-edge one.
    pub fn mass_attenuation(&self, element: &str, energies: &[f64]) -> Result<Attenuation> {
        let rec = self.element(element)?;
        let (min, max) = energy_bounds(rec);
        if let Some(&energy) = energies.iter().find(|&&e| !(min..=max).contains(&e)) {
            return Err(PhotonDbError::EnergyOutOfRange { energy, min, max });
        }
        Ok(Attenuation {
            rayleigh: interp_loglog(energies, &rec.energy, &rec.matten_rayleigh),
            compton: interp_loglog(energies, &rec.energy, &rec.matten_compton),
            photoelectric: interp_loglog(energies, &rec.energy, &rec.matten_photoelectric),
        })
    }

    /// Coherent form factor F(x), linearly interpolated.
    pub fn form_factor(&self, element: &str, x: &[f64]) -> Result<Vec<f64>> {
        let rec = self.element(element)?;
        Ok(interp(x, &rec.x, &rec.form_factor))
    }

    /// Incoherent scattering function S(x), linearly interpolated.
    pub fn scattering_function(&self, element: &str, x: &[f64]) -> Result<Vec<f64>> {
        let rec = self.element(element)?;
        Ok(interp(x, &rec.x, &rec.scattering_func))
    }
}

/// First and last tabulated energy of an element.
pub(crate) fn energy_bounds(rec: &ElementRecord) -> (f64, f64) {
    match (rec.energy.first(), rec.energy.last()) {
        (Some(&lo), Some(&hi)) => (lo, hi),
        _ => (f64::NAN, f64::NAN),
    }
}
