use std::collections::BTreeMap;

use photondb_data::{ElementRecord, MaterialRecord};
use tracing::{debug, info};

use crate::chemparser::formula_to_composition;
use crate::db::{PhotonDb, energy_bounds};
use crate::error::{PhotonDbError, Result};
use crate::grid::standard_grid;
use crate::interp::{interp, interp_loglog, interp_loglog_one};

/// A composed material; an immutable snapshot with no link back to the
/// elemental tables.
pub type Material = MaterialRecord;

/// Constituent element with its normalized mass fraction.
struct Constituent<'a> {
    record: &'a ElementRecord,
    weight: f64,
}

impl<'a> Constituent<'a> {
    /// Photoelectric value just below (`post == false`) or above an energy.
    ///
    /// At one of this element's own edges the tabulated sample is taken as
    /// is; elsewhere the curve is smooth and log-log interpolated.
    fn photoelectric_at(&self, energy: f64, post: bool) -> f64 {
        let rec = self.record;
        let at_edge = if post {
            rec.energy.iter().rposition(|&e| e == energy)
        } else {
            rec.energy.iter().position(|&e| e == energy)
        };
        match at_edge {
            Some(i) if rec.edges.contains(&energy) => rec.matten_photoelectric[i],
            _ => interp_loglog_one(energy, &rec.energy, &rec.matten_photoelectric),
        }
    }
}

fn check_energy(energy: f64, min: f64, max: f64) -> Result<f64> {
    if energy.is_finite() && (min..=max).contains(&energy) {
        Ok(energy)
    } else {
        Err(PhotonDbError::EnergyOutOfRange { energy, min, max })
    }
}

impl PhotonDb {
    /// Convert atom counts to mass fractions via atomic weights.
    pub fn composition_to_mass_fraction(
        &self,
        composition: &BTreeMap<u16, f64>,
    ) -> Result<BTreeMap<u16, f64>> {
        let mut masses = BTreeMap::new();
        for (&z, &count) in composition {
            let weight = self.element_by_z(z)?.atomic_weight;
            masses.insert(z, count * weight);
        }
        normalize(&masses)
    }

    /// Compose a material from a chemical formula such as `"Lu2SiO5"`.
    pub fn material_by_formula(
        &self,
        formula: &str,
        energy_lo: Option<f64>,
        energy_hi: Option<f64>,
    ) -> Result<Material> {
        let counts = formula_to_composition(formula)?;
        let composition = self.composition_from_symbols(&counts)?;
        self.material_by_composition(&composition, energy_lo, energy_hi)
    }

    /// Compose a material from atom counts keyed by atomic number.
    pub fn material_by_composition(
        &self,
        composition: &BTreeMap<u16, f64>,
        energy_lo: Option<f64>,
        energy_hi: Option<f64>,
    ) -> Result<Material> {
        let fractions = self.composition_to_mass_fraction(composition)?;
        self.material_by_mass_fraction(&fractions, energy_lo, energy_hi)
    }

    /// Compose a material from mass fractions keyed by atomic number.
    ///
    /// Fractions are normalized by their sum. The energy grid spans
    /// `[energy_lo, energy_hi]` (MeV), defaulting to the range every
    /// constituent tabulates. Bounds outside that range are rejected with
    /// `EnergyOutOfRange` rather than clamped to it, so a caller never gets
    /// a narrower table than it asked for without noticing.
    /// Attenuation curves are mixed on the standard grid, and every
    /// constituent edge inside the range is inserted as a pre-edge/post-edge
    /// pair at the same energy.
    pub fn material_by_mass_fraction(
        &self,
        mass_fractions: &BTreeMap<u16, f64>,
        energy_lo: Option<f64>,
        energy_hi: Option<f64>,
    ) -> Result<Material> {
        let fractions = normalize(mass_fractions)?;
        let constituents = fractions
            .iter()
            .map(|(&z, &weight)| {
                Ok(Constituent {
                    record: self.element_by_z(z)?,
                    weight,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // intersection of the tabulated ranges
        let (lo_bound, hi_bound) = constituents.iter().fold(
            (f64::NEG_INFINITY, f64::INFINITY),
            |(lo, hi), c| {
                let (min, max) = energy_bounds(c.record);
                (lo.max(min), hi.min(max))
            },
        );
        if lo_bound.is_nan() || hi_bound.is_nan() || lo_bound > hi_bound {
            return Err(PhotonDbError::EmptyEnergyRange {
                lo: lo_bound,
                hi: hi_bound,
            });
        }
        let lo = check_energy(energy_lo.unwrap_or(lo_bound), lo_bound, hi_bound)?;
        let hi = check_energy(energy_hi.unwrap_or(hi_bound), lo_bound, hi_bound)?;
        if lo > hi {
            return Err(PhotonDbError::EmptyEnergyRange { lo, hi });
        }

        let grid = standard_grid(lo, hi);
        let mut rayleigh = vec![0.0; grid.len()];
        let mut compton = vec![0.0; grid.len()];
        let mut photo = vec![0.0; grid.len()];
        for c in &constituents {
            let rec = c.record;
            let curves = [
                (&mut rayleigh, &rec.matten_rayleigh),
                (&mut compton, &rec.matten_compton),
                (&mut photo, &rec.matten_photoelectric),
            ];
            for (mixed, curve) in curves {
                for (m, v) in mixed.iter_mut().zip(interp_loglog(&grid, &rec.energy, curve)) {
                    *m += c.weight * v;
                }
            }
        }

        let mut edges: Vec<f64> = constituents
            .iter()
            .flat_map(|c| c.record.edges.iter().copied())
            .filter(|e| (lo..=hi).contains(e))
            .collect();
        edges.sort_by(f64::total_cmp);
        // edges of different elements at the same energy share one pair
        edges.dedup();

        let mut samples: Vec<(f64, f64)> = grid
            .iter()
            .zip(&photo)
            .filter(|(e, _)| !edges.contains(*e))
            .map(|(&e, &p)| (e, p))
            .collect();
        for &edge in &edges {
            let side = |post: bool| -> f64 {
                constituents
                    .iter()
                    .map(|c| c.weight * c.photoelectric_at(edge, post))
                    .sum()
            };
            samples.push((edge, side(false)));
            samples.push((edge, side(true)));
        }
        // stable: each edge keeps pre-edge before post-edge
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (energy, matten_photoelectric): (Vec<f64>, Vec<f64>) = samples.into_iter().unzip();
        debug!(edges = edges.len(), "inserted absorption edges");

        let matten_rayleigh = interp_loglog(&energy, &grid, &rayleigh);
        let matten_compton = interp_loglog(&energy, &grid, &compton);

        // shared x axis: the constituent with the most samples, lowest Z on ties
        let x = constituents
            .iter()
            .fold(None::<&ElementRecord>, |best, c| match best {
                Some(b) if b.x.len() >= c.record.x.len() => Some(b),
                _ => Some(c.record),
            })
            .map(|rec| rec.x.clone())
            .unwrap_or_default();
        let mut form_factor = vec![0.0; x.len()];
        let mut scattering_func = vec![0.0; x.len()];
        for c in &constituents {
            let ff = interp(&x, &c.record.x, &c.record.form_factor);
            let sf = interp(&x, &c.record.x, &c.record.scattering_func);
            for i in 0..x.len() {
                form_factor[i] += c.weight * ff[i];
                scattering_func[i] += c.weight * sf[i];
            }
        }

        let z_eff = constituents
            .iter()
            .map(|c| c.weight * c.record.atomic_number as f64)
            .sum();
        let atomic_weight = constituents
            .iter()
            .map(|c| c.weight * c.record.atomic_weight)
            .sum();

        info!(
            elements = constituents.len(),
            points = energy.len(),
            z_eff,
            "composed material"
        );
        Ok(Material {
            composition: fractions,
            z_eff,
            atomic_weight,
            density: None,
            index: None,
            energy,
            matten_rayleigh,
            matten_compton,
            matten_photoelectric,
            edges,
            x,
            form_factor,
            scattering_func,
        })
    }
}

/// Scale non-negative weights to sum to one.
fn normalize(weights: &BTreeMap<u16, f64>) -> Result<BTreeMap<u16, f64>> {
    if weights.is_empty() {
        return Err(PhotonDbError::InvalidComposition(
            "no constituents".to_string(),
        ));
    }
    if let Some((z, w)) = weights.iter().find(|(_, w)| !w.is_finite() || **w < 0.0) {
        return Err(PhotonDbError::InvalidComposition(format!(
            "Z={z} has weight {w}"
        )));
    }
    let total: f64 = weights.values().sum();
    if total <= 0.0 {
        return Err(PhotonDbError::InvalidComposition(
            "weights sum to zero".to_string(),
        ));
    }
    Ok(weights.iter().map(|(&z, &w)| (z, w / total)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use photondb_data::Curve;

    /// Power-law element with a single photoelectric edge.
    fn element(z: u16, edge: f64) -> ElementRecord {
        let mut energy = vec![1e-3, 1e-2, 1e-1, 1.0, 10.0];
        let pos = energy.partition_point(|&e| e < edge);
        energy.insert(pos, edge);
        energy.insert(pos, edge);
        let photo: Vec<f64> = energy
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let jump = if i > pos { 5.0 } else { 1.0 };
                jump * z as f64 * e.powi(-3)
            })
            .collect();
        ElementRecord {
            atomic_number: z,
            atomic_weight: 2.0 * z as f64,
            matten_rayleigh: energy.iter().map(|e| z as f64 * e.powi(-2)).collect(),
            matten_compton: energy.iter().map(|e| 0.2 * e.powf(-0.5)).collect(),
            matten_photoelectric: photo,
            edges: vec![edge],
            edge_select: energy.iter().map(|&e| e == edge).collect(),
            energy,
            x: (0..=z).map(|i| i as f64).collect(),
            form_factor: (0..=z).map(|i| (z - i) as f64).collect(),
            scattering_func: (0..=z).map(|i| i as f64).collect(),
            anomalous_real: Curve::default(),
            anomalous_imag: Curve::default(),
        }
    }

    fn db() -> PhotonDb {
        PhotonDb::new(BTreeMap::from([
            (8, element(8, 5.4e-4)),
            (20, element(20, 4.0e-3)),
            (50, element(50, 2.9e-2)),
        ]))
    }

    #[test]
    fn test_normalize() {
        let n = normalize(&BTreeMap::from([(1, 1.0), (2, 3.0)])).unwrap();
        assert_relative_eq!(n[&1], 0.25);
        assert!(matches!(
            normalize(&BTreeMap::from([(1, 0.0)])),
            Err(PhotonDbError::InvalidComposition(_))
        ));
        assert!(normalize(&BTreeMap::from([(1, -1.0), (2, 3.0)])).is_err());
        assert!(normalize(&BTreeMap::new()).is_err());
    }

    #[test]
    fn test_bounds_default_to_intersection() {
        let m = db()
            .material_by_mass_fraction(&BTreeMap::from([(20, 1.0)]), None, None)
            .unwrap();
        assert_eq!(m.energy[0], 1e-3);
        assert_eq!(*m.energy.last().unwrap(), 10.0);
    }

    #[test]
    fn test_out_of_range_bound_is_error() {
        let result = db().material_by_mass_fraction(&BTreeMap::from([(20, 1.0)]), Some(1e-4), None);
        assert!(matches!(result, Err(PhotonDbError::EnergyOutOfRange { .. })));
        let result =
            db().material_by_mass_fraction(&BTreeMap::from([(20, 1.0)]), Some(0.5), Some(0.1));
        assert!(matches!(result, Err(PhotonDbError::EmptyEnergyRange { .. })));
    }

    #[test]
    fn test_edges_inserted_as_pairs() {
        let m = db()
            .material_by_mass_fraction(&BTreeMap::from([(20, 0.5), (50, 0.5)]), Some(1e-3), Some(1.0))
            .unwrap();
        assert_eq!(m.edges, vec![4.0e-3, 2.9e-2]);
        for edge in &m.edges {
            let i = m.energy.iter().position(|e| e == edge).unwrap();
            assert_eq!(m.energy[i + 1], *edge);
            assert!(m.matten_photoelectric[i + 1] > m.matten_photoelectric[i]);
        }
        assert!(m.energy.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(m.energy.len(), m.matten_rayleigh.len());
        assert_eq!(m.energy.len(), m.matten_compton.len());
    }

    #[test]
    fn test_grid_point_on_edge_is_replaced_by_pair() {
        let db = PhotonDb::new(BTreeMap::from([(20, element(20, 4.0e-3))]));
        let m = db
            .material_by_mass_fraction(&BTreeMap::from([(20, 1.0)]), Some(1e-3), Some(1e-2))
            .unwrap();
        assert_eq!(m.energy.iter().filter(|&&e| e == 4.0e-3).count(), 2);
        let i = m.energy.iter().position(|&e| e == 4.0e-3).unwrap();
        assert_relative_eq!(m.matten_photoelectric[i], 20.0 * 4.0e-3f64.powi(-3), max_relative = 1e-9);
        assert_relative_eq!(
            m.matten_photoelectric[i + 1],
            5.0 * 20.0 * 4.0e-3f64.powi(-3),
            max_relative = 1e-9
        );
    }

    #[test]
    fn test_coincident_edges_share_one_pair() {
        let edge = 7.0e-3;
        let db = PhotonDb::new(BTreeMap::from([(20, element(20, edge)), (26, element(26, edge))]));
        let m = db
            .material_by_mass_fraction(&BTreeMap::from([(20, 1.0), (26, 3.0)]), Some(1e-3), Some(1.0))
            .unwrap();
        assert_eq!(m.edges, vec![edge]);
        assert_eq!(m.energy.iter().filter(|&&e| e == edge).count(), 2);

        let i = m.energy.iter().position(|&e| e == edge).unwrap();
        assert_eq!(m.energy[i + 1], edge);
        let base = |z: f64| z * edge.powi(-3);
        let pre = 0.25 * base(20.0) + 0.75 * base(26.0);
        let post = 0.25 * 5.0 * base(20.0) + 0.75 * 5.0 * base(26.0);
        assert_relative_eq!(m.matten_photoelectric[i], pre, max_relative = 1e-12);
        assert_relative_eq!(m.matten_photoelectric[i + 1], post, max_relative = 1e-12);
        assert!(m.matten_photoelectric[i] < m.matten_photoelectric[i + 1]);
    }

    #[test]
    fn test_single_element_matches_element_curves() {
        let db = db();
        let m = db
            .material_by_mass_fraction(&BTreeMap::from([(50, 2.0)]), Some(1e-3), Some(1.0))
            .unwrap();
        assert_relative_eq!(m.z_eff, 50.0);
        assert_relative_eq!(m.atomic_weight, 100.0);
        let smooth: Vec<usize> = (0..m.energy.len())
            .filter(|&i| !m.edges.contains(&m.energy[i]))
            .collect();
        for i in smooth {
            let e = m.energy[i];
            assert_relative_eq!(m.matten_rayleigh[i], 50.0 * e.powi(-2), max_relative = 1e-9);
            let expected = db.mass_attenuation("Sn", &[e]).unwrap().photoelectric[0];
            assert_relative_eq!(m.matten_photoelectric[i], expected, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_x_axis_from_largest_table() {
        let m = db()
            .material_by_mass_fraction(&BTreeMap::from([(8, 0.5), (20, 0.5)]), None, None)
            .unwrap();
        assert_eq!(m.x.len(), 21);
        // O's table ends at x = 8, where its form factor is already 0
        assert_relative_eq!(m.form_factor[10], 0.5 * 0.0 + 0.5 * 10.0);
        assert_relative_eq!(m.scattering_func[4], 0.5 * 4.0 + 0.5 * 4.0);
    }

    #[test]
    fn test_formula_and_composition_paths_agree() {
        let db = db();
        let by_formula = db.material_by_formula("CaSnO3", None, Some(1.0)).unwrap();
        let counts = BTreeMap::from([(20, 1.0), (50, 1.0), (8, 3.0)]);
        let by_counts = db.material_by_composition(&counts, None, Some(1.0)).unwrap();
        assert_eq!(by_formula, by_counts);
        let total = 40.0 + 100.0 + 3.0 * 16.0;
        assert_relative_eq!(by_counts.composition[&50], 100.0 / total, max_relative = 1e-12);
    }
}
