//! Atomic relaxation cascades.
//!
//! A vacancy in one subshell is filled by a chain of radiative and
//! non-radiative transitions, each of which may open further vacancies in
//! outer subshells. Resolving a shell follows every chain until no vacancy
//! is left and records which photons were emitted on the way.
//!
//! Shells only ever hand vacancies outwards, so the transition graph is a
//! DAG. Each shell is resolved once, after every shell its transitions
//! point at, and the resolved distributions are reused from then on.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use photondb_data::{AtomicRecord, ShellRecord, Subshell};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::eadl::AtomicDb;
use crate::error::{PhotonDbError, Result};
use crate::export::FluorescenceLine;
use crate::interp::interp_loglog_one;

/// Resolution and filtering parameters. Energies in eV.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// Width of the buckets emission energies are floored into.
    pub round_to: f64,
    /// Emissions below this energy are not tracked.
    pub emission_threshold: f64,
    /// Photon energy at which subshell ionization probabilities are taken.
    pub reference_energy: f64,
    /// Aggregated emissions at or below this probability count as no emission.
    pub probability_threshold: f64,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        CascadeConfig {
            round_to: 1000.0,
            emission_threshold: 15_000.0,
            reference_energy: 511_000.0,
            probability_threshold: 0.005,
        }
    }
}

impl CascadeConfig {
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("round_to", self.round_to, self.round_to > 0.0),
            ("emission_threshold", self.emission_threshold, self.emission_threshold >= 0.0),
            ("reference_energy", self.reference_energy, self.reference_energy > 0.0),
            (
                "probability_threshold",
                self.probability_threshold,
                (0.0..1.0).contains(&self.probability_threshold),
            ),
        ];
        for (name, value, ok) in checks {
            if !ok || !value.is_finite() {
                return Err(PhotonDbError::InvalidConfig(format!("{name} = {value}")));
            }
        }
        Ok(())
    }
}

/// Energy ordered with `total_cmp`, usable as a map key.
#[derive(Debug, Clone, Copy)]
struct EnergyKey(f64);

impl PartialEq for EnergyKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EnergyKey {}

impl PartialOrd for EnergyKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EnergyKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Emission energies in units of `round_to`, kept sorted.
type Buckets = Vec<i64>;

/// Partial cascade: photons emitted so far and vacancies still open.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Outcome {
    emissions: Buckets,
    holes: Vec<Subshell>,
}

/// Resolved cascade of one subshell vacancy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShellCascade {
    pub subshell: Subshell,
    /// Binding energy in eV.
    pub binding_energy: f64,
    /// Emitted photon energies (eV, ascending) and the probability of that
    /// set. The empty set is the no-photon outcome.
    pub emissions: Vec<(Vec<f64>, f64)>,
}

struct Resolver<'a> {
    atom: &'a AtomicRecord,
    seeds: BTreeMap<Subshell, BTreeMap<Outcome, f64>>,
    /// `None` marks a shell whose cascades never emit a tracked photon.
    resolved: BTreeMap<Subshell, Option<BTreeMap<Buckets, f64>>>,
    untracked: usize,
}

impl<'a> Resolver<'a> {
    fn new(atom: &'a AtomicRecord, config: &CascadeConfig) -> Self {
        let seeds = atom
            .shells
            .iter()
            .filter(|s| !s.transitions.is_empty())
            .map(|s| (s.subshell, seed(s, config)))
            .collect();
        Resolver {
            atom,
            seeds,
            resolved: BTreeMap::new(),
            untracked: 0,
        }
    }

    fn ensure(&mut self, shell: Subshell, path: &mut Vec<Subshell>) -> Result<()> {
        if self.resolved.contains_key(&shell) {
            return Ok(());
        }
        let Some(seed) = self.seeds.get(&shell) else {
            return Ok(());
        };
        if path.contains(&shell) {
            return Err(PhotonDbError::CascadeCycle {
                atomic_number: self.atom.atomic_number,
                shell: shell.to_string(),
            });
        }
        let targets: BTreeSet<Subshell> = seed
            .keys()
            .flat_map(|o| o.holes.iter().copied())
            .collect();
        path.push(shell);
        for target in targets {
            self.ensure(target, path)?;
        }
        path.pop();

        let done = self.expand(shell);
        self.resolved.insert(shell, done);
        Ok(())
    }

    /// Work-list expansion of one shell against already resolved shells.
    fn expand(&mut self, shell: Subshell) -> Option<BTreeMap<Buckets, f64>> {
        let mut work: Vec<(Outcome, f64)> = self
            .seeds
            .get(&shell)
            .map(|s| s.iter().map(|(o, &p)| (o.clone(), p)).collect())
            .unwrap_or_default();
        let mut done: BTreeMap<Buckets, f64> = BTreeMap::new();

        while let Some((outcome, p)) = work.pop() {
            let Some((&first, rest)) = outcome.holes.split_first() else {
                *done.entry(outcome.emissions).or_insert(0.0) += p;
                continue;
            };
            match self.resolved.get(&first) {
                Some(Some(next)) => {
                    for (more, &p2) in next {
                        let mut emissions = outcome.emissions.clone();
                        emissions.extend_from_slice(more);
                        emissions.sort_unstable();
                        work.push((
                            Outcome {
                                emissions,
                                holes: rest.to_vec(),
                            },
                            p * p2,
                        ));
                    }
                }
                _ => {
                    // no relaxation data below this vacancy; it ends here
                    if self.atom.shell(first).is_none() {
                        self.untracked += 1;
                    }
                    work.push((
                        Outcome {
                            emissions: outcome.emissions,
                            holes: rest.to_vec(),
                        },
                        p,
                    ));
                }
            }
        }

        let silent = done.len() == 1 && done.keys().all(Vec::is_empty);
        if silent { None } else { Some(done) }
    }
}

fn seed(shell: &ShellRecord, config: &CascadeConfig) -> BTreeMap<Outcome, f64> {
    let mut outcomes = BTreeMap::new();
    for t in &shell.transitions {
        let outcome = match t.ejected {
            None => {
                let bucket = (t.energy / config.round_to).floor() as i64;
                let tracked = bucket as f64 * config.round_to >= config.emission_threshold;
                Outcome {
                    emissions: if tracked { vec![bucket] } else { Vec::new() },
                    holes: vec![t.source],
                }
            }
            Some(ejected) => Outcome {
                emissions: Vec::new(),
                holes: vec![t.source, ejected],
            },
        };
        *outcomes.entry(outcome).or_insert(0.0) += t.probability;
    }
    outcomes
}

/// Resolve every subshell of `atom` to its distribution of emitted photons.
///
/// Subshells whose cascades never emit a tracked photon are left out, as
/// are subshells without transition data. A vacancy in a subshell without
/// data ends the chain with its probability unchanged. Transition
/// probabilities are used as given, not renormalized.
pub fn resolve_shell_cascades(
    atom: &AtomicRecord,
    config: &CascadeConfig,
) -> Result<Vec<ShellCascade>> {
    config.validate()?;
    let mut resolver = Resolver::new(atom, config);
    // outermost first
    for shell in Subshell::all().rev() {
        resolver.ensure(shell, &mut Vec::new())?;
    }
    if resolver.untracked > 0 {
        warn!(
            z = atom.atomic_number,
            vacancies = resolver.untracked,
            "cascade reached subshells missing from the relaxation data"
        );
    }

    let cascades: Vec<ShellCascade> = atom
        .shells
        .iter()
        .filter_map(|shell| {
            let done = resolver.resolved.get(&shell.subshell)?.as_ref()?;
            let emissions = done
                .iter()
                .map(|(buckets, &p)| {
                    let energies = buckets.iter().map(|&b| b as f64 * config.round_to).collect();
                    (energies, p)
                })
                .collect();
            Some(ShellCascade {
                subshell: shell.subshell,
                binding_energy: shell.binding_energy,
                emissions,
            })
        })
        .collect();
    debug!(z = atom.atomic_number, shells = cascades.len(), "resolved cascades");
    Ok(cascades)
}

/// Probability that a photon at the reference energy ionizes each subshell.
///
/// Subshell cross sections are log-log interpolated and normalized over the
/// subshells that have cross-section data. A subshell whose table starts
/// above the reference energy is closed and gets zero.
pub fn shell_probabilities(atom: &AtomicRecord, config: &CascadeConfig) -> BTreeMap<Subshell, f64> {
    let energy = config.reference_energy;
    let xs: Vec<(Subshell, f64)> = atom
        .photoionization
        .iter()
        .map(|x| {
            let open = x.energy.first().is_some_and(|&e0| e0 <= energy);
            let value = if open {
                interp_loglog_one(energy, &x.energy, &x.cross_section)
            } else {
                0.0
            };
            (x.subshell, if value.is_finite() { value.max(0.0) } else { 0.0 })
        })
        .collect();
    let total: f64 = xs.iter().map(|(_, v)| v).sum();
    if total <= 0.0 {
        return BTreeMap::new();
    }
    xs.into_iter().map(|(s, v)| (s, v / total)).collect()
}

/// One outcome after a vacancy at a binding energy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Emission {
    /// Photon energy in eV; `None` when no tracked photon is emitted.
    pub energy: Option<f64>,
    pub probability: f64,
}

/// Emission probabilities for all vacancies sharing one binding energy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BindingEnergyEmissions {
    /// Binding energy in eV.
    pub binding_energy: f64,
    /// Ionization probability × mass fraction that reached this binding
    /// energy, before any filtering.
    pub weight: f64,
    /// The no-emission entry first, then photon energies ascending.
    /// Probabilities sum to one.
    pub emissions: Vec<Emission>,
}

impl BindingEnergyEmissions {
    pub fn no_emission(&self) -> f64 {
        self.emissions
            .iter()
            .filter(|e| e.energy.is_none())
            .map(|e| e.probability)
            .sum()
    }
}

/// Characteristic emission table of a material.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MaterialEmissions {
    /// Ascending binding energy.
    pub binding_energies: Vec<BindingEnergyEmissions>,
}

impl MaterialEmissions {
    /// Flattened `(binding energy, emission energy, probability)` rows.
    pub fn lines(&self) -> Vec<FluorescenceLine> {
        self.binding_energies
            .iter()
            .flat_map(|b| {
                b.emissions.iter().map(|e| FluorescenceLine {
                    binding_energy: b.binding_energy,
                    emission_energy: e.energy,
                    probability: e.probability,
                })
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.binding_energies.is_empty()
    }
}

#[derive(Default)]
struct Accumulator {
    weight: f64,
    outcomes: BTreeMap<Vec<EnergyKey>, f64>,
}

/// Emission table for a material with the given mass fractions.
///
/// Each element's resolved cascades are weighted by subshell ionization
/// probability and mass fraction and pooled by binding energy. Photon sets
/// at or below `probability_threshold` move to the no-emission entry, and
/// binding energies left with no photons are dropped. A photon set is then
/// represented by its most energetic photon, which discards the others;
/// sets sharing that photon are summed.
pub fn material_emissions(
    atomic: &AtomicDb,
    mass_fractions: &BTreeMap<u16, f64>,
    config: &CascadeConfig,
) -> Result<MaterialEmissions> {
    config.validate()?;
    let mut pooled: BTreeMap<EnergyKey, Accumulator> = BTreeMap::new();
    for (&z, &fraction) in mass_fractions {
        let atom = atomic.atom(z)?;
        let probabilities = shell_probabilities(atom, config);
        for cascade in resolve_shell_cascades(atom, config)? {
            let Some(&ionization) = probabilities.get(&cascade.subshell) else {
                continue;
            };
            let weight = ionization * fraction;
            let acc = pooled.entry(EnergyKey(cascade.binding_energy)).or_default();
            acc.weight += weight;
            for (energies, p) in cascade.emissions {
                let key = energies.into_iter().map(EnergyKey).collect();
                *acc.outcomes.entry(key).or_insert(0.0) += p * weight;
            }
        }
    }

    let mut binding_energies = Vec::new();
    for (EnergyKey(binding_energy), acc) in pooled {
        let mut photons: BTreeMap<EnergyKey, f64> = BTreeMap::new();
        for (set, p) in acc.outcomes {
            if p <= config.probability_threshold {
                continue;
            }
            if let Some(&largest) = set.iter().max() {
                *photons.entry(largest).or_insert(0.0) += p;
            }
        }
        if photons.is_empty() {
            continue;
        }
        let kept: f64 = photons.values().sum();
        let mut emissions = vec![Emission {
            energy: None,
            probability: 1.0 - kept,
        }];
        emissions.extend(photons.into_iter().map(|(EnergyKey(e), p)| Emission {
            energy: Some(e),
            probability: p,
        }));
        binding_energies.push(BindingEnergyEmissions {
            binding_energy,
            weight: acc.weight,
            emissions,
        });
    }
    Ok(MaterialEmissions { binding_energies })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use photondb_data::{SubshellCrossSection, TransitionRecord};

    fn radiative(source: Subshell, energy: f64, probability: f64) -> TransitionRecord {
        TransitionRecord {
            source,
            ejected: None,
            energy,
            probability,
        }
    }

    fn auger(source: Subshell, ejected: Subshell, probability: f64) -> TransitionRecord {
        TransitionRecord {
            source,
            ejected: Some(ejected),
            energy: 100.0,
            probability,
        }
    }

    fn shell(subshell: Subshell, binding_energy: f64, transitions: Vec<TransitionRecord>) -> ShellRecord {
        ShellRecord {
            subshell,
            binding_energy,
            number_electrons: 2.0,
            transitions,
        }
    }

    /// Flat cross section, so the value at the reference energy is `value`.
    fn xs(subshell: Subshell, binding_energy: f64, value: f64) -> SubshellCrossSection {
        SubshellCrossSection {
            subshell,
            binding_energy,
            fluorescence_yield: None,
            energy: vec![binding_energy, 1.0e6],
            cross_section: vec![value, value],
        }
    }

    /// K fills from L3 (radiative, 60 keV) or L2/L3 Auger; L3 emits 9.5 keV
    /// (below threshold) or goes Auger into M1, which has no data.
    fn heavy_atom() -> AtomicRecord {
        let l3 = Subshell::L3;
        let l2 = Subshell::L2;
        let m1 = Subshell::M1;
        AtomicRecord {
            atomic_number: 71,
            symbol: "Lu".to_string(),
            mass: 173.5,
            shells: vec![
                shell(Subshell::K, 63_314.0, vec![
                    radiative(l3, 54_069.0, 0.5),
                    radiative(l2, 52_965.0, 0.3),
                    auger(l2, l3, 0.2),
                ]),
                shell(l2, 10_349.0, vec![radiative(m1, 9_000.0, 0.4), auger(m1, m1, 0.6)]),
                shell(l3, 9_244.0, vec![radiative(m1, 7_600.0, 0.3), auger(m1, m1, 0.7)]),
                shell(m1, 2_491.0, vec![]),
            ],
            photoionization: Vec::new(),
        }
    }

    #[test]
    fn test_seed_rounds_and_thresholds() {
        let config = CascadeConfig::default();
        let atom = heavy_atom();
        let seeded = seed(&atom.shells[0], &config);
        assert_eq!(seeded.len(), 3);
        let l3_line = Outcome {
            emissions: vec![54],
            holes: vec![Subshell::L3],
        };
        assert_eq!(seeded[&l3_line], 0.5);

        let seeded = seed(&atom.shells[2], &config);
        assert!(seeded.keys().all(|o| o.emissions.is_empty()));
    }

    #[test]
    fn test_resolve_drops_silent_shells() {
        let cascades = resolve_shell_cascades(&heavy_atom(), &CascadeConfig::default()).unwrap();
        // L2 and L3 only emit below threshold; M1 has no transitions
        assert_eq!(cascades.len(), 1);
        let k = &cascades[0];
        assert_eq!(k.subshell, Subshell::K);
        let total: f64 = k.emissions.iter().map(|(_, p)| p).sum();
        // L shells hand their vacancies to M1, which ends the chain
        assert_relative_eq!(total, 1.0);
        let with = |e: &[f64]| {
            k.emissions
                .iter()
                .find(|(set, _)| set.as_slice() == e)
                .map(|&(_, p)| p)
                .unwrap()
        };
        assert_relative_eq!(with(&[54_000.0]), 0.5);
        assert_relative_eq!(with(&[52_000.0]), 0.3);
        assert_relative_eq!(with(&[]), 0.2);
    }

    #[test]
    fn test_lower_threshold_keeps_l_lines() {
        let config = CascadeConfig {
            emission_threshold: 5_000.0,
            ..CascadeConfig::default()
        };
        let cascades = resolve_shell_cascades(&heavy_atom(), &config).unwrap();
        let k = cascades.iter().find(|c| c.subshell == Subshell::K).unwrap();
        // K -> L3 line, then L3 -> M1 line
        let pair = k
            .emissions
            .iter()
            .find(|(set, _)| set.as_slice() == [7_000.0, 54_000.0])
            .unwrap();
        assert_relative_eq!(pair.1, 0.5 * 0.3);
        let total: f64 = k.emissions.iter().map(|(_, p)| p).sum();
        assert_relative_eq!(total, 1.0);
    }

    #[test]
    fn test_cycle_is_reported() {
        let mut atom = heavy_atom();
        atom.shells[1].transitions.push(auger(Subshell::K, Subshell::M1, 0.1));
        assert!(matches!(
            resolve_shell_cascades(&atom, &CascadeConfig::default()),
            Err(PhotonDbError::CascadeCycle { atomic_number: 71, .. })
        ));
    }

    #[test]
    fn test_invalid_config() {
        let config = CascadeConfig {
            round_to: 0.0,
            ..CascadeConfig::default()
        };
        assert!(matches!(
            resolve_shell_cascades(&heavy_atom(), &config),
            Err(PhotonDbError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_shell_probabilities_normalize_cross_sections() {
        let mut atom = heavy_atom();
        atom.photoionization = vec![
            SubshellCrossSection {
                subshell: Subshell::K,
                binding_energy: 63_314.0,
                fluorescence_yield: None,
                energy: vec![63_314.0, 1.0e6],
                cross_section: vec![300.0, 3.0],
            },
            SubshellCrossSection {
                subshell: Subshell::L3,
                binding_energy: 9_244.0,
                fluorescence_yield: None,
                energy: vec![9_244.0, 1.0e6],
                cross_section: vec![100.0, 1.0],
            },
            SubshellCrossSection {
                subshell: Subshell::L2,
                binding_energy: 10_349.0,
                fluorescence_yield: None,
                energy: vec![600_000.0, 1.0e6],
                cross_section: vec![50.0, 1.0],
            },
        ];
        let probs = shell_probabilities(&atom, &CascadeConfig::default());
        assert_eq!(probs[&Subshell::L2], 0.0);
        let k = interp_loglog_one(511_000.0, &[63_314.0, 1.0e6], &[300.0, 3.0]);
        let l3 = interp_loglog_one(511_000.0, &[9_244.0, 1.0e6], &[100.0, 1.0]);
        assert_relative_eq!(probs[&Subshell::K], k / (k + l3));
        assert_relative_eq!(probs.values().sum::<f64>(), 1.0);
    }

    #[test]
    fn test_material_emissions_sum_to_one() {
        let mut atom = heavy_atom();
        atom.photoionization = vec![xs(Subshell::K, 63_314.0, 4.0), xs(Subshell::L3, 9_244.0, 1.0)];
        let mut db = AtomicDb::default();
        db.insert(atom);

        let table =
            material_emissions(&db, &BTreeMap::from([(71, 0.8)]), &CascadeConfig::default()).unwrap();
        assert_eq!(table.binding_energies.len(), 1);
        let k = &table.binding_energies[0];
        assert_eq!(k.binding_energy, 63_314.0);
        let sum: f64 = k.emissions.iter().map(|e| e.probability).sum();
        assert_relative_eq!(sum, 1.0);
        assert!(k.no_emission() > 0.0);
        assert_eq!(k.emissions[0].energy, None);
        assert_eq!(k.emissions[1].energy, Some(52_000.0));
        assert_eq!(k.emissions[2].energy, Some(54_000.0));
        assert_relative_eq!(k.emissions[2].probability, 0.5 * k.weight);
        assert_eq!(table.lines().len(), 3);
    }

    #[test]
    fn test_small_outcomes_fold_into_no_emission() {
        let mut atom = heavy_atom();
        atom.photoionization = vec![xs(Subshell::K, 63_314.0, 1.0)];
        let mut db = AtomicDb::default();
        db.insert(atom);
        let config = CascadeConfig {
            probability_threshold: 0.4,
            ..CascadeConfig::default()
        };
        let table = material_emissions(&db, &BTreeMap::from([(71, 1.0)]), &config).unwrap();
        let k = &table.binding_energies[0];
        assert_relative_eq!(k.weight, 1.0);
        // only the 54 keV line (0.5) clears the threshold
        assert_eq!(k.emissions.len(), 2);
        assert_relative_eq!(k.no_emission(), 0.5);
    }

    #[test]
    fn test_missing_atomic_data() {
        let result =
            material_emissions(&AtomicDb::default(), &BTreeMap::from([(8, 1.0)]), &CascadeConfig::default());
        assert!(matches!(result, Err(PhotonDbError::MissingAtomicData(8))));
    }
}
