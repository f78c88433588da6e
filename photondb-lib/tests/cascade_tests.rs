use std::collections::BTreeMap;

use approx::assert_relative_eq;
use photondb::photondb_data::Subshell;
use photondb::{
    AtomicDb, CascadeConfig, MaterialTable, PhotonDb, PhotonDbError, material_emissions,
    resolve_shell_cascades, shell_probabilities,
};

fn atomic() -> AtomicDb {
    let mut db =
        AtomicDb::load(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/eadl_extract.endf")).unwrap();
    db.merge(
        AtomicDb::load(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/epdl_extract.endf")).unwrap(),
    );
    db
}

fn lso_fractions() -> BTreeMap<u16, f64> {
    let db = PhotonDb::load(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/epdl_extract.all"))
        .unwrap();
    db.composition_to_mass_fraction(&BTreeMap::from([(71, 2.0), (14, 1.0), (8, 5.0)]))
        .unwrap()
}

fn assert_sums_to_one(table: &photondb::MaterialEmissions) {
    for entry in &table.binding_energies {
        let sum: f64 = entry.emissions.iter().map(|e| e.probability).sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-12);
        assert!(entry.emissions.iter().all(|e| e.probability >= 0.0));
    }
}

#[test]
fn test_lutetium_k_cascade() {
    let atomic = atomic();
    let cascades = resolve_shell_cascades(atomic.atom(71).unwrap(), &CascadeConfig::default()).unwrap();
    // L and M vacancies only emit below 15 keV
    assert_eq!(cascades.len(), 1);
    let k = &cascades[0];
    assert_eq!(k.subshell, Subshell::K);
    assert_eq!(k.binding_energy, 63314.0);

    let expected = [
        (vec![], 0.07),
        (vec![52000.0], 0.27),
        (vec![54000.0], 0.47),
        // K-M2 and K-M3 fall in the same bucket
        (vec![61000.0], 0.15),
        // N3 has no relaxation data and ends the chain
        (vec![62000.0], 0.04),
    ];
    assert_eq!(k.emissions.len(), expected.len());
    for ((energies, p), (want, want_p)) in k.emissions.iter().zip(expected) {
        assert_eq!(*energies, want);
        assert_relative_eq!(*p, want_p, epsilon = 1e-12);
    }
}

#[test]
fn test_light_elements_emit_nothing_tracked() {
    let atomic = atomic();
    for z in [8, 14] {
        let cascades = resolve_shell_cascades(atomic.atom(z).unwrap(), &CascadeConfig::default()).unwrap();
        assert!(cascades.is_empty(), "Z={z}");
    }
}

#[test]
fn test_k_shell_dominates_ionization() {
    let atomic = atomic();
    let probs = shell_probabilities(atomic.atom(71).unwrap(), &CascadeConfig::default());
    assert_eq!(probs.len(), 9);
    assert_relative_eq!(probs.values().sum::<f64>(), 1.0, epsilon = 1e-12);
    assert!(probs[&Subshell::K] > 0.99);

    // below the K edge only the outer shells are open
    let config = CascadeConfig {
        reference_energy: 20_000.0,
        ..CascadeConfig::default()
    };
    let probs = shell_probabilities(atomic.atom(71).unwrap(), &config);
    assert_eq!(probs[&Subshell::K], 0.0);
    assert!(probs[&Subshell::L3] > 0.0);
}

#[test]
fn test_lso_emissions() {
    let atomic = atomic();
    let fractions = lso_fractions();
    let config = CascadeConfig::default();
    let table = material_emissions(&atomic, &fractions, &config).unwrap();
    assert_sums_to_one(&table);

    assert_eq!(table.binding_energies.len(), 1);
    let k = &table.binding_energies[0];
    assert_eq!(k.binding_energy, 63314.0);
    let p_k = shell_probabilities(atomic.atom(71).unwrap(), &config)[&Subshell::K];
    assert_relative_eq!(k.weight, p_k * fractions[&71], max_relative = 1e-12);

    let energies: Vec<Option<f64>> = k.emissions.iter().map(|e| e.energy).collect();
    assert_eq!(
        energies,
        vec![None, Some(52000.0), Some(54000.0), Some(61000.0), Some(62000.0)]
    );
    assert_relative_eq!(k.emissions[2].probability, 0.47 * k.weight, max_relative = 1e-12);
    assert_relative_eq!(k.no_emission(), 1.0 - 0.93 * k.weight, max_relative = 1e-12);
}

#[test]
fn test_probability_threshold() {
    let atomic = atomic();
    let fractions = lso_fractions();

    let config = CascadeConfig {
        probability_threshold: 0.05,
        ..CascadeConfig::default()
    };
    let table = material_emissions(&atomic, &fractions, &config).unwrap();
    assert_sums_to_one(&table);
    let k = &table.binding_energies[0];
    // the 62 keV line (0.04 × weight) folds into no emission
    assert_eq!(k.emissions.len(), 4);
    assert!(k.emissions.iter().all(|e| e.energy != Some(62000.0)));

    let config = CascadeConfig {
        probability_threshold: 0.5,
        ..CascadeConfig::default()
    };
    let table = material_emissions(&atomic, &fractions, &config).unwrap();
    assert!(table.is_empty());
}

#[test]
fn test_low_emission_threshold_keeps_l_shells() {
    let atomic = atomic();
    let config = CascadeConfig {
        emission_threshold: 5000.0,
        probability_threshold: 0.0,
        ..CascadeConfig::default()
    };
    let table = material_emissions(&atomic, &lso_fractions(), &config).unwrap();
    assert_sums_to_one(&table);
    let bindings: Vec<f64> = table.binding_energies.iter().map(|b| b.binding_energy).collect();
    assert_eq!(bindings, vec![9244.0, 10349.0, 10870.0, 63314.0]);

    let l3 = &table.binding_energies[0];
    let energies: Vec<Option<f64>> = l3.emissions.iter().map(|e| e.energy).collect();
    assert_eq!(energies, vec![None, Some(7000.0)]);
    assert_relative_eq!(l3.emissions[1].probability, 0.25 * l3.weight, max_relative = 1e-12);

    // K-L3 now emits a second photon from L3; both sets collapse onto 54 keV
    let k = &table.binding_energies[3];
    let line = k.emissions.iter().find(|e| e.energy == Some(54000.0)).unwrap();
    assert_relative_eq!(line.probability, 0.47 * k.weight, max_relative = 1e-12);
}

#[test]
fn test_export_lines() {
    let db = PhotonDb::load(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/epdl_extract.all"))
        .unwrap();
    let lso = db.material_by_formula("Lu2SiO5", Some(0.001), Some(1.5)).unwrap();
    let emissions = material_emissions(&atomic(), &lso.composition, &CascadeConfig::default()).unwrap();
    let table = MaterialTable::new(&lso, 0, 7.4, true).with_emissions(&emissions);
    assert_eq!(table.fluorescence.len(), 5);
    assert!(table.fluorescence.iter().all(|l| l.binding_energy == 63314.0));
    assert_eq!(table.fluorescence[0].emission_energy, None);
}

#[test]
fn test_missing_element() {
    let result = material_emissions(&atomic(), &BTreeMap::from([(26, 1.0)]), &CascadeConfig::default());
    assert!(matches!(result, Err(PhotonDbError::MissingAtomicData(26))));
}
