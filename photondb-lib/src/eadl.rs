//! Atomic relaxation (EADL) and subshell photoionization data read from
//! ENDF-6 files.
//!
//! | MF | MT        | content                                   |
//! |----|-----------|-------------------------------------------|
//! | 1  | 451       | descriptive header (Z, symbol, mass)      |
//! | 23 | 534..=572 | subshell photoionization cross sections   |
//! | 28 | 533       | atomic relaxation transitions             |
//!
//! All other sections are ignored.

use std::collections::BTreeMap;
use std::path::Path;

use photondb_data::{
    AtomicRecord, ShellRecord, Subshell, SubshellCrossSection, TransitionRecord,
};
use tracing::{debug, info};

use crate::elements;
use crate::endf::{self, RecordCursor, Section};
use crate::error::{PhotonDbError, Result};

const MF_HEADER: i32 = 1;
const MT_HEADER: i32 = 451;
const MF_CROSS_SECTIONS: i32 = 23;
const MF_RELAXATION: i32 = 28;
const MT_RELAXATION: i32 = 533;
/// MT of the K subshell photoionization section; later subshells follow.
const MT_SUBSHELL_BASE: i32 = 533;
const ENDF_FORMAT: i64 = 6;

/// Atomic relaxation data keyed by atomic number.
#[derive(Debug, Clone, Default)]
pub struct AtomicDb {
    atoms: BTreeMap<u16, AtomicRecord>,
}

impl AtomicDb {
    /// Parse the contents of one ENDF-6 file.
    pub fn parse(content: &str) -> Result<Self> {
        let mut atoms: BTreeMap<u16, AtomicRecord> = BTreeMap::new();
        for section in endf::split_sections(content)? {
            let z = section_atomic_number(&section)?;
            let atom = atoms.entry(z).or_insert_with(|| AtomicRecord {
                atomic_number: z,
                symbol: elements::symbol(z).unwrap_or_default().to_string(),
                ..AtomicRecord::default()
            });
            match (section.mf, section.mt) {
                (MF_HEADER, MT_HEADER) => parse_header(&section, atom)?,
                (MF_CROSS_SECTIONS, mt) if Subshell::from_designator(subshell_index(mt)).is_some() => {
                    let xs = parse_subshell_cross_section(&section)?;
                    debug!(z, subshell = %xs.subshell, points = xs.energy.len(), "read photoionization");
                    atom.photoionization.push(xs);
                }
                (MF_RELAXATION, MT_RELAXATION) => {
                    atom.shells = parse_relaxation(&section)?;
                    debug!(z, shells = atom.shells.len(), "read atomic relaxation");
                }
                _ => {}
            }
        }
        info!(elements = atoms.len(), "loaded ENDF-6 atomic data");
        Ok(AtomicDb { atoms })
    }

    /// Read and parse an ENDF-6 file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| PhotonDbError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Fold another library into this one.
    ///
    /// Sections present in `other` replace the same subshell's data here;
    /// everything else is kept. Used to join EADL transitions with the
    /// subshell cross sections of the ENDF-6 EPDL.
    pub fn merge(&mut self, other: AtomicDb) {
        for (z, incoming) in other.atoms {
            let Some(atom) = self.atoms.get_mut(&z) else {
                self.atoms.insert(z, incoming);
                continue;
            };
            if incoming.mass > 0.0 {
                atom.mass = incoming.mass;
            }
            for shell in incoming.shells {
                match atom.shells.iter_mut().find(|s| s.subshell == shell.subshell) {
                    Some(existing) => *existing = shell,
                    None => atom.shells.push(shell),
                }
            }
            atom.shells.sort_by_key(|s| s.subshell);
            for xs in incoming.photoionization {
                match atom
                    .photoionization
                    .iter_mut()
                    .find(|s| s.subshell == xs.subshell)
                {
                    Some(existing) => *existing = xs,
                    None => atom.photoionization.push(xs),
                }
            }
            atom.photoionization.sort_by_key(|s| s.subshell);
        }
    }

    /// Add or replace one atom.
    pub fn insert(&mut self, atom: AtomicRecord) {
        self.atoms.insert(atom.atomic_number, atom);
    }

    pub fn atom(&self, atomic_number: u16) -> Result<&AtomicRecord> {
        self.atoms
            .get(&atomic_number)
            .ok_or(PhotonDbError::MissingAtomicData(atomic_number))
    }

    /// Atoms in order of atomic number.
    pub fn atoms(&self) -> impl Iterator<Item = &AtomicRecord> {
        self.atoms.values()
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

fn subshell_index(mt: i32) -> u8 {
    u8::try_from(mt - MT_SUBSHELL_BASE).unwrap_or(0)
}

/// Atomic number from the ZA of the section's HEAD record.
fn section_atomic_number(section: &Section<'_>) -> Result<u16> {
    let head = section.cursor().head()?;
    head.za
        .and_then(|za| u16::try_from(za / 1000).ok())
        .filter(|&z| z > 0)
        .ok_or_else(|| {
            PhotonDbError::format(
                section.first_line,
                format!("MAT {} has invalid ZA {:?}", section.mat, head.za),
            )
        })
}

fn required<T>(value: Option<T>, cursor: &RecordCursor<'_>, what: &str) -> Result<T> {
    value.ok_or_else(|| PhotonDbError::format(cursor.line_number(), format!("missing {what}")))
}

fn parse_header(section: &Section<'_>, atom: &mut AtomicRecord) -> Result<()> {
    let mut cursor = section.cursor();
    let head = cursor.head()?;
    if let Some(awr) = head.awr {
        atom.mass = awr;
    }
    let format = cursor.cont()?.n2;
    if format != Some(ENDF_FORMAT) {
        return Err(PhotonDbError::format(
            section.first_line + 1,
            format!("expected ENDF-6 format (NFOR=6), found {format:?}"),
        ));
    }
    cursor.cont()?;
    cursor.cont()?;

    let text = cursor.text()?;
    let z: Option<u16> = text.get(0..3).and_then(|s| s.trim().parse().ok());
    if z.is_some_and(|z| z != atom.atomic_number) {
        return Err(PhotonDbError::format(
            section.first_line + 4,
            format!("header Z {z:?} does not match ZA of MAT {}", section.mat),
        ));
    }
    if let Some(symbol) = text.get(4..6).map(str::trim).filter(|s| !s.is_empty()) {
        atom.symbol = symbol.to_string();
    }
    Ok(())
}

fn parse_subshell_cross_section(section: &Section<'_>) -> Result<SubshellCrossSection> {
    let mut cursor = section.cursor();
    cursor.head()?;
    let line = cursor.line_number();
    let tab = cursor.tab1()?;
    let (energy, cross_section) = tab
        .points()
        .ok_or_else(|| PhotonDbError::format(line, "missing TAB1 point value"))?;
    let subshell = Subshell::from_designator(subshell_index(section.mt))
        .ok_or_else(|| PhotonDbError::UnknownShell(format!("MT {}", section.mt)))?;
    Ok(SubshellCrossSection {
        subshell,
        binding_energy: required(tab.control.c1, &cursor, "binding energy")?,
        fluorescence_yield: tab.control.c2,
        energy,
        cross_section,
    })
}

fn designator(value: Option<f64>) -> Result<Option<Subshell>> {
    match value {
        Some(v) if v == 0.0 => Ok(None),
        Some(v) if v.fract() == 0.0 && (1.0..=255.0).contains(&v) => {
            Subshell::from_designator(v as u8)
                .map(Some)
                .ok_or_else(|| PhotonDbError::UnknownShell(format!("{v}")))
        }
        other => Err(PhotonDbError::UnknownShell(format!("{other:?}"))),
    }
}

fn parse_relaxation(section: &Section<'_>) -> Result<Vec<ShellRecord>> {
    let mut cursor = section.cursor();
    let head = cursor.head()?;
    let n_subshells = required(head.n1, &cursor, "subshell count (NSS)")?;

    let mut shells = Vec::new();
    for _ in 0..n_subshells {
        let list = cursor.list()?;
        let subshell = designator(list.control.c1)?
            .ok_or_else(|| PhotonDbError::UnknownShell("0".to_string()))?;
        let n_transitions =
            required(list.control.n2, &cursor, "transition count (NTR)")?.max(0);
        let found = list.items.len();
        // six words for the shell, six per transition
        let expected = usize::try_from(n_transitions)
            .ok()
            .and_then(|n| n.checked_add(1))
            .and_then(|n| n.checked_mul(6));
        let n_transitions = match expected {
            Some(expected) if expected <= found => expected / 6 - 1,
            Some(expected) => return Err(PhotonDbError::ListLength { expected, found }),
            None => {
                return Err(PhotonDbError::format(
                    cursor.line_number(),
                    format!("transition count {n_transitions} overflows"),
                ));
            }
        };

        let mut transitions = Vec::new();
        for j in 1..=n_transitions {
            let at = 6 * j;
            let source = designator(list.value(at))?
                .ok_or_else(|| PhotonDbError::UnknownShell("0".to_string()))?;
            transitions.push(TransitionRecord {
                source,
                ejected: designator(list.value(at + 1))?,
                energy: required(list.value(at + 2), &cursor, "transition energy")?,
                probability: required(list.value(at + 3), &cursor, "transition probability")?,
            });
        }
        shells.push(ShellRecord {
            subshell,
            binding_energy: required(list.value(0), &cursor, "binding energy")?,
            number_electrons: required(list.value(1), &cursor, "electron count")?,
            transitions,
        });
    }
    shells.sort_by_key(|s| s.subshell);
    Ok(shells)
}
