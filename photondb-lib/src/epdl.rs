//! EPDL table loader.
//!
//! An EPDL file is a stream of tables. Each table opens with two header
//! lines (ZA and atomic weight on the first, the `(rdesc, rprop, rmod)`
//! descriptor on the second), continues with two 16-column numeric rows and
//! ends with a line of 71 blanks followed by `1`.

use std::collections::BTreeMap;
use std::path::Path;

use photondb_data::{Curve, ElementRecord};
use tracing::{debug, info};

use crate::constants::{AVOGADRO, BARN_CM2};
use crate::endf;
use crate::error::{PhotonDbError, Result};
use crate::interp::{interp, interp_loglog};

const ROW_FIELD_WIDTH: usize = 16;

/// Quantity stored in one EPDL table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Table {
    Rayleigh,
    Compton,
    Photoelectric,
    FormFactor,
    ScatteringFunction,
    AnomalousImag,
    AnomalousReal,
}

impl Table {
    fn from_descriptor(rdesc: i32, rprop: i32, rmod: i32) -> Option<Self> {
        match (rdesc, rprop, rmod) {
            (71, 0, 0) => Some(Table::Rayleigh),
            (72, 0, 0) => Some(Table::Compton),
            (73, 0, 0) => Some(Table::Photoelectric),
            (93, 941, 0) => Some(Table::FormFactor),
            (93, 942, 0) => Some(Table::ScatteringFunction),
            (93, 943, 0) => Some(Table::AnomalousImag),
            (93, 944, 0) => Some(Table::AnomalousReal),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Table::Rayleigh => "Rayleigh",
            Table::Compton => "Compton",
            Table::Photoelectric => "photoelectric",
            Table::FormFactor => "form factor",
            Table::ScatteringFunction => "scattering function",
            Table::AnomalousImag => "imaginary anomalous scattering",
            Table::AnomalousReal => "real anomalous scattering",
        }
    }
}

/// Rows of one table and the line its header started on.
#[derive(Debug, Default)]
struct Rows {
    line: usize,
    x: Vec<f64>,
    y: Vec<f64>,
}

impl Rows {
    fn sorted(self, z: u16, table: Table) -> Result<Self> {
        if self.x.windows(2).any(|w| w[1] < w[0]) {
            return Err(PhotonDbError::format(
                self.line,
                format!("Z={z} {} table energies are not sorted", table.name()),
            ));
        }
        Ok(self)
    }
}

/// Tables collected for one element before re-gridding.
#[derive(Debug, Default)]
struct RawElement {
    atomic_weight: Option<f64>,
    header_line: usize,
    tables: BTreeMap<Table, Rows>,
}

impl RawElement {
    fn take(&mut self, z: u16, table: Table) -> Result<Rows> {
        self.tables
            .remove(&table)
            .ok_or(PhotonDbError::MissingTable {
                atomic_number: z,
                table: table.name(),
            })?
            .sorted(z, table)
    }

    fn take_optional(&mut self, table: Table) -> Curve {
        self.tables
            .remove(&table)
            .map(|rows| Curve::new(rows.x, rows.y))
            .unwrap_or_default()
    }
}

fn is_terminator(line: &str) -> bool {
    line.len() >= 72
        && line.as_bytes()[..71].iter().all(|&b| b == b' ')
        && line[71..].trim_end() == "1"
}

fn header_int(line: &str, range: std::ops::Range<usize>) -> Option<i32> {
    line.get(range)
        .map(str::trim)
        .and_then(|s| s.parse().ok())
}

fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    trimmed.parse().ok().or_else(|| endf::read_float(trimmed))
}

fn parse_row(line: &str, line_no: usize) -> Result<(f64, f64)> {
    let column = |i: usize| {
        let start = i * ROW_FIELD_WIDTH;
        line.get(start..(start + ROW_FIELD_WIDTH).min(line.len()))
            .and_then(parse_number)
    };
    match (column(0), column(1)) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(PhotonDbError::format(
            line_no,
            format!("expected two numeric columns, got {:?}", line.trim_end()),
        )),
    }
}

fn to_linear_attenuation(barns: &[f64], atomic_weight: f64) -> Vec<f64> {
    barns
        .iter()
        .map(|&b| b * BARN_CM2 * AVOGADRO / atomic_weight)
        .collect()
}

/// Energies that appear twice in a sorted axis.
fn find_edges(energy: &[f64]) -> Vec<f64> {
    let mut edges: Vec<f64> = energy
        .windows(2)
        .filter(|w| w[0] == w[1])
        .map(|w| w[0])
        .collect();
    edges.dedup();
    edges
}

fn finish_element(z: u16, mut raw: RawElement) -> Result<ElementRecord> {
    let atomic_weight = match raw.atomic_weight {
        Some(w) if w > 0.0 => w,
        other => {
            return Err(PhotonDbError::format(
                raw.header_line,
                format!("Z={z} has invalid atomic weight {other:?}"),
            ));
        }
    };

    // the photoelectric axis carries the edges and is the most detailed
    let photo = raw.take(z, Table::Photoelectric)?;
    let rayl = raw.take(z, Table::Rayleigh)?;
    let comp = raw.take(z, Table::Compton)?;
    let scat = raw.take(z, Table::ScatteringFunction)?;
    let ff = raw.take(z, Table::FormFactor)?;

    let energy = photo.x;
    let matten_rayleigh =
        interp_loglog(&energy, &rayl.x, &to_linear_attenuation(&rayl.y, atomic_weight));
    let matten_compton =
        interp_loglog(&energy, &comp.x, &to_linear_attenuation(&comp.y, atomic_weight));
    let matten_photoelectric = to_linear_attenuation(&photo.y, atomic_weight);

    let edges = find_edges(&energy);
    let edge_select = energy.iter().map(|e| edges.contains(e)).collect();
    let x = scat.x;
    let scattering_func = scat.y;
    let form_factor = interp(&x, &ff.x, &ff.y);

    Ok(ElementRecord {
        atomic_number: z,
        atomic_weight,
        anomalous_real: raw.take_optional(Table::AnomalousReal),
        anomalous_imag: raw.take_optional(Table::AnomalousImag),
        energy,
        matten_rayleigh,
        matten_compton,
        matten_photoelectric,
        edges,
        edge_select,
        x,
        form_factor,
        scattering_func,
    })
}

/// Parse the contents of an EPDL file into one record per atomic number.
///
/// Every element must carry the Rayleigh, Compton and photoelectric cross
/// sections plus the form factor and scattering function; the anomalous
/// scattering tables are optional. Tables with any other descriptor are
/// skipped.
pub fn parse_epdl(content: &str) -> Result<BTreeMap<u16, ElementRecord>> {
    let mut raw: BTreeMap<u16, RawElement> = BTreeMap::new();
    let mut lines = content.lines().enumerate().map(|(i, l)| (i + 1, l));

    while let Some((line1_no, line1)) = lines.next() {
        if line1.trim().is_empty() {
            continue;
        }
        let (_, line2) = lines
            .next()
            .ok_or_else(|| PhotonDbError::format(line1_no, "truncated table header"))?;

        let za: u32 = header_int(line1, 0..6)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| PhotonDbError::format(line1_no, "invalid ZA in table header"))?;
        let z = u16::try_from(za / 1000)
            .map_err(|_| PhotonDbError::format(line1_no, format!("ZA {za} out of range")))?;
        let atomic_weight = line1.get(13..24).and_then(parse_number);

        let rdesc = header_int(line2, 0..2).unwrap_or(-1);
        let rprop = header_int(line2, 2..5).unwrap_or(-1);
        let rmod = header_int(line2, 5..8).unwrap_or(-1);
        let table = Table::from_descriptor(rdesc, rprop, rmod);

        let mut rows = Rows {
            line: line1_no,
            ..Rows::default()
        };
        let mut terminated = false;
        for (line_no, line) in lines.by_ref() {
            if is_terminator(line) {
                terminated = true;
                break;
            }
            if table.is_some() {
                let (x, y) = parse_row(line, line_no)?;
                rows.x.push(x);
                rows.y.push(y);
            }
        }
        if !terminated {
            return Err(PhotonDbError::MissingTerminator { za, line: line1_no });
        }

        let entry = raw.entry(z).or_insert_with(|| RawElement {
            atomic_weight,
            header_line: line1_no,
            ..RawElement::default()
        });
        match table {
            Some(table) => {
                debug!(z, table = table.name(), points = rows.x.len(), "read EPDL table");
                entry.tables.insert(table, rows);
            }
            None => debug!(z, rdesc, rprop, rmod, "skipped EPDL table"),
        }
    }

    let elements = raw
        .into_iter()
        .map(|(z, r)| finish_element(z, r).map(|e| (z, e)))
        .collect::<Result<BTreeMap<_, _>>>()?;
    info!(elements = elements.len(), "loaded EPDL");
    Ok(elements)
}

/// Read and parse an EPDL file.
pub fn load_epdl(path: impl AsRef<Path>) -> Result<BTreeMap<u16, ElementRecord>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| PhotonDbError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_epdl(&content)
}
