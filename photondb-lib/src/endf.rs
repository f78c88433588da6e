//! ENDF-6 fixed-field record decoding.
//!
//! Every line carries six 11-column numeric fields followed by MAT (columns
//! 67-70), MF (71-72), MT (73-75) and a sequence number. Floats omit the
//! exponent marker (`1.234567+3`) and may contain blanks.
//!
//! Field content never aborts decoding: a field that does not parse comes
//! back as `None`, so callers can tell a missing value from a zero. Record
//! structure (counts, line totals) is checked and reported as an error.

use std::collections::BTreeMap;

use crate::error::{PhotonDbError, Result};

pub const FIELD_WIDTH: usize = 11;
pub const FIELDS_PER_LINE: usize = 6;

/// Field `index` (0..6) of a line; short lines give short or empty fields.
fn field(line: &str, index: usize) -> &str {
    let start = index * FIELD_WIDTH;
    let end = (start + FIELD_WIDTH).min(line.len());
    line.get(start..end).unwrap_or("")
}

/// Convert an ENDF-6 float field to `f64`.
///
/// The first character is taken verbatim (it may be a sign). In the rest,
/// blanks are dropped and a bare `+`/`-` following the mantissa marks the
/// exponent.
///
/// # Examples
/// ```
/// use photondb::endf::read_float;
/// assert_eq!(read_float(" 1.234567+3"), Some(1234.567));
/// assert_eq!(read_float("-2.5-1"), Some(-0.25));
/// assert_eq!(read_float("           "), None);
/// ```
pub fn read_float(field: &str) -> Option<f64> {
    let mut chars = field.chars();
    let first = chars.next()?;
    let mut text = String::with_capacity(field.len() + 2);
    text.push(first);

    let mut prev = first;
    for ch in chars {
        match ch {
            ' ' => continue,
            '+' | '-' if prev.is_ascii_digit() || prev == '.' => {
                text.push('e');
                text.push(ch);
            }
            _ => text.push(ch),
        }
        prev = ch;
    }
    text.trim().parse::<f64>().ok()
}

/// Convert an ENDF-6 integer field. Float-formatted integers are truncated.
pub fn read_int(field: &str) -> Option<i64> {
    let trimmed = field.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Some(v);
    }
    read_float(field)
        .filter(|v| v.is_finite())
        .map(|v| v.trunc() as i64)
}

/// Encode a float into an 11-column ENDF-6 field (7 significant digits for
/// one-digit exponents).
pub fn format_float(value: f64) -> String {
    if value == 0.0 {
        return " 0.000000+0".to_string();
    }
    let sign = if value < 0.0 { '-' } else { ' ' };
    let magnitude = value.abs();

    let mut digits = 6;
    loop {
        let text = format!("{magnitude:.digits$e}");
        let (mantissa, exponent) = match text.split_once('e') {
            Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
            None => (text.as_str(), 0),
        };
        let needed = match exponent.unsigned_abs() {
            0..=9 => 6,
            10..=99 => 5,
            _ => 4,
        };
        if needed >= digits || digits == 4 {
            let exp_sign = if exponent < 0 { '-' } else { '+' };
            return format!("{sign}{mantissa}{exp_sign}{}", exponent.unsigned_abs());
        }
        digits = needed;
    }
}

/// Encode an integer into an 11-column field.
pub fn format_int(value: i64) -> String {
    format!("{value:>11}")
}

/// The six numeric fields of a line, as floats.
pub fn parse_data(line: &str) -> [Option<f64>; FIELDS_PER_LINE] {
    std::array::from_fn(|i| read_float(field(line, i)))
}

/// HEAD record: `(ZA, AWR, L1, L2, N1, N2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Head {
    pub za: Option<i64>,
    pub awr: Option<f64>,
    pub l1: Option<i64>,
    pub l2: Option<i64>,
    pub n1: Option<i64>,
    pub n2: Option<i64>,
}

pub fn parse_head(line: &str) -> Head {
    Head {
        za: read_int(field(line, 0)),
        awr: read_float(field(line, 1)),
        l1: read_int(field(line, 2)),
        l2: read_int(field(line, 3)),
        n1: read_int(field(line, 4)),
        n2: read_int(field(line, 5)),
    }
}

/// CONT record: `(C1, C2, L1, L2, N1, N2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cont {
    pub c1: Option<f64>,
    pub c2: Option<f64>,
    pub l1: Option<i64>,
    pub l2: Option<i64>,
    pub n1: Option<i64>,
    pub n2: Option<i64>,
}

/// The four integer fields of a CONT record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContIntegers {
    pub l1: Option<i64>,
    pub l2: Option<i64>,
    pub n1: Option<i64>,
    pub n2: Option<i64>,
}

pub fn parse_cont(line: &str) -> Cont {
    Cont {
        c1: read_float(field(line, 0)),
        c2: read_float(field(line, 1)),
        l1: read_int(field(line, 2)),
        l2: read_int(field(line, 3)),
        n1: read_int(field(line, 4)),
        n2: read_int(field(line, 5)),
    }
}

/// CONT record with C1 and C2 skipped.
pub fn parse_cont_integers(line: &str) -> ContIntegers {
    ContIntegers {
        l1: read_int(field(line, 2)),
        l2: read_int(field(line, 3)),
        n1: read_int(field(line, 4)),
        n2: read_int(field(line, 5)),
    }
}

/// LIST record: a CONT control line and N1 values, six per line.
#[derive(Debug, Clone, PartialEq)]
pub struct List {
    pub control: Cont,
    pub items: Vec<Option<f64>>,
}

impl List {
    pub fn value(&self, index: usize) -> Option<f64> {
        self.items.get(index).copied().flatten()
    }
}

/// TAB1 record: control line, NR interpolation ranges and NP `(x, y)` pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct Tab1 {
    pub control: Cont,
    /// `(NBT, INT)` interpolation ranges.
    pub ranges: Vec<(Option<i64>, Option<i64>)>,
    pub x: Vec<Option<f64>>,
    pub y: Vec<Option<f64>>,
}

impl Tab1 {
    /// The tabulated points, or `None` if any value is missing.
    pub fn points(&self) -> Option<(Vec<f64>, Vec<f64>)> {
        let x = self.x.iter().copied().collect::<Option<Vec<f64>>>()?;
        let y = self.y.iter().copied().collect::<Option<Vec<f64>>>()?;
        Some((x, y))
    }
}

fn count(value: Option<i64>, what: &str) -> Result<usize> {
    match value {
        Some(n) if n >= 0 => Ok(n as usize),
        _ => Err(PhotonDbError::format(1, format!("invalid {what} count {value:?}"))),
    }
}

/// Read `n` values laid out `per_line` to a line, starting at `lines[0]`.
fn read_values(lines: &[&str], n: usize, per_line: usize) -> Result<Vec<Option<f64>>> {
    let needed = n.div_ceil(per_line);
    if lines.len() < needed {
        return Err(PhotonDbError::ListLength {
            expected: n,
            found: lines.len() * per_line,
        });
    }
    let mut values = Vec::with_capacity(n);
    for line in &lines[..needed] {
        let data = parse_data(line);
        let take = per_line.min(n - values.len());
        values.extend_from_slice(&data[..take]);
    }
    Ok(values)
}

/// Parse a LIST record starting at `lines[0]`.
///
/// Returns the record and the number of lines it occupied.
pub fn parse_list(lines: &[&str]) -> Result<(List, usize)> {
    let control_line = lines
        .first()
        .ok_or_else(|| PhotonDbError::format(1, "missing LIST control record"))?;
    let control = parse_cont(control_line);
    let n = count(control.n1, "LIST item")?;
    let items = read_values(&lines[1..], n, FIELDS_PER_LINE)?;
    Ok((List { control, items }, 1 + n.div_ceil(FIELDS_PER_LINE)))
}

/// Parse a TAB1 record starting at `lines[0]`.
///
/// Returns the record and the number of lines it occupied.
pub fn parse_tab1(lines: &[&str]) -> Result<(Tab1, usize)> {
    let control_line = lines
        .first()
        .ok_or_else(|| PhotonDbError::format(1, "missing TAB1 control record"))?;
    let control = parse_cont(control_line);
    let nr = count(control.n1, "TAB1 interpolation range")?;
    let np = count(control.n2, "TAB1 point")?;

    let range_lines = nr.div_ceil(3);
    let ranges = read_values(&lines[1..], nr * 2, FIELDS_PER_LINE)?
        .chunks(2)
        .map(|pair| {
            let as_int = |v: Option<f64>| v.map(|f| f.trunc() as i64);
            (as_int(pair[0]), as_int(pair[1]))
        })
        .collect();

    let start = 1 + range_lines;
    let values = read_values(&lines[start.min(lines.len())..], np * 2, FIELDS_PER_LINE)?;
    let (x, y) = values.chunks(2).map(|pair| (pair[0], pair[1])).unzip();

    Ok((
        Tab1 {
            control,
            ranges,
            x,
            y,
        },
        start + np.div_ceil(3),
    ))
}

/// MAT, MF and MT of a line, from columns 67-75.
pub fn parse_tag(line: &str) -> Option<(i32, i32, i32)> {
    let mat = line.get(66..70)?.trim().parse().ok()?;
    let mf = line.get(70..72)?.trim().parse().ok()?;
    let mt = line.get(72..75)?.trim().parse().ok()?;
    Some((mat, mf, mt))
}

/// All lines of one `(MAT, MF, MT)` section, in file order.
#[derive(Debug, Clone)]
pub struct Section<'a> {
    pub mat: i32,
    pub mf: i32,
    pub mt: i32,
    /// 1-based line number of the first line in the source.
    pub first_line: usize,
    pub lines: Vec<&'a str>,
}

impl<'a> Section<'a> {
    pub fn cursor(&self) -> RecordCursor<'_> {
        RecordCursor::new(&self.lines, self.first_line)
    }
}

/// Group the lines of an ENDF-6 file by `(MAT, MF, MT)`.
///
/// Control records (SEND, FEND, MEND, TEND) have a zero MAT, MF or MT and
/// are skipped, as are blank lines.
pub fn split_sections(content: &str) -> Result<Vec<Section<'_>>> {
    let mut sections: BTreeMap<(i32, i32, i32), Section<'_>> = BTreeMap::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let (mat, mf, mt) = parse_tag(line)
            .ok_or_else(|| PhotonDbError::format(idx + 1, "missing MAT/MF/MT columns"))?;
        if mat <= 0 || mf == 0 || mt == 0 {
            continue;
        }
        sections
            .entry((mat, mf, mt))
            .or_insert_with(|| Section {
                mat,
                mf,
                mt,
                first_line: idx + 1,
                lines: Vec::new(),
            })
            .lines
            .push(line);
    }
    Ok(sections.into_values().collect())
}

/// Sequential reader over the records of one section.
///
/// Errors carry absolute line numbers.
pub struct RecordCursor<'a> {
    lines: &'a [&'a str],
    pos: usize,
    first_line: usize,
}

impl<'a> RecordCursor<'a> {
    pub fn new(lines: &'a [&'a str], first_line: usize) -> Self {
        RecordCursor {
            lines,
            pos: 0,
            first_line,
        }
    }

    pub fn line_number(&self) -> usize {
        self.first_line + self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.lines.len()
    }

    fn next_line(&mut self) -> Result<&'a str> {
        let line = self.lines.get(self.pos).copied().ok_or_else(|| {
            PhotonDbError::format(self.line_number(), "unexpected end of section")
        })?;
        self.pos += 1;
        Ok(line)
    }

    fn relocate(&self, err: PhotonDbError) -> PhotonDbError {
        match err {
            PhotonDbError::Format { line, message } => PhotonDbError::Format {
                line: self.line_number() + line - 1,
                message,
            },
            other => other,
        }
    }

    pub fn head(&mut self) -> Result<Head> {
        self.next_line().map(parse_head)
    }

    pub fn cont(&mut self) -> Result<Cont> {
        self.next_line().map(parse_cont)
    }

    /// The next line, undecoded (TEXT records).
    pub fn text(&mut self) -> Result<&'a str> {
        self.next_line()
    }

    pub fn list(&mut self) -> Result<List> {
        let (list, used) = parse_list(&self.lines[self.pos..]).map_err(|e| self.relocate(e))?;
        self.pos += used;
        Ok(list)
    }

    pub fn tab1(&mut self) -> Result<Tab1> {
        let (tab, used) = parse_tab1(&self.lines[self.pos..]).map_err(|e| self.relocate(e))?;
        self.pos += used;
        Ok(tab)
    }
}
