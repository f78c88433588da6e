use std::collections::BTreeMap;

use crate::elements;
use crate::error::{PhotonDbError, Result};

/// Recursive-descent reader over an ASCII formula.
struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Parser { text, pos: 0 }
    }

    fn peek(&mut self) -> Option<u8> {
        while self.text.as_bytes().get(self.pos) == Some(&b' ') {
            self.pos += 1;
        }
        self.text.as_bytes().get(self.pos).copied()
    }

    fn error(&self, message: impl std::fmt::Display) -> PhotonDbError {
        PhotonDbError::InvalidFormula(format!("{message} in '{}'", self.text))
    }

    /// A run of elements and parenthesised groups, up to `)` or the end.
    fn group(&mut self, nested: bool) -> Result<BTreeMap<String, f64>> {
        let mut counts = BTreeMap::new();
        loop {
            match self.peek() {
                None if nested => return Err(self.error("unclosed '('")),
                None => return Ok(counts),
                Some(b')') if nested => {
                    self.pos += 1;
                    return Ok(counts);
                }
                Some(b'(') => {
                    self.pos += 1;
                    let inner = self.group(true)?;
                    let n = self.count()?;
                    for (sym, c) in inner {
                        *counts.entry(sym).or_insert(0.0) += c * n;
                    }
                }
                Some(c) if c.is_ascii_uppercase() => {
                    let sym = self.symbol()?;
                    let n = self.count()?;
                    *counts.entry(sym).or_insert(0.0) += n;
                }
                Some(c) => {
                    return Err(self.error(format_args!(
                        "unexpected '{}' at position {}",
                        c as char, self.pos
                    )));
                }
            }
        }
    }

    fn symbol(&mut self) -> Result<String> {
        let bytes = self.text.as_bytes();
        let start = self.pos;
        self.pos += 1;
        while bytes.get(self.pos).is_some_and(u8::is_ascii_lowercase) {
            self.pos += 1;
        }
        let sym = &self.text[start..self.pos];
        match sym {
            // deuterium
            "D" => Ok("H".to_string()),
            s if elements::is_symbol(s) => Ok(s.to_string()),
            s => Err(self.error(format_args!("'{s}' is not an element symbol"))),
        }
    }

    /// Optional stoichiometric count; `1` when absent.
    fn count(&mut self) -> Result<f64> {
        let bytes = self.text.as_bytes();
        let digits = |pos: &mut usize| {
            while bytes.get(*pos).is_some_and(u8::is_ascii_digit) {
                *pos += 1;
            }
        };

        let start = self.pos;
        let mut end = start;
        digits(&mut end);
        if bytes.get(end) == Some(&b'.') {
            end += 1;
            digits(&mut end);
        }
        if end == start {
            return Ok(1.0);
        }
        // lowercase exponent only: an uppercase `E` starts a symbol
        if bytes.get(end) == Some(&b'e') {
            let mut exp = end + 1;
            if matches!(bytes.get(exp), Some(b'+' | b'-')) {
                exp += 1;
            }
            if bytes.get(exp).is_some_and(u8::is_ascii_digit) {
                digits(&mut exp);
                end = exp;
            }
        }
        self.pos = end;
        let text = &self.text[start..end];
        text.parse::<f64>()
            .map_err(|_| self.error(format_args!("invalid count '{text}'")))
    }
}

/// Parse a chemical formula into element symbol → atom count.
///
/// Handles nested parentheses and fractional counts; `D` counts as `H`.
///
/// # Examples
/// ```
/// let lso = photondb::chemparser::formula_to_composition("Lu2SiO5").unwrap();
/// assert_eq!(lso["Lu"], 2.0);
/// assert_eq!(lso["Si"], 1.0);
/// assert_eq!(lso["O"], 5.0);
/// ```
pub fn formula_to_composition(formula: &str) -> Result<BTreeMap<String, f64>> {
    if !formula.is_ascii() {
        return Err(PhotonDbError::InvalidFormula(formula.to_string()));
    }
    let counts = Parser::new(formula).group(false)?;
    if counts.is_empty() {
        return Err(PhotonDbError::InvalidFormula(format!(
            "no elements in '{formula}'"
        )));
    }
    Ok(counts)
}

/// Returns true if the formula parses.
pub fn validate_formula(formula: &str) -> bool {
    formula_to_composition(formula).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_formulas() {
        let lso = formula_to_composition("Lu2SiO5").unwrap();
        assert_eq!(lso.len(), 3);
        assert_eq!(lso["Lu"], 2.0);
        assert_eq!(lso["Si"], 1.0);
        assert_eq!(lso["O"], 5.0);

        let salt = formula_to_composition("NaCl").unwrap();
        assert_eq!(salt.len(), 2);
        assert_eq!(salt["Na"], 1.0);
        assert_eq!(salt["Cl"], 1.0);
    }

    #[test]
    fn test_repeated_symbols_accumulate() {
        let result = formula_to_composition("CH3CH2OH").unwrap();
        assert_eq!(result["C"], 2.0);
        assert_eq!(result["H"], 6.0);
        assert_eq!(result["O"], 1.0);
    }

    #[test]
    fn test_nested_groups() {
        let result = formula_to_composition("Ca10(PO4)6(OH)2").unwrap();
        assert_eq!(result["Ca"], 10.0);
        assert_eq!(result["P"], 6.0);
        assert_eq!(result["O"], 26.0);
        assert_eq!(result["H"], 2.0);

        let result = formula_to_composition("((CH2)2O)3").unwrap();
        assert_eq!(result["C"], 6.0);
        assert_eq!(result["H"], 12.0);
        assert_eq!(result["O"], 3.0);
    }

    #[test]
    fn test_fractional_counts() {
        let result = formula_to_composition("Lu1.8Y.2SiO5").unwrap();
        assert!((result["Lu"] - 1.8).abs() < 1e-12);
        assert!((result["Y"] - 0.2).abs() < 1e-12);

        let result = formula_to_composition("Ce2e-3Gd2SiO5").unwrap();
        assert!((result["Ce"] - 2e-3).abs() < 1e-15);
        assert_eq!(result["Gd"], 2.0);
    }

    #[test]
    fn test_uppercase_e_starts_a_symbol() {
        let result = formula_to_composition("Fe2Er").unwrap();
        assert_eq!(result["Fe"], 2.0);
        assert_eq!(result["Er"], 1.0);
    }

    #[test]
    fn test_symbol_case_matters() {
        let co = formula_to_composition("CO").unwrap();
        assert_eq!(co["C"], 1.0);
        assert_eq!(co["O"], 1.0);
        assert_eq!(formula_to_composition("Co").unwrap()["Co"], 1.0);
    }

    #[test]
    fn test_deuterium_counts_as_hydrogen() {
        let result = formula_to_composition("D2O").unwrap();
        assert_eq!(result["H"], 2.0);
        assert!(!result.contains_key("D"));
    }

    #[test]
    fn test_invalid_formulas() {
        for bad in ["", "lu2SiO5", "Xx", "Lu2(SiO5", "Lu2)SiO5", "Bi4Ge3O12!", "Ñ"] {
            assert!(
                matches!(
                    formula_to_composition(bad),
                    Err(PhotonDbError::InvalidFormula(_))
                ),
                "{bad:?}"
            );
        }
        assert!(validate_formula("Bi4Ge3O12"));
        assert!(!validate_formula("Bi4Ge3O12)"));
    }
}
