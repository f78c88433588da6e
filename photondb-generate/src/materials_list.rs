use anyhow::{Context, Result, bail};
use photondb::chemparser::validate_formula;

/// One line of a materials list: `name formula density sensitive`.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialSpec {
    pub name: String,
    pub formula: String,
    /// g/cm³
    pub density: f64,
    pub sensitive: bool,
}

fn parse_flag(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Parse a whitespace-separated materials list. Blank lines and lines
/// starting with `#` are skipped; names must be unique.
pub fn parse_materials_list(content: &str) -> Result<Vec<MaterialSpec>> {
    let mut specs: Vec<MaterialSpec> = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line_no = i + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [name, formula, density, sensitive] = fields[..] else {
            bail!("line {line_no}: expected 4 columns, found {}", fields.len());
        };
        if !validate_formula(formula) {
            bail!("line {line_no}: invalid formula '{formula}'");
        }
        let density: f64 = density
            .parse()
            .with_context(|| format!("line {line_no}: invalid density '{density}'"))?;
        if !(density.is_finite() && density > 0.0) {
            bail!("line {line_no}: density must be positive, got {density}");
        }
        let Some(sensitive) = parse_flag(sensitive) else {
            bail!("line {line_no}: invalid sensitive flag '{sensitive}'");
        };
        if specs.iter().any(|s| s.name == name) {
            bail!("line {line_no}: duplicate material '{name}'");
        }
        specs.push(MaterialSpec {
            name: name.to_string(),
            formula: formula.to_string(),
            density,
            sensitive,
        });
    }
    Ok(specs)
}
