//! Element symbols and names for Z = 1..=118.

use crate::error::{PhotonDbError, Result};

pub const MAX_ATOMIC_NUMBER: u16 = 118;

const SYMBOLS: [&str; 118] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh",
    "Fl", "Mc", "Lv", "Ts", "Og",
];

const NAMES: [&str; 118] = [
    "hydrogen", "helium", "lithium", "beryllium", "boron", "carbon", "nitrogen", "oxygen",
    "fluorine", "neon", "sodium", "magnesium", "aluminum", "silicon", "phosphorus",
    "sulfur", "chlorine", "argon", "potassium", "calcium", "scandium", "titanium", "vanadium",
    "chromium", "manganese", "iron", "cobalt", "nickel", "copper", "zinc", "gallium", "germanium",
    "arsenic", "selenium", "bromine", "krypton", "rubidium", "strontium", "yttrium", "zirconium",
    "niobium", "molybdenum", "technetium", "ruthenium", "rhodium", "palladium", "silver",
    "cadmium", "indium", "tin", "antimony", "tellurium", "iodine", "xenon", "cesium", "barium",
    "lanthanum", "cerium", "praseodymium", "neodymium", "promethium", "samarium", "europium",
    "gadolinium", "terbium", "dysprosium", "holmium", "erbium", "thulium", "ytterbium", "lutetium",
    "hafnium", "tantalum", "tungsten", "rhenium", "osmium", "iridium", "platinum", "gold",
    "mercury", "thallium", "lead", "bismuth", "polonium", "astatine", "radon", "francium",
    "radium", "actinium", "thorium", "protactinium", "uranium", "neptunium", "plutonium",
    "americium", "curium", "berkelium", "californium", "einsteinium", "fermium", "mendelevium",
    "nobelium", "lawrencium", "rutherfordium", "dubnium", "seaborgium", "bohrium", "hassium",
    "meitnerium", "darmstadtium", "roentgenium", "copernicium", "nihonium", "flerovium",
    "moscovium", "livermorium", "tennessine", "oganesson",
];

/// British spellings accepted in addition to `NAMES`.
const NAME_ALIASES: [(&str, u16); 3] = [("aluminium", 13), ("caesium", 55), ("sulphur", 16)];

pub fn symbol(atomic_number: u16) -> Option<&'static str> {
    SYMBOLS.get((atomic_number as usize).checked_sub(1)?).copied()
}

pub fn name(atomic_number: u16) -> Option<&'static str> {
    NAMES.get((atomic_number as usize).checked_sub(1)?).copied()
}

/// True for an exactly-cased element symbol, e.g. `Co` but not `CO` or `co`.
pub fn is_symbol(sym: &str) -> bool {
    SYMBOLS.contains(&sym)
}

/// Resolve an element identifier (atomic number, symbol, or name) to Z.
pub fn atomic_number(element: &str) -> Result<u16> {
    let element = element.trim();
    if let Ok(z) = element.parse::<u16>() {
        if (1..=MAX_ATOMIC_NUMBER).contains(&z) {
            return Ok(z);
        }
        return Err(PhotonDbError::UnknownElement(element.to_string()));
    }
    let found = SYMBOLS
        .iter()
        .position(|s| s.eq_ignore_ascii_case(element))
        .or_else(|| NAMES.iter().position(|n| n.eq_ignore_ascii_case(element)))
        .map(|i| i as u16 + 1)
        .or_else(|| {
            NAME_ALIASES
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(element))
                .map(|&(_, z)| z)
        });
    found.ok_or_else(|| PhotonDbError::UnknownElement(element.to_string()))
}
