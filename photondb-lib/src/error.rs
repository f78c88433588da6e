use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PhotonDbError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("format error at line {line}: {message}")]
    Format { line: usize, message: String },
    #[error("table for ZA {za} starting at line {line} has no end-of-table line")]
    MissingTerminator { za: u32, line: usize },
    #[error("element {atomic_number} has no {table} table")]
    MissingTable {
        atomic_number: u16,
        table: &'static str,
    },
    #[error("LIST record declares {expected} items but only {found} are present")]
    ListLength { expected: usize, found: usize },
    #[error("unknown element: {0}")]
    UnknownElement(String),
    #[error("unknown subshell: {0}")]
    UnknownShell(String),
    #[error("no atomic relaxation data for Z={0}")]
    MissingAtomicData(u16),
    #[error("constituent energy ranges do not overlap: [{lo}, {hi}]")]
    EmptyEnergyRange { lo: f64, hi: f64 },
    #[error("energy {energy} MeV out of range [{min}, {max}]")]
    EnergyOutOfRange { energy: f64, min: f64, max: f64 },
    #[error("invalid composition: {0}")]
    InvalidComposition(String),
    #[error("invalid chemical formula: {0}")]
    InvalidFormula(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("relaxation cascade for Z={atomic_number} shell {shell} does not terminate")]
    CascadeCycle { atomic_number: u16, shell: String },
}

pub type Result<T> = std::result::Result<T, PhotonDbError>;

impl PhotonDbError {
    pub(crate) fn format(line: usize, message: impl Into<String>) -> Self {
        PhotonDbError::Format {
            line,
            message: message.into(),
        }
    }
}
