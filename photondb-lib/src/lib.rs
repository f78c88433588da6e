#[cfg(feature = "anomalous")]
pub mod anomalous;
pub mod cascade;
pub mod chemparser;
pub mod constants;
pub mod db;
pub mod eadl;
pub mod elements;
pub mod endf;
pub mod epdl;
pub mod error;
pub mod export;
pub mod grid;
pub mod interp;
pub mod materials;
pub mod scattering;

pub use cascade::{
    BindingEnergyEmissions, CascadeConfig, Emission, MaterialEmissions, ShellCascade,
    material_emissions, resolve_shell_cascades, shell_probabilities,
};
pub use db::{Attenuation, PhotonDb};
pub use eadl::AtomicDb;
pub use error::{PhotonDbError, Result};
pub use export::{FluorescenceLine, MaterialTable, PhysicsFile, PhysicsInfo};
pub use materials::Material;
pub use photondb_data;
