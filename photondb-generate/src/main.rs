mod materials_list;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use photondb::{
    AtomicDb, CascadeConfig, MaterialTable, PhotonDb, PhysicsFile, PhysicsInfo,
    material_emissions,
};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use materials_list::{MaterialSpec, parse_materials_list};

#[derive(Parser)]
#[command(
    name = "photondb-generate",
    about = "Build the simulator physics file from EPDL and EADL"
)]
struct Cli {
    /// EPDL file (text tables)
    #[arg(long)]
    epdl: PathBuf,
    /// EADL file (ENDF-6)
    #[arg(long)]
    eadl: PathBuf,
    /// EPDL in ENDF-6 form, for subshell photoionization cross sections
    #[arg(long)]
    epdl_endf: Option<PathBuf>,
    /// Materials list: `name formula density sensitive` per line
    #[arg(long)]
    materials: PathBuf,
    /// JSON file overriding the energy range and cascade parameters
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(short, long, default_value = "GrayPhysics.json")]
    output: PathBuf,
    /// Also write one attenuation table per material into this directory
    #[arg(long)]
    table_dir: Option<PathBuf>,
}

/// Overridable generation parameters. Energies of the range are in MeV.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct GenerateConfig {
    energy_lo: f64,
    energy_hi: f64,
    cascade: CascadeConfig,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        GenerateConfig {
            energy_lo: 0.001,
            energy_hi: 1.5,
            cascade: CascadeConfig::default(),
        }
    }
}

fn read_to_string(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<GenerateConfig> {
    let Some(path) = path else {
        return Ok(GenerateConfig::default());
    };
    let config: GenerateConfig = serde_json::from_str(&read_to_string(path)?)
        .with_context(|| format!("parsing {}", path.display()))?;
    config.cascade.validate()?;
    Ok(config)
}

fn load_atomic(eadl: &Path, epdl_endf: Option<&Path>) -> Result<AtomicDb> {
    let mut atomic = AtomicDb::load(eadl)?;
    match epdl_endf {
        Some(path) => atomic.merge(AtomicDb::load(path)?),
        None => warn!("no ENDF-6 EPDL given; materials get no fluorescence lines"),
    }
    Ok(atomic)
}

fn build_table(
    db: &PhotonDb,
    atomic: &AtomicDb,
    config: &GenerateConfig,
    spec: &MaterialSpec,
    index: u32,
) -> Result<MaterialTable> {
    let material =
        db.material_by_formula(&spec.formula, Some(config.energy_lo), Some(config.energy_hi))?;
    let emissions = material_emissions(atomic, &material.composition, &config.cascade)?;
    info!(
        material = %spec.name,
        z_eff = material.z_eff,
        lines = emissions.lines().len(),
        "built material"
    );
    Ok(MaterialTable::new(&material, index, spec.density, spec.sensitive).with_emissions(&emissions))
}

/// Plain-text attenuation table: energy (MeV) and linear attenuation (1/cm)
/// for photoelectric, incoherent and coherent scattering.
fn write_attenuation_table(dir: &Path, spec: &MaterialSpec, table: &MaterialTable) -> Result<()> {
    let path = dir.join(format!("{}.dat", spec.name));
    let mut out = BufWriter::new(
        File::create(&path).with_context(|| format!("creating {}", path.display()))?,
    );
    writeln!(out, "# {} {} {}", spec.name, spec.formula, spec.density)?;
    for (i, &energy) in table.energy.iter().enumerate() {
        writeln!(
            out,
            "{energy:.6e} {:.6e} {:.6e} {:.6e}",
            table.matten_photoelectric[i] * spec.density,
            table.matten_compton[i] * spec.density,
            table.matten_rayleigh[i] * spec.density,
        )?;
    }
    out.flush()?;
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let specs = parse_materials_list(&read_to_string(&cli.materials)?)
        .with_context(|| format!("parsing {}", cli.materials.display()))?;
    let db = PhotonDb::load(&cli.epdl)?;
    let atomic = load_atomic(&cli.eadl, cli.epdl_endf.as_deref())?;
    if let Some(dir) = &cli.table_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let mut materials = BTreeMap::new();
    for (index, spec) in specs.iter().enumerate() {
        let table = build_table(&db, &atomic, &config, spec, index as u32)
            .with_context(|| format!("material '{}' ({})", spec.name, spec.formula))?;
        if let Some(dir) = &cli.table_dir {
            write_attenuation_table(dir, spec, &table)?;
        }
        materials.insert(spec.name.clone(), table);
    }

    let created = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let physics = PhysicsFile {
        materials,
        info: PhysicsInfo {
            created,
            generator: format!("photondb-generate {}", env!("CARGO_PKG_VERSION")),
            materials_source: cli.materials.display().to_string(),
        },
    };
    let file = File::create(&cli.output)
        .with_context(|| format!("creating {}", cli.output.display()))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, &physics)?;
    out.flush()?;
    info!(
        materials = physics.materials.len(),
        output = %cli.output.display(),
        "wrote physics file"
    );
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    run(Cli::parse())
}
