//! Structure prediction inputs for fusion constructs: a Boltz config with the
//! nucleotide ligand, a protein-only FASTA and a region map for viewers.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use tracing::info;

use crate::library::boltz_config::BoltzConfig;
use crate::library::optogenetic::{normalize_sequence, Construct, Region};
use crate::models::Nucleotide;

#[derive(Debug, Clone, PartialEq)]
pub struct PreparedChimera {
    pub boltz_config: PathBuf,
    pub fasta: PathBuf,
    /// Only written when the construct layout is known.
    pub regions: Option<PathBuf>,
}

/// First record of a FASTA file as `(header, sequence)`.
pub fn read_fasta_record(path: &Path) -> anyhow::Result<(String, String)> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let Some(header) = lines.next().and_then(|l| l.strip_prefix('>')) else {
        bail!("{} does not start with a FASTA header", path.display());
    };
    let sequence: String = lines.take_while(|l| !l.starts_with('>')).collect();
    if sequence.is_empty() {
        bail!("{} has no sequence for {}", path.display(), header);
    }
    Ok((header.to_string(), normalize_sequence(&sequence)?))
}

/// `dATP_Dronpa_A_Catcher_sensor (note)` -> `dATP_Dronpa_A_Catcher`.
pub fn chimera_name(header: &str) -> String {
    let id = header.split_whitespace().next().unwrap_or(header);
    id.strip_suffix("_sensor").unwrap_or(id).to_string()
}

/// Writes `{name}_boltz.yaml`, `{name}_alphafold.fasta` and, for non-empty
/// `regions`, `{name}_regions.json` into `output_dir`.
pub fn prepare_chimera_prediction(
    name: &str,
    sequence: &str,
    nucleotide: Nucleotide,
    regions: &[Region],
    output_dir: &Path,
) -> anyhow::Result<PreparedChimera> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    info!("Preparing {} with {} ({} aa)", name, nucleotide, sequence.len());

    let boltz_config = output_dir.join(format!("{name}_boltz.yaml"));
    BoltzConfig::protein_ligand(sequence, nucleotide.smiles()).write(&boltz_config)?;

    let fasta = output_dir.join(format!("{name}_alphafold.fasta"));
    std::fs::write(&fasta, format!(">{name}\n{sequence}\n"))
        .with_context(|| format!("Failed to write {}", fasta.display()))?;

    let regions = if regions.is_empty() {
        None
    } else {
        let path = output_dir.join(format!("{name}_regions.json"));
        let file = File::create(&path).with_context(|| format!("Cannot create {}", path.display()))?;
        serde_json::to_writer_pretty(file, regions)?;
        for r in regions {
            info!("  {} ({}-{}): {}", r.name, r.start, r.end, r.color);
        }
        Some(path)
    };

    info!("Boltz input: {}", boltz_config.display());
    Ok(PreparedChimera { boltz_config, fasta, regions })
}

pub fn prepare_construct(construct: &Construct, output_dir: &Path) -> anyhow::Result<PreparedChimera> {
    prepare_chimera_prediction(
        &chimera_name(&construct.name),
        &construct.sequence,
        construct.nucleotide,
        &construct.regions,
        output_dir,
    )
}
