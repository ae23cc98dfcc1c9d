//! Query-only A3M alignments so Boltz can run without an MSA server.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{info, warn};

use crate::data_handling::library_manifest::load_manifest;
use crate::library::boltz_config::BoltzConfig;

pub const CONFIGS_WITH_MSAS: &str = "configs_with_msas";

pub fn write_minimal_msa(sequence: &str, output_file: &Path, seq_id: &str) -> anyhow::Result<()> {
    std::fs::write(output_file, format!(">{}\n{}\n", seq_id, sequence))
        .with_context(|| format!("Failed to write MSA {}", output_file.display()))
}

/// Writes `msas/{variant}/A.a3m` for every manifest variant and copies each
/// config into `configs_with_msas/` with the protein MSA path filled in.
/// Returns the number of configs written.
pub fn generate_library_msas(library_dir: &Path) -> anyhow::Result<usize> {
    let manifest = load_manifest(library_dir)?;
    info!("Found {} variants", manifest.variants.len());

    let msa_dir = library_dir.join("msas");
    for variant in &manifest.variants {
        let variant_dir = msa_dir.join(&variant.id);
        std::fs::create_dir_all(&variant_dir)
            .with_context(|| format!("Failed to create {}", variant_dir.display()))?;
        write_minimal_msa(&variant.sequence, &variant_dir.join("A.a3m"), "A")?;
    }
    info!("Generated {} MSAs in {}", manifest.variants.len(), msa_dir.display());

    let out_dir = library_dir.join(CONFIGS_WITH_MSAS);
    std::fs::create_dir_all(&out_dir).with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let mut updated = 0;
    for entry in &manifest.configs {
        let source = PathBuf::from(&entry.config_file);
        let Some(name) = source.file_name() else {
            warn!("Config entry without file name: {}", entry.config_file);
            continue;
        };
        let msa_file = msa_dir.join(&entry.variant_id).join("A.a3m");
        if !msa_file.exists() {
            warn!("No MSA for variant {}", entry.variant_id);
            continue;
        }
        let msa_path = std::fs::canonicalize(&msa_file)
            .with_context(|| format!("Cannot resolve MSA path {}", msa_file.display()))?;

        let mut config = BoltzConfig::read(&source)?;
        for protein in config.proteins_mut() {
            protein.msa = Some(msa_path.display().to_string());
        }
        config.write(&out_dir.join(name))?;
        updated += 1;
    }
    info!("Updated {} config files in {}", updated, out_dir.display());
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::cdr_library::generate_library;

    #[test]
    fn msa_is_query_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("A.a3m");
        write_minimal_msa("QVQL", &path, "A").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), ">A\nQVQL\n");
    }

    #[test]
    fn configs_point_at_their_msa() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = generate_library(dir.path(), 2, Some(11)).unwrap();
        let updated = generate_library_msas(dir.path()).unwrap();
        assert_eq!(updated, manifest.configs.len());

        let entry = &manifest.configs[0];
        let name = Path::new(&entry.config_file).file_name().unwrap();
        let mut config = BoltzConfig::read(&dir.path().join(CONFIGS_WITH_MSAS).join(name)).unwrap();
        let msa = config.proteins_mut().next().unwrap().msa.clone().unwrap();
        assert!(msa.ends_with(&format!("{}/A.a3m", entry.variant_id)));
        assert!(Path::new(&msa).is_absolute());
    }
}
