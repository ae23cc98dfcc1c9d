//! Boltz YAML input files (one protein chain and one ligand chain).

use std::fs::File;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProteinChain {
    pub id: String,
    pub sequence: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msa: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LigandChain {
    pub id: String,
    pub smiles: String,
}

/// A `sequences` list entry; exactly one of the two chains is set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SequenceEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein: Option<ProteinChain>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ligand: Option<LigandChain>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoltzConfig {
    pub version: u32,
    pub sequences: Vec<SequenceEntry>,
}

impl BoltzConfig {
    /// Protein on chain A, ligand on chain B.
    pub fn protein_ligand(sequence: &str, smiles: &str) -> Self {
        Self {
            version: 1,
            sequences: vec![
                SequenceEntry {
                    protein: Some(ProteinChain {
                        id: "A".to_string(),
                        sequence: sequence.to_string(),
                        msa: None,
                    }),
                    ..Default::default()
                },
                SequenceEntry {
                    ligand: Some(LigandChain {
                        id: "B".to_string(),
                        smiles: smiles.to_string(),
                    }),
                    ..Default::default()
                },
            ],
        }
    }

    pub fn proteins_mut(&mut self) -> impl Iterator<Item = &mut ProteinChain> {
        self.sequences.iter_mut().filter_map(|s| s.protein.as_mut())
    }

    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path).with_context(|| format!("Cannot open config {}", path.display()))?;
        serde_yaml::from_reader(file).with_context(|| format!("Malformed config {}", path.display()))
    }

    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        let file = File::create(path).with_context(|| format!("Cannot create config {}", path.display()))?;
        serde_yaml::to_writer(file, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_layout_matches_boltz_input() {
        let config = BoltzConfig::protein_ligand("QVQL", "Cc1cn");
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.starts_with("version: 1\nsequences:\n- protein:\n    id: A\n    sequence: QVQL\n"));
        assert!(yaml.contains("- ligand:\n    id: B\n    smiles: Cc1cn\n"));
        assert!(!yaml.contains("msa"));
    }

    #[test]
    fn msa_path_is_written_once_set() {
        let mut config = BoltzConfig::protein_ligand("QVQL", "Cc1cn");
        for protein in config.proteins_mut() {
            protein.msa = Some("/tmp/msas/A.a3m".to_string());
        }
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("    msa: /tmp/msas/A.a3m\n"));
    }
}
