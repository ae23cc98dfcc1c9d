use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::Nucleotide;

pub const MANIFEST_FILE: &str = "library_manifest.yaml";

/// A designed nanobody sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    pub sequence: String,
    pub mutations: String,
    pub target: Nucleotide,
    pub strategy: String,
}

/// One Boltz input: a variant paired with a test nucleotide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub config_file: String,
    pub variant_id: String,
    pub target_nucleotide: Nucleotide,
    pub test_nucleotide: Nucleotide,
    pub mutations: String,
    pub is_target: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyRecord {
    pub target: String,
    pub rationale: String,
    /// 0-indexed scaffold position -> preferred residues
    pub cdr3_mutations: BTreeMap<usize, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryManifest {
    pub library_size: usize,
    pub total_predictions: usize,
    pub nucleotides: Vec<Nucleotide>,
    pub variants: Vec<Variant>,
    pub configs: Vec<ConfigEntry>,
    #[serde(default)]
    pub design_strategies: BTreeMap<Nucleotide, StrategyRecord>,
}

impl LibraryManifest {
    pub fn variant(&self, id: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }
}

pub fn load_manifest(library_dir: &Path) -> anyhow::Result<LibraryManifest> {
    let path = library_dir.join(MANIFEST_FILE);
    info!("Loading library manifest {}", path.display());
    let file = File::open(&path)
        .with_context(|| format!("Manifest not found: {} (generate the library first)", path.display()))?;
    serde_yaml::from_reader(file).with_context(|| format!("Malformed manifest {}", path.display()))
}

pub fn save_manifest(library_dir: &Path, manifest: &LibraryManifest) -> anyhow::Result<()> {
    let path = library_dir.join(MANIFEST_FILE);
    let file = File::create(&path).with_context(|| format!("Cannot create {}", path.display()))?;
    serde_yaml::to_writer(file, manifest)?;
    info!("Library manifest saved: {}", path.display());
    Ok(())
}
