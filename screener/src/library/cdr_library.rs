//! Nucleotide-targeted CDR3 variant libraries.
//!
//! Each target nucleotide has a set of preferred residues per CDR3 position.
//! Variants are sampled from those preferences and every variant is paired
//! with all four nucleotides so a screen can measure specificity.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use anyhow::{bail, Context};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::data_handling::library_manifest::{
    save_manifest, ConfigEntry, LibraryManifest, StrategyRecord, Variant,
};
use crate::library::boltz_config::BoltzConfig;
use crate::models::Nucleotide;

/// VHH framework used as the wild type of every library.
pub const BASE_NANOBODY: &str = "QVQLVESGGGLVQPGGSLRLSCAASGFTFSSYAMSWVRQAPGKGLEWVSAISGSGGSTYYADSVKGRFTISRDNSKNTLYLQMNSLRAEDTAVYYCAKVSYLSTASSLDYWGQGTLVTVSS";

/// 0-indexed, half-open CDR spans of `BASE_NANOBODY`.
pub const CDR_REGIONS: [(&str, usize, usize); 3] = [("CDR1", 26, 35), ("CDR2", 50, 58), ("CDR3", 95, 102)];

/// Half-open CDR3 span of `BASE_NANOBODY`.
pub fn cdr3_span() -> (usize, usize) {
    let (_, start, end) = CDR_REGIONS[2];
    (start, end)
}

/// Per-position mutation probability.
pub const MUTATION_RATE: f64 = 0.6;

pub struct DesignStrategy {
    pub target: &'static str,
    pub rationale: &'static str,
    pub cdr3_mutations: &'static [(usize, &'static [char])],
}

const DATP: DesignStrategy = DesignStrategy {
    target: "Adenine - 6-amino group, purine",
    cdr3_mutations: &[
        (95, &['N', 'Q', 'S']),
        (96, &['Y', 'F', 'W']),
        (97, &['R', 'K']),
        (98, &['L', 'I', 'V']),
        (99, &['S', 'T', 'N']),
        (100, &['D', 'E']),
    ],
    rationale: "Target 6-amino group (unique to A) with H-bond acceptors (N,Q,S). Use aromatics for stacking. Accommodate purine size.",
};

const DGTP: DesignStrategy = DesignStrategy {
    target: "Guanine - 6-keto, N1-H donor, purine",
    cdr3_mutations: &[
        (95, &['Q', 'N', 'T']),
        (96, &['F', 'Y', 'W']),
        (97, &['K', 'R']),
        (98, &['I', 'L', 'M']),
        (99, &['N', 'Q', 'S']),
        (100, &['S', 'T']),
    ],
    rationale: "Target 6-keto (unique to G) with H-bond donors (N,Q). Recognize N1-H. Purine-sized pocket.",
};

const DCTP: DesignStrategy = DesignStrategy {
    target: "Cytosine - 4-amino, pyrimidine (smaller)",
    cdr3_mutations: &[
        (95, &['S', 'T', 'N']),
        (96, &['F', 'Y']),
        (97, &['R', 'K', 'H']),
        (98, &['A', 'V']),
        (99, &['Q', 'N']),
        (100, &['D', 'E']),
    ],
    rationale: "Tighter pocket for smaller pyrimidine. Target 4-amino with H-bond acceptors. Exclude purines by size.",
};

const DTTP: DesignStrategy = DesignStrategy {
    target: "Thymine - 5-methyl, 4-keto, pyrimidine",
    cdr3_mutations: &[
        (95, &['Q', 'N', 'T']),
        (96, &['F', 'Y']),
        (97, &['K', 'R']),
        (98, &['V', 'I', 'L']),
        (99, &['A', 'G']),
        (100, &['S', 'T']),
    ],
    rationale: "Hydrophobic pocket for 5-methyl group (unique to T). H-bond donor for 4-keto. Pyrimidine-sized pocket.",
};

pub fn design_strategy(nucleotide: Nucleotide) -> &'static DesignStrategy {
    match nucleotide {
        Nucleotide::DAtp => &DATP,
        Nucleotide::DGtp => &DGTP,
        Nucleotide::DCtp => &DCTP,
        Nucleotide::DTtp => &DTTP,
    }
}

fn strategy_records() -> BTreeMap<Nucleotide, StrategyRecord> {
    Nucleotide::ALL
        .into_iter()
        .map(|n| {
            let s = design_strategy(n);
            let record = StrategyRecord {
                target: s.target.to_string(),
                rationale: s.rationale.to_string(),
                cdr3_mutations: s
                    .cdr3_mutations
                    .iter()
                    .map(|(pos, options)| (*pos, options.iter().collect()))
                    .collect(),
            };
            (n, record)
        })
        .collect()
}

/// Samples up to `num_variants` variants for `target`, the wild type first.
///
/// Sampled variants without any effective substitution are dropped, so the
/// result may be shorter than `num_variants`. Identical RNG state gives an
/// identical library.
pub fn generate_variants<R: Rng + ?Sized>(
    base_seq: &str,
    target: Nucleotide,
    num_variants: usize,
    rng: &mut R,
) -> anyhow::Result<Vec<Variant>> {
    let strategy = design_strategy(target);
    let base: Vec<char> = base_seq.chars().collect();
    let (cdr3_start, cdr3_end) = cdr3_span();
    if base.len() < cdr3_end {
        bail!("Scaffold of length {} ends before CDR3 ({}-{})", base.len(), cdr3_start + 1, cdr3_end);
    }
    if let Some((pos, _)) = strategy
        .cdr3_mutations
        .iter()
        .find(|(pos, _)| !(cdr3_start..cdr3_end).contains(pos))
    {
        bail!("Design position {} lies outside CDR3", pos + 1);
    }

    let mut variants = vec![Variant {
        id: format!("{}_variant_000_WT", target),
        sequence: base_seq.to_string(),
        mutations: "WT".to_string(),
        target,
        strategy: "Wild-type control".to_string(),
    }];

    for i in 1..num_variants {
        let mut residues = base.clone();
        let mut mutation_list = Vec::new();

        for &(pos, options) in strategy.cdr3_mutations {
            if rng.gen::<f64>() >= MUTATION_RATE {
                continue;
            }
            let original = base[pos];
            if let Some(&new) = options.choose(rng) {
                if new != original {
                    residues[pos] = new;
                    mutation_list.push(format!("{}{}{}", original, pos + 1, new));
                }
            }
        }

        if mutation_list.is_empty() {
            continue;
        }
        variants.push(Variant {
            id: format!("{}_variant_{:03}", target, i),
            sequence: residues.into_iter().collect(),
            mutations: mutation_list.join(","),
            target,
            strategy: strategy.rationale.to_string(),
        });
    }
    Ok(variants)
}

/// Writes one Boltz config per (variant, nucleotide) pair into `configs_dir`.
pub fn create_config_files(variants: &[Variant], configs_dir: &Path) -> anyhow::Result<Vec<ConfigEntry>> {
    std::fs::create_dir_all(configs_dir)
        .with_context(|| format!("Failed to create {}", configs_dir.display()))?;

    let mut configs = Vec::with_capacity(variants.len() * Nucleotide::ALL.len());
    for variant in variants {
        for test in Nucleotide::ALL {
            let config_file = configs_dir.join(format!("{}_vs_{}.yaml", variant.id, test));
            BoltzConfig::protein_ligand(&variant.sequence, test.smiles()).write(&config_file)?;

            configs.push(ConfigEntry {
                config_file: config_file.display().to_string(),
                variant_id: variant.id.clone(),
                target_nucleotide: variant.target,
                test_nucleotide: test,
                mutations: variant.mutations.clone(),
                is_target: test == variant.target,
            });
        }
    }
    Ok(configs)
}

pub fn library_summary(manifest: &LibraryManifest) -> String {
    let rule = "=".repeat(80);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}\nNUCLEOTIDE-SPECIFIC NANOBODY LIBRARY\n{rule}\n");
    let _ = writeln!(out, "Total variants: {}", manifest.library_size);
    let _ = writeln!(out, "Total predictions: {}", manifest.total_predictions);
    let _ = writeln!(out, "Predictions per variant: 4 (all nucleotides)\n");

    for nucleotide in Nucleotide::ALL {
        let group: Vec<&Variant> = manifest.variants.iter().filter(|v| v.target == nucleotide).collect();
        let _ = writeln!(out, "\n{} Variants: {}\n{}", nucleotide, group.len(), "-".repeat(80));
        let _ = writeln!(out, "Strategy: {}\n", design_strategy(nucleotide).rationale);
        for v in group.iter().take(5) {
            let _ = writeln!(out, "  {}: {}", v.id, v.mutations);
        }
        if group.len() > 5 {
            let _ = writeln!(out, "  ... and {} more", group.len() - 5);
        }
    }
    out
}

/// Generates the full library under `output_dir`: configs, manifest and summary.
pub fn generate_library(
    output_dir: &Path,
    variants_per_target: usize,
    seed: Option<u64>,
) -> anyhow::Result<LibraryManifest> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let mut rng = match seed {
        Some(seed) => {
            info!("Using random seed: {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    let mut variants = Vec::new();
    for nucleotide in Nucleotide::ALL {
        info!("Generating {} variants for {}", variants_per_target, nucleotide);
        info!("  Strategy: {}", design_strategy(nucleotide).rationale);
        let generated = generate_variants(BASE_NANOBODY, nucleotide, variants_per_target, &mut rng)?;
        info!("  Generated {} variants", generated.len());
        variants.extend(generated);
    }

    let configs = create_config_files(&variants, &output_dir.join("configs"))?;
    info!("Created {} config files", configs.len());

    let manifest = LibraryManifest {
        library_size: variants.len(),
        total_predictions: configs.len(),
        nucleotides: Nucleotide::ALL.to_vec(),
        variants,
        configs,
        design_strategies: strategy_records(),
    };
    save_manifest(output_dir, &manifest)?;

    let summary_file = output_dir.join("library_summary.txt");
    std::fs::write(&summary_file, library_summary(&manifest))
        .with_context(|| format!("Failed to write {}", summary_file.display()))?;
    info!("Library summary saved: {}", summary_file.display());
    Ok(manifest)
}
