//! Follow-up stages that start from the winning binders of an analysis:
//! catcher sensors with their prediction inputs, and ChimeraX scripts.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::analysis::ranking::RankMetric;
use crate::analysis::specificity_analysis_integration::rank_screening_results;
use crate::data_handling::library_manifest::load_manifest;
use crate::library::cdr_library::BASE_NANOBODY;
use crate::library::chimera_prediction::prepare_construct;
use crate::library::chimerax::{generate_chimerax_scripts, ScriptLayout};
use crate::library::optogenetic::{build_catcher_sensors, SensorSet};
use crate::library::winners::{binder_sequence, winning_binders, WinningBinder};

pub fn load_winners(results_file: &Path, library_dir: &Path, metric: RankMetric) -> anyhow::Result<Vec<WinningBinder>> {
    let ranked = rank_screening_results(results_file, metric)?;
    let manifest = load_manifest(library_dir)?;
    Ok(winning_binders(&ranked, &manifest))
}

/// Sequence and construct name for `chimeras`: a library variant when
/// `variant_id` is given, else the raw sequence, else the base nanobody.
pub fn chimera_input(
    sequence: Option<String>,
    variant_id: Option<&str>,
    library_dir: &Path,
    name: Option<String>,
) -> anyhow::Result<(String, String)> {
    match variant_id {
        Some(id) => {
            let manifest = load_manifest(library_dir)?;
            let sequence = binder_sequence(&manifest, id)?;
            info!("Using library variant {} ({} aa)", id, sequence.len());
            Ok((sequence, name.unwrap_or_else(|| id.to_string())))
        }
        None => Ok((
            sequence.unwrap_or_else(|| BASE_NANOBODY.to_string()),
            name.unwrap_or_else(|| "nanobody".to_string()),
        )),
    }
}

/// Builds the catcher sensors of every winning binder into `output_dir` and a
/// Boltz input per sensor, with its own nucleotide, into `output_dir/predictions`.
pub fn run_sensor_design(
    results_file: &Path,
    library_dir: &Path,
    output_dir: &Path,
    metric: RankMetric,
    position: usize,
    linker: &str,
) -> anyhow::Result<Vec<SensorSet>> {
    let winners = load_winners(results_file, library_dir, metric)?;
    for w in &winners {
        info!("{}: {} (combined score {:.4})", w.nucleotide, w.variant_id, w.combined_score);
    }
    let (sets, files) = build_catcher_sensors(&winners, position, linker, output_dir)?;

    let predictions_dir = output_dir.join("predictions");
    for set in &sets {
        let prepared = prepare_construct(&set.sensor, &predictions_dir)?;
        if let Some(regions) = &prepared.regions {
            info!("  Region map: {}", regions.display());
        }
    }
    info!("{} constructs, {} prediction inputs", files.len(), sets.len());
    Ok(sets)
}

pub fn run_visualization(
    results_file: &Path,
    library_dir: &Path,
    output_dir: &Path,
    metric: RankMetric,
    layout: &ScriptLayout,
) -> anyhow::Result<Vec<PathBuf>> {
    let winners = load_winners(results_file, library_dir, metric)?;
    let results_dir = results_file.parent().unwrap_or_else(|| Path::new("."));
    generate_chimerax_scripts(&winners, results_dir, output_dir, layout)
}
