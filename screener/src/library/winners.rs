//! The best ranked binder per target nucleotide, joined with its designed
//! sequence from the library manifest.

use anyhow::Context;
use tracing::{info, warn};

use crate::analysis::ranking::top_for_nucleotide;
use crate::data_handling::library_manifest::LibraryManifest;
use crate::models::{Nucleotide, VariantSpecificityResult};

#[derive(Debug, Clone, PartialEq)]
pub struct WinningBinder {
    pub variant_id: String,
    pub nucleotide: Nucleotide,
    pub mutations: String,
    pub sequence: String,
    pub combined_score: f64,
}

/// Sequence of `variant_id` as designed in the library.
pub fn binder_sequence(manifest: &LibraryManifest, variant_id: &str) -> anyhow::Result<String> {
    manifest
        .variant(variant_id)
        .map(|v| v.sequence.clone())
        .with_context(|| format!("Variant {} is not part of the library manifest", variant_id))
}

/// First entry per nucleotide of an already ranked list. Nucleotides without
/// a scored variant, and variants missing from the manifest, are skipped.
pub fn winning_binders(ranked: &[VariantSpecificityResult], manifest: &LibraryManifest) -> Vec<WinningBinder> {
    let mut winners = Vec::new();
    for nucleotide in Nucleotide::ALL {
        let Some(best) = top_for_nucleotide(ranked, nucleotide, 1).into_iter().next() else {
            warn!("No scored {} binder", nucleotide);
            continue;
        };
        let Some(variant) = manifest.variant(&best.variant_id) else {
            warn!("Winning {} binder {} is missing from the manifest", nucleotide, best.variant_id);
            continue;
        };
        info!("Winning {} binder: {} ({})", nucleotide, best.variant_id, best.mutations);
        winners.push(WinningBinder {
            variant_id: best.variant_id.clone(),
            nucleotide,
            mutations: best.mutations.clone(),
            sequence: variant.sequence.clone(),
            combined_score: best.combined_score,
        });
    }
    winners
}
