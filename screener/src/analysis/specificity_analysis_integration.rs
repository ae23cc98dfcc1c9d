//! Loads a screening results document, scores and ranks every variant,
//! and writes the analysis reports.

use std::path::Path;

use tracing::info;

use crate::analysis::ranking::{rank_candidates, rank_within_nucleotide, summarize_by_nucleotide, RankMetric};
use crate::analysis::report::{log_summary, log_top_candidates, save_analysis_results};
use crate::analysis::specificity::calculate_specificity_scores;
use crate::data_handling::screening_results::load_screening_results;
use crate::models::{Nucleotide, VariantSpecificityResult};

/// Scored and ranked variants of a screening results document, without
/// writing any report.
pub fn rank_screening_results(results_file: &Path, metric: RankMetric) -> anyhow::Result<Vec<VariantSpecificityResult>> {
    info!("Loading results from {}", results_file.display());
    let screening = load_screening_results(results_file)?;
    info!("Total predictions: {}", screening.total_predictions);
    info!("Successful: {}", screening.successful);

    let outcome = calculate_specificity_scores(&screening.results);
    info!("Variants with complete data: {}", outcome.scored.len());
    Ok(rank_candidates(outcome.scored, metric))
}

pub fn run_specificity_analysis(
    results_file: &Path,
    output_dir: &Path,
    top_n: usize,
    metric: RankMetric,
) -> anyhow::Result<Vec<VariantSpecificityResult>> {
    // ── score & rank ─────────────────────────────────────────────────────────
    let ranked = rank_screening_results(results_file, metric)?;

    log_top_candidates(&ranked, metric, top_n);
    log_summary(&summarize_by_nucleotide(&ranked));
    for nucleotide in Nucleotide::ALL {
        if let Some(best) = rank_within_nucleotide(&ranked, nucleotide, RankMetric::SpecificityRatio).first() {
            info!(
                "Most specific {} binder: {} ({:.2}x)",
                nucleotide, best.variant_id, best.specificity_ratio_conf
            );
        }
    }

    // ── persist ──────────────────────────────────────────────────────────────
    save_analysis_results(&ranked, metric, output_dir)?;
    info!("Specificity analysis complete.");
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::specificity::tests::variant;
    use crate::models::ScreeningResults;

    #[test]
    fn analyzes_results_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut results = variant("dGTP_variant_001", Nucleotide::DGtp, 0.6, [0.2, 0.2, 0.2]);
        results.extend(variant("dGTP_variant_002", Nucleotide::DGtp, 0.9, [0.3, 0.4, 0.3]));
        let mut incomplete = variant("dCTP_variant_001", Nucleotide::DCtp, 0.9, [0.1, 0.1, 0.1]);
        incomplete.truncate(2);
        results.extend(incomplete);

        let doc = ScreeningResults {
            timestamp: "2025-01-01T00:00:00".to_string(),
            total_predictions: 10,
            successful: 10,
            failed: 0,
            total_time_seconds: 1.0,
            mode: "quick".to_string(),
            results,
        };
        let results_file = dir.path().join("screening_results.json");
        std::fs::write(&results_file, serde_json::to_string_pretty(&doc).unwrap()).unwrap();

        let out = dir.path().join("analysis");
        let ranked = run_specificity_analysis(&results_file, &out, 10, RankMetric::CombinedScore).unwrap();
        let ids: Vec<&str> = ranked.iter().map(|r| r.variant_id.as_str()).collect();
        assert_eq!(ids, vec!["dGTP_variant_002", "dGTP_variant_001"]);
        assert!(out.join("specificity_report.txt").exists());

        let by_target = run_specificity_analysis(&results_file, &out, 10, RankMetric::TargetConfidence).unwrap();
        assert_eq!(by_target[0].variant_id, "dGTP_variant_002");
    }
}
