use std::cmp::Ordering;

use crate::models::{Nucleotide, VariantSpecificityResult};

/// Metric used to order candidates, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RankMetric {
    #[default]
    CombinedScore,
    SpecificityRatio,
    Selectivity,
    TargetConfidence,
}

impl RankMetric {
    pub fn value(self, r: &VariantSpecificityResult) -> f64 {
        match self {
            RankMetric::CombinedScore => r.combined_score,
            RankMetric::SpecificityRatio => r.specificity_ratio_conf,
            RankMetric::Selectivity => r.selectivity_conf,
            RankMetric::TargetConfidence => r.target_confidence,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RankMetric::CombinedScore => "Combined Score",
            RankMetric::SpecificityRatio => "Specificity Ratio",
            RankMetric::Selectivity => "Selectivity",
            RankMetric::TargetConfidence => "Target Confidence",
        }
    }
}

fn descending(metric: RankMetric, a: &VariantSpecificityResult, b: &VariantSpecificityResult) -> Ordering {
    metric
        .value(b)
        .partial_cmp(&metric.value(a))
        .unwrap_or(Ordering::Equal)
}

/// Sorts candidates by `metric`, highest first. Ties keep their input order.
pub fn rank_candidates(
    mut results: Vec<VariantSpecificityResult>,
    metric: RankMetric,
) -> Vec<VariantSpecificityResult> {
    results.sort_by(|a, b| descending(metric, a, b));
    results
}

/// Candidates designed against `nucleotide`, ranked independently by `metric`.
pub fn rank_within_nucleotide(
    results: &[VariantSpecificityResult],
    nucleotide: Nucleotide,
    metric: RankMetric,
) -> Vec<&VariantSpecificityResult> {
    let mut group: Vec<&VariantSpecificityResult> = results
        .iter()
        .filter(|r| r.target_nucleotide == nucleotide)
        .collect();
    group.sort_by(|a, b| descending(metric, a, b));
    group
}

/// The first `n` entries of an already ranked list that target `nucleotide`.
pub fn top_for_nucleotide(
    ranked: &[VariantSpecificityResult],
    nucleotide: Nucleotide,
    n: usize,
) -> Vec<&VariantSpecificityResult> {
    ranked
        .iter()
        .filter(|r| r.target_nucleotide == nucleotide)
        .take(n)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct NucleotideSummary {
    pub nucleotide: Nucleotide,
    pub variants_tested: usize,
    pub best_specificity_ratio: f64,
    pub best_target_confidence: f64,
    pub mean_specificity_ratio: f64,
    pub best_variant_id: String,
    pub best_mutations: String,
    pub best_combined_score: f64,
}

/// Per target nucleotide summary over the ranked results.
/// Nucleotides without any scored variant are left out.
pub fn summarize_by_nucleotide(ranked: &[VariantSpecificityResult]) -> Vec<NucleotideSummary> {
    Nucleotide::ALL
        .into_iter()
        .filter_map(|nucleotide| {
            let group: Vec<&VariantSpecificityResult> = ranked
                .iter()
                .filter(|r| r.target_nucleotide == nucleotide)
                .collect();
            // first maximum wins, like the overall ranking
            let best = group.iter().copied().reduce(|best, r| {
                if r.combined_score > best.combined_score { r } else { best }
            })?;

            let ratios: Vec<f64> = group.iter().map(|r| r.specificity_ratio_conf).collect();
            Some(NucleotideSummary {
                nucleotide,
                variants_tested: group.len(),
                best_specificity_ratio: ratios.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                best_target_confidence: group
                    .iter()
                    .map(|r| r.target_confidence)
                    .fold(f64::NEG_INFINITY, f64::max),
                mean_specificity_ratio: ratios.iter().sum::<f64>() / ratios.len() as f64,
                best_variant_id: best.variant_id.clone(),
                best_mutations: best.mutations.clone(),
                best_combined_score: best.combined_score,
            })
        })
        .collect()
}
