//! Specificity scoring of screened variants.
//!
//! Every variant is predicted against all four nucleotides. Only variants with
//! exactly one successful prediction per nucleotide are scored; everything else
//! is reported as skipped and never produces a partial score.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::models::{ConfidenceMetrics, Nucleotide, PredictionRecord, VariantSpecificityResult};

/// Why a variant was left out of scoring.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// No successful prediction for these test nucleotides.
    Incomplete { missing: Vec<Nucleotide> },
    /// More than one successful prediction for the same test nucleotide.
    DuplicateTest { nucleotide: Nucleotide },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedVariant {
    pub variant_id: String,
    pub reason: SkipReason,
}

/// Scored variants in first-seen input order plus the variants that failed the gate.
#[derive(Debug, Clone, Default)]
pub struct ScoringOutcome {
    pub scored: Vec<VariantSpecificityResult>,
    pub skipped: Vec<SkippedVariant>,
}

/// Records of one variant, keyed by test nucleotide.
struct VariantPartition<'a> {
    variant_id: &'a str,
    target_nucleotide: Nucleotide,
    mutations: &'a str,
    slots: [Option<ConfidenceMetrics>; 4],
    duplicate: Option<Nucleotide>,
}

impl<'a> VariantPartition<'a> {
    fn new(first: &'a PredictionRecord) -> Self {
        Self {
            variant_id: &first.variant_id,
            target_nucleotide: first.target_nucleotide,
            mutations: &first.mutations,
            slots: [None; 4],
            duplicate: None,
        }
    }

    fn insert(&mut self, record: &PredictionRecord) {
        let Some(confidence) = record.confidence else {
            return;
        };
        let slot = &mut self.slots[record.test_nucleotide.index()];
        if slot.is_some() {
            self.duplicate.get_or_insert(record.test_nucleotide);
        }
        *slot = Some(confidence);
    }

    fn complete(&self) -> Result<[ConfidenceMetrics; 4], SkipReason> {
        if let Some(nucleotide) = self.duplicate {
            return Err(SkipReason::DuplicateTest { nucleotide });
        }
        match self.slots {
            [Some(a), Some(g), Some(c), Some(t)] => Ok([a, g, c, t]),
            _ => Err(SkipReason::Incomplete {
                missing: Nucleotide::ALL
                    .into_iter()
                    .filter(|n| self.slots[n.index()].is_none())
                    .collect(),
            }),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// `numerator / denominator` when the denominator is positive, otherwise 0.
fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Computes the specificity metrics of a variant from its four confidence bundles.
pub fn score_variant(
    variant_id: &str,
    target_nucleotide: Nucleotide,
    mutations: &str,
    all_scores: [ConfidenceMetrics; 4],
) -> VariantSpecificityResult {
    let target = all_scores[target_nucleotide.index()];

    let (off_target_confs, off_target_iptms): (Vec<f64>, Vec<f64>) = Nucleotide::ALL
        .into_iter()
        .filter(|&n| n != target_nucleotide)
        .map(|n| {
            let s = &all_scores[n.index()];
            (s.confidence_score, s.ligand_iptm)
        })
        .unzip();

    let mean_off_target_conf = mean(&off_target_confs);
    let mean_off_target_iptm = mean(&off_target_iptms);
    let max_off_target_conf = max(&off_target_confs);

    // Zero off-target signal maps to 0, not infinity. This also scores a variant
    // with no off-target binding at all as non-specific.
    let specificity_ratio_conf = ratio_or_zero(target.confidence_score, mean_off_target_conf);
    let specificity_ratio_iptm = ratio_or_zero(target.ligand_iptm, mean_off_target_iptm);

    VariantSpecificityResult {
        variant_id: variant_id.to_string(),
        target_nucleotide,
        mutations: mutations.to_string(),
        target_confidence: target.confidence_score,
        target_iptm: target.ligand_iptm,
        mean_off_target_conf,
        mean_off_target_iptm,
        max_off_target_conf,
        specificity_ratio_conf,
        specificity_ratio_iptm,
        selectivity_conf: target.confidence_score - max_off_target_conf,
        selectivity_iptm: target.ligand_iptm - max(&off_target_iptms),
        combined_score: target.confidence_score * specificity_ratio_conf,
        all_scores,
    }
}

/// Groups prediction records by variant and scores every variant that passes
/// the completeness gate. The first record of a variant decides its target
/// nucleotide and mutation string.
pub fn calculate_specificity_scores(records: &[PredictionRecord]) -> ScoringOutcome {
    let mut order: Vec<VariantPartition> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for record in records {
        let i = *index.entry(record.variant_id.as_str()).or_insert_with(|| {
            order.push(VariantPartition::new(record));
            order.len() - 1
        });
        order[i].insert(record);
    }

    let mut outcome = ScoringOutcome::default();
    for partition in &order {
        match partition.complete() {
            Ok(all_scores) => outcome.scored.push(score_variant(
                partition.variant_id,
                partition.target_nucleotide,
                partition.mutations,
                all_scores,
            )),
            Err(reason) => {
                debug!("Skipping {}: {:?}", partition.variant_id, reason);
                outcome.skipped.push(SkippedVariant {
                    variant_id: partition.variant_id.to_string(),
                    reason,
                });
            }
        }
    }

    info!(
        "Scored {} variants with complete data, skipped {}",
        outcome.scored.len(),
        outcome.skipped.len()
    );
    outcome
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn record(
        variant_id: &str,
        target: Nucleotide,
        test: Nucleotide,
        confidence_score: Option<f64>,
    ) -> PredictionRecord {
        PredictionRecord {
            variant_id: variant_id.to_string(),
            target_nucleotide: target,
            test_nucleotide: test,
            is_target: target == test,
            mutations: "V96Y,S97R".to_string(),
            prediction_dir: None,
            confidence: confidence_score.map(|c| ConfidenceMetrics {
                confidence_score: c,
                ligand_iptm: c / 2.0,
                complex_plddt: 0.8,
            }),
            elapsed_time: None,
        }
    }

    /// Four records for `variant_id`: target first, then off-targets in `ALL` order.
    pub(crate) fn variant(
        variant_id: &str,
        target: Nucleotide,
        target_conf: f64,
        off_targets: [f64; 3],
    ) -> Vec<PredictionRecord> {
        let mut off = off_targets.into_iter();
        Nucleotide::ALL
            .into_iter()
            .map(|n| {
                let c = if n == target { target_conf } else { off.next().unwrap() };
                record(variant_id, target, n, Some(c))
            })
            .collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn high_target_low_off_target() {
        let records = variant("dATP_variant_001", Nucleotide::DAtp, 0.9, [0.3, 0.4, 0.3]);
        let outcome = calculate_specificity_scores(&records);
        assert_eq!(outcome.scored.len(), 1);
        let r = &outcome.scored[0];
        assert!(close(r.mean_off_target_conf, 1.0 / 3.0));
        assert!(close(r.specificity_ratio_conf, 2.7));
        assert!(close(r.selectivity_conf, 0.5));
        assert!(close(r.combined_score, 2.43));
        assert!(close(r.max_off_target_conf, 0.4));
        // iptm is half of confidence in the fixture
        assert!(close(r.specificity_ratio_iptm, 2.7));
        assert!(close(r.selectivity_iptm, 0.25));
    }

    #[test]
    fn uniform_binding_is_not_specific() {
        let records = variant("dGTP_variant_002", Nucleotide::DGtp, 0.5, [0.5, 0.5, 0.5]);
        let r = &calculate_specificity_scores(&records).scored[0];
        assert!(close(r.specificity_ratio_conf, 1.0));
        assert!(close(r.selectivity_conf, 0.0));
        assert!(close(r.combined_score, 0.5));
    }

    #[test]
    fn zero_off_target_mean_falls_back_to_zero() {
        let records = variant("dCTP_variant_003", Nucleotide::DCtp, 0.8, [0.0, 0.0, 0.0]);
        let r = &calculate_specificity_scores(&records).scored[0];
        assert_eq!(r.specificity_ratio_conf, 0.0);
        assert_eq!(r.specificity_ratio_iptm, 0.0);
        assert_eq!(r.combined_score, 0.0);
        assert!(close(r.selectivity_conf, 0.8));
    }

    #[test]
    fn negative_selectivity_when_off_target_wins() {
        let records = variant("dTTP_variant_004", Nucleotide::DTtp, 0.4, [0.2, 0.7, 0.3]);
        let r = &calculate_specificity_scores(&records).scored[0];
        assert!(close(r.selectivity_conf, -0.3));
        assert!(close(r.combined_score, r.target_confidence * r.specificity_ratio_conf));
    }

    #[test]
    fn partial_variants_are_skipped() {
        let mut records = variant("complete", Nucleotide::DAtp, 0.9, [0.3, 0.4, 0.3]);
        records.push(record("two_only", Nucleotide::DAtp, Nucleotide::DAtp, Some(0.9)));
        records.push(record("two_only", Nucleotide::DAtp, Nucleotide::DGtp, Some(0.2)));

        let mut failed = variant("one_failed", Nucleotide::DGtp, 0.7, [0.1, 0.2, 0.3]);
        failed[3].confidence = None;
        records.extend(failed);

        let outcome = calculate_specificity_scores(&records);
        let ids: Vec<&str> = outcome.scored.iter().map(|r| r.variant_id.as_str()).collect();
        assert_eq!(ids, vec!["complete"]);
        assert_eq!(
            outcome.skipped[0].reason,
            SkipReason::Incomplete { missing: vec![Nucleotide::DCtp, Nucleotide::DTtp] }
        );
        assert_eq!(
            outcome.skipped[1].reason,
            SkipReason::Incomplete { missing: vec![Nucleotide::DTtp] }
        );
    }

    #[test]
    fn duplicate_test_nucleotide_is_not_completeness() {
        let mut records = variant("dup", Nucleotide::DAtp, 0.9, [0.3, 0.4, 0.3]);
        records.pop();
        records.push(record("dup", Nucleotide::DAtp, Nucleotide::DGtp, Some(0.1)));

        let outcome = calculate_specificity_scores(&records);
        assert!(outcome.scored.is_empty());
        assert_eq!(
            outcome.skipped[0].reason,
            SkipReason::DuplicateTest { nucleotide: Nucleotide::DGtp }
        );
    }

    #[test]
    fn failed_duplicate_does_not_count() {
        let mut records = variant("retry", Nucleotide::DCtp, 0.6, [0.2, 0.2, 0.2]);
        records.insert(0, record("retry", Nucleotide::DCtp, Nucleotide::DAtp, None));
        let outcome = calculate_specificity_scores(&records);
        assert_eq!(outcome.scored.len(), 1);
    }

    #[test]
    fn records_may_arrive_interleaved() {
        let a = variant("a", Nucleotide::DAtp, 0.9, [0.3, 0.4, 0.3]);
        let b = variant("b", Nucleotide::DTtp, 0.5, [0.5, 0.5, 0.5]);
        let records: Vec<PredictionRecord> =
            a.into_iter().zip(b).flat_map(|(x, y)| [y, x]).collect();

        let outcome = calculate_specificity_scores(&records);
        let ids: Vec<&str> = outcome.scored.iter().map(|r| r.variant_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(close(outcome.scored[1].combined_score, 2.43));
    }

    #[test]
    fn scoring_is_repeatable() {
        let mut records = variant("x", Nucleotide::DAtp, 0.9, [0.3, 0.4, 0.3]);
        records.extend(variant("y", Nucleotide::DGtp, 0.6, [0.1, 0.5, 0.2]));
        let first = calculate_specificity_scores(&records);
        let second = calculate_specificity_scores(&records);
        assert_eq!(first.scored, second.scored);
    }

    #[test]
    fn all_scores_are_kept_for_audit() {
        let records = variant("audit", Nucleotide::DGtp, 0.9, [0.1, 0.2, 0.3]);
        let r = &calculate_specificity_scores(&records).scored[0];
        assert_eq!(r.score(Nucleotide::DGtp).confidence_score, 0.9);
        assert_eq!(r.score(Nucleotide::DAtp).confidence_score, 0.1);
        assert_eq!(r.score(Nucleotide::DTtp).confidence_score, 0.3);
        assert_eq!(r.scores().count(), 4);
    }
}
