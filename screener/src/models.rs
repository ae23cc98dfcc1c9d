use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The four deoxynucleotide triphosphates a binder can be screened against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Nucleotide {
    #[serde(rename = "dATP")]
    DAtp,
    #[serde(rename = "dGTP")]
    DGtp,
    #[serde(rename = "dCTP")]
    DCtp,
    #[serde(rename = "dTTP")]
    DTtp,
}

impl Nucleotide {
    /// Fixed iteration order used for grouping, completeness checks and reports.
    pub const ALL: [Nucleotide; 4] = [
        Nucleotide::DAtp,
        Nucleotide::DGtp,
        Nucleotide::DCtp,
        Nucleotide::DTtp,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Nucleotide::DAtp => "dATP",
            Nucleotide::DGtp => "dGTP",
            Nucleotide::DCtp => "dCTP",
            Nucleotide::DTtp => "dTTP",
        }
    }

    /// Slot of this nucleotide in `ALL`.
    pub fn index(self) -> usize {
        match self {
            Nucleotide::DAtp => 0,
            Nucleotide::DGtp => 1,
            Nucleotide::DCtp => 2,
            Nucleotide::DTtp => 3,
        }
    }

    /// Ligand SMILES handed to the structure predictor.
    pub fn smiles(self) -> &'static str {
        match self {
            Nucleotide::DAtp => "Nc1ncnc2c1ncn2[C@H]3C[C@H](O)[C@@H](COP(O)(=O)OP(O)(=O)OP(O)(O)=O)O3",
            Nucleotide::DGtp => "Nc1nc2c(ncn2[C@H]3C[C@H](O)[C@@H](COP(O)(=O)OP(O)(=O)OP(O)(O)=O)O3)c(=O)[nH]1",
            Nucleotide::DCtp => "Nc1ccn([C@H]2C[C@H](O)[C@@H](COP(O)(=O)OP(O)(=O)OP(O)(O)=O)O2)c(=O)n1",
            Nucleotide::DTtp => "Cc1cn([C@H]2C[C@H](O)[C@@H](COP(O)(=O)OP(O)(=O)OP(O)(O)=O)O2)c(=O)[nH]c1=O",
        }
    }
}

impl fmt::Display for Nucleotide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Nucleotide {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Nucleotide::ALL
            .into_iter()
            .find(|n| n.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow::anyhow!("Unknown nucleotide: {}", s))
    }
}

/// Confidence metrics reported by Boltz for one predicted complex.
/// Any additional keys in the confidence JSON are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceMetrics {
    pub confidence_score: f64,
    pub ligand_iptm: f64,
    pub complex_plddt: f64,
}

/// One (variant, test nucleotide) prediction outcome.
/// `confidence` is `None` when the prediction failed upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub variant_id: String,
    pub target_nucleotide: Nucleotide,
    pub test_nucleotide: Nucleotide,
    pub is_target: bool,
    pub mutations: String,
    #[serde(default)]
    pub prediction_dir: Option<String>,
    pub confidence: Option<ConfidenceMetrics>,
    #[serde(default)]
    pub elapsed_time: Option<f64>,
}

/// The document written by a batch screen (`screening_results.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningResults {
    pub timestamp: String,
    pub total_predictions: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_time_seconds: f64,
    pub mode: String,
    pub results: Vec<PredictionRecord>,
}

/// Specificity metrics for one variant with a complete set of four predictions.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantSpecificityResult {
    pub variant_id: String,
    pub target_nucleotide: Nucleotide,
    pub mutations: String,
    pub target_confidence: f64,
    pub target_iptm: f64,
    pub mean_off_target_conf: f64,
    pub mean_off_target_iptm: f64,
    pub max_off_target_conf: f64,
    pub specificity_ratio_conf: f64,
    pub specificity_ratio_iptm: f64,
    pub selectivity_conf: f64,
    pub selectivity_iptm: f64,
    pub combined_score: f64,
    /// Per test nucleotide, indexed by `Nucleotide::index`.
    pub all_scores: [ConfidenceMetrics; 4],
}

impl VariantSpecificityResult {
    pub fn score(&self, nucleotide: Nucleotide) -> &ConfidenceMetrics {
        &self.all_scores[nucleotide.index()]
    }

    /// Scores in `Nucleotide::ALL` order.
    pub fn scores(&self) -> impl Iterator<Item = (Nucleotide, &ConfidenceMetrics)> {
        Nucleotide::ALL.into_iter().zip(self.all_scores.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nucleotide_names_round_trip_through_json() {
        for n in Nucleotide::ALL {
            let json = serde_json::to_string(&n).unwrap();
            assert_eq!(json, format!("\"{}\"", n.name()));
            assert_eq!(serde_json::from_str::<Nucleotide>(&json).unwrap(), n);
            assert_eq!(Nucleotide::ALL[n.index()], n);
        }
        assert!(serde_json::from_str::<Nucleotide>("\"dUTP\"").is_err());
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("dttp".parse::<Nucleotide>().unwrap(), Nucleotide::DTtp);
        assert!("ATP".parse::<Nucleotide>().is_err());
    }

    #[test]
    fn failed_prediction_has_null_confidence() {
        let record: PredictionRecord = serde_json::from_str(
            r#"{"variant_id": "v", "target_nucleotide": "dCTP", "test_nucleotide": "dGTP",
                "is_target": false, "mutations": "WT", "confidence": null}"#,
        )
        .unwrap();
        assert!(record.confidence.is_none());
        assert!(record.prediction_dir.is_none());
    }
}
