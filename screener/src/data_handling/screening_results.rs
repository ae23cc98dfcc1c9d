use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use tracing::{error, info};

use crate::models::ScreeningResults;

pub fn load_screening_results(path: &Path) -> anyhow::Result<ScreeningResults> {
    info!("Reading screening results from {}", path.display());
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            error!("Failed to open screening results {}: {}", path.display(), e);
            return Err(e).with_context(|| format!("Cannot open {}", path.display()));
        }
    };
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Malformed screening results in {}", path.display()))
}

pub fn save_screening_results(path: &Path, results: &ScreeningResults) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("Cannot create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, results)?;
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Nucleotide;

    const DOCUMENT: &str = r#"{
      "timestamp": "2025-03-02T10:11:12.000123",
      "total_predictions": 2,
      "successful": 2,
      "failed": 0,
      "total_time_seconds": 12.5,
      "mode": "quick",
      "results": [
        {
          "variant_id": "dATP_variant_000_WT",
          "target_nucleotide": "dATP",
          "test_nucleotide": "dATP",
          "is_target": true,
          "mutations": "WT",
          "prediction_dir": "out/boltz_results_x",
          "confidence": {
            "confidence_score": 0.81,
            "ptm": 0.9,
            "iptm": 0.7,
            "ligand_iptm": 0.66,
            "complex_plddt": 0.85,
            "complex_iplddt": 0.8
          },
          "elapsed_time": 6.2
        },
        {
          "variant_id": "dATP_variant_000_WT",
          "target_nucleotide": "dATP",
          "test_nucleotide": "dCTP",
          "is_target": false,
          "mutations": "WT",
          "prediction_dir": "out/boltz_results_y",
          "confidence": null,
          "elapsed_time": 6.3
        }
      ]
    }"#;

    #[test]
    fn reads_document_and_ignores_extra_confidence_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screening_results.json");
        std::fs::write(&path, DOCUMENT).unwrap();

        let doc = load_screening_results(&path).unwrap();
        assert_eq!(doc.results.len(), 2);
        let first = &doc.results[0];
        assert_eq!(first.test_nucleotide, Nucleotide::DAtp);
        assert_eq!(first.confidence.unwrap().ligand_iptm, 0.66);
        assert!(doc.results[1].confidence.is_none());

        let copy = dir.path().join("copy.json");
        save_screening_results(&copy, &doc).unwrap();
        let reread = load_screening_results(&copy).unwrap();
        assert_eq!(reread.results.len(), 2);
        assert_eq!(reread.results[1].test_nucleotide, Nucleotide::DCtp);
    }

    #[test]
    fn save_into_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let doc = load_from(DOCUMENT);
        assert!(save_screening_results(&dir.path().join("no/such/dir.json"), &doc).is_err());
    }

    #[test]
    fn saved_document_is_complete_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        save_screening_results(&path, &load_from(DOCUMENT)).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.trim_end().ends_with('}'));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["results"].as_array().unwrap().len(), 2);
    }

    fn load_from(text: &str) -> ScreeningResults {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_screening_results(&dir.path().join("nope.json")).is_err());
    }
}
