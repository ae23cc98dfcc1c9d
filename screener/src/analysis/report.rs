//! Tabular and text reports for ranked specificity results.

use std::fmt::Write as _;
use std::fs::File;
use std::path::Path;

use anyhow::Context;
use polars::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::analysis::ranking::{top_for_nucleotide, NucleotideSummary, RankMetric};
use crate::models::{Nucleotide, VariantSpecificityResult};

const RULE: &str = "================================================================================";
const THIN_RULE: &str = "--------------------------------------------------------------------------------";

fn f64_column(name: &str, results: &[VariantSpecificityResult], f: impl Fn(&VariantSpecificityResult) -> f64) -> Column {
    Column::from(Series::new(
        PlSmallStr::from(name),
        results.iter().map(f).collect::<Vec<f64>>(),
    ))
}

/// One row per ranked variant, in ranking order.
pub fn results_to_dataframe(results: &[VariantSpecificityResult]) -> PolarsResult<DataFrame> {
    let mut columns = vec![
        Column::from(Series::new(
            PlSmallStr::from("variant_id"),
            results.iter().map(|r| r.variant_id.as_str()).collect::<Vec<&str>>(),
        )),
        Column::from(Series::new(
            PlSmallStr::from("target_nucleotide"),
            results.iter().map(|r| r.target_nucleotide.name()).collect::<Vec<&str>>(),
        )),
        Column::from(Series::new(
            PlSmallStr::from("mutations"),
            results.iter().map(|r| r.mutations.as_str()).collect::<Vec<&str>>(),
        )),
        f64_column("target_confidence", results, |r| r.target_confidence),
        f64_column("target_iptm", results, |r| r.target_iptm),
        f64_column("mean_off_target_conf", results, |r| r.mean_off_target_conf),
        f64_column("mean_off_target_iptm", results, |r| r.mean_off_target_iptm),
        f64_column("max_off_target_conf", results, |r| r.max_off_target_conf),
        f64_column("specificity_ratio_conf", results, |r| r.specificity_ratio_conf),
        f64_column("specificity_ratio_iptm", results, |r| r.specificity_ratio_iptm),
        f64_column("selectivity_conf", results, |r| r.selectivity_conf),
        f64_column("selectivity_iptm", results, |r| r.selectivity_iptm),
        f64_column("combined_score", results, |r| r.combined_score),
    ];
    for nucleotide in Nucleotide::ALL {
        columns.push(f64_column(&format!("confidence_{}", nucleotide), results, |r| {
            r.score(nucleotide).confidence_score
        }));
    }
    DataFrame::new(columns)
}

fn write_dataframe(df: &mut DataFrame, path: &Path) -> anyhow::Result<()> {
    let mut file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    info!("Saved {}", path.display());
    Ok(())
}

/// A per (variant, test nucleotide) row of `score_breakdown.csv`.
#[derive(Debug, Serialize)]
struct BreakdownRow<'a> {
    variant_id: &'a str,
    target_nucleotide: Nucleotide,
    test_nucleotide: Nucleotide,
    is_target: bool,
    confidence_score: f64,
    ligand_iptm: f64,
    complex_plddt: f64,
}

fn write_breakdown(ranked: &[VariantSpecificityResult], path: &Path) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path).with_context(|| format!("Cannot create {}", path.display()))?;
    for r in ranked {
        for (test_nucleotide, score) in r.scores() {
            wtr.serialize(BreakdownRow {
                variant_id: &r.variant_id,
                target_nucleotide: r.target_nucleotide,
                test_nucleotide,
                is_target: test_nucleotide == r.target_nucleotide,
                confidence_score: score.confidence_score,
                ligand_iptm: score.ligand_iptm,
                complex_plddt: score.complex_plddt,
            })?;
        }
    }
    wtr.flush()?;
    info!("Saved {}", path.display());
    Ok(())
}

fn marker(test: Nucleotide, target: Nucleotide) -> char {
    if test == target { '★' } else { ' ' }
}

/// Plain text report: top 10 overall and the best binder per nucleotide,
/// both by the `metric` that produced `ranked`.
pub fn specificity_report(ranked: &[VariantSpecificityResult], metric: RankMetric) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}\nSPECIFICITY SCREENING ANALYSIS REPORT\n{RULE}\n");
    let _ = writeln!(out, "Total variants analyzed: {}\n", ranked.len());

    let _ = writeln!(out, "TOP 10 SPECIFIC BINDERS ({})\n{THIN_RULE}", metric.label());
    for (i, r) in ranked.iter().take(10).enumerate() {
        let _ = writeln!(out, "\n{}. {} ({})", i + 1, r.variant_id, r.target_nucleotide);
        let _ = writeln!(out, "   Mutations: {}", r.mutations);
        let _ = writeln!(out, "   Target conf: {:.4}", r.target_confidence);
        let _ = writeln!(out, "   Specificity: {:.2}x", r.specificity_ratio_conf);
        let _ = writeln!(out, "   Combined: {:.4}", r.combined_score);
        if metric != RankMetric::CombinedScore {
            let _ = writeln!(out, "   {}: {:.4}", metric.label(), metric.value(r));
        }
    }

    let _ = writeln!(out, "\n\n{RULE}\nBEST BINDER PER NUCLEOTIDE ({})\n{RULE}\n", metric.label());
    for nucleotide in Nucleotide::ALL {
        let Some(best) = top_for_nucleotide(ranked, nucleotide, 1).into_iter().next() else {
            continue;
        };
        let _ = writeln!(out, "{}:", nucleotide);
        let _ = writeln!(out, "  {}", best.variant_id);
        let _ = writeln!(out, "  Mutations: {}", best.mutations);
        let _ = writeln!(out, "  Target confidence: {:.4}", best.target_confidence);
        let _ = writeln!(out, "  Specificity ratio: {:.2}x", best.specificity_ratio_conf);
        let _ = writeln!(out, "  Individual scores:");
        for (test, score) in best.scores() {
            let _ = writeln!(out, "    {} {}: {:.4}", marker(test, nucleotide), test, score.confidence_score);
        }
        let _ = writeln!(out);
    }
    out
}

/// Writes every report file into `output_dir`.
pub fn save_analysis_results(
    ranked: &[VariantSpecificityResult],
    metric: RankMetric,
    output_dir: &Path,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let mut df = results_to_dataframe(ranked)?;
    write_dataframe(&mut df, &output_dir.join("specificity_analysis.csv"))?;

    for nucleotide in Nucleotide::ALL {
        let mut top = df
            .clone()
            .lazy()
            .filter(col("target_nucleotide").eq(lit(nucleotide.name())))
            .limit(5)
            .collect()?;
        write_dataframe(&mut top, &output_dir.join(format!("top_binders_{}.csv", nucleotide)))?;
    }

    write_breakdown(ranked, &output_dir.join("score_breakdown.csv"))?;

    let report_path = output_dir.join("specificity_report.txt");
    std::fs::write(&report_path, specificity_report(ranked, metric))
        .with_context(|| format!("Failed to write {}", report_path.display()))?;
    info!("Analysis report: {}", report_path.display());
    Ok(())
}

pub fn log_top_candidates(ranked: &[VariantSpecificityResult], metric: RankMetric, n: usize) {
    info!("TOP {} SPECIFIC BINDERS (by {})", n, metric.label().to_lowercase());
    for (i, r) in ranked.iter().take(n).enumerate() {
        info!("Rank {}: {}", i + 1, r.variant_id);
        info!("  Target: {}", r.target_nucleotide);
        info!("  Mutations: {}", r.mutations);
        info!("  Target confidence: {:.4}", r.target_confidence);
        info!("  Mean off-target: {:.4}", r.mean_off_target_conf);
        info!("  Specificity ratio: {:.2}x", r.specificity_ratio_conf);
        info!("  Selectivity: {:.4}", r.selectivity_conf);
        info!("  Combined score: {:.4}", r.combined_score);
        for (test, score) in r.scores() {
            info!(
                "    {} {}: {:.4} (iPTM: {:.4})",
                marker(test, r.target_nucleotide),
                test,
                score.confidence_score,
                score.ligand_iptm
            );
        }
    }
}

pub fn log_summary(summary: &[NucleotideSummary]) {
    info!("SUMMARY BY TARGET NUCLEOTIDE");
    for s in summary {
        info!("{}:", s.nucleotide);
        info!("  Variants tested: {}", s.variants_tested);
        info!("  Best specificity ratio: {:.2}x", s.best_specificity_ratio);
        info!("  Best target confidence: {:.4}", s.best_target_confidence);
        info!("  Mean specificity ratio: {:.2}x", s.mean_specificity_ratio);
        info!("  Best variant (combined score): {}", s.best_variant_id);
        info!("    Mutations: {}", s.best_mutations);
        info!("    Combined score: {:.4}", s.best_combined_score);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ranking::{rank_candidates, RankMetric};
    use crate::analysis::specificity::calculate_specificity_scores;
    use crate::analysis::specificity::tests::variant;

    fn ranked_by(metric: RankMetric) -> Vec<VariantSpecificityResult> {
        let mut records = variant("dATP_variant_001", Nucleotide::DAtp, 0.9, [0.3, 0.4, 0.3]);
        records.extend(variant("dATP_variant_002", Nucleotide::DAtp, 0.5, [0.5, 0.5, 0.5]));
        records.extend(variant("dTTP_variant_001", Nucleotide::DTtp, 0.7, [0.3, 0.3, 0.3]));
        rank_candidates(calculate_specificity_scores(&records).scored, metric)
    }

    fn ranked() -> Vec<VariantSpecificityResult> {
        ranked_by(RankMetric::CombinedScore)
    }

    #[test]
    fn dataframe_has_one_row_per_variant() {
        let df = results_to_dataframe(&ranked()).unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 17);
        let ids = df.column("variant_id").unwrap().str().unwrap().clone();
        assert_eq!(ids.get(0), Some("dATP_variant_001"));
        assert_eq!(ids.get(1), Some("dTTP_variant_001"));
    }

    #[test]
    fn report_marks_target_score() {
        let report = specificity_report(&ranked(), RankMetric::CombinedScore);
        assert!(report.contains("TOP 10 SPECIFIC BINDERS (Combined Score)"));
        assert!(report.contains("BEST BINDER PER NUCLEOTIDE (Combined Score)"));
        assert!(report.contains("Total variants analyzed: 3"));
        assert!(report.contains("1. dATP_variant_001 (dATP)"));
        assert!(report.contains("    ★ dATP: 0.9000"));
        assert!(report.contains("dTTP:\n  dTTP_variant_001"));
        assert!(!report.contains("dGTP:\n"));
    }

    #[test]
    fn writes_all_report_files() {
        let dir = tempfile::tempdir().unwrap();
        save_analysis_results(&ranked(), RankMetric::CombinedScore, dir.path()).unwrap();

        for name in [
            "specificity_analysis.csv",
            "score_breakdown.csv",
            "specificity_report.txt",
            "top_binders_dATP.csv",
            "top_binders_dGTP.csv",
            "top_binders_dCTP.csv",
            "top_binders_dTTP.csv",
        ] {
            assert!(dir.path().join(name).exists(), "{name} missing");
        }

        let datp = std::fs::read_to_string(dir.path().join("top_binders_dATP.csv")).unwrap();
        assert_eq!(datp.lines().count(), 3);
        let breakdown = std::fs::read_to_string(dir.path().join("score_breakdown.csv")).unwrap();
        assert_eq!(breakdown.lines().count(), 1 + 3 * 4);
        assert!(breakdown.starts_with("variant_id,target_nucleotide,test_nucleotide,is_target"));
    }

    #[test]
    fn report_headings_name_the_ranking_metric() {
        let ranked = ranked_by(RankMetric::SpecificityRatio);
        assert_eq!(ranked[0].variant_id, "dATP_variant_001");
        let report = specificity_report(&ranked, RankMetric::SpecificityRatio);
        assert!(report.contains("TOP 10 SPECIFIC BINDERS (Specificity Ratio)"));
        assert!(report.contains("BEST BINDER PER NUCLEOTIDE (Specificity Ratio)"));
        assert!(report.contains("   Specificity Ratio: "));
        assert!(!report.contains("(Combined Score)"));
    }
}
