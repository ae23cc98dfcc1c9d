use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::analysis::ranking::RankMetric;
use crate::analysis::specificity_analysis_integration::run_specificity_analysis;
use crate::config::PipelineConfig;
use crate::helper_functions::in_project;
use crate::library::cdr_library::generate_library;
use crate::library::chimera_prediction::{chimera_name, prepare_chimera_prediction, read_fasta_record};
use crate::library::chimerax::ScriptLayout;
use crate::library::msa::generate_library_msas;
use crate::library::optogenetic::{build_chimeras, OptoDomain, DEFAULT_INSERTION_POS, DEFAULT_LINKER};
use crate::library::winner_integration::{chimera_input, run_sensor_design, run_visualization};
use crate::models::Nucleotide;
use crate::prediction_tools::boltz_integration::{run_batch_predictions, BoltzOptions};

mod analysis;
mod config;
mod data_handling;
mod helper_functions;
mod library;
mod models;
mod prediction_tools;

#[derive(Parser, Debug)]
#[command(version, about = "Design, screen and rank nucleotide-specific nanobody binders", long_about = None)]
struct Args {
    /// Pipeline config (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate the CDR3 variant library and Boltz configs
    Library {
        #[arg(long, default_value_t = 20)]
        variants_per_target: usize,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Write query-only MSAs and MSA-aware configs for a library
    Msas {
        #[arg(long)]
        library_dir: Option<PathBuf>,
    },
    /// Predict every variant against all four nucleotides
    Screen {
        #[arg(long)]
        library_dir: Option<PathBuf>,
        #[arg(long)]
        results_dir: Option<PathBuf>,
        #[arg(long)]
        quick: bool,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Score and rank screening results
    Analyze {
        #[arg(long)]
        results_file: Option<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[arg(long, default_value_t = 10)]
        top_n: usize,
        #[arg(long, value_enum, default_value_t = RankMetric::CombinedScore)]
        metric: RankMetric,
    },
    /// Insert optogenetic domains into a nanobody
    Chimeras {
        /// Raw nanobody sequence; the base scaffold when neither this nor --variant-id is given
        #[arg(short, long, conflicts_with = "variant_id")]
        sequence: Option<String>,
        /// Library variant to use, e.g. a winner reported by `analyze`
        #[arg(short, long)]
        variant_id: Option<String>,
        #[arg(long)]
        library_dir: Option<PathBuf>,
        /// LOV2, CRY2 or BphP1 when omitted; Dronpa, BICYCL_Red and PhyB are also accepted
        #[arg(short, long)]
        domain: Vec<OptoDomain>,
        #[arg(short, long, default_value_t = DEFAULT_INSERTION_POS)]
        position: usize,
        #[arg(short, long, default_value = DEFAULT_LINKER)]
        linker: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long, default_value = "results/optogenetic_chimeras")]
        output_dir: PathBuf,
    },
    /// Catcher-readout sensors for the winning binder of each nucleotide
    Sensors {
        #[arg(long)]
        results_file: Option<PathBuf>,
        #[arg(long)]
        library_dir: Option<PathBuf>,
        #[arg(long, default_value = "results/catcher_sensors")]
        output_dir: PathBuf,
        #[arg(long, value_enum, default_value_t = RankMetric::CombinedScore)]
        metric: RankMetric,
        #[arg(short, long, default_value_t = DEFAULT_INSERTION_POS)]
        position: usize,
        #[arg(short, long, default_value = DEFAULT_LINKER)]
        linker: String,
    },
    /// Boltz and AlphaFold inputs for a chimera FASTA bound to a nucleotide
    PrepareChimera {
        #[arg(short, long)]
        fasta: PathBuf,
        #[arg(short = 't', long)]
        nucleotide: Nucleotide,
        #[arg(short, long, default_value = "results/chimera_predictions")]
        output_dir: PathBuf,
    },
    /// ChimeraX scripts for the winning binder of each nucleotide
    Visualize {
        #[arg(long)]
        results_file: Option<PathBuf>,
        #[arg(long)]
        library_dir: Option<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = RankMetric::CombinedScore)]
        metric: RankMetric,
        /// Write scripts for structures copied to `{base}/structures` on another machine
        #[arg(long)]
        remote_base: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = PipelineConfig::load(args.config.as_deref())?;
    let library_default = in_project(&config.library_dir);
    let results_default = library_default.join("screening_results/screening_results.json");

    match args.command {
        Commands::Library { variants_per_target, seed, output_dir } => {
            let output_dir = output_dir.map(|p| in_project(&p)).unwrap_or(library_default);
            info!("Generating nucleotide-specific nanobody library in {}", output_dir.display());
            let manifest = generate_library(&output_dir, variants_per_target, seed)?;
            info!("Total variants: {}", manifest.library_size);
            info!("Total predictions needed: {}", manifest.total_predictions);
        }
        Commands::Msas { library_dir } => {
            let library_dir = library_dir.map(|p| in_project(&p)).unwrap_or(library_default);
            generate_library_msas(&library_dir)?;
        }
        Commands::Screen { library_dir, results_dir, quick, limit } => {
            let library_dir = library_dir.map(|p| in_project(&p)).unwrap_or(library_default);
            let results_dir = results_dir
                .map(|p| in_project(&p))
                .unwrap_or_else(|| library_dir.join("screening_results"));
            let options = BoltzOptions::new(config.resolve_boltz()?, &config, quick || config.quick);
            run_batch_predictions(&library_dir, &results_dir, &options, limit)?;
        }
        Commands::Analyze { results_file, output_dir, top_n, metric } => {
            let results_file = results_file.map(|p| in_project(&p)).unwrap_or(results_default);
            let output_dir = output_dir
                .map(|p| in_project(&p))
                .unwrap_or_else(|| library_default.join("analysis"));
            run_specificity_analysis(&results_file, &output_dir, top_n, metric)?;
        }
        Commands::Chimeras { sequence, variant_id, library_dir, domain, position, linker, name, output_dir } => {
            let library_dir = library_dir.map(|p| in_project(&p)).unwrap_or(library_default);
            let (sequence, name) = chimera_input(sequence, variant_id.as_deref(), &library_dir, name)?;
            let domains = if domain.is_empty() { OptoDomain::INSERTION_SET.to_vec() } else { domain };
            build_chimeras(&sequence, &domains, position, &linker, &name, &in_project(&output_dir))?;
        }
        Commands::Sensors { results_file, library_dir, output_dir, metric, position, linker } => {
            let results_file = results_file.map(|p| in_project(&p)).unwrap_or(results_default);
            let library_dir = library_dir.map(|p| in_project(&p)).unwrap_or(library_default);
            run_sensor_design(&results_file, &library_dir, &in_project(&output_dir), metric, position, &linker)?;
        }
        Commands::PrepareChimera { fasta, nucleotide, output_dir } => {
            let (header, sequence) = read_fasta_record(&in_project(&fasta))?;
            let prepared =
                prepare_chimera_prediction(&chimera_name(&header), &sequence, nucleotide, &[], &in_project(&output_dir))?;
            info!("AlphaFold FASTA (protein only): {}", prepared.fasta.display());
        }
        Commands::Visualize { results_file, library_dir, output_dir, metric, remote_base } => {
            let results_file = results_file.map(|p| in_project(&p)).unwrap_or(results_default);
            let library_dir = library_dir.map(|p| in_project(&p)).unwrap_or(library_default);
            let output_dir = output_dir
                .map(|p| in_project(&p))
                .unwrap_or_else(|| library_dir.join("visualizations/chimerax_scripts"));
            let layout = match remote_base {
                Some(base) => ScriptLayout::Relocated { base },
                None => ScriptLayout::Local,
            };
            run_visualization(&results_file, &library_dir, &output_dir, metric, &layout)?;
        }
    }
    Ok(())
}
