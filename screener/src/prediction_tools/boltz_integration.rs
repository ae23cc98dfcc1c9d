use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::data_handling::library_manifest::{load_manifest, ConfigEntry};
use crate::data_handling::screening_results::save_screening_results;
use crate::helper_functions::files_below;
use crate::library::msa::CONFIGS_WITH_MSAS;
use crate::models::{ConfidenceMetrics, PredictionRecord, ScreeningResults};

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const INTERMEDIATE_EVERY: usize = 10;

#[derive(Debug, Clone)]
pub struct BoltzOptions {
    pub executable: PathBuf,
    pub accelerator: String,
    pub devices: u32,
    pub diffusion_samples: u32,
    pub sampling_steps: u32,
    pub recycling_steps: u32,
    pub timeout: Duration,
    pub quick: bool,
}

impl BoltzOptions {
    /// Quick mode trades accuracy for speed: 1 sample, 50 steps, 1 recycle.
    pub fn new(executable: PathBuf, config: &PipelineConfig, quick: bool) -> Self {
        let (diffusion_samples, sampling_steps, recycling_steps) =
            if quick { (1, 50, 1) } else { (3, 150, 2) };
        Self {
            executable,
            accelerator: config.accelerator.clone(),
            devices: config.devices,
            diffusion_samples,
            sampling_steps,
            recycling_steps,
            timeout: Duration::from_secs(config.timeout_secs),
            quick,
        }
    }

    pub fn mode(&self) -> &'static str {
        if self.quick { "quick" } else { "production" }
    }

    pub fn args(&self, config_file: &Path, output_dir: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["predict".into(), config_file.into(), "--out_dir".into(), output_dir.into()];
        for (flag, value) in [
            ("--devices", self.devices.to_string()),
            ("--accelerator", self.accelerator.clone()),
            ("--diffusion_samples", self.diffusion_samples.to_string()),
            ("--sampling_steps", self.sampling_steps.to_string()),
            ("--recycling_steps", self.recycling_steps.to_string()),
        ] {
            args.push(flag.into());
            args.push(value.into());
        }
        args.push("--write_full_pae".into());
        args
    }
}

#[derive(Debug)]
pub enum PredictionOutcome {
    Success { prediction_dir: PathBuf, elapsed: f64 },
    Failed { reason: String, elapsed: f64 },
}

/// First `boltz_results_*` directory below `output_dir`.
pub fn find_prediction_dir(output_dir: &Path) -> Option<PathBuf> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(output_dir)
        .ok()?
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.is_dir()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("boltz_results_"))
        })
        .collect();
    dirs.sort();
    dirs.into_iter().next()
}

fn stderr_excerpt(path: &Path) -> String {
    let mut text = String::new();
    if let Ok(mut f) = File::open(path) {
        let _ = f.read_to_string(&mut text);
    }
    text.chars().take(200).collect()
}

/// Runs one prediction, killing it once `options.timeout` has passed.
pub fn run_boltz_prediction(options: &BoltzOptions, config_file: &Path, output_dir: &Path) -> PredictionOutcome {
    let start = Instant::now();
    let failed = |reason: String| PredictionOutcome::Failed { reason, elapsed: start.elapsed().as_secs_f64() };

    if let Err(e) = fs::create_dir_all(output_dir) {
        return failed(format!("cannot create {}: {}", output_dir.display(), e));
    }
    let stderr_path = output_dir.join("boltz_stderr.log");
    let stderr = match File::create(&stderr_path) {
        Ok(f) => f,
        Err(e) => return failed(format!("cannot create {}: {}", stderr_path.display(), e)),
    };

    let args = options.args(config_file, output_dir);
    debug!("Executing {} {:?}", options.executable.display(), args);
    let mut child = match Command::new(&options.executable)
        .args(&args)
        .stdout(Stdio::null())
        .stderr(stderr)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => return failed(format!("failed to start {}: {}", options.executable.display(), e)),
    };

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if start.elapsed() >= options.timeout => {
                let _ = child.kill();
                let _ = child.wait();
                return failed(format!("timeout after {}s", options.timeout.as_secs()));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => return failed(format!("wait failed: {}", e)),
        }
    };

    if !status.success() {
        return failed(format!("{}: {}", status, stderr_excerpt(&stderr_path)));
    }
    match find_prediction_dir(output_dir) {
        Some(prediction_dir) => PredictionOutcome::Success { prediction_dir, elapsed: start.elapsed().as_secs_f64() },
        None => failed(format!("no boltz_results_* directory in {}", output_dir.display())),
    }
}

/// Confidence metrics of the best model (model_0) found anywhere below
/// `prediction_dir`, falling back to the first confidence file otherwise.
pub fn extract_confidence(prediction_dir: &Path) -> Option<ConfidenceMetrics> {
    let pattern = Regex::new(r"^confidence_.+_model_(\d+)\.json$").ok()?;

    let files = files_below(prediction_dir);
    let mut candidates: Vec<(u32, PathBuf)> = files
        .into_iter()
        .filter_map(|p| {
            let name = p.file_name()?.to_str()?;
            let model = pattern.captures(name)?.get(1)?.as_str().parse().ok()?;
            Some((model, p))
        })
        .collect();
    candidates.sort();

    let (_, best) = candidates
        .iter()
        .find(|(model, _)| *model == 0)
        .or_else(|| candidates.first())?;

    let parsed = fs::read_to_string(best)
        .map_err(anyhow::Error::from)
        .and_then(|text| serde_json::from_str::<ConfidenceMetrics>(&text).map_err(anyhow::Error::from));
    match parsed {
        Ok(confidence) => Some(confidence),
        Err(e) => {
            warn!("Unreadable confidence file {}: {}", best.display(), e);
            None
        }
    }
}

fn config_path(library_dir: &Path, entry: &ConfigEntry) -> Option<PathBuf> {
    let name = Path::new(&entry.config_file).file_name()?;
    Some(library_dir.join(CONFIGS_WITH_MSAS).join(name))
}

/// Predicts every (variant, nucleotide) pair of the library manifest one at a time.
pub fn run_batch_predictions(
    library_dir: &Path,
    results_dir: &Path,
    options: &BoltzOptions,
    limit: Option<usize>,
) -> anyhow::Result<ScreeningResults> {
    fs::create_dir_all(results_dir).with_context(|| format!("Failed to create {}", results_dir.display()))?;

    let manifest = load_manifest(library_dir)?;
    let mut configs = manifest.configs;
    if let Some(limit) = limit {
        info!("LIMIT MODE: Running only {} predictions", limit);
        configs.truncate(limit);
    }

    let total = configs.len();
    info!("Total predictions to run: {}", total);
    info!("Mode: {}", options.mode().to_uppercase());

    let mut results = Vec::new();
    let mut failed = 0;
    let start = Instant::now();

    for (i, entry) in configs.iter().enumerate() {
        let n = i + 1;
        info!(
            "[{}/{}] {} vs {} {}",
            n,
            total,
            entry.variant_id,
            entry.test_nucleotide,
            if entry.is_target { "[TARGET]" } else { "[OFF-TARGET]" }
        );

        match config_path(library_dir, entry).filter(|p| p.exists()) {
            None => {
                error!("Config not found for {}", entry.config_file);
                failed += 1;
            }
            Some(config_file) => {
                let output_dir = results_dir.join(format!("{}_vs_{}", entry.variant_id, entry.test_nucleotide));
                match run_boltz_prediction(options, &config_file, &output_dir) {
                    PredictionOutcome::Success { prediction_dir, elapsed } => {
                        info!("  Success in {:.1}s", elapsed);
                        let confidence = extract_confidence(&prediction_dir);
                        if let Some(c) = &confidence {
                            info!("  Confidence: {:.3}", c.confidence_score);
                            info!("  Ligand iPTM: {:.3}", c.ligand_iptm);
                        } else {
                            warn!("  No confidence metrics in {}", prediction_dir.display());
                        }
                        results.push(PredictionRecord {
                            variant_id: entry.variant_id.clone(),
                            target_nucleotide: entry.target_nucleotide,
                            test_nucleotide: entry.test_nucleotide,
                            is_target: entry.is_target,
                            mutations: entry.mutations.clone(),
                            prediction_dir: Some(prediction_dir.display().to_string()),
                            confidence,
                            elapsed_time: Some(elapsed),
                        });
                    }
                    PredictionOutcome::Failed { reason, elapsed } => {
                        error!("  Failed after {:.1}s: {}", elapsed, reason);
                        failed += 1;
                    }
                }
            }
        }

        if n % INTERMEDIATE_EVERY == 0 || n == total {
            let intermediate = results_dir.join("results_intermediate.json");
            fs::write(&intermediate, serde_json::to_string_pretty(&results)?)
                .with_context(|| format!("Failed to write {}", intermediate.display()))?;
        }
    }

    let screening = ScreeningResults {
        timestamp: chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        total_predictions: total,
        successful: results.len(),
        failed,
        total_time_seconds: start.elapsed().as_secs_f64(),
        mode: options.mode().to_string(),
        results,
    };

    let results_file = results_dir.join("screening_results.json");
    save_screening_results(&results_file, &screening)?;
    info!("Total time: {:.1} minutes", screening.total_time_seconds / 60.0);
    info!("Success: {}/{}", screening.successful, total);
    info!("Failed: {}/{}", screening.failed, total);
    info!("Results saved: {}", results_file.display());
    Ok(screening)
}
