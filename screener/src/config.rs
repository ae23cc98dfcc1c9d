use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Pipeline settings, read from a JSON file. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Name on `PATH` or a path to the Boltz executable.
    pub boltz_executable: String,
    pub accelerator: String,
    pub devices: u32,
    /// Per-prediction limit; the run is killed and counted as failed after this.
    pub timeout_secs: u64,
    pub library_dir: PathBuf,
    pub quick: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            boltz_executable: "boltz".to_string(),
            accelerator: "gpu".to_string(),
            devices: 1,
            timeout_secs: 600,
            library_dir: PathBuf::from("specificity_library"),
            quick: false,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        info!("Reading pipeline config from {}", path.display());
        let file = File::open(path).with_context(|| format!("Cannot open config {}", path.display()))?;
        serde_json::from_reader(file).with_context(|| format!("Malformed config {}", path.display()))
    }

    /// Locates the Boltz executable on `PATH` (or checks an explicit path).
    pub fn resolve_boltz(&self) -> anyhow::Result<PathBuf> {
        which::which(&self.boltz_executable)
            .with_context(|| format!("Boltz executable '{}' not found", self.boltz_executable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        assert_eq!(PipelineConfig::load(None).unwrap(), PipelineConfig::default());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"devices": 2, "quick": true}"#).unwrap();
        let config = PipelineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.devices, 2);
        assert!(config.quick);
        assert_eq!(config.timeout_secs, 600);
        assert_eq!(config.boltz_executable, "boltz");
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PipelineConfig::load(Some(&dir.path().join("absent.json"))).is_err());
    }

    #[test]
    fn unknown_executable_is_reported() {
        let config = PipelineConfig {
            boltz_executable: "definitely-not-boltz-7f3a".to_string(),
            ..Default::default()
        };
        assert!(config.resolve_boltz().is_err());
    }
}
