use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileSimulationConfig {
    pub sim_time_ns: Option<f64>,
    pub temperature_k: Option<f64>,
    pub box_buffer_angstrom: Option<f64>,
    pub force_field: Option<String>,
    pub water_model: Option<String>,
    pub gpu_device: Option<String>,
    pub job_name: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileEnvironmentConfig {
    /// Shell-style file whose assignments are applied to the engine environment.
    pub source: Option<PathBuf>,
    pub results_root: Option<PathBuf>,
    /// Start from the process environment (`true`) or from an empty one.
    pub inherit: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub simulation: Option<FileSimulationConfig>,
    pub environment: Option<FileEnvironmentConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
