use crate::core::layout::{self, FilesystemError, RunLayout};
use crate::core::stage::STEPS_PER_NS;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_TEMPERATURE_K: f64 = 300.0;
pub const DEFAULT_BOX_BUFFER_ANGSTROM: f64 = 12.0;

// Largest step count an f64 product can represent exactly.
const MAX_EXACT_STEPS: f64 = 9_007_199_254_740_992.0;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ValidationError {
    #[error("Structure file not found: {}", .0.display())]
    StructureNotFound(PathBuf),

    #[error("Structure file '{path}' is not readable: {reason}", path = path.display())]
    StructureUnreadable { path: PathBuf, reason: String },

    #[error("Unknown force field '{0}' (supported: ff14SB, ff19SB)")]
    UnknownForceField(String),

    #[error("Unknown water model '{0}' (supported: tip3p, opc, tip4pew)")]
    UnknownWaterModel(String),

    #[error("Simulation time must be a positive number of nanoseconds, got {0}")]
    NonPositiveSimTime(f64),

    #[error("Simulation time of {0} ns does not yield a usable production step count")]
    StepCountOutOfRange(f64),

    #[error("Invalid GPU device '{0}' (expected 'cuda:N' or 'N')")]
    InvalidGpuDevice(String),

    #[error("Temperature must be positive, got {0} K")]
    NonPositiveTemperature(f64),

    #[error("Box buffer must be positive, got {0} Å")]
    NonPositiveBoxBuffer(f64),

    #[error("Invalid job name '{0}' (use letters, digits, '-', '_' or '.')")]
    InvalidJobName(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ForceField {
    #[serde(rename = "ff14SB")]
    Ff14SB,
    #[default]
    #[serde(rename = "ff19SB")]
    Ff19SB,
}

impl ForceField {
    pub const fn name(self) -> &'static str {
        match self {
            ForceField::Ff14SB => "ff14SB",
            ForceField::Ff19SB => "ff19SB",
        }
    }

    /// The preparation-tool script that loads this protein force field.
    pub const fn leap_source(self) -> &'static str {
        match self {
            ForceField::Ff14SB => "leaprc.protein.ff14SB",
            ForceField::Ff19SB => "leaprc.protein.ff19SB",
        }
    }
}

impl FromStr for ForceField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ff14sb" => Ok(ForceField::Ff14SB),
            "ff19sb" => Ok(ForceField::Ff19SB),
            _ => Err(ValidationError::UnknownForceField(s.to_string())),
        }
    }
}

impl fmt::Display for ForceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WaterModel {
    Tip3p,
    #[default]
    Opc,
    Tip4pew,
}

impl WaterModel {
    pub const fn name(self) -> &'static str {
        match self {
            WaterModel::Tip3p => "tip3p",
            WaterModel::Opc => "opc",
            WaterModel::Tip4pew => "tip4pew",
        }
    }

    pub const fn leap_source(self) -> &'static str {
        match self {
            WaterModel::Tip3p => "leaprc.water.tip3p",
            WaterModel::Opc => "leaprc.water.opc",
            WaterModel::Tip4pew => "leaprc.water.tip4pew",
        }
    }

    /// The pre-equilibrated solvent box unit used for solvation.
    pub const fn solvent_box(self) -> &'static str {
        match self {
            WaterModel::Tip3p => "TIP3PBOX",
            WaterModel::Opc => "OPCBOX",
            WaterModel::Tip4pew => "TIP4PEWBOX",
        }
    }
}

impl FromStr for WaterModel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tip3p" => Ok(WaterModel::Tip3p),
            "opc" => Ok(WaterModel::Opc),
            "tip4pew" => Ok(WaterModel::Tip4pew),
            _ => Err(ValidationError::UnknownWaterModel(s.to_string())),
        }
    }
}

impl fmt::Display for WaterModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A CUDA device index, parsed from `cuda:N` or `N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct GpuDevice(u32);

impl GpuDevice {
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl FromStr for GpuDevice {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("cuda:").unwrap_or(s);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidGpuDevice(s.to_string()));
        }
        digits
            .parse::<u32>()
            .map(GpuDevice)
            .map_err(|_| ValidationError::InvalidGpuDevice(s.to_string()))
    }
}

impl fmt::Display for GpuDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cuda:{}", self.0)
    }
}

/// Unvalidated parameters as supplied by a caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawParams {
    pub structure_path: PathBuf,
    pub sim_time_ns: f64,
    #[serde(default)]
    pub gpu_device: Option<String>,
    #[serde(default)]
    pub force_field: Option<String>,
    #[serde(default)]
    pub water_model: Option<String>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub job_name: Option<String>,
    #[serde(default)]
    pub temperature_k: Option<f64>,
    #[serde(default)]
    pub box_buffer_angstrom: Option<f64>,
}

impl RawParams {
    pub fn new(structure_path: impl Into<PathBuf>, sim_time_ns: f64) -> Self {
        Self {
            structure_path: structure_path.into(),
            sim_time_ns,
            ..Self::default()
        }
    }
}

/// Production step count for `sim_time_ns` at the fixed 2 fs timestep.
///
/// The product is rounded half away from zero; anything below one step or beyond
/// exact `f64` integer range is rejected rather than truncated.
pub fn production_steps(sim_time_ns: f64) -> Result<u64, ValidationError> {
    if !sim_time_ns.is_finite() || sim_time_ns <= 0.0 {
        return Err(ValidationError::NonPositiveSimTime(sim_time_ns));
    }
    let steps = (sim_time_ns * STEPS_PER_NS as f64).round();
    if !(1.0..=MAX_EXACT_STEPS).contains(&steps) {
        return Err(ValidationError::StepCountOutOfRange(sim_time_ns));
    }
    Ok(steps as u64)
}

/// Fully resolved, immutable parameters for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationConfig {
    structure_path: PathBuf,
    job_name: String,
    force_field: ForceField,
    water_model: WaterModel,
    sim_time_ns: f64,
    production_steps: u64,
    temperature_k: f64,
    box_buffer_angstrom: f64,
    gpu_device: Option<GpuDevice>,
    output_dir: PathBuf,
}

struct ResolvedParams {
    structure_path: PathBuf,
    job_name: String,
    force_field: ForceField,
    water_model: WaterModel,
    sim_time_ns: f64,
    production_steps: u64,
    temperature_k: f64,
    box_buffer_angstrom: f64,
    gpu_device: Option<GpuDevice>,
}

impl SimulationConfig {
    /// Validates `raw` and creates the run's output directory.
    ///
    /// Without an explicit `output_dir` the directory is
    /// `<results_root>/md_<job>_<YYYYmmdd_HHMMSS>`. An explicit directory must not
    /// exist yet.
    pub fn build(raw: &RawParams, results_root: &Path) -> Result<Self, ConfigError> {
        let resolved = Self::resolve(raw)?;
        debug!(
            job = %resolved.job_name,
            steps = resolved.production_steps,
            "Configuration parameters validated."
        );

        let layout = match &raw.output_dir {
            Some(dir) => RunLayout::create_exclusive(dir)?,
            None => {
                let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
                RunLayout::create_timestamped(results_root, &resolved.job_name, &stamp)?
            }
        };
        info!("Run directory created at {:?}", layout.root());

        Ok(Self {
            structure_path: resolved.structure_path,
            job_name: resolved.job_name,
            force_field: resolved.force_field,
            water_model: resolved.water_model,
            sim_time_ns: resolved.sim_time_ns,
            production_steps: resolved.production_steps,
            temperature_k: resolved.temperature_k,
            box_buffer_angstrom: resolved.box_buffer_angstrom,
            gpu_device: resolved.gpu_device,
            output_dir: layout.root().to_path_buf(),
        })
    }

    fn resolve(raw: &RawParams) -> Result<ResolvedParams, ValidationError> {
        let structure_path = check_structure(&raw.structure_path)?;

        let force_field = raw
            .force_field
            .as_deref()
            .map(str::parse)
            .transpose()?
            .unwrap_or_default();
        let water_model = raw
            .water_model
            .as_deref()
            .map(str::parse)
            .transpose()?
            .unwrap_or_default();

        let production_steps = production_steps(raw.sim_time_ns)?;

        let gpu_device = raw
            .gpu_device
            .as_deref()
            .map(str::parse::<GpuDevice>)
            .transpose()?;

        let temperature_k = raw.temperature_k.unwrap_or(DEFAULT_TEMPERATURE_K);
        if !temperature_k.is_finite() || temperature_k <= 0.0 {
            return Err(ValidationError::NonPositiveTemperature(temperature_k));
        }
        let box_buffer_angstrom = raw
            .box_buffer_angstrom
            .unwrap_or(DEFAULT_BOX_BUFFER_ANGSTROM);
        if !box_buffer_angstrom.is_finite() || box_buffer_angstrom <= 0.0 {
            return Err(ValidationError::NonPositiveBoxBuffer(box_buffer_angstrom));
        }

        let job_name = match raw.job_name.as_deref() {
            Some(name) => name.to_string(),
            None => structure_path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        if !layout::is_safe_component(&job_name) {
            return Err(ValidationError::InvalidJobName(job_name));
        }

        Ok(ResolvedParams {
            structure_path,
            job_name,
            force_field,
            water_model,
            sim_time_ns: raw.sim_time_ns,
            production_steps,
            temperature_k,
            box_buffer_angstrom,
            gpu_device,
        })
    }

    pub fn structure_path(&self) -> &Path {
        &self.structure_path
    }
    pub fn job_name(&self) -> &str {
        &self.job_name
    }
    pub fn force_field(&self) -> ForceField {
        self.force_field
    }
    pub fn water_model(&self) -> WaterModel {
        self.water_model
    }
    pub fn sim_time_ns(&self) -> f64 {
        self.sim_time_ns
    }
    pub fn production_steps(&self) -> u64 {
        self.production_steps
    }
    pub fn temperature_k(&self) -> f64 {
        self.temperature_k
    }
    pub fn box_buffer_angstrom(&self) -> f64 {
        self.box_buffer_angstrom
    }
    pub fn gpu_device(&self) -> Option<GpuDevice> {
        self.gpu_device
    }
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

fn check_structure(path: &Path) -> Result<PathBuf, ValidationError> {
    if !path.is_file() {
        return Err(ValidationError::StructureNotFound(path.to_path_buf()));
    }
    let unreadable = |e: std::io::Error| ValidationError::StructureUnreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };
    File::open(path).map_err(unreadable)?;
    path.canonicalize().map_err(unreadable)
}
