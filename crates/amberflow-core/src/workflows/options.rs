use crate::engine::environment::BaseEnvironment;
use std::path::PathBuf;

pub const DEFAULT_RESULTS_ROOT: &str = "results";

/// How a run is hosted, as opposed to what it simulates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Parent of generated run directories when no explicit output directory is given.
    pub results_root: PathBuf,
    /// Shell-style file (e.g. `amber.sh`) whose assignments extend the base environment.
    pub environment_source: Option<PathBuf>,
    pub base_environment: BaseEnvironment,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            results_root: PathBuf::from(DEFAULT_RESULTS_ROOT),
            environment_source: None,
            base_environment: BaseEnvironment::Process,
        }
    }
}

impl RunOptions {
    pub fn new(results_root: impl Into<PathBuf>) -> Self {
        Self {
            results_root: results_root.into(),
            ..Self::default()
        }
    }

    pub fn with_environment_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.environment_source = Some(source.into());
        self
    }

    pub fn with_base_environment(mut self, base: BaseEnvironment) -> Self {
        self.base_environment = base;
        self
    }
}
