use crate::core::config::GpuDevice;
use crate::core::env_source;
use crate::core::layout::FilesystemError;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub const CUDA_VISIBLE_DEVICES: &str = "CUDA_VISIBLE_DEVICES";
const PATH: &str = "PATH";
const PWD: &str = "PWD";

/// The variables an engine environment starts from before the source file is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BaseEnvironment {
    /// The orchestrator's own environment, captured once at assembly time.
    #[default]
    Process,
    Empty,
    Explicit(BTreeMap<String, String>),
}

impl BaseEnvironment {
    fn snapshot(&self) -> BTreeMap<String, String> {
        match self {
            BaseEnvironment::Process => std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
            BaseEnvironment::Empty => BTreeMap::new(),
            BaseEnvironment::Explicit(vars) => vars.clone(),
        }
    }
}

/// The complete variable mapping handed to every stage subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEnvironment {
    vars: BTreeMap<String, String>,
}

impl EngineEnvironment {
    /// Builds the mapping: base snapshot, then the assignments of `source` (if
    /// any), then `PWD` and, with a GPU, `CUDA_VISIBLE_DEVICES`.
    pub fn assemble(
        base: &BaseEnvironment,
        source: Option<&Path>,
        working_dir: &Path,
        gpu: Option<GpuDevice>,
    ) -> Result<Self, FilesystemError> {
        let mut vars = base.snapshot();

        if let Some(source) = source {
            let text = fs::read_to_string(source)
                .map_err(|e| FilesystemError::new("read environment source", source, e))?;
            let applied = env_source::apply(&text, &mut vars);
            info!("Applied {} assignments from {:?}", applied, source);
        }

        vars.insert(PWD.to_string(), working_dir.display().to_string());
        if let Some(device) = gpu {
            vars.insert(CUDA_VISIBLE_DEVICES.to_string(), device.index().to_string());
        }

        debug!(count = vars.len(), "Engine environment assembled.");
        Ok(Self { vars })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// The `PATH` executables are resolved against.
    pub fn search_path(&self) -> Option<OsString> {
        self.vars.get(PATH).map(OsString::from)
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
