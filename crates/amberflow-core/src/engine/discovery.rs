use super::environment::EngineEnvironment;
use super::error::PipelineError;
use crate::core::stage::Stage;
use serde::Serialize;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The preparation tool that builds the solvated topology.
pub const PREPARATION_TOOL: &str = "tleap";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Engine {
    #[serde(rename = "pmemd.cuda")]
    PmemdCuda,
    #[serde(rename = "pmemd")]
    Pmemd,
    #[serde(rename = "sander")]
    Sander,
}

impl Engine {
    /// Highest preference first.
    pub const PREFERENCE: [Engine; 3] = [Engine::PmemdCuda, Engine::Pmemd, Engine::Sander];

    pub const fn binary_name(self) -> &'static str {
        match self {
            Engine::PmemdCuda => "pmemd.cuda",
            Engine::Pmemd => "pmemd",
            Engine::Sander => "sander",
        }
    }

    pub const fn uses_gpu(self) -> bool {
        matches!(self, Engine::PmemdCuda)
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedEngine {
    pub engine: Engine,
    pub path: PathBuf,
}

/// Executables a run needs. `engine` is `None` only when no engine stage is planned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub preparation: PathBuf,
    pub engine: Option<SelectedEngine>,
}

/// Picks the most preferred engine `available` can locate.
///
/// The GPU engine is only eligible when `gpu_enabled`.
pub fn select_engine(
    available: impl Fn(Engine) -> Option<PathBuf>,
    gpu_enabled: bool,
) -> Result<SelectedEngine, PipelineError> {
    let candidates: Vec<Engine> = Engine::PREFERENCE
        .into_iter()
        .filter(|engine| gpu_enabled || !engine.uses_gpu())
        .collect();

    for engine in &candidates {
        if let Some(path) = available(*engine) {
            info!(engine = %engine, "Selected MD engine at {:?}", path);
            return Ok(SelectedEngine {
                engine: *engine,
                path,
            });
        }
        debug!(engine = %engine, "Engine not available.");
    }

    if gpu_enabled {
        warn!("A GPU was requested but no MD engine could be found.");
    }
    Err(PipelineError::EngineNotFound {
        role: "MD engine",
        probed: candidates
            .iter()
            .map(|e| e.binary_name())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Locates the executables needed to run every stage up to `through`, searching
/// the `PATH` of `env`.
pub fn discover_toolchain(
    env: &EngineEnvironment,
    gpu_enabled: bool,
    through: Stage,
) -> Result<Toolchain, PipelineError> {
    let search_path = env.search_path();
    let search_path = search_path.as_deref();
    let lookup = |name: &str| search_path.and_then(|dirs| find_executable(name, dirs));

    let preparation =
        lookup(PREPARATION_TOOL).ok_or_else(|| PipelineError::EngineNotFound {
            role: "preparation tool",
            probed: PREPARATION_TOOL.to_string(),
        })?;
    debug!("Preparation tool found at {:?}", preparation);

    let engine = if Stage::through(through).any(Stage::uses_engine) {
        Some(select_engine(|e| lookup(e.binary_name()), gpu_enabled)?)
    } else {
        None
    };

    Ok(Toolchain {
        preparation,
        engine,
    })
}

/// First regular (and, on Unix, executable) file called `name` in `search_path`.
pub fn find_executable(name: &str, search_path: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
