use super::cancel::CancelToken;
use super::discovery::Toolchain;
use super::environment::EngineEnvironment;
use super::error::PipelineError;
use crate::core::layout::{self, FilesystemError, RunLayout};
use crate::core::stage::{Stage, StageResult};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Program and arguments for one stage. Arguments name files relative to the
/// run directory, which is the working directory of every stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl StageCommand {
    pub fn display(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Exited { code: Option<i32>, success: bool },
    SpawnFailed(String),
    Cancelled,
}

fn file_name_of(result: &StageResult) -> Option<String> {
    result
        .coordinates
        .as_ref()
        .and_then(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
}

/// The command line for `stage`, fed by the coordinates of `predecessor`.
pub fn build_command(
    stage: Stage,
    toolchain: &Toolchain,
    predecessor: Option<&StageResult>,
) -> Result<StageCommand, PipelineError> {
    if stage == Stage::Prep {
        return Ok(StageCommand {
            program: toolchain.preparation.clone(),
            args: vec!["-f".to_string(), layout::deck_name(stage)],
        });
    }

    let engine = toolchain.engine.as_ref().ok_or_else(|| {
        PipelineError::Internal(format!("no MD engine selected for stage '{}'", stage))
    })?;
    let input = predecessor
        .filter(|p| Some(p.stage) == stage.predecessor())
        .and_then(file_name_of)
        .ok_or_else(|| {
            PipelineError::Internal(format!(
                "stage '{}' has no coordinates from its predecessor",
                stage
            ))
        })?;

    let mut args = vec![
        "-O".to_string(),
        "-i".to_string(),
        layout::deck_name(stage),
        "-o".to_string(),
        layout::engine_report_name(stage),
        "-inf".to_string(),
        layout::engine_info_name(stage),
        "-p".to_string(),
        layout::topology_name(),
        "-c".to_string(),
        input.clone(),
        "-r".to_string(),
        layout::coordinates_name(stage),
    ];
    if let Some(trajectory) = layout::trajectory_name(stage) {
        args.push("-x".to_string());
        args.push(trajectory);
    }

    let reference = match stage {
        Stage::MinRestrained => Some(layout::coordinates_name(Stage::Prep)),
        Stage::HeatNvt | Stage::EquilNpt => Some(input),
        _ => None,
    };
    if let Some(reference) = reference {
        args.push("-ref".to_string());
        args.push(reference);
    }

    Ok(StageCommand {
        program: engine.path.clone(),
        args,
    })
}

fn create_log(path: PathBuf) -> Result<File, FilesystemError> {
    File::create(&path).map_err(|e| FilesystemError::new("create log file", path, e))
}

/// Runs `command` in the run directory with exactly the variables of `env`,
/// capturing stdout and stderr into the stage's log files.
///
/// The child is killed if `cancel` fires first.
pub async fn execute(
    command: &StageCommand,
    env: &EngineEnvironment,
    layout: &RunLayout,
    stage: Stage,
    cancel: &CancelToken,
) -> Result<ProcessOutcome, PipelineError> {
    let stdout = create_log(layout.stdout_log(stage))?;
    let mut stderr = create_log(layout.stderr_log(stage))?;

    debug!(stage = %stage, command = %command.display(), "Launching stage process.");

    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .current_dir(layout.root())
        .env_clear()
        .envs(env.iter())
        .stdin(Stdio::null())
        .kill_on_drop(true);

    let stderr_handle = stderr
        .try_clone()
        .map_err(|e| FilesystemError::new("open log file", layout.stderr_log(stage), e))?;
    cmd.stdout(Stdio::from(stdout)).stderr(Stdio::from(stderr_handle));

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            let message = format!("failed to start {}: {}", command.program.display(), e);
            if let Err(log_err) = writeln!(stderr, "{}", message) {
                warn!("Could not record spawn failure in stderr log: {}", log_err);
            }
            return Ok(ProcessOutcome::SpawnFailed(message));
        }
    };

    tokio::select! {
        status = child.wait() => {
            let status = status
                .map_err(|e| FilesystemError::new("wait for process", &command.program, e))?;
            debug!(stage = %stage, code = ?status.code(), "Stage process exited.");
            Ok(ProcessOutcome::Exited {
                code: status.code(),
                success: status.success(),
            })
        }
        _ = cancel.cancelled() => {
            warn!(stage = %stage, "Cancellation requested, terminating stage process.");
            if let Err(e) = child.kill().await {
                warn!(stage = %stage, "Failed to kill stage process: {}", e);
            }
            Ok(ProcessOutcome::Cancelled)
        }
    }
}
