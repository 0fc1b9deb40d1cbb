use crate::core::config::SimulationConfig;
use crate::core::layout::{self, FilesystemError, RunLayout};
use crate::core::stage::Stage;
use crate::engine::discovery::SelectedEngine;
use crate::engine::error::{PipelineError, StageFailure};
use crate::engine::pipeline::PipelineOutcome;
use crate::engine::state::{StageRecord, StageState};
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::PathBuf;
use tracing::{info, warn};

/// Overall outcome of a workflow, as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    ValidationFailed {
        message: String,
    },
    EngineNotFound {
        message: String,
    },
    StageFailed {
        stage: Stage,
        exit_code: Option<i32>,
        reason: StageFailure,
        log_excerpt: String,
    },
    FilesystemError {
        message: String,
    },
    TemplateError {
        stage: Stage,
        message: String,
    },
    Cancelled {
        stage: Stage,
    },
    Internal {
        message: String,
    },
}

impl RunStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Success)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Success => f.write_str("success"),
            RunStatus::ValidationFailed { message } => write!(f, "validation failed: {}", message),
            RunStatus::EngineNotFound { message } => write!(f, "engine not found: {}", message),
            RunStatus::StageFailed { stage, reason, .. } => {
                write!(f, "stage '{}' failed: {}", stage, reason)
            }
            RunStatus::FilesystemError { message } => write!(f, "filesystem error: {}", message),
            RunStatus::TemplateError { message, .. } => write!(f, "template error: {}", message),
            RunStatus::Cancelled { stage } => write!(f, "cancelled during stage '{}'", stage),
            RunStatus::Internal { message } => write!(f, "internal error: {}", message),
        }
    }
}

impl From<&PipelineError> for RunStatus {
    fn from(err: &PipelineError) -> Self {
        match err {
            PipelineError::Validation(e) => RunStatus::ValidationFailed {
                message: e.to_string(),
            },
            PipelineError::EngineNotFound { .. } => RunStatus::EngineNotFound {
                message: err.to_string(),
            },
            PipelineError::Template(e) => RunStatus::TemplateError {
                stage: e.stage(),
                message: e.to_string(),
            },
            PipelineError::StageExecution {
                stage,
                exit_code,
                reason,
                log_excerpt,
            } => RunStatus::StageFailed {
                stage: *stage,
                exit_code: *exit_code,
                reason: reason.clone(),
                log_excerpt: log_excerpt.clone(),
            },
            PipelineError::Filesystem(e) => RunStatus::FilesystemError {
                message: e.to_string(),
            },
            PipelineError::Cancelled { stage } => RunStatus::Cancelled { stage: *stage },
            PipelineError::Internal(message) => RunStatus::Internal {
                message: message.clone(),
            },
        }
    }
}

/// Everything a caller needs to know about one workflow invocation.
///
/// Paths are only filled in for artifacts that were actually produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    #[serde(flatten)]
    pub status: RunStatus,
    pub output_dir: Option<PathBuf>,
    pub config: Option<SimulationConfig>,
    pub engine: Option<SelectedEngine>,
    pub stages: Vec<StageRecord>,
    pub decks: Vec<PathBuf>,
    pub topology_path: Option<PathBuf>,
    pub solvated_structure_path: Option<PathBuf>,
    pub solvated_atoms: Option<usize>,
    /// Coordinates written by the last planned stage.
    pub final_coordinates_path: Option<PathBuf>,
    pub final_trajectory_path: Option<PathBuf>,
    pub summary_path: Option<PathBuf>,
}

impl RunReport {
    pub fn new(status: RunStatus) -> Self {
        Self {
            status,
            output_dir: None,
            config: None,
            engine: None,
            stages: Vec::new(),
            decks: Vec::new(),
            topology_path: None,
            solvated_structure_path: None,
            solvated_atoms: None,
            final_coordinates_path: None,
            final_trajectory_path: None,
            summary_path: None,
        }
    }

    pub fn from_error(err: &PipelineError) -> Self {
        Self::new(RunStatus::from(err))
    }

    pub fn with_config(mut self, config: SimulationConfig) -> Self {
        self.output_dir = Some(config.output_dir().to_path_buf());
        self.config = Some(config);
        self
    }

    /// Folds a finished pipeline into a report.
    pub fn from_outcome(
        config: SimulationConfig,
        engine: Option<SelectedEngine>,
        outcome: PipelineOutcome,
    ) -> Self {
        let status = outcome
            .error
            .as_ref()
            .map_or(RunStatus::Success, RunStatus::from);
        let layout = RunLayout::new(config.output_dir());

        let mut report = Self::new(status).with_config(config);
        report.engine = engine;
        report.decks = outcome
            .records
            .iter()
            .map(|r| layout.deck(r.stage))
            .filter(|path| path.is_file())
            .collect();

        let prep_succeeded = outcome
            .records
            .iter()
            .any(|r| r.stage == Stage::Prep && r.state == StageState::Succeeded);
        if prep_succeeded {
            report.topology_path = Some(layout.topology());
            let solvated = layout.solvated_structure();
            if solvated.is_file() {
                match layout::count_atoms(&solvated) {
                    Ok(count) => report.solvated_atoms = Some(count),
                    Err(e) => warn!("Could not count solvated atoms: {}", e),
                }
                report.solvated_structure_path = Some(solvated);
            }
        }

        if outcome.succeeded() {
            if let Some(last) = outcome.records.last().and_then(|r| r.result.as_ref()) {
                report.final_coordinates_path = last.coordinates.clone();
                report.final_trajectory_path = last.trajectory.clone();
            }
        }

        report.stages = outcome.records;
        report
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Writes the report as JSON into the run directory and records where.
    ///
    /// A report without a run directory has nowhere to go and is left unwritten.
    pub fn write_summary(&mut self) -> Result<Option<PathBuf>, FilesystemError> {
        let Some(dir) = &self.output_dir else {
            return Ok(None);
        };
        let path = RunLayout::new(dir).summary();
        self.summary_path = Some(path.clone());

        let written = serde_json::to_string_pretty(self)
            .map_err(|e| FilesystemError::new("serialize run summary", &path, io::Error::other(e)))
            .and_then(|json| layout::write_file(&path, &json));
        if let Err(e) = written {
            self.summary_path = None;
            return Err(e);
        }
        info!("Run summary written to {:?}", path);
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ValidationError;
    use crate::core::deck::TemplateError;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn pipeline_errors_map_onto_the_status_taxonomy() {
        let status = RunStatus::from(&PipelineError::Validation(
            ValidationError::NonPositiveSimTime(-1.0),
        ));
        assert!(matches!(status, RunStatus::ValidationFailed { .. }));

        let status = RunStatus::from(&PipelineError::StageExecution {
            stage: Stage::EquilNpt,
            exit_code: Some(2),
            reason: StageFailure::NonZeroExit { code: Some(2) },
            log_excerpt: "vlimit exceeded".to_string(),
        });
        assert_eq!(
            status,
            RunStatus::StageFailed {
                stage: Stage::EquilNpt,
                exit_code: Some(2),
                reason: StageFailure::NonZeroExit { code: Some(2) },
                log_excerpt: "vlimit exceeded".to_string(),
            }
        );
        assert_eq!(status.to_string(), "stage 'equil_npt' failed: exited with code 2");

        let status = RunStatus::from(&PipelineError::Template(TemplateError::MissingValue {
            stage: Stage::HeatNvt,
            key: "nstlim".to_string(),
        }));
        assert!(matches!(
            status,
            RunStatus::TemplateError {
                stage: Stage::HeatNvt,
                ..
            }
        ));
    }

    #[test]
    fn status_is_flattened_into_the_report_json() {
        let report = RunReport::new(RunStatus::StageFailed {
            stage: Stage::MinFree,
            exit_code: Some(0),
            reason: StageFailure::MissingOutputs {
                missing: vec![PathBuf::from("min_free.rst7")],
            },
            log_excerpt: String::new(),
        });
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "stage_failed");
        assert_eq!(json["stage"], "min_free");
        assert_eq!(json["exit_code"], 0);
        assert_eq!(json["reason"]["kind"], "missing_outputs");
        assert!(json["final_trajectory_path"].is_null());

        let json = serde_json::to_value(RunReport::new(RunStatus::Success)).unwrap();
        assert_eq!(json["status"], "success");
    }

    #[test]
    fn summary_needs_a_run_directory() {
        let mut report = RunReport::new(RunStatus::Success);
        assert!(report.write_summary().unwrap().is_none());
        assert!(report.summary_path.is_none());
    }

    #[test]
    fn summary_is_written_into_the_run_directory() {
        let dir = tempdir().unwrap();
        let mut report = RunReport::new(RunStatus::Cancelled {
            stage: Stage::ProdNpt,
        });
        report.output_dir = Some(dir.path().to_path_buf());

        let path = report.write_summary().unwrap().unwrap();
        assert_eq!(path, dir.path().join("run_summary.json"));
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["status"], "cancelled");
        assert_eq!(json["stage"], "prod_npt");
        assert_eq!(json["summary_path"], path.to_str().unwrap());
    }
}
