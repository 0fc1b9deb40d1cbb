use crate::core::config::{ConfigError, ValidationError};
use crate::core::deck::{DeckError, TemplateError};
use crate::core::layout::FilesystemError;
use crate::core::stage::Stage;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Why a stage ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageFailure {
    /// The process exited unsuccessfully. `code` is `None` when it was killed by a signal.
    NonZeroExit { code: Option<i32> },
    /// The process exited cleanly but expected output files are absent or empty.
    MissingOutputs { missing: Vec<PathBuf> },
    /// The process could not be started.
    Spawn { message: String },
    Cancelled,
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageFailure::NonZeroExit { code: Some(code) } => write!(f, "exited with code {}", code),
            StageFailure::NonZeroExit { code: None } => f.write_str("terminated by a signal"),
            StageFailure::MissingOutputs { missing } => {
                let names: Vec<_> = missing
                    .iter()
                    .map(|p| {
                        p.file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_else(|| p.display().to_string())
                    })
                    .collect();
                write!(f, "exited cleanly but did not produce {}", names.join(", "))
            }
            StageFailure::Spawn { message } => write!(f, "could not be started: {}", message),
            StageFailure::Cancelled => f.write_str("was cancelled"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("No {role} found (looked for: {probed})")]
    EngineNotFound { role: &'static str, probed: String },

    #[error("Input deck generation failed: {0}")]
    Template(#[from] TemplateError),

    #[error("Stage '{stage}' {reason}")]
    StageExecution {
        stage: Stage,
        exit_code: Option<i32>,
        reason: StageFailure,
        log_excerpt: String,
    },

    #[error("Filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),

    #[error("Run cancelled during stage '{stage}'")]
    Cancelled { stage: Stage },

    #[error("Internal logic error: {0}")]
    Internal(String),
}

impl From<ConfigError> for PipelineError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation(e) => PipelineError::Validation(e),
            ConfigError::Filesystem(e) => PipelineError::Filesystem(e),
        }
    }
}

impl From<DeckError> for PipelineError {
    fn from(err: DeckError) -> Self {
        match err {
            DeckError::Template(e) => PipelineError::Template(e),
            DeckError::Filesystem(e) => PipelineError::Filesystem(e),
        }
    }
}

impl PipelineError {
    /// The stage the error is attributed to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::StageExecution { stage, .. } | PipelineError::Cancelled { stage } => {
                Some(*stage)
            }
            PipelineError::Template(e) => Some(e.stage()),
            _ => None,
        }
    }
}
