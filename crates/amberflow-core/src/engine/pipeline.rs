use super::cancel::CancelToken;
use super::discovery::Toolchain;
use super::environment::EngineEnvironment;
use super::error::{PipelineError, StageFailure};
use super::executor::{self, ProcessOutcome, StageCommand};
use super::progress::{Progress, ProgressReporter};
use super::state::{StageRecord, StageState, StageTracker};
use crate::core::config::SimulationConfig;
use crate::core::deck;
use crate::core::layout::{self, RunLayout};
use crate::core::stage::{Stage, StageResult};
use tracing::{error, info};

/// Lines of the failing stage's log carried in the error.
pub const LOG_EXCERPT_LINES: usize = 20;

/// Everything a run produced: a record per planned stage and the error that
/// halted it, if any.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub records: Vec<StageRecord>,
    pub error: Option<PipelineError>,
}

impl PipelineOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
            && self
                .records
                .iter()
                .all(|r| r.state == StageState::Succeeded)
    }

    pub fn result(&self, stage: Stage) -> Option<&StageResult> {
        self.records
            .iter()
            .find(|r| r.stage == stage)
            .and_then(|r| r.result.as_ref())
    }
}

pub struct Pipeline<'a> {
    config: &'a SimulationConfig,
    layout: RunLayout,
    toolchain: &'a Toolchain,
    environment: &'a EngineEnvironment,
    reporter: &'a ProgressReporter<'a>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a SimulationConfig,
        toolchain: &'a Toolchain,
        environment: &'a EngineEnvironment,
        reporter: &'a ProgressReporter<'a>,
    ) -> Self {
        Self {
            config,
            layout: RunLayout::new(config.output_dir()),
            toolchain,
            environment,
            reporter,
        }
    }

    pub fn layout(&self) -> &RunLayout {
        &self.layout
    }

    /// Runs every stage from `prep` through `last`, stopping at the first failure.
    ///
    /// Stages after a failure stay `Pending`. Files written by any stage are
    /// left in place.
    pub async fn run_through(&self, last: Stage, cancel: &CancelToken) -> PipelineOutcome {
        let mut tracker = StageTracker::new(Stage::through(last));
        let error = self.drive(&mut tracker, last, cancel).await.err();
        PipelineOutcome {
            records: tracker.into_records(),
            error,
        }
    }

    async fn drive(
        &self,
        tracker: &mut StageTracker,
        last: Stage,
        cancel: &CancelToken,
    ) -> Result<(), PipelineError> {
        let total = last.index() + 1;
        let mut previous: Option<StageResult> = None;

        for stage in Stage::through(last) {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled { stage });
            }
            self.reporter.report(Progress::StageStart {
                stage,
                index: stage.index(),
                total,
            });

            let prepared = self.prepare(stage, previous.as_ref()).and_then(|command| {
                tracker.begin(stage)?;
                Ok(command)
            });
            let command = match prepared {
                Ok(command) => command,
                Err(e) => {
                    self.reporter.report(Progress::StageFinish {
                        stage,
                        succeeded: false,
                    });
                    return Err(e);
                }
            };
            info!(stage = %stage, "{}", stage.description());

            let outcome = match executor::execute(
                &command,
                self.environment,
                &self.layout,
                stage,
                cancel,
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    let result = StageResult::failed(stage, None, &self.layout);
                    tracker.fail(
                        stage,
                        result,
                        StageFailure::Spawn {
                            message: e.to_string(),
                        },
                    )?;
                    self.reporter.report(Progress::StageFinish {
                        stage,
                        succeeded: false,
                    });
                    return Err(e);
                }
            };

            let (exit_code, failure) = self.classify(stage, outcome);
            let Some(failure) = failure else {
                let result = StageResult::planned(stage, &self.layout);
                tracker.succeed(stage, result.clone())?;
                info!(stage = %stage, "Stage completed.");
                self.reporter.report(Progress::StageFinish {
                    stage,
                    succeeded: true,
                });
                previous = Some(result);
                continue;
            };

            let result = StageResult::failed(stage, exit_code, &self.layout);
            tracker.fail(stage, result, failure.clone())?;
            self.reporter.report(Progress::StageFinish {
                stage,
                succeeded: false,
            });

            if failure == StageFailure::Cancelled {
                return Err(PipelineError::Cancelled { stage });
            }
            error!(stage = %stage, exit_code = ?exit_code, "Stage failed: {}", failure);
            return Err(PipelineError::StageExecution {
                stage,
                exit_code,
                reason: failure,
                log_excerpt: self.log_excerpt(stage),
            });
        }

        Ok(())
    }

    /// Writes the stage's deck and assembles its command line.
    fn prepare(
        &self,
        stage: Stage,
        previous: Option<&StageResult>,
    ) -> Result<StageCommand, PipelineError> {
        deck::generate(self.config, &self.layout, stage, previous)?;
        executor::build_command(stage, self.toolchain, previous)
    }

    fn classify(
        &self,
        stage: Stage,
        outcome: ProcessOutcome,
    ) -> (Option<i32>, Option<StageFailure>) {
        match outcome {
            ProcessOutcome::Exited {
                code,
                success: true,
            } => {
                let missing = self.layout.missing_outputs(stage);
                let failure =
                    (!missing.is_empty()).then_some(StageFailure::MissingOutputs { missing });
                (code, failure)
            }
            ProcessOutcome::Exited {
                code,
                success: false,
            } => (code, Some(StageFailure::NonZeroExit { code })),
            ProcessOutcome::SpawnFailed(message) => (None, Some(StageFailure::Spawn { message })),
            ProcessOutcome::Cancelled => (None, Some(StageFailure::Cancelled)),
        }
    }

    fn log_excerpt(&self, stage: Stage) -> String {
        let stderr = layout::tail_lines(&self.layout.stderr_log(stage), LOG_EXCERPT_LINES);
        if !stderr.trim().is_empty() {
            return stderr;
        }
        layout::tail_lines(&self.layout.stdout_log(stage), LOG_EXCERPT_LINES)
    }
}
