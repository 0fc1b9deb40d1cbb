use super::error::{PipelineError, StageFailure};
use crate::core::stage::{Stage, StageResult};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl StageState {
    pub fn is_terminal(self) -> bool {
        matches!(self, StageState::Succeeded | StageState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub state: StageState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<StageResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<StageFailure>,
}

/// Lifecycle bookkeeping for the stages of one run.
///
/// A stage may only start once every stage before it has succeeded, and each
/// stage moves through its states at most once.
#[derive(Debug, Clone)]
pub struct StageTracker {
    records: Vec<StageRecord>,
}

impl StageTracker {
    pub fn new(plan: impl IntoIterator<Item = Stage>) -> Self {
        let records = plan
            .into_iter()
            .map(|stage| StageRecord {
                stage,
                state: StageState::Pending,
                result: None,
                failure: None,
            })
            .collect();
        Self { records }
    }

    fn position(&self, stage: Stage) -> Result<usize, PipelineError> {
        self.records
            .iter()
            .position(|r| r.stage == stage)
            .ok_or_else(|| PipelineError::Internal(format!("stage '{}' is not planned", stage)))
    }

    fn transition(
        &mut self,
        stage: Stage,
        from: StageState,
        to: StageState,
    ) -> Result<&mut StageRecord, PipelineError> {
        let index = self.position(stage)?;
        let record = &mut self.records[index];
        if record.state != from {
            return Err(PipelineError::Internal(format!(
                "stage '{}' cannot move from {:?} to {:?}",
                stage, record.state, to
            )));
        }
        record.state = to;
        Ok(record)
    }

    /// `Pending → Running`.
    pub fn begin(&mut self, stage: Stage) -> Result<(), PipelineError> {
        let index = self.position(stage)?;
        if let Some(blocker) = self.records[..index]
            .iter()
            .find(|r| r.state != StageState::Succeeded)
        {
            return Err(PipelineError::Internal(format!(
                "stage '{}' cannot start while '{}' is {:?}",
                stage, blocker.stage, blocker.state
            )));
        }
        self.transition(stage, StageState::Pending, StageState::Running)?;
        Ok(())
    }

    /// `Running → Succeeded`.
    pub fn succeed(&mut self, stage: Stage, result: StageResult) -> Result<(), PipelineError> {
        let record = self.transition(stage, StageState::Running, StageState::Succeeded)?;
        record.result = Some(result);
        Ok(())
    }

    /// `Running → Failed`.
    pub fn fail(
        &mut self,
        stage: Stage,
        result: StageResult,
        failure: StageFailure,
    ) -> Result<(), PipelineError> {
        let record = self.transition(stage, StageState::Running, StageState::Failed)?;
        record.result = Some(result);
        record.failure = Some(failure);
        Ok(())
    }

    pub fn state(&self, stage: Stage) -> Option<StageState> {
        self.records
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| r.state)
    }

    /// Result of the most recent successful stage.
    pub fn last_success(&self) -> Option<&StageResult> {
        self.records
            .iter()
            .rev()
            .filter(|r| r.state == StageState::Succeeded)
            .find_map(|r| r.result.as_ref())
    }

    pub fn records(&self) -> &[StageRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<StageRecord> {
        self.records
    }
}
