//! Caller-owned run state and the updates that drive it.

use crate::constants::STAGE_FAILURE_MESSAGE;
use crate::stages::{PipelineStage, StageCatalog, StageStatus};
use serde::Serialize;
use serde_json::Value;

/// A single stage transition announced to the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct StageUpdate {
    pub index: usize,
    pub status: StageStatus,
    pub output: Option<Value>,
}

impl StageUpdate {
    pub fn running(index: usize) -> Self {
        Self {
            index,
            status: StageStatus::Running,
            output: None,
        }
    }

    pub fn completed(index: usize, output: Value) -> Self {
        Self {
            index,
            status: StageStatus::Completed,
            output: Some(output),
        }
    }
}

/// State of one invocation: the stage list, which stage is current, and the final response.
///
/// Owned by the caller for the duration of a run and discarded on the next run or reset.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PipelineRun {
    stages: Vec<PipelineStage>,
    current_stage_index: usize,
    running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    final_output: Option<Value>,
}

impl PipelineRun {
    /// Idle run with every stage pending.
    pub fn new(catalog: &StageCatalog) -> Self {
        Self {
            stages: catalog.iter().map(PipelineStage::pending).collect(),
            current_stage_index: 0,
            running: false,
            final_output: None,
        }
    }

    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    pub fn stage(&self, index: usize) -> Option<&PipelineStage> {
        self.stages.get(index)
    }

    pub fn current_stage_index(&self) -> usize {
        self.current_stage_index
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn final_output(&self) -> Option<&Value> {
        self.final_output.as_ref()
    }

    /// Resets every stage to pending and marks the run active.
    pub fn begin(&mut self) {
        self.reset();
        self.running = true;
    }

    /// Applies a stage transition. Updates for unknown indices are ignored.
    pub fn apply(&mut self, update: StageUpdate) {
        let Some(stage) = self.stages.get_mut(update.index) else {
            tracing::warn!("ignoring update for unknown stage index {}", update.index);
            return;
        };
        self.current_stage_index = update.index;
        stage.status = update.status;
        stage.output = update.output;
    }

    /// Marks the run finished and stores the raw upstream response.
    pub fn finish(&mut self, final_output: Value) {
        self.running = false;
        self.final_output = Some(final_output);
    }

    /// Marks the run failed; only the current stage is flagged.
    pub fn fail(&mut self) {
        self.running = false;
        if let Some(stage) = self.stages.get_mut(self.current_stage_index) {
            stage.status = StageStatus::Error;
            stage.error = Some(STAGE_FAILURE_MESSAGE.to_string());
        }
    }

    /// Back to the idle, all-pending state.
    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.status = StageStatus::Pending;
            stage.output = None;
            stage.error = None;
        }
        self.current_stage_index = 0;
        self.running = false;
        self.final_output = None;
    }

    /// Stages that completed with output, in order.
    pub fn completed_stages(&self) -> impl Iterator<Item = &PipelineStage> {
        self.stages
            .iter()
            .filter(|s| s.status == StageStatus::Completed && s.output.is_some())
    }

    /// Output of the stage with the given id, if it has one.
    pub fn output_of(&self, stage_id: &str) -> Option<&Value> {
        self.stages
            .iter()
            .find(|s| s.id == stage_id)
            .and_then(|s| s.output.as_ref())
    }
}
