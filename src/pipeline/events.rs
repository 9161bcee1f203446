//! Progress events emitted while a run executes.

use serde::Serialize;

use super::RunReport;

/// Something that happened during a run, in the order it happened.
///
/// `Delta` events carry partial text for display only; the final text of a
/// stage is the one in `StageCompleted`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    RunStarted { stages: usize },
    StageStarted { key: String, title: String, index: usize },
    Progress { key: String, percent: u8 },
    Delta { key: String, text: String },
    StageCompleted { key: String, text: String },
    StageFailed { key: String, message: String },
    RunFinished { report: RunReport },
}

impl PipelineEvent {
    /// Short name of the event kind (used as the SSE event name).
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineEvent::RunStarted { .. } => "run_started",
            PipelineEvent::StageStarted { .. } => "stage_started",
            PipelineEvent::Progress { .. } => "progress",
            PipelineEvent::Delta { .. } => "delta",
            PipelineEvent::StageCompleted { .. } => "stage_completed",
            PipelineEvent::StageFailed { .. } => "stage_failed",
            PipelineEvent::RunFinished { .. } => "run_finished",
        }
    }
}

/// Receives events from a running pipeline.
pub trait PipelineObserver: Send {
    fn on_event(&mut self, event: PipelineEvent);
}

impl<F> PipelineObserver for F
where
    F: FnMut(PipelineEvent) + Send,
{
    fn on_event(&mut self, event: PipelineEvent) {
        self(event)
    }
}
