//! Pipeline error types.

use crate::completion::CompletionError;

/// Errors that stop a run before any stage executes.
///
/// Per-stage problems never surface here; they are recorded as a failed
/// [`StageResult`](super::StageResult) and the run continues.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Please provide both API key and topic! (missing API key)")]
    MissingApiKey,

    #[error("Please provide both API key and topic! (missing topic)")]
    MissingTopic,

    #[error("Failed to initialize: {0}")]
    Init(#[from] CompletionError),
}
