//! Stage results and the per-session result cache.

use std::collections::HashMap;

use serde::Serialize;

/// Why a stage did not produce usable text.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StageFailure {
    /// The completion call could not be started.
    #[error("Error: Failed to generate content: {0}")]
    Start(String),

    /// The delta stream broke off; any partial text is discarded.
    #[error("Error during streaming: {0}")]
    Stream(String),

    /// The generated text itself reports an error.
    #[error("{0}")]
    ErrorMarker(String),
}

/// Outcome of one stage in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Succeeded(String),
    Failed(StageFailure),
}

/// Generated text starting with this marker is treated as a failure.
pub const ERROR_MARKER: &str = "Error";

impl StageOutcome {
    /// Classify fully accumulated text.
    pub fn classify(text: String) -> Self {
        if text.starts_with(ERROR_MARKER) {
            StageOutcome::Failed(StageFailure::ErrorMarker(text))
        } else {
            StageOutcome::Succeeded(text)
        }
    }
}

/// The stored result of a stage: generated text, or the failure message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageResult {
    pub key: String,
    pub text: String,
    pub succeeded: bool,
}

impl StageResult {
    pub fn new(key: impl Into<String>, outcome: &StageOutcome) -> Self {
        let (text, succeeded) = match outcome {
            StageOutcome::Succeeded(text) => (text.clone(), true),
            StageOutcome::Failed(failure) => (failure.to_string(), false),
        };
        Self {
            key: key.into(),
            text,
            succeeded,
        }
    }
}

/// Results of the most recent run of each stage, owned by the caller.
///
/// Re-running a stage overwrites its entry. There is no reset; the state lives
/// as long as the session that owns it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionState {
    /// Topic of the latest run, used to name downloads
    topic: Option<String>,
    results: HashMap<String, StageResult>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_topic(&mut self, topic: &str) {
        self.topic = Some(topic.to_string());
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    /// Store a result, replacing any earlier result for the same stage.
    pub fn record(&mut self, result: StageResult) {
        self.results.insert(result.key.clone(), result);
    }

    pub fn get(&self, key: &str) -> Option<&StageResult> {
        self.results.get(key)
    }

    /// Text of a stage whose latest run succeeded.
    pub fn succeeded_text(&self, key: &str) -> Option<&str> {
        self.results
            .get(key)
            .filter(|r| r.succeeded)
            .map(|r| r.text.as_str())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Summary of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Number of stages that were attempted
    pub executed: usize,
    /// Keys of stages that succeeded, in pipeline order
    pub succeeded: Vec<String>,
    /// Keys of stages that failed, in pipeline order
    pub failed: Vec<String>,
    /// Whether the run stopped early because it was cancelled
    pub cancelled: bool,
}
