//! Per-run user input.

use serde::Deserialize;

use super::PipelineError;

/// What the user supplied for one generation run. Never persisted.
#[derive(Clone, Default, Deserialize)]
pub struct GenerationRequest {
    /// Credential forwarded to the completion API
    #[serde(default)]
    pub api_key: String,
    /// Video topic
    #[serde(default)]
    pub topic: String,
    /// Model id to generate with
    #[serde(default)]
    pub model: String,
}

impl GenerationRequest {
    pub fn new(
        api_key: impl Into<String>,
        topic: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            topic: topic.into(),
            model: model.into(),
        }
    }

    /// Use `model` when the request did not name one.
    pub fn with_default_model(mut self, model: &str) -> Self {
        if self.model.trim().is_empty() {
            self.model = model.to_string();
        }
        self
    }

    /// Check that the run can start at all.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.api_key.trim().is_empty() {
            return Err(PipelineError::MissingApiKey);
        }
        if self.topic.trim().is_empty() {
            return Err(PipelineError::MissingTopic);
        }
        Ok(())
    }
}

impl std::fmt::Debug for GenerationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationRequest")
            .field("api_key", &"<redacted>")
            .field("topic", &self.topic)
            .field("model", &self.model)
            .finish()
    }
}
