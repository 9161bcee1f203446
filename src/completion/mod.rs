//! Streaming chat-completion client.
//!
//! The pipeline only needs one operation from the remote model: send a system
//! prompt and a user prompt, then read the reply back as an ordered sequence
//! of text deltas. [`CompletionClient`] is that seam; [`OpenAiClient`] is the
//! HTTP implementation.

mod error;
mod openai;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

pub use error::CompletionError;
pub use openai::OpenAiClient;

/// Sampling temperature used for every stage.
pub const TEMPERATURE: f64 = 0.7;

/// Output token cap used for every stage.
pub const MAX_TOKENS: u32 = 1000;

/// One streaming chat-completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub stream: bool,
}

impl CompletionRequest {
    /// Build a streaming request with the fixed sampling settings.
    pub fn new(
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            stream: true,
        }
    }
}

/// Text deltas in arrival order. The stream ending is the completion signal.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, CompletionError>> + Send>>;

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Start a completion and return its delta stream.
    ///
    /// An `Err` here means the call never started (network, auth, bad status).
    async fn stream(&self, request: &CompletionRequest) -> Result<DeltaStream, CompletionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_fixed_sampling_settings() {
        let request = CompletionRequest::new("gpt-4o-mini", "system", "user");

        assert_eq!(request.temperature, 0.7);
        assert_eq!(request.max_tokens, 1000);
        assert!(request.stream);
    }
}
