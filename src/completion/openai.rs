//! OpenAI-compatible `/chat/completions` client.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{CompletionClient, CompletionError, CompletionRequest, DeltaStream};
use crate::config::CompletionConfig;

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    /// Create a client for the configured API.
    ///
    /// Fails when the key is blank or the HTTP client cannot be built.
    pub fn new(api_key: &str, config: &CompletionConfig) -> Result<Self, CompletionError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(CompletionError::Init("no API key provided".to_string()));
        }

        let client = Client::builder()
            .user_agent(concat!("tubegen/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CompletionError::Init(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn stream(&self, request: &CompletionRequest) -> Result<DeltaStream, CompletionError> {
        tracing::debug!(model = %request.model, url = %self.endpoint(), "starting completion");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&build_body(request))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            return Err(CompletionError::Api(format!("HTTP {}: {}", status, text)));
        }

        let mut events = response.bytes_stream().eventsource();
        let stream = async_stream::stream! {
            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        yield Err(CompletionError::Stream(e.to_string()));
                        break;
                    }
                };

                match parse_sse_data(&event.data) {
                    Ok(SseChunk::Done) => break,
                    Ok(SseChunk::Delta(text)) => yield Ok(text),
                    Ok(SseChunk::Empty) => {}
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Build the JSON body for a streaming chat completion.
pub(crate) fn build_body(request: &CompletionRequest) -> Value {
    json!({
        "model": request.model,
        "messages": [
            { "role": "system", "content": request.system_prompt },
            { "role": "user", "content": request.user_prompt },
        ],
        "temperature": request.temperature,
        "max_tokens": request.max_tokens,
        "stream": request.stream,
    })
}

// --- Stream chunk parsing ---

#[derive(Debug, PartialEq)]
enum SseChunk {
    Delta(String),
    Empty,
    Done,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Deserialize, Default)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Interpret the `data:` payload of one SSE event.
fn parse_sse_data(data: &str) -> Result<SseChunk, CompletionError> {
    let data = data.trim();
    if data.is_empty() {
        return Ok(SseChunk::Empty);
    }
    if data == "[DONE]" {
        return Ok(SseChunk::Done);
    }

    let chunk: StreamChunk = serde_json::from_str(data)
        .map_err(|e| CompletionError::Stream(format!("invalid chunk: {e}")))?;

    if let Some(error) = chunk.error {
        return Err(CompletionError::Api(error.message));
    }

    match chunk.choices.into_iter().next().and_then(|c| c.delta.content) {
        Some(text) if !text.is_empty() => Ok(SseChunk::Delta(text)),
        _ => Ok(SseChunk::Empty),
    }
}
