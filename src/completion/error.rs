/// Errors from the completion API.
#[derive(thiserror::Error, Debug)]
pub enum CompletionError {
    #[error("failed to initialize client: {0}")]
    Init(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("stream error: {0}")]
    Stream(String),
}
