//! Browser front end: page rendering, streamed generation runs and downloads.

mod sessions;

use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::stream::Stream;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use sessions::SessionStore;

use crate::completion::OpenAiClient;
use crate::config::{Config, MarkdownConfig};
use crate::markdown::render_markdown;
use crate::pipeline::{
    GenerationRequest, Pipeline, PipelineError, PipelineEvent, SessionState, StageOutcome,
    StageResult,
};
use crate::render::{IndexContext, RenderError, Renderer, SectionContext};
use crate::util::download_file_name;

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    pipeline: Arc<Pipeline>,
    renderer: Arc<Renderer>,
    sessions: SessionStore,
}

impl AppState {
    pub fn new(config: Config, pipeline: Pipeline, renderer: Renderer) -> Self {
        let sessions = SessionStore::new(&config.server);
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            renderer: Arc::new(renderer),
            sessions,
        }
    }

    /// Periodically drop idle sessions so they are freed even when no new run
    /// starts.
    pub fn spawn_session_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let sessions = self.sessions.clone();
        let period = self.config.server.session_idle().max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                sessions.prune_expired(Instant::now());
            }
        })
    }
}

/// Build the router for the web front end.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/sessions/{session}", get(session_handler))
        .route("/api/sessions/{session}/generate", post(generate_handler))
        .route(
            "/api/sessions/{session}/stages/{key}/download",
            get(download_handler),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Errors
// =============================================================================

/// An error answered with a status code and a JSON `{ "error": ... }` body.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<RenderError> for ApiError {
    fn from(e: RenderError) -> Self {
        tracing::error!("failed to render page: {e}");
        ApiError::Internal(e.to_string())
    }
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Debug, Deserialize)]
struct IndexQuery {
    session: Option<Uuid>,
}

/// Render the page, re-displaying the results of a known session.
///
/// An unknown or missing session id renders an empty page; the session is
/// only created once a run starts on it.
async fn index_handler(
    State(state): State<AppState>,
    Query(query): Query<IndexQuery>,
) -> Result<Html<String>, ApiError> {
    let session_id = query.session.unwrap_or_else(Uuid::new_v4);
    let session = state.sessions.get(&session_id).unwrap_or_default();
    let session_key = session_id.to_string();

    let sections = state
        .pipeline
        .stages()
        .iter()
        .map(|stage| {
            SectionContext::for_stage(stage, &session_key, &session, &state.config.markdown)
        })
        .collect();

    let html = state.renderer.render_index(&IndexContext {
        session_id: session_key,
        models: state.config.completion.models.clone(),
        sections,
    })?;

    Ok(Html(html))
}

/// Stored results of a session.
async fn session_handler(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionState>, ApiError> {
    state
        .sessions
        .get(&session_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("unknown session {session_id}")))
}

/// Start a generation run and stream its events.
///
/// Bad input is rejected before any stage runs. Each stage's result is stored
/// in the session before its event is streamed, so a completed stage can be
/// downloaded while later stages are still running. When the browser goes
/// away the run stops after the current stage.
async fn generate_handler(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<GenerationRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let request = request.with_default_model(state.config.completion.default_model());
    request.validate()?;
    let client =
        OpenAiClient::new(&request.api_key, &state.config.completion).map_err(PipelineError::Init)?;

    state.sessions.start_run(session_id, &request.topic);

    let (tx, mut rx) = mpsc::unbounded_channel::<PipelineEvent>();
    let cancel = CancellationToken::new();

    let run_state = state.clone();
    tokio::spawn(async move {
        let sessions = run_state.sessions.clone();
        let disconnected = cancel.clone();
        let mut observer = move |event: PipelineEvent| {
            if let Some(result) = stage_result(&event) {
                sessions.record(session_id, result);
            }
            if tx.send(event).is_err() && !disconnected.is_cancelled() {
                tracing::info!(%session_id, "client disconnected, stopping after current stage");
                disconnected.cancel();
            }
        };

        // Results reach the shared store through the observer; this copy is
        // only the run's own bookkeeping.
        let mut session = SessionState::new();
        let result = run_state
            .pipeline
            .run(&request, &client, &mut session, &mut observer, &cancel)
            .await;
        if let Err(e) = result {
            tracing::error!(%session_id, "generation run failed: {e}");
        }
    });

    let markdown = state.config.markdown.clone();
    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            yield Ok::<_, Infallible>(sse_event(&event, &markdown));
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// The stored result carried by a stage's final event.
fn stage_result(event: &PipelineEvent) -> Option<StageResult> {
    match event {
        PipelineEvent::StageCompleted { key, text } => Some(StageResult::new(
            key.as_str(),
            &StageOutcome::Succeeded(text.clone()),
        )),
        PipelineEvent::StageFailed { key, message } => Some(StageResult {
            key: key.clone(),
            text: message.clone(),
            succeeded: false,
        }),
        _ => None,
    }
}

/// Encode a pipeline event; completed stages also carry rendered HTML.
fn sse_event(event: &PipelineEvent, markdown: &MarkdownConfig) -> Event {
    let mut data = serde_json::to_value(event).unwrap_or_default();

    if let PipelineEvent::StageCompleted { text, .. } = event {
        let html = render_markdown(text, markdown).unwrap_or_else(|_| tera::escape_html(text));
        data["html"] = serde_json::Value::String(html);
    }

    Event::default().event(event.kind()).data(data.to_string())
}

#[derive(Debug, Deserialize)]
struct DownloadQuery {
    /// Overrides the topic stored with the session
    topic: Option<String>,
}

/// Serve a stored successful result as a markdown file.
async fn download_handler(
    State(state): State<AppState>,
    Path((session_id, key)): Path<(Uuid, String)>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let (text, stored_topic) = state
        .sessions
        .download(&session_id, &key)
        .ok_or_else(|| ApiError::NotFound(format!("no result for stage '{key}'")))?;

    let topic = query
        .topic
        .filter(|topic| !topic.is_empty())
        .or(stored_topic)
        .unwrap_or_default();
    let file_name = download_file_name(&key, &topic);

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/markdown; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, content_disposition(&file_name)),
        ],
        text,
    )
        .into_response())
}

/// RFC 5987 `attr-char`: everything else in `filename*` is percent-encoded.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// `attachment` header with an ASCII `filename` and, for non-ASCII names, a
/// UTF-8 `filename*`.
fn content_disposition(file_name: &str) -> HeaderValue {
    let fallback: String = file_name
        .chars()
        .filter(|c| !matches!(c, '"' | '\\'))
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '_' })
        .collect();

    let mut value = format!("attachment; filename=\"{fallback}\"");
    if !file_name.is_ascii() {
        value.push_str("; filename*=UTF-8''");
        value.extend(utf8_percent_encode(file_name, ATTR_CHAR));
    }

    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
