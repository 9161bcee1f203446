//! Content generation pipeline.
//!
//! The pipeline runs a fixed list of stages, one after another:
//! 1. ideas
//! 2. titles
//! 3. keywords
//! 4. description
//! 5. hook
//! 6. outline
//! 7. script
//!
//! Each stage sends its prompt template as the system prompt and a user
//! message built from the topic and every earlier successful output. A stage
//! that fails is recorded and skipped as context; the run always continues.

mod context;
mod error;
mod events;
mod request;
mod result;
mod stage;

use context::RunContext;
pub use error::PipelineError;
pub use events::{PipelineEvent, PipelineObserver};
pub use request::GenerationRequest;
pub use result::{RunReport, SessionState, StageFailure, StageOutcome, StageResult};
pub use stage::{Stage, default_stages};

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::completion::{CompletionClient, CompletionRequest};
use crate::prompt::PromptResolver;

/// The content generation pipeline.
///
/// The stage list is fixed once the pipeline is built; `run` only borrows it.
pub struct Pipeline {
    stages: Vec<Stage>,
    prompts: PromptResolver,
}

impl Pipeline {
    /// Create an empty pipeline with no stages.
    pub fn new(prompts: PromptResolver) -> Self {
        Self {
            stages: Vec::new(),
            prompts,
        }
    }

    /// Create the pipeline with the standard stages.
    pub fn default_pipeline(prompts: PromptResolver) -> Self {
        let mut pipeline = Self::new(prompts);
        for stage in default_stages() {
            pipeline.add_stage(stage);
        }
        pipeline
    }

    /// Add a stage to the end of the pipeline.
    pub fn add_stage(&mut self, stage: Stage) -> &mut Self {
        self.stages.push(stage);
        self
    }

    /// All stages in order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run every stage in order.
    ///
    /// Fails only when the request is unusable, in which case no stage runs.
    /// Otherwise each stage's result is written to `session` and the returned
    /// report lists which stages succeeded. `cancel` is checked between
    /// stages, never while a response is streaming.
    pub async fn run<C, O>(
        &self,
        request: &GenerationRequest,
        client: &C,
        session: &mut SessionState,
        observer: &mut O,
        cancel: &CancellationToken,
    ) -> Result<RunReport, PipelineError>
    where
        C: CompletionClient + ?Sized,
        O: PipelineObserver + ?Sized,
    {
        request.validate()?;
        session.set_topic(&request.topic);

        tracing::info!(
            topic = %request.topic,
            model = %request.model,
            stages = self.stages.len(),
            "starting generation run"
        );
        observer.on_event(PipelineEvent::RunStarted {
            stages: self.stages.len(),
        });

        let mut ctx = RunContext::new(&request.topic);
        let mut report = RunReport::default();

        for (index, stage) in self.stages.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(stage = %stage.key, "run cancelled, skipping remaining stages");
                report.cancelled = true;
                break;
            }

            observer.on_event(PipelineEvent::StageStarted {
                key: stage.key.clone(),
                title: stage.title.clone(),
                index,
            });

            let outcome = self
                .run_stage(stage, &request.model, &ctx, client, observer)
                .await;
            report.executed += 1;

            match &outcome {
                StageOutcome::Succeeded(text) => {
                    tracing::info!(stage = %stage.key, chars = text.len(), "stage succeeded");
                    ctx.record_success(&stage.key, text);
                    report.succeeded.push(stage.key.clone());
                    progress(observer, stage, 100);
                    observer.on_event(PipelineEvent::StageCompleted {
                        key: stage.key.clone(),
                        text: text.clone(),
                    });
                }
                StageOutcome::Failed(failure) => {
                    tracing::warn!(stage = %stage.key, "stage failed: {failure}");
                    report.failed.push(stage.key.clone());
                    progress(observer, stage, 0);
                    observer.on_event(PipelineEvent::StageFailed {
                        key: stage.key.clone(),
                        message: failure.to_string(),
                    });
                }
            }

            session.record(StageResult::new(&stage.key, &outcome));
        }

        tracing::info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            cancelled = report.cancelled,
            "generation run finished"
        );
        observer.on_event(PipelineEvent::RunFinished {
            report: report.clone(),
        });

        Ok(report)
    }

    /// Generate one stage, streaming deltas to the observer.
    async fn run_stage<C, O>(
        &self,
        stage: &Stage,
        model: &str,
        ctx: &RunContext<'_>,
        client: &C,
        observer: &mut O,
    ) -> StageOutcome
    where
        C: CompletionClient + ?Sized,
        O: PipelineObserver + ?Sized,
    {
        progress(observer, stage, 25);

        // A resolution failure comes back as text and is still sent.
        let system_prompt = self.prompts.resolve(&stage.key);
        let user_prompt = ctx.user_prompt(&stage.key);
        let request = CompletionRequest::new(model, system_prompt, user_prompt);

        progress(observer, stage, 50);

        let mut deltas = match client.stream(&request).await {
            Ok(deltas) => deltas,
            Err(e) => {
                tracing::error!(stage = %stage.key, "error generating content: {e}");
                return StageOutcome::Failed(StageFailure::Start(e.to_string()));
            }
        };

        progress(observer, stage, 75);

        let mut text = String::new();
        while let Some(delta) = deltas.next().await {
            match delta {
                Ok(delta) if delta.is_empty() => {}
                Ok(delta) => {
                    text.push_str(&delta);
                    observer.on_event(PipelineEvent::Delta {
                        key: stage.key.clone(),
                        text: delta,
                    });
                }
                Err(e) => {
                    tracing::error!(stage = %stage.key, "error during streaming: {e}");
                    return StageOutcome::Failed(StageFailure::Stream(e.to_string()));
                }
            }
        }

        StageOutcome::classify(text)
    }
}

fn progress<O: PipelineObserver + ?Sized>(observer: &mut O, stage: &Stage, percent: u8) {
    observer.on_event(PipelineEvent::Progress {
        key: stage.key.clone(),
        percent,
    });
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::completion::{CompletionError, DeltaStream};
    use crate::prompt::{MemoryStore, default_store};

    /// How the scripted client answers one call.
    enum Reply {
        Text(Vec<&'static str>),
        StartError(&'static str),
        BreakAfter(Vec<&'static str>, &'static str),
    }

    /// Answers calls in order and remembers every request.
    struct ScriptedClient {
        replies: Mutex<VecDeque<Reply>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn stream(
            &self,
            request: &CompletionRequest,
        ) -> Result<DeltaStream, CompletionError> {
            self.requests.lock().unwrap().push(request.clone());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("more calls than scripted replies");

            let items: Vec<Result<String, CompletionError>> = match reply {
                Reply::Text(deltas) => deltas.into_iter().map(|d| Ok(d.to_string())).collect(),
                Reply::StartError(msg) => return Err(CompletionError::Api(msg.to_string())),
                Reply::BreakAfter(deltas, msg) => deltas
                    .into_iter()
                    .map(|d| Ok(d.to_string()))
                    .chain(std::iter::once(Err(CompletionError::Stream(msg.to_string()))))
                    .collect(),
            };
            Ok(Box::pin(futures_util::stream::iter(items)))
        }
    }

    fn pipeline_with(keys: &[&str]) -> Pipeline {
        let mut pipeline = Pipeline::new(PromptResolver::new(default_store()));
        for key in keys {
            pipeline.add_stage(Stage::from_key(*key));
        }
        pipeline
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new("sk-test", "cats", "gpt-4o-mini")
    }

    async fn run_collecting(
        pipeline: &Pipeline,
        request: &GenerationRequest,
        client: &ScriptedClient,
        session: &mut SessionState,
    ) -> (Result<RunReport, PipelineError>, Vec<PipelineEvent>) {
        let mut events = Vec::new();
        let result = pipeline
            .run(
                request,
                client,
                session,
                &mut |event: PipelineEvent| events.push(event),
                &CancellationToken::new(),
            )
            .await;
        (result, events)
    }

    #[tokio::test]
    async fn test_two_stage_run_builds_expected_prompts() {
        let pipeline = pipeline_with(&["ideas", "titles"]);
        let client = ScriptedClient::new(vec![
            Reply::Text(vec!["<ideas-", "text>"]),
            Reply::Text(vec!["Top 10 cats"]),
        ]);
        let mut session = SessionState::new();

        let (result, _) = run_collecting(&pipeline, &request(), &client, &mut session).await;

        let report = result.unwrap();
        assert_eq!(report.succeeded, vec!["ideas", "titles"]);

        let requests = client.requests();
        assert_eq!(
            requests[1].user_prompt,
            "Topic: cats\nPrevious content:\nideas: <ideas-text>\n\nGenerate titles."
        );
        assert_eq!(requests[1].model, "gpt-4o-mini");
        assert_eq!(requests[1].temperature, 0.7);
        assert_eq!(requests[1].max_tokens, 1000);
        assert!(requests[1].stream);

        assert_eq!(session.succeeded_text("ideas"), Some("<ideas-text>"));
        assert_eq!(session.succeeded_text("titles"), Some("Top 10 cats"));
        assert_eq!(session.topic(), Some("cats"));
    }

    #[tokio::test]
    async fn test_default_stages_each_see_all_earlier_outputs() {
        let pipeline = Pipeline::default_pipeline(PromptResolver::new(default_store()));
        let outputs = ["I", "T", "K", "D", "H", "O", "S"];
        let client = ScriptedClient::new(outputs.iter().map(|o| Reply::Text(vec![*o])).collect());
        let mut session = SessionState::new();

        let (result, _) = run_collecting(&pipeline, &request(), &client, &mut session).await;
        assert_eq!(result.unwrap().executed, 7);

        let requests = client.requests();
        let stages = pipeline.stages();
        for (i, req) in requests.iter().enumerate() {
            let expected_context = stages[..i]
                .iter()
                .zip(outputs)
                .map(|(s, o)| format!("{}: {}", s.key, o))
                .collect::<Vec<_>>()
                .join("\n");
            assert_eq!(
                req.user_prompt,
                format!(
                    "Topic: cats\nPrevious content:\n{}\n\nGenerate {}.",
                    expected_context, stages[i].key
                )
            );
        }
    }

    #[tokio::test]
    async fn test_failed_stage_is_excluded_and_run_continues() {
        let pipeline = pipeline_with(&["ideas", "titles", "keywords", "description"]);
        let client = ScriptedClient::new(vec![
            Reply::Text(vec!["ideas!"]),
            Reply::StartError("HTTP 500: upstream"),
            Reply::Text(vec!["Error: model refused"]),
            Reply::Text(vec!["desc"]),
        ]);
        let mut session = SessionState::new();

        let (result, _) = run_collecting(&pipeline, &request(), &client, &mut session).await;
        let report = result.unwrap();

        assert_eq!(report.executed, 4);
        assert_eq!(report.succeeded, vec!["ideas", "description"]);
        assert_eq!(report.failed, vec!["titles", "keywords"]);
        assert!(!report.cancelled);

        let requests = client.requests();
        assert_eq!(requests.len(), 4);
        // Neither failed stage reaches the context of later stages.
        assert!(requests[2].user_prompt.contains("\nideas: ideas!\n\n"));
        assert!(requests[3].user_prompt.contains("\nideas: ideas!\n\n"));
        assert!(!requests[3].user_prompt.contains("titles:"));
        assert!(!requests[3].user_prompt.contains("model refused"));

        let titles = session.get("titles").unwrap();
        assert!(!titles.succeeded);
        assert_eq!(
            titles.text,
            "Error: Failed to generate content: API error: HTTP 500: upstream"
        );
        let keywords = session.get("keywords").unwrap();
        assert!(!keywords.succeeded);
        assert_eq!(keywords.text, "Error: model refused");
    }

    #[tokio::test]
    async fn test_stream_failure_discards_partial_text() {
        let pipeline = pipeline_with(&["ideas", "titles"]);
        let client = ScriptedClient::new(vec![
            Reply::BreakAfter(vec!["half an "], "connection reset"),
            Reply::Text(vec!["titles"]),
        ]);
        let mut session = SessionState::new();

        let (result, events) = run_collecting(&pipeline, &request(), &client, &mut session).await;

        assert_eq!(result.unwrap().failed, vec!["ideas"]);
        assert_eq!(
            session.get("ideas").unwrap().text,
            "Error during streaming: stream error: connection reset"
        );
        assert!(client.requests()[1].user_prompt.contains("Previous content:\n\n\n"));
        assert!(events.contains(&PipelineEvent::StageFailed {
            key: "ideas".to_string(),
            message: "Error during streaming: stream error: connection reset".to_string(),
        }));
    }

    #[tokio::test]
    async fn test_missing_credential_or_topic_runs_nothing() {
        let pipeline = pipeline_with(&["ideas", "titles"]);

        for request in [
            GenerationRequest::new("", "cats", "gpt-4o-mini"),
            GenerationRequest::new("sk-test", "", "gpt-4o-mini"),
        ] {
            let client = ScriptedClient::new(vec![]);
            let mut session = SessionState::new();

            let (result, events) = run_collecting(&pipeline, &request, &client, &mut session).await;

            assert!(result.is_err());
            assert!(client.requests().is_empty());
            assert!(events.is_empty());
            assert!(session.is_empty());
            assert!(session.topic().is_none());
        }
    }

    #[tokio::test]
    async fn test_unresolvable_prompt_is_still_sent() {
        let mut pipeline = Pipeline::new(PromptResolver::new(MemoryStore::new()));
        pipeline.add_stage(Stage::from_key("thumbnail"));
        let client = ScriptedClient::new(vec![Reply::Text(vec!["ok"])]);
        let mut session = SessionState::new();

        let (result, _) = run_collecting(&pipeline, &request(), &client, &mut session).await;

        assert_eq!(result.unwrap().succeeded, vec!["thumbnail"]);
        assert_eq!(
            client.requests()[0].system_prompt,
            "Prompt file thumbnail.md not found"
        );
    }

    #[tokio::test]
    async fn test_deltas_concatenate_to_final_text() {
        let pipeline = pipeline_with(&["script"]);
        let client = ScriptedClient::new(vec![Reply::Text(vec!["Hello", "", ", ", "world", "!"])]);
        let mut session = SessionState::new();

        let (_, events) = run_collecting(&pipeline, &request(), &client, &mut session).await;

        let streamed: String = events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::Delta { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        let completed = events.iter().find_map(|e| match e {
            PipelineEvent::StageCompleted { text, .. } => Some(text.clone()),
            _ => None,
        });

        assert_eq!(streamed, "Hello, world!");
        assert_eq!(completed.as_deref(), Some("Hello, world!"));
        assert_eq!(session.succeeded_text("script"), Some("Hello, world!"));
    }

    #[tokio::test]
    async fn test_progress_milestones() {
        let pipeline = pipeline_with(&["ideas", "titles"]);
        let client = ScriptedClient::new(vec![
            Reply::Text(vec!["ok"]),
            Reply::StartError("down"),
        ]);
        let mut session = SessionState::new();

        let (_, events) = run_collecting(&pipeline, &request(), &client, &mut session).await;

        let percents = |key: &str| -> Vec<u8> {
            events
                .iter()
                .filter_map(|e| match e {
                    PipelineEvent::Progress { key: k, percent } if k == key => Some(*percent),
                    _ => None,
                })
                .collect()
        };
        assert_eq!(percents("ideas"), vec![25, 50, 75, 100]);
        assert_eq!(percents("titles"), vec![25, 50, 0]);

        assert!(matches!(events.first(), Some(PipelineEvent::RunStarted { stages: 2 })));
        assert!(matches!(events.last(), Some(PipelineEvent::RunFinished { .. })));
    }

    #[tokio::test]
    async fn test_cancellation_is_checked_between_stages() {
        let pipeline = pipeline_with(&["ideas", "titles", "keywords"]);
        let client = ScriptedClient::new(vec![Reply::Text(vec!["ideas"])]);
        let mut session = SessionState::new();
        let cancel = CancellationToken::new();

        let token = cancel.clone();
        let mut observer = move |event: PipelineEvent| {
            if matches!(event, PipelineEvent::StageCompleted { .. }) {
                token.cancel();
            }
        };

        let report = pipeline
            .run(&request(), &client, &mut session, &mut observer, &cancel)
            .await
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.executed, 1);
        assert_eq!(client.requests().len(), 1);
        assert_eq!(session.len(), 1);
    }

    #[tokio::test]
    async fn test_rerun_overwrites_session_results() {
        let pipeline = pipeline_with(&["ideas"]);
        let mut session = SessionState::new();

        let client = ScriptedClient::new(vec![Reply::Text(vec!["first"])]);
        run_collecting(&pipeline, &request(), &client, &mut session).await.0.unwrap();
        assert_eq!(session.succeeded_text("ideas"), Some("first"));

        let client = ScriptedClient::new(vec![Reply::StartError("down")]);
        run_collecting(&pipeline, &request(), &client, &mut session).await.0.unwrap();

        assert_eq!(session.len(), 1);
        assert!(!session.get("ideas").unwrap().succeeded);
    }
}
