use std::io::Write;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use crate::{
    GenerateArgs,
    completion::OpenAiClient,
    config::Config,
    pipeline::{
        GenerationRequest, Pipeline, PipelineError, PipelineEvent, PipelineObserver, RunReport,
        SessionState,
    },
    prompt::resolver_for_dir,
    util::disk_file_name,
};

pub async fn run(args: &GenerateArgs) -> Result<(), anyhow::Error> {
    let config = Config::load_from_arg(args.config_file.as_deref())?;

    let request = GenerationRequest::new(
        args.api_key.clone().unwrap_or_default(),
        args.topic.clone(),
        args.model.clone().unwrap_or_default(),
    )
    .with_default_model(config.completion.default_model());

    // Nothing runs unless both the credential and the client are usable.
    request.validate()?;
    let client =
        OpenAiClient::new(&request.api_key, &config.completion).map_err(PipelineError::Init)?;

    let pipeline = Pipeline::default_pipeline(resolver_for_dir(&config.prompts.dir));

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let mut session = SessionState::new();
    let mut observer = TerminalObserver::default();
    let report = pipeline
        .run(&request, &client, &mut session, &mut observer, &cancel)
        .await?;

    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| config.output.dir.clone());
    let written = write_results(&output_dir, &request.topic, &report, &session).await?;

    println!();
    for path in &written.written {
        println!("Wrote {}", path.display());
    }
    for (path, e) in &written.failed {
        eprintln!("Failed to write {}: {e}", path.display());
    }
    println!(
        "Generated {} of {} stage(s){}",
        report.succeeded.len(),
        pipeline.stages().len(),
        if report.cancelled { " (cancelled)" } else { "" }
    );
    if !report.failed.is_empty() {
        println!("Failed: {}", report.failed.join(", "));
    }

    if !written.failed.is_empty() {
        return Err(anyhow::anyhow!(
            "{} result file(s) could not be written",
            written.failed.len()
        ));
    }

    Ok(())
}

/// Cancel between stages on the first Ctrl+C, exit on the second.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nStopping after the current stage (Ctrl+C again to quit)...");
            cancel.cancel();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}

/// Files produced by [`write_results`].
#[derive(Debug, Default)]
struct WrittenResults {
    written: Vec<PathBuf>,
    failed: Vec<(PathBuf, std::io::Error)>,
}

/// Write every succeeded stage of the run to `{output_dir}/{key}_{topic}.md`.
///
/// A file that cannot be written is reported and the remaining stages are
/// still written. Only failing to create `output_dir` is an error.
async fn write_results(
    output_dir: &Path,
    topic: &str,
    report: &RunReport,
    session: &SessionState,
) -> Result<WrittenResults, std::io::Error> {
    let mut results = WrittenResults::default();
    if report.succeeded.is_empty() {
        return Ok(results);
    }

    tokio::fs::create_dir_all(output_dir).await?;
    for key in &report.succeeded {
        if let Some(text) = session.succeeded_text(key) {
            let path = output_dir.join(disk_file_name(key, topic));
            match tokio::fs::write(&path, text).await {
                Ok(()) => results.written.push(path),
                Err(e) => {
                    tracing::error!(stage = %key, path = %path.display(), "failed to write result: {e}");
                    results.failed.push((path, e));
                }
            }
        }
    }
    Ok(results)
}

/// Streams a run into the terminal.
#[derive(Default)]
struct TerminalObserver {
    streaming: bool,
}

impl PipelineObserver for TerminalObserver {
    fn on_event(&mut self, event: PipelineEvent) {
        let mut stdout = std::io::stdout().lock();
        match event {
            PipelineEvent::StageStarted { title, .. } => {
                let _ = writeln!(stdout, "\n### {title}\n");
            }
            PipelineEvent::Delta { text, .. } => {
                self.streaming = true;
                let _ = write!(stdout, "{text}");
                let _ = stdout.flush();
            }
            PipelineEvent::StageCompleted { .. } => {
                if self.streaming {
                    let _ = writeln!(stdout);
                }
                self.streaming = false;
            }
            PipelineEvent::StageFailed { message, .. } => {
                if self.streaming {
                    let _ = writeln!(stdout);
                }
                self.streaming = false;
                eprintln!("{message}");
            }
            PipelineEvent::RunStarted { .. }
            | PipelineEvent::Progress { .. }
            | PipelineEvent::RunFinished { .. } => {}
        }
    }
}
