use std::io::Write;

use futures_util::StreamExt;

use crate::{
    CheckArgs,
    completion::{CompletionClient, CompletionRequest, OpenAiClient},
    config::Config,
};

const SYSTEM_PROMPT: &str = "You are a helpful assistant.";
const USER_PROMPT: &str = "Say hello!";

/// Stream a tiny completion to confirm the key and model work.
pub async fn run(args: &CheckArgs) -> Result<(), anyhow::Error> {
    let config = Config::load_from_arg(args.config_file.as_deref())?;

    let api_key = args.api_key.clone().unwrap_or_default();
    let model = args
        .model
        .clone()
        .unwrap_or_else(|| config.completion.default_model().to_string());

    let client = OpenAiClient::new(&api_key, &config.completion)?;
    println!(
        "Checking {} with model {}...",
        config.completion.base_url, model
    );

    let request = CompletionRequest::new(&model, SYSTEM_PROMPT, USER_PROMPT);
    let mut deltas = client.stream(&request).await?;

    print!("Response: ");
    let mut received = 0;
    while let Some(delta) = deltas.next().await {
        let delta = delta?;
        received += delta.len();
        print!("{delta}");
        std::io::stdout().flush()?;
    }
    println!();

    if received == 0 {
        return Err(anyhow::anyhow!("the model returned an empty response"));
    }
    println!("OK");

    Ok(())
}
