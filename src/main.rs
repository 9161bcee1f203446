use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod completion;
mod config;
mod markdown;
mod pipeline;
mod prompt;
mod render;
mod util;
mod web;

#[derive(Parser)]
#[command(version, about = "Generate YouTube video content with a staged LLM pipeline")]
struct Args {
    /// The command to execute
    #[command(subcommand)]
    command: TubegenCommand,
}

#[derive(Parser)]
struct InitArgs {
    /// The path to initialize the project in
    path: PathBuf,

    /// Whether to create the directory if it doesn't exist
    #[arg(short, long, default_value = "false")]
    create: bool,
}

#[derive(Parser)]
struct GenerateArgs {
    /// The video topic to generate content for
    #[arg(short, long)]
    topic: String,

    /// The OpenAI API key
    #[arg(short = 'k', long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// The model to use, defaults to the first configured model
    #[arg(short, long)]
    model: Option<String>,

    /// The path to the configuration file
    #[arg(short, long, default_value = "tubegen.yaml")]
    config_file: Option<PathBuf>,

    /// Directory to write the generated stages to, overriding `output.dir`
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Parser)]
struct ServeArgs {
    /// The address to bind to
    #[arg(short, long, default_value = "127.0.0.1")]
    bind: String,

    /// The port to bind to
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Open the generator in the default browser
    #[arg(short, long, default_value = "false")]
    open: bool,

    /// The path to the configuration file
    #[arg(short, long, default_value = "tubegen.yaml")]
    config_file: Option<PathBuf>,
}

#[derive(Parser)]
struct CheckArgs {
    /// The OpenAI API key
    #[arg(short = 'k', long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// The model to check, defaults to the first configured model
    #[arg(short, long)]
    model: Option<String>,

    /// The path to the configuration file
    #[arg(short, long, default_value = "tubegen.yaml")]
    config_file: Option<PathBuf>,
}

#[derive(Parser)]
struct CleanArgs {
    /// The path to the configuration file
    #[arg(short, long, default_value = "tubegen.yaml")]
    config_file: Option<PathBuf>,

    /// Only print what would be deleted
    #[arg(long, default_value = "false")]
    dry_run: bool,
}

#[derive(Subcommand)]
enum TubegenCommand {
    /// Initialize a new project with a config file and prompt templates
    Init(InitArgs),

    /// Run the content pipeline for a topic in the terminal
    Generate(GenerateArgs),

    /// Serve the generator on a local port
    Serve(ServeArgs),

    /// Send a small streamed request to verify the API key and model
    Check(CheckArgs),

    /// Delete the generated output directory
    Clean(CleanArgs),
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        TubegenCommand::Init(args) => {
            commands::init::run(&args).await?;
        }
        TubegenCommand::Generate(args) => {
            commands::generate::run(&args).await?;
        }
        TubegenCommand::Serve(args) => {
            commands::serve::run(&args).await?;
        }
        TubegenCommand::Check(args) => {
            commands::check::run(&args).await?;
        }
        TubegenCommand::Clean(args) => {
            commands::clean::run(&args).await?;
        }
    }

    Ok(())
}
