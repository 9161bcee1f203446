//! Configuration type definitions.
//!
//! This module contains all the data structures used in tubegen configuration files.
//! These types are pure data - no I/O or complex logic.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

// =============================================================================
// Root config
// =============================================================================

/// Top-level tubegen configuration (`tubegen.yaml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Completion API settings
    #[serde(default)]
    pub completion: CompletionConfig,
    /// Where per-stage prompt templates live
    #[serde(default)]
    pub prompts: PromptsConfig,
    /// Where `generate` writes finished artifacts
    #[serde(default)]
    pub output: OutputConfig,
    /// Markdown rendering of generated text in the browser
    #[serde(default)]
    pub markdown: MarkdownConfig,
    /// Web front end settings
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Resolve relative paths in the config against `base_path`
    /// (typically the config file's directory).
    pub fn resolve_paths(mut self, base_path: &Path) -> Self {
        self.prompts.dir = resolve_path(&self.prompts.dir, base_path);
        self.output.dir = resolve_path(&self.output.dir, base_path);
        self
    }
}

fn resolve_path(path: &Path, base_path: &Path) -> PathBuf {
    if path.is_relative() {
        base_path.join(path)
    } else {
        path.to_path_buf()
    }
}

// =============================================================================
// Completion API configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`)
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Models offered to the user; the first one is the default
    #[serde(default = "default_models")]
    pub models: Vec<String>,
}

impl CompletionConfig {
    /// The model used when the caller does not pick one.
    pub fn default_model(&self) -> &str {
        self.models
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_MODEL)
    }
}

const DEFAULT_MODEL: &str = "gpt-4o-mini";

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_models() -> Vec<String> {
    vec![DEFAULT_MODEL.to_string(), "gpt-4o".to_string()]
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            models: default_models(),
        }
    }
}

// =============================================================================
// Prompt and output locations
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptsConfig {
    /// Directory holding one `{stage}.md` file per stage
    #[serde(default = "default_prompts_dir")]
    pub dir: PathBuf,
}

fn default_prompts_dir() -> PathBuf {
    PathBuf::from("prompts")
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            dir: default_prompts_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("generated")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

// =============================================================================
// Markdown configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkdownConfig {
    /// Extensions to enable for markdown processing
    #[serde(default = "default_markdown_extensions")]
    pub extensions: Vec<String>,
}

fn default_markdown_extensions() -> Vec<String> {
    vec![
        "footnotes".to_string(),
        "gfm".to_string(),
        "strikethrough".to_string(),
        "tables".to_string(),
        "tasklists".to_string(),
    ]
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            extensions: default_markdown_extensions(),
        }
    }
}

// =============================================================================
// Web front end
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Seconds a browser session is kept after its last run activity
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
    /// Most sessions kept at once; the least recently active is dropped first
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_session_idle_secs() -> u64 {
    60 * 60
}

fn default_max_sessions() -> usize {
    1000
}

impl ServerConfig {
    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            session_idle_secs: default_session_idle_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}
