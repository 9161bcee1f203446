//! Configuration loading and types for tubegen.
//!
//! This module handles all aspects of configuration:
//! - Type definitions for config structures (`types`)
//! - Loading configs from files and the environment (`load`)

mod load;
mod types;

use std::path::{Path, PathBuf};

// Re-export all types for convenient access
pub use types::{CompletionConfig, Config, MarkdownConfig, ServerConfig};

/// Default name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "tubegen.yaml";

/// Prefix for environment variable overrides (`TUBEGEN__COMPLETION__BASE_URL`).
pub const ENV_PREFIX: &str = "TUBEGEN";

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to deserialize config: {0}")]
    Deserialize(#[from] ::config::ConfigError),

    #[error("failed to get current working directory: {0}")]
    CwdFailure(std::io::Error),

    #[error("{0}")]
    Validation(String),
}

/// Get the base path for resolving relative paths in a config file.
pub fn base_path_from_config(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Config {
    /// Check the loaded values for mistakes serde cannot catch.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.completion.models.is_empty() {
            return Err(ConfigError::Validation(
                "invalid config: 'completion.models' must list at least one model\n\nExample:\n  completion:\n    models: [gpt-4o-mini, gpt-4o]".to_string(),
            ));
        }

        if let Some(blank) = self.completion.models.iter().find(|m| m.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "invalid config: model names cannot be blank (got {blank:?})"
            )));
        }

        let base_url = &self.completion.base_url;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "invalid config: 'completion.base_url' must be an http(s) URL, got '{base_url}'"
            )));
        }

        if self.server.max_sessions == 0 {
            return Err(ConfigError::Validation(
                "invalid config: 'server.max_sessions' must be at least 1".to_string(),
            ));
        }

        // Surface unknown extensions at load time instead of on first render.
        crate::markdown::markdown_options(&self.markdown)
            .map_err(|e| ConfigError::Validation(format!("invalid config: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_path_from_config() {
        assert_eq!(
            base_path_from_config(Path::new("/project/tubegen.yaml")),
            PathBuf::from("/project")
        );
        assert_eq!(
            base_path_from_config(Path::new("tubegen.yaml")),
            PathBuf::from("")
        );
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_models() {
        let mut config = Config::default();
        config.completion.models.clear();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("completion.models"));
    }

    #[test]
    fn test_validate_rejects_non_http_base_url() {
        let mut config = Config::default();
        config.completion.base_url = "api.openai.com".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_max_sessions() {
        let mut config = Config::default();
        config.server.max_sessions = 0;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.max_sessions"));
    }

    #[test]
    fn test_validate_rejects_unknown_markdown_extension() {
        let mut config = Config::default();
        config.markdown.extensions = vec!["not_a_real_extension".to_string()];

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("not_a_real_extension"));
    }
}
