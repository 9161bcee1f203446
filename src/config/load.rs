//! Configuration loading from files.
//!
//! The YAML file is optional; `TUBEGEN__*` environment variables are layered
//! on top of it.

use std::path::{Path, PathBuf};

use ::config::{Environment, File, FileFormat};

use super::{CONFIG_FILE_NAME, Config, ConfigError, ENV_PREFIX, base_path_from_config};

impl Config {
    /// Load the config from the command line argument, defaulting to `tubegen.yaml`
    ///
    /// Relative paths inside the config are resolved against the config file's
    /// directory.
    pub fn load_from_arg(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let config_file = absolute_config_path(config_file)?;
        let base_path = base_path_from_config(&config_file);

        let config = Self::load_from_file(&config_file)?.resolve_paths(&base_path);
        config.validate()?;
        Ok(config)
    }

    /// Load the config from a file path, with environment overrides.
    ///
    /// A missing file is not an error: defaults (plus environment) are used.
    pub(crate) fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
        }

        let settings = ::config::Config::builder()
            .add_source(
                File::from(path.to_path_buf())
                    .format(FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("completion.models")
                    .with_list_parse_key("markdown.extensions"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

/// Turn the `--config-file` argument into an absolute path.
pub fn absolute_config_path(config_file: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let config_file = config_file.unwrap_or(Path::new(CONFIG_FILE_NAME));
    if config_file.is_relative() {
        Ok(std::env::current_dir()
            .map_err(ConfigError::CwdFailure)?
            .join(config_file))
    } else {
        Ok(config_file.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from_arg(Some(&dir.path().join("tubegen.yaml"))).unwrap();

        assert_eq!(config.completion.base_url, "https://api.openai.com/v1");
        assert_eq!(config.completion.models, vec!["gpt-4o-mini", "gpt-4o"]);
        assert_eq!(config.prompts.dir, dir.path().join("prompts"));
        assert_eq!(config.output.dir, dir.path().join("generated"));
    }

    #[test]
    fn test_load_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tubegen.yaml");
        std::fs::write(
            &path,
            "completion:\n  base_url: http://localhost:8080/v1\n  models:\n    - llama3\nprompts:\n  dir: templates\n",
        )
        .unwrap();

        let config = Config::load_from_arg(Some(&path)).unwrap();

        assert_eq!(config.completion.base_url, "http://localhost:8080/v1");
        assert_eq!(config.completion.models, vec!["llama3"]);
        assert_eq!(config.completion.default_model(), "llama3");
        assert_eq!(config.prompts.dir, dir.path().join("templates"));
        // Untouched sections keep their defaults.
        assert_eq!(config.output.dir, dir.path().join("generated"));
    }

    #[test]
    fn test_load_invalid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tubegen.yaml");
        std::fs::write(&path, "completion:\n  models: []\n").unwrap();

        assert!(matches!(
            Config::load_from_arg(Some(&path)),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_absolute_config_path_keeps_absolute() {
        let path = Path::new("/etc/tubegen.yaml");
        assert_eq!(absolute_config_path(Some(path)).unwrap(), path);
    }
}
