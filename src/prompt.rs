//! Per-stage system prompts.
//!
//! A [`TemplateStore`] maps a stage key to its instruction text. The
//! [`PromptResolver`] never fails: a missing or unreadable template degrades
//! to a human-readable message that is sent in place of the prompt.

mod defaults;

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub use defaults::{DEFAULT_PROMPTS, default_store};

/// Why a template could not be produced.
#[derive(thiserror::Error, Debug)]
pub enum TemplateError {
    #[error("Prompt file {0}.md not found")]
    NotFound(String),

    #[error("Error reading prompt: Prompt file {0}.md is empty")]
    Empty(String),

    #[error("Error reading prompt: {0}")]
    Io(std::io::Error),
}

/// A read-only keyed collection of prompt templates.
pub trait TemplateStore: Send + Sync {
    /// Look up the template for `key`.
    fn load(&self, key: &str) -> Result<String, TemplateError>;
}

/// Templates stored as `{dir}/{key}.md`, read on every lookup.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the template file for `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.md"))
    }
}

impl TemplateStore for DirectoryStore {
    fn load(&self, key: &str) -> Result<String, TemplateError> {
        let content = std::fs::read_to_string(self.path_for(key)).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                TemplateError::NotFound(key.to_string())
            } else {
                TemplateError::Io(e)
            }
        })?;

        let content = content.trim();
        if content.is_empty() {
            return Err(TemplateError::Empty(key.to_string()));
        }
        Ok(content.to_string())
    }
}

/// Templates held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    templates: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, template: impl Into<String>) -> Self {
        self.templates.insert(key.into(), template.into());
        self
    }
}

impl TemplateStore for MemoryStore {
    fn load(&self, key: &str) -> Result<String, TemplateError> {
        let template = self
            .templates
            .get(key)
            .ok_or_else(|| TemplateError::NotFound(key.to_string()))?;

        let template = template.trim();
        if template.is_empty() {
            return Err(TemplateError::Empty(key.to_string()));
        }
        Ok(template.to_string())
    }
}

/// Resolves stage keys to system prompts.
pub struct PromptResolver {
    store: Box<dyn TemplateStore>,
}

impl PromptResolver {
    pub fn new<S: TemplateStore + 'static>(store: S) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Resolve the system prompt for `key`.
    ///
    /// On failure the returned string describes the problem instead; the
    /// caller still sends it as the prompt.
    pub fn resolve(&self, key: &str) -> String {
        match self.store.load(key) {
            Ok(template) => template,
            Err(e) => {
                let message = e.to_string();
                tracing::error!(stage = key, "{message}");
                message
            }
        }
    }
}

/// Resolver over `dir`, or over the built-in templates when `dir` does not exist.
pub fn resolver_for_dir(dir: &Path) -> PromptResolver {
    if dir.is_dir() {
        PromptResolver::new(DirectoryStore::new(dir))
    } else {
        tracing::warn!(
            dir = %dir.display(),
            "prompt directory not found, using built-in templates (run `tubegen init` to customize them)"
        );
        PromptResolver::new(default_store())
    }
}

impl std::fmt::Debug for PromptResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptResolver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_store_reads_and_trims() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("titles.md"), "\n  Write catchy titles.  \n").unwrap();

        let resolver = PromptResolver::new(DirectoryStore::new(dir.path()));

        assert_eq!(resolver.resolve("titles"), "Write catchy titles.");
    }

    #[test]
    fn test_directory_store_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = PromptResolver::new(DirectoryStore::new(dir.path()));

        assert_eq!(resolver.resolve("hook"), "Prompt file hook.md not found");
    }

    #[test]
    fn test_directory_store_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("outline.md"), "   \n").unwrap();

        let resolver = PromptResolver::new(DirectoryStore::new(dir.path()));

        assert_eq!(
            resolver.resolve("outline"),
            "Error reading prompt: Prompt file outline.md is empty"
        );
    }

    #[test]
    fn test_directory_store_unreadable_entry() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be cannot be read as a string.
        std::fs::create_dir(dir.path().join("script.md")).unwrap();

        let resolver = PromptResolver::new(DirectoryStore::new(dir.path()));
        let resolved = resolver.resolve("script");

        assert!(resolved.starts_with("Error reading prompt: "), "{resolved}");
    }

    #[test]
    fn test_resolver_for_missing_dir_uses_built_in_templates() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver_for_dir(&dir.path().join("prompts"));

        assert_eq!(resolver.resolve("ideas"), DEFAULT_PROMPTS[0].1);
    }

    #[test]
    fn test_resolver_for_existing_dir_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver_for_dir(dir.path());

        assert_eq!(resolver.resolve("ideas"), "Prompt file ideas.md not found");
    }

    #[test]
    fn test_memory_store_unknown_key() {
        let resolver = PromptResolver::new(MemoryStore::new().with("ideas", "Brainstorm."));

        assert_eq!(resolver.resolve("ideas"), "Brainstorm.");
        assert_eq!(resolver.resolve("nope"), "Prompt file nope.md not found");
    }
}
