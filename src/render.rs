//! HTML page rendering for the web front end.

use serde::Serialize;
use tera::{Context, Tera};

use crate::config::MarkdownConfig;
use crate::markdown::render_markdown;
use crate::pipeline::{SessionState, Stage};

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
}

/// The template renderer, wrapping Tera.
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    /// Create a renderer with the built-in templates.
    pub fn new() -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        tera.add_raw_template("index.html", INDEX_TEMPLATE)?;
        Ok(Self { tera })
    }

    /// Render the generator page.
    pub fn render_index(&self, context: &IndexContext) -> Result<String, RenderError> {
        let mut tera_context = Context::new();
        tera_context.insert("session_id", &context.session_id);
        tera_context.insert("models", &context.models);
        tera_context.insert("sections", &context.sections);
        tera_context.insert("version", env!("CARGO_PKG_VERSION"));

        Ok(self.tera.render("index.html", &tera_context)?)
    }
}

/// Context passed to the page template.
#[derive(Debug, Serialize)]
pub struct IndexContext {
    pub session_id: String,
    pub models: Vec<String>,
    pub sections: Vec<SectionContext>,
}

/// One stage section on the page.
#[derive(Debug, Serialize)]
pub struct SectionContext {
    pub key: String,
    pub title: String,
    /// Rendered output of a stored successful result
    pub html: Option<String>,
    /// Message of a stored failed result
    pub error: Option<String>,
    /// Link to the stored successful result
    pub download_url: Option<String>,
    pub progress: u8,
}

/// Path serving the stored result of `key` in a session.
pub fn download_path(session_id: &str, key: &str) -> String {
    format!("/api/sessions/{session_id}/stages/{key}/download")
}

impl SectionContext {
    /// Build a section from whatever the session holds for `stage`.
    pub fn for_stage(
        stage: &Stage,
        session_id: &str,
        session: &SessionState,
        markdown: &MarkdownConfig,
    ) -> Self {
        let mut section = SectionContext {
            key: stage.key.clone(),
            title: stage.title.clone(),
            html: None,
            error: None,
            download_url: None,
            progress: 0,
        };

        if let Some(result) = session.get(&stage.key) {
            if result.succeeded {
                section.html = Some(match render_markdown(&result.text, markdown) {
                    Ok(html) => html,
                    Err(e) => {
                        tracing::warn!(stage = %stage.key, "failed to render stored result: {e}");
                        tera::escape_html(&result.text)
                    }
                });
                section.download_url = Some(download_path(session_id, &stage.key));
                section.progress = 100;
            } else {
                section.error = Some(result.text.clone());
            }
        }

        section
    }
}
