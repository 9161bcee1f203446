//! Built-in templates for the default stages, written out by `tubegen init`.

use super::MemoryStore;

/// `(stage key, template)` pairs for the default pipeline.
pub const DEFAULT_PROMPTS: &[(&str, &str)] = &[
    (
        "ideas",
        "You are a YouTube content strategist. Given a topic, propose 5 distinct video ideas. \
For each idea give a one-line angle, the target viewer, and why it would get clicks. \
Answer in markdown as a numbered list.",
    ),
    (
        "titles",
        "You write YouTube titles. Using the topic and the video ideas provided, write 10 titles \
under 70 characters each. Mix curiosity, numbers and clear benefits. Avoid clickbait that the \
video cannot deliver. Answer in markdown as a numbered list.",
    ),
    (
        "keywords",
        "You are a YouTube SEO specialist. From the topic, ideas and titles provided, list 20 \
search keywords and tags, most important first, followed by 5 hashtags. Answer in markdown.",
    ),
    (
        "description",
        "You write YouTube video descriptions. Using the previous content, write a description \
whose first two lines hook the viewer, followed by a short summary, timestamps placeholders \
and a call to action. Work the most important keywords in naturally. Answer in markdown.",
    ),
    (
        "hook",
        "You write the first 15 seconds of YouTube videos. Using the previous content, write 3 \
alternative spoken hooks that make the viewer stay. Each hook should be under 60 words.",
    ),
    (
        "outline",
        "You plan YouTube videos. Using the previous content, write a section-by-section outline \
with an intro, 4 to 6 main sections with bullet points, and an outro with a call to action. \
Answer in markdown.",
    ),
    (
        "script",
        "You are a YouTube scriptwriter. Using the hook and outline provided, write the full \
spoken script in a conversational tone. Mark each section with a markdown heading and add \
short [B-ROLL] suggestions where visuals would help.",
    ),
];

/// A store holding the built-in templates.
pub fn default_store() -> MemoryStore {
    DEFAULT_PROMPTS
        .iter()
        .fold(MemoryStore::new(), |store, (key, template)| {
            store.with(*key, *template)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::default_stages;
    use crate::prompt::TemplateStore;

    #[test]
    fn test_every_default_stage_has_a_template() {
        let store = default_store();
        for stage in default_stages() {
            assert!(store.load(&stage.key).is_ok(), "missing template for {}", stage.key);
        }
        assert_eq!(DEFAULT_PROMPTS.len(), default_stages().len());
    }
}
