//! Run context: the topic plus everything earlier stages produced.

use crate::util::humanize_key;

/// State that flows from stage to stage within one run.
///
/// Only successful outputs are recorded, in the order their stages ran, so a
/// failed stage never leaks into a later stage's prompt.
#[derive(Debug)]
pub struct RunContext<'a> {
    topic: &'a str,
    outputs: Vec<(String, String)>,
}

impl<'a> RunContext<'a> {
    pub fn new(topic: &'a str) -> Self {
        Self {
            topic,
            outputs: Vec::new(),
        }
    }

    /// Make a stage's output available to the stages after it.
    pub fn record_success(&mut self, key: &str, text: &str) {
        self.outputs.push((key.to_string(), text.to_string()));
    }

    /// `"{key}: {text}"` lines for every successful earlier stage.
    pub fn context_text(&self) -> String {
        self.outputs
            .iter()
            .map(|(key, text)| format!("{key}: {text}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The user message sent for `stage_key`.
    pub fn user_prompt(&self, stage_key: &str) -> String {
        format!(
            "Topic: {}\nPrevious content:\n{}\n\nGenerate {}.",
            self.topic,
            self.context_text(),
            humanize_key(stage_key)
        )
    }
}
