//! Stage definitions.

use serde::Serialize;

use crate::util::title_case;

/// One content-generation step, e.g. "titles".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stage {
    /// Identifier used for prompt lookup, context lines and file names
    pub key: String,
    /// Heading shown to the user
    pub title: String,
}

impl Stage {
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
        }
    }

    /// A stage titled after its key ("call_to_action" -> "Call To Action").
    pub fn from_key(key: impl Into<String>) -> Self {
        let key = key.into();
        let title = title_case(&key);
        Self { key, title }
    }
}

/// The standard stage list, in dependency order.
pub fn default_stages() -> Vec<Stage> {
    vec![
        Stage::new("ideas", "Video Ideas"),
        Stage::from_key("titles"),
        Stage::from_key("keywords"),
        Stage::from_key("description"),
        Stage::from_key("hook"),
        Stage::from_key("outline"),
        Stage::from_key("script"),
    ]
}
