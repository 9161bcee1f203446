//! Shared utility functions.

/// Convert a stage key to title case.
///
/// Splits on `-` and `_`, capitalizes each word.
/// "video_ideas" -> "Video Ideas"
/// "call-to-action" -> "Call To Action"
pub fn title_case(s: &str) -> String {
    s.split(['-', '_'])
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Turn a stage key into the phrase used in the generation instruction.
///
/// "video_ideas" -> "video ideas"
pub fn humanize_key(key: &str) -> String {
    key.replace('_', " ")
}

/// File name offered for a downloaded stage result.
///
/// Spaces in the topic become underscores; nothing else is touched.
/// ("titles", "cute cats") -> "titles_cute_cats.md"
pub fn download_file_name(stage_key: &str, topic: &str) -> String {
    format!("{}_{}.md", stage_key, topic.replace(' ', "_"))
}

/// File name used when a stage result is written to disk.
///
/// Same as [`download_file_name`], with path separators and other characters
/// that are not allowed in file names replaced by `_`.
/// ("ideas", "AC/DC live") -> "ideas_AC_DC_live.md"
pub fn disk_file_name(stage_key: &str, topic: &str) -> String {
    download_file_name(stage_key, topic)
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
