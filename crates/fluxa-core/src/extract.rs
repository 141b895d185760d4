//! Pulls a candidate JSON array out of free-form backend output.
//!
//! Generative backends wrap structured output in prose and markdown fences.
//! The extractor is tolerant of both but never invents content: when nothing
//! array-shaped is found it returns `None`.

use regex::Regex;
use std::sync::OnceLock;

static FENCED_ARRAY_RE: OnceLock<Regex> = OnceLock::new();

fn fenced_array_re() -> &'static Regex {
    FENCED_ARRAY_RE
        .get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(\[.*?\])\s*```").unwrap())
}

/// Extract a JSON array candidate from `text`.
///
/// Tried in order:
/// 1. the body of the first fenced block (optionally tagged `json`) that is
///    bracket-delimited, returned unparsed;
/// 2. the span from the first `[` to the last `]`, if it parses as JSON;
/// 3. the whole trimmed text, if it starts with `[` and ends with `]`
///    (unparsed);
/// 4. `None`.
pub fn extract_json_array(text: &str) -> Option<&str> {
    if let Some(body) = fenced_array_re()
        .captures(text)
        .and_then(|caps| caps.get(1))
    {
        return Some(body.as_str());
    }

    if let Some(span) = bracket_span(text) {
        if serde_json::from_str::<serde_json::Value>(span).is_ok() {
            return Some(span);
        }
    }

    let trimmed = text.trim();
    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        return Some(trimmed);
    }

    None
}

/// Greedy span from the first `[` through the last `]`.
fn bracket_span(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_json_block_inside_prose() {
        let text = "Here you go:\n```json\n[{\"operation\":\"gaussianBlur\",\"radius\":{\"unit\":\"px\",\"value\":5}}]\n```\nEnjoy!";
        assert_eq!(
            extract_json_array(text),
            Some("[{\"operation\":\"gaussianBlur\",\"radius\":{\"unit\":\"px\",\"value\":5}}]")
        );
    }

    #[test]
    fn untagged_fence_is_accepted() {
        let text = "Result:\n```\n[1, 2, 3]\n```";
        assert_eq!(extract_json_array(text), Some("[1, 2, 3]"));
    }

    #[test]
    fn fenced_body_is_returned_unparsed() {
        // Invalid JSON inside a fence still wins; the caller's decode step
        // reports the error.
        let text = "```json\n[{\"operation\": }]\n```";
        assert_eq!(extract_json_array(text), Some("[{\"operation\": }]"));
    }

    #[test]
    fn first_fenced_array_wins() {
        let text = "```json\n[1]\n```\nand also\n```json\n[2]\n```";
        assert_eq!(extract_json_array(text), Some("[1]"));
    }

    #[test]
    fn non_array_fence_falls_through_to_bracket_span() {
        let text = "```python\nprint('x')\n```\nActions: [{\"operation\": \"invert\"}] done";
        assert_eq!(
            extract_json_array(text),
            Some("[{\"operation\": \"invert\"}]")
        );
    }

    #[test]
    fn bracket_span_is_greedy() {
        let text = "Steps [ignore] then [{\"operation\": \"invert\"}]";
        // First `[` to last `]` does not parse, and the trimmed text does not
        // start with `[`.
        assert_eq!(extract_json_array(text), None);

        let nested = "Output: [[1], [2]] end";
        assert_eq!(extract_json_array(nested), Some("[[1], [2]]"));
    }

    #[test]
    fn bare_array_is_returned_unchanged() {
        let text = "[{\"operation\":\"emboss\",\"amount\":100}]";
        assert_eq!(extract_json_array(text), Some(text));
    }

    #[test]
    fn surrounding_whitespace_is_trimmed_for_bare_arrays() {
        let text = "  \n[{\"operation\": \"emboss\"}]\n  ";
        assert_eq!(extract_json_array(text), Some("[{\"operation\": \"emboss\"}]"));
    }

    #[test]
    fn array_shaped_but_invalid_text_is_returned_unparsed() {
        let text = "[not json at all]";
        assert_eq!(extract_json_array(text), Some("[not json at all]"));
    }

    #[test]
    fn prose_without_brackets_is_none() {
        assert_eq!(extract_json_array("I could not find any steps."), None);
        assert_eq!(extract_json_array(""), None);
        assert_eq!(extract_json_array("closing ] before opening ["), None);
    }

    #[test]
    fn prose_with_unparseable_brackets_is_none() {
        assert_eq!(
            extract_json_array("Use the [Filter] menu and pick [Blur]."),
            None
        );
    }
}
