//! Where tutorial text comes from, and the helpers that do not need the
//! network: URL classification, YouTube id parsing, transcript files.

use crate::error::{FluxaError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

pub const TRUNCATION_MARKER: &str = "... [truncated]";

const YOUTUBE_DOMAINS: &[&str] = &["youtube.com", "youtu.be", "youtube-nocookie.com"];

// ---------------------------------------------------------------------------
// SourceKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Youtube,
    Web,
    TranscriptFile,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Youtube => "youtube",
            SourceKind::Web => "web",
            SourceKind::TranscriptFile => "transcript_file",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tutorial text plus where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub content: String,
    pub source: String,
    pub kind: SourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

// ---------------------------------------------------------------------------
// URLs
// ---------------------------------------------------------------------------

/// `Youtube` for any URL mentioning a YouTube domain, `Web` otherwise.
pub fn classify_url(url: &str) -> SourceKind {
    let lower = url.to_lowercase();
    if YOUTUBE_DOMAINS.iter().any(|d| lower.contains(d)) {
        SourceKind::Youtube
    } else {
        SourceKind::Web
    }
}

static VIDEO_ID_RES: OnceLock<Vec<Regex>> = OnceLock::new();

fn video_id_res() -> &'static [Regex] {
    VIDEO_ID_RES.get_or_init(|| {
        [
            r"(?:https?://)?(?:www\.)?youtube\.com/watch\?v=([^&]+)",
            r"(?:https?://)?(?:www\.)?youtu\.be/([^?]+)",
            r"(?:https?://)?(?:www\.)?youtube\.com/embed/([^?]+)",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

/// Video id from `watch?v=`, `youtu.be/` or `/embed/` URLs.
pub fn youtube_video_id(url: &str) -> Option<&str> {
    video_id_res()
        .iter()
        .find_map(|re| re.captures(url).and_then(|c| c.get(1)))
        .map(|m| m.as_str())
}

// ---------------------------------------------------------------------------
// Text helpers
// ---------------------------------------------------------------------------

/// Cut `text` to at most `max_chars` characters, appending
/// [`TRUNCATION_MARKER`] when anything was dropped.
pub fn truncate_content(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{TRUNCATION_MARKER}", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Load a local transcript file as tutorial content.
pub fn read_transcript(path: &Path, max_chars: usize) -> Result<ExtractedContent> {
    if !path.is_file() {
        return Err(FluxaError::TranscriptNotFound(path.display().to_string()));
    }
    let text = std::fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Err(FluxaError::EmptyTranscript(path.display().to_string()));
    }
    Ok(ExtractedContent {
        content: truncate_content(&text, max_chars),
        source: path.display().to_string(),
        kind: SourceKind::TranscriptFile,
        title: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn classify_youtube_domains() {
        assert_eq!(
            classify_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            SourceKind::Youtube
        );
        assert_eq!(classify_url("https://YOUTU.BE/abc"), SourceKind::Youtube);
        assert_eq!(
            classify_url("https://www.youtube-nocookie.com/embed/abc"),
            SourceKind::Youtube
        );
        assert_eq!(
            classify_url("https://helpx.adobe.com/photoshop/using/blur.html"),
            SourceKind::Web
        );
    }

    #[test]
    fn video_id_forms() {
        assert_eq!(
            youtube_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42"),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(youtube_video_id("youtu.be/abc123?si=x"), Some("abc123"));
        assert_eq!(
            youtube_video_id("https://youtube.com/embed/xyz?start=1"),
            Some("xyz")
        );
        assert_eq!(youtube_video_id("https://youtube.com/channel/foo"), None);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_content("short", 10), "short");
        assert_eq!(truncate_content("exact", 5), "exact");
        assert_eq!(truncate_content("ééééé", 2), "éé... [truncated]");
    }

    #[test]
    fn transcript_is_loaded_and_truncated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tutorial.txt");
        std::fs::write(&path, "Open the image. Apply gaussian blur.").unwrap();

        let extracted = read_transcript(&path, 15).unwrap();
        assert_eq!(extracted.kind, SourceKind::TranscriptFile);
        assert_eq!(extracted.content, "Open the image.... [truncated]");
        assert!(extracted.source.ends_with("tutorial.txt"));
    }

    #[test]
    fn transcript_missing_or_blank() {
        let dir = TempDir::new().unwrap();
        let missing = read_transcript(&dir.path().join("nope.txt"), 100).unwrap_err();
        assert!(matches!(missing, FluxaError::TranscriptNotFound(_)));

        let blank = dir.path().join("blank.txt");
        std::fs::write(&blank, "  \n\t").unwrap();
        let empty = read_transcript(&blank, 100).unwrap_err();
        assert!(matches!(empty, FluxaError::EmptyTranscript(_)));
    }

    #[test]
    fn kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&SourceKind::TranscriptFile).unwrap(),
            "\"transcript_file\""
        );
        assert_eq!(SourceKind::Youtube.to_string(), "youtube");
    }
}
