//! Web article fetching: blocking GET, HTML to plain text, truncation.

use crate::error::{LlmError, Result};
use fluxa_core::source::{truncate_content, ExtractedContent, SourceKind};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const TEXT_WIDTH: usize = 120;

static TITLE_RE: OnceLock<Regex> = OnceLock::new();
static BLANK_RUN_RE: OnceLock<Regex> = OnceLock::new();
static TAG_RE: OnceLock<Regex> = OnceLock::new();

fn title_re() -> &'static Regex {
    TITLE_RE.get_or_init(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap())
}

fn blank_run_re() -> &'static Regex {
    BLANK_RUN_RE.get_or_init(|| Regex::new(r"\n[ \t]*(\n[ \t]*)+").unwrap())
}

fn tag_re() -> &'static Regex {
    TAG_RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").unwrap())
}

/// Download `url` and reduce it to readable text.
pub fn fetch_web_article(url: &str, timeout_secs: u64, max_chars: usize) -> Result<ExtractedContent> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()?;

    tracing::info!(%url, "fetching web article");
    let response = client.get(url).send().map_err(|e| LlmError::Fetch {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(LlmError::Fetch {
            url: url.to_string(),
            reason: format!("HTTP {status}"),
        });
    }

    let html = response.text()?;
    let text = html_to_text(&html);
    if text.trim().is_empty() {
        return Err(LlmError::Fetch {
            url: url.to_string(),
            reason: "page has no readable content".to_string(),
        });
    }

    Ok(ExtractedContent {
        content: truncate_content(&text, max_chars),
        source: url.to_string(),
        kind: SourceKind::Web,
        title: page_title(&html),
    })
}

/// Plain text with runs of blank lines collapsed to one.
pub fn html_to_text(html: &str) -> String {
    let text = match html2text::from_read(html.as_bytes(), TEXT_WIDTH) {
        Ok(text) if !text.trim().is_empty() => text,
        _ => tag_re().replace_all(html, " ").into_owned(),
    };
    blank_run_re()
        .replace_all(&text, "\n\n")
        .trim()
        .to_string()
}

pub fn page_title(html: &str) -> Option<String> {
    title_re()
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "<html><head><title>\n  Soft Glow Tutorial </title>\
        <style>body { color: red; }</style></head>\
        <body><article><h1>Soft glow</h1>\
        <p>Duplicate the background layer.</p>\
        <p>Apply a Gaussian Blur with a radius of 8 pixels.</p>\
        </article></body></html>";

    #[test]
    fn title_is_trimmed_and_collapsed() {
        assert_eq!(page_title(PAGE).as_deref(), Some("Soft Glow Tutorial"));
        assert_eq!(page_title("<p>no title</p>"), None);
    }

    #[test]
    fn html_becomes_readable_text() {
        let text = html_to_text(PAGE);
        assert!(text.contains("Duplicate the background layer."));
        assert!(text.contains("Gaussian Blur"));
        assert!(!text.contains("<p>"));
        assert!(!text.contains("\n\n\n"));
    }

    #[test]
    fn fetch_uses_server_response() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/tutorial")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(PAGE)
            .create();

        let url = format!("{}/tutorial", server.url());
        let extracted = fetch_web_article(&url, 5, 100_000).unwrap();
        assert_eq!(extracted.kind, SourceKind::Web);
        assert_eq!(extracted.source, url);
        assert_eq!(extracted.title.as_deref(), Some("Soft Glow Tutorial"));
        assert!(extracted.content.contains("Gaussian Blur"));
        mock.assert();
    }

    #[test]
    fn fetch_truncates_long_pages() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/long")
            .with_status(200)
            .with_body(format!("<p>{}</p>", "a".repeat(500)))
            .create();

        let extracted = fetch_web_article(&format!("{}/long", server.url()), 5, 50).unwrap();
        assert!(extracted.content.ends_with("... [truncated]"));
    }

    #[test]
    fn http_error_is_fetch_error() {
        let mut server = mockito::Server::new();
        server.mock("GET", "/missing").with_status(404).create();

        let err = fetch_web_article(&format!("{}/missing", server.url()), 5, 100).unwrap_err();
        assert!(matches!(err, LlmError::Fetch { .. }));
        assert!(err.to_string().contains("404"));
    }
}
