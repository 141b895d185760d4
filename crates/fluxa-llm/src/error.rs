use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("response contained no message content")]
    EmptyResponse,

    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse stream-json line: {source}\n  line: {line}")]
    Parse {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("agent process error: {0}")]
    Process(String),

    #[error("agent run ended with {subtype} after {num_turns} turn(s)")]
    AgentFailed { subtype: String, num_turns: u32 },

    #[error("documentation folder not found: {0}")]
    DocsNotFound(String),

    #[error("agent timed out after {0}s")]
    Timeout(u64),
}

pub type Result<T> = std::result::Result<T, LlmError>;
