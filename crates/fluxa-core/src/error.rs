use thiserror::Error;

#[derive(Debug, Error)]
pub enum FluxaError {
    #[error("config not found: {0}")]
    ConfigNotFound(String),

    #[error("transcript not found: {0}")]
    TranscriptNotFound(String),

    #[error("transcript is empty: {0}")]
    EmptyTranscript(String),

    #[error("{0} does not contain an action array")]
    MissingActions(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FluxaError>;
