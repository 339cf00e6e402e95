use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubliftError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Stream probe error: {0}")]
    Probe(String),

    #[error("External tool timed out: {0}")]
    ToolTimeout(String),

    #[error("Subtitle extraction failed: {0}")]
    Extraction(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Translation API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

impl SubliftError {
    /// Whether a failed submission is worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            Self::TransientNetwork(_) => true,
            Self::Api { status, .. } => matches!(status, 502 | 503 | 504),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SubliftError>;
