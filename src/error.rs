use thiserror::Error;

#[derive(Error, Debug)]
pub enum DubError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Speech synthesis error: {0}")]
    Speech(String),

    #[error("Lip-sync error: {0}")]
    LipSync(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("No transcript for language '{language}' (available: {available:?})")]
    LanguageNotFound {
        language: String,
        available: Vec<String>,
    },

    #[error("{service} returned HTTP {status}: {body}")]
    UnexpectedStatus {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{what} did not finish after {attempts} polls")]
    PollExhausted { what: String, attempts: u32 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("File not found: {0}")]
    FileNotFound(String),
}

pub type Result<T> = std::result::Result<T, DubError>;

impl DubError {
    /// Build an `UnexpectedStatus` from a failed response, consuming its body.
    pub async fn from_response(service: &'static str, response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        DubError::UnexpectedStatus {
            service,
            status,
            body,
        }
    }
}
