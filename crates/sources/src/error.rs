use thiserror::Error;

pub type Result<T> = std::result::Result<T, SourceError>;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(String),

    #[error("{source_name} requires a Google API key (--google-api-key or GOOGLE_API_KEY)")]
    MissingApiKey { source_name: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("No fixture for {0}")]
    NoFixture(String),
}
