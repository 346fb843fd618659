use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiffError>;

#[derive(Error, Debug)]
pub enum DiffError {
    /// Settings that cannot drive a run. Raised before any work starts.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The selected prior-run file is not valid newline-delimited JSON.
    #[error("Corrupt prior run {}: line {line}: {source}", path.display())]
    CorruptPriorRun {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid diff state: {0}")]
    InvalidState(String),
}

impl DiffError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
