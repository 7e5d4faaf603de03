use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure talking to the launcher API.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {url} failed: {source}")]
    Request {
        url:    String,
        source: reqwest::Error,
    },

    #[error("HTTP status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("launcher API error {retcode}: {message}")]
    Api { retcode: i64, message: String },

    #[error("response has no '{0}' field")]
    MissingField(&'static str),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid API URL: {0}")]
    Url(#[from] url::ParseError),
}

impl SourceError {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request { .. } => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Invalid or unreadable application config. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config fields: {}", .0.join(", "))]
    Invalid(Vec<String>),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] hypmirror_storage::StorageError),

    #[error("failed to write status snapshot: {0}")]
    Fs(#[from] hypmirror_fs::Error),

    #[error("failed to encode status snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
