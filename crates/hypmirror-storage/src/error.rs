//! Error types for hypmirror-storage.

use std::io;

use hypmirror_catalogue::FileKey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Nothing is stored, or is being stored, under this key.
    #[error("no stored file for {0}")]
    NotFound(FileKey),

    #[error("remote size {actual} does not match catalogue size {expected}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("remote name '{actual}' does not match catalogue name '{expected}'")]
    NameMismatch { expected: String, actual: String },

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("transfer process failed: {0}")]
    TransferProcess(String),

    #[error("invalid storage configuration: {0}")]
    Config(String),

    #[error("fetch error: {0}")]
    Fetch(hypmirror_fetch::Error),

    #[error("filesystem error: {0}")]
    Fs(#[from] hypmirror_fs::Error),

    #[error("verification error: {0}")]
    Verification(#[from] hypmirror_verify::VerificationError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool { matches!(self, Self::NotFound(_)) }
}

impl From<hypmirror_fetch::Error> for StorageError {
    fn from(error: hypmirror_fetch::Error) -> Self {
        match error {
            hypmirror_fetch::Error::ChecksumMismatch { expected, actual } => Self::ChecksumMismatch { expected, actual },
            hypmirror_fetch::Error::SizeMismatch { expected, actual } => Self::SizeMismatch { expected, actual },
            other => Self::Fetch(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
