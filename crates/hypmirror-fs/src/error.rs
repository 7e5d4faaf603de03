use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("operation failed")]
    Failed,

    #[error("path not found")]
    NotFound,

    #[error("permission denied")]
    PermissionDenied,

    #[error("already exists")]
    AlreadyExists,

    #[error("directory not empty")]
    DirectoryNotEmpty,

    #[error("failed to write '{path}': {source}")]
    Write {
        path:   PathBuf,
        source: std::io::Error,
    },
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound => true,
            Self::Write { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub fn from_io(err: std::io::Error) -> Error {
    match err.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound,
        std::io::ErrorKind::PermissionDenied => Error::PermissionDenied,
        std::io::ErrorKind::AlreadyExists => Error::AlreadyExists,
        std::io::ErrorKind::DirectoryNotEmpty => Error::DirectoryNotEmpty,
        _ => Error::Failed,
    }
}

pub(crate) fn write_error(path: &std::path::Path, source: std::io::Error) -> Error {
    Error::Write {
        path: path.to_path_buf(),
        source,
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self { from_io(err) }
}
