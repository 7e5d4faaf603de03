#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
    #[error("malformed {field} '{value}' for {url}")]
    MalformedNumber {
        field: &'static str,
        value: String,
        url:   String,
    },

    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url:    String,
        source: url::ParseError,
    },

    #[error("invalid content hash '{0}'")]
    InvalidHash(String),

    #[error("invalid file name '{0}'")]
    InvalidName(String),

    #[error("unknown patch selection '{0}', expected true, false or \"latest-only\"")]
    UnknownPatchSelection(String),
}

pub type Result<T> = std::result::Result<T, CatalogueError>;
