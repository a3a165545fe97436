use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum ShortenerError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("short code already taken: {0}")]
    Conflict(String),
    #[error("link not found")]
    NotFound,
    #[error("internal error: {0}")]
    Internal(String),
}

impl ShortenerError {
    /// Machine-readable error kind exposed to API clients
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "invalid_url",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Conflict(_) => "conflict",
            Self::NotFound => "not_found",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether the caller may retry the same request as-is
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::StoreUnavailable(_))
    }
}

impl From<StorageError> for ShortenerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict => {
                Self::Conflict("short code was claimed concurrently, retry".to_string())
            }
            StorageError::NotFound => Self::NotFound,
            StorageError::Unavailable(message) => Self::StoreUnavailable(message),
            StorageError::Other(err) => Self::Internal(format!("{err:#}")),
        }
    }
}
