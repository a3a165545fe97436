use crate::models::Link;
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("short code already exists")]
    Conflict,
    #[error("link not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
            sqlx::Error::RowNotFound => StorageError::NotFound,
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StorageError::Unavailable(err.to_string()),
            _ => StorageError::Other(err.into()),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables and indexes)
    async fn init(&self) -> Result<()>;

    /// Point existence check by exact short code. Must be strongly consistent.
    async fn exists(&self, short_code: &str) -> StorageResult<bool>;

    /// Insert a new link. Fails with `StorageError::Conflict` when the short
    /// code is already taken; this is the authoritative uniqueness gate.
    async fn insert(&self, short_code: &str, original_url: &str) -> StorageResult<Link>;

    /// Get a link by short code
    async fn find_by_code(&self, short_code: &str) -> StorageResult<Option<Link>>;

    /// Add one click and set `last_clicked_at` in a single atomic update.
    /// Fails with `StorageError::NotFound` when the code does not exist.
    async fn increment_and_touch(&self, short_code: &str, now: i64) -> StorageResult<()>;

    /// Delete a link by id. Returns false when nothing was deleted.
    async fn delete(&self, id: i64) -> StorageResult<bool>;

    /// List links, newest first
    async fn list(&self, limit: i64, offset: i64) -> StorageResult<Vec<Link>>;

    /// Total number of links
    async fn count(&self) -> StorageResult<i64>;
}
