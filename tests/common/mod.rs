//! Shared helpers for integration tests

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use quicklink::models::Link;
use quicklink::shortener::{ClickRecorder, ClickRecorderConfig, LinkService, UrlValidator};
use quicklink::storage::{MemoryStorage, SqliteStorage, Storage, StorageError, StorageResult};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Helper to create in-memory SQLite storage
pub async fn create_sqlite_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

/// Service plus a handle on its click recorder so tests can drain it
pub fn create_service(storage: Arc<dyn Storage>) -> (Arc<LinkService>, Arc<ClickRecorder>) {
    let clicks = Arc::new(ClickRecorder::new(
        Arc::clone(&storage),
        ClickRecorderConfig::default(),
    ));
    let service = Arc::new(LinkService::with_recorder(
        storage,
        UrlValidator::default(),
        Arc::clone(&clicks),
    ));
    (service, clicks)
}

/// Storage wrapper with switchable failure modes
pub struct FaultyStorage {
    pub inner: Arc<dyn Storage>,
    /// `increment_and_touch` always fails
    pub fail_clicks: AtomicBool,
    /// every call except `init` fails as unavailable
    pub unavailable: AtomicBool,
    /// `exists` claims the code is free, then lets a "concurrent creator"
    /// take it before the caller's insert runs
    pub steal_codes: AtomicBool,
    /// delay applied before every click update
    pub click_delay_ms: AtomicU64,
}

impl FaultyStorage {
    pub fn new(inner: Arc<dyn Storage>) -> Self {
        Self {
            inner,
            fail_clicks: AtomicBool::new(false),
            unavailable: AtomicBool::new(false),
            steal_codes: AtomicBool::new(false),
            click_delay_ms: AtomicU64::new(0),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    fn check_available(&self) -> StorageResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for FaultyStorage {
    async fn init(&self) -> Result<()> {
        self.inner.init().await
    }

    async fn exists(&self, short_code: &str) -> StorageResult<bool> {
        self.check_available()?;
        if self.steal_codes.load(Ordering::SeqCst) {
            self.inner
                .insert(short_code, "https://example.com/stolen")
                .await?;
            return Ok(false);
        }
        self.inner.exists(short_code).await
    }

    async fn insert(&self, short_code: &str, original_url: &str) -> StorageResult<Link> {
        self.check_available()?;
        self.inner.insert(short_code, original_url).await
    }

    async fn find_by_code(&self, short_code: &str) -> StorageResult<Option<Link>> {
        self.check_available()?;
        self.inner.find_by_code(short_code).await
    }

    async fn increment_and_touch(&self, short_code: &str, now: i64) -> StorageResult<()> {
        let delay = self.click_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.check_available()?;
        if self.fail_clicks.load(Ordering::SeqCst) {
            return Err(StorageError::Other(anyhow::anyhow!("transient write failure")));
        }
        self.inner.increment_and_touch(short_code, now).await
    }

    async fn delete(&self, id: i64) -> StorageResult<bool> {
        self.check_available()?;
        self.inner.delete(id).await
    }

    async fn list(&self, limit: i64, offset: i64) -> StorageResult<Vec<Link>> {
        self.check_available()?;
        self.inner.list(limit, offset).await
    }

    async fn count(&self) -> StorageResult<i64> {
        self.check_available()?;
        self.inner.count().await
    }
}
