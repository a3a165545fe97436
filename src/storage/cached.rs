use crate::models::Link;
use crate::storage::{Storage, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Read-through cache for short code lookups on the redirect path.
///
/// Only positive lookups are cached, so a freshly created code is never
/// hidden behind a stale miss. `exists` always goes to the underlying store
/// because the allocator needs a strongly consistent answer. Cached entries
/// carry the click count as of caching time; list/count read the store.
pub struct CachedStorage {
    inner: Arc<dyn Storage>,
    read_cache: Cache<String, Link>,
    /// id -> short code, so deletes by id can invalidate the right entry
    codes_by_id: Cache<i64, String>,
    /// Bumped after every successful delete. A lookup that observed a
    /// different value before its store read must not leave its result cached.
    delete_generation: AtomicU64,
}

impl CachedStorage {
    pub fn new(inner: Arc<dyn Storage>, max_cache_entries: u64, ttl_secs: u64) -> Self {
        let read_cache = Cache::builder()
            .max_capacity(max_cache_entries)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();
        let codes_by_id = Cache::builder()
            .max_capacity(max_cache_entries)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self {
            inner,
            read_cache,
            codes_by_id,
            delete_generation: AtomicU64::new(0),
        }
    }

    async fn remember(&self, link: &Link) {
        self.codes_by_id
            .insert(link.id, link.short_code.clone())
            .await;
        self.read_cache
            .insert(link.short_code.clone(), link.clone())
            .await;
    }
}

#[async_trait]
impl Storage for CachedStorage {
    async fn init(&self) -> Result<()> {
        self.inner.init().await
    }

    async fn exists(&self, short_code: &str) -> StorageResult<bool> {
        self.inner.exists(short_code).await
    }

    async fn insert(&self, short_code: &str, original_url: &str) -> StorageResult<Link> {
        let link = self.inner.insert(short_code, original_url).await?;
        self.remember(&link).await;
        Ok(link)
    }

    async fn find_by_code(&self, short_code: &str) -> StorageResult<Option<Link>> {
        if let Some(cached) = self.read_cache.get(short_code).await {
            return Ok(Some(cached));
        }

        let generation = self.delete_generation.load(Ordering::SeqCst);
        let result = self.inner.find_by_code(short_code).await?;
        if let Some(ref link) = result {
            self.remember(link).await;
            if self.delete_generation.load(Ordering::SeqCst) != generation {
                self.read_cache.invalidate(short_code).await;
            }
        }

        Ok(result)
    }

    async fn increment_and_touch(&self, short_code: &str, now: i64) -> StorageResult<()> {
        self.inner.increment_and_touch(short_code, now).await
    }

    async fn delete(&self, id: i64) -> StorageResult<bool> {
        let deleted = self.inner.delete(id).await?;
        if !deleted {
            return Ok(false);
        }

        self.delete_generation.fetch_add(1, Ordering::SeqCst);
        match self.codes_by_id.remove(&id).await {
            Some(code) => self.read_cache.invalidate(&code).await,
            // id -> code mapping was evicted, drop everything we hold
            None => self.read_cache.invalidate_all(),
        }

        Ok(true)
    }

    async fn list(&self, limit: i64, offset: i64) -> StorageResult<Vec<Link>> {
        self.inner.list(limit, offset).await
    }

    async fn count(&self) -> StorageResult<i64> {
        self.inner.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn cached() -> (Arc<dyn Storage>, CachedStorage) {
        let inner: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let cached = CachedStorage::new(Arc::clone(&inner), 100, 300);
        (inner, cached)
    }

    #[tokio::test]
    async fn lookup_is_served_from_cache() {
        let (inner, cached) = cached();
        let link = cached.insert("cache1", "https://example.com").await.unwrap();

        // Bypass the cache and remove the row; the cached entry still answers
        inner.delete(link.id).await.unwrap();
        let hit = cached.find_by_code("cache1").await.unwrap();
        assert_eq!(hit.unwrap().original_url, "https://example.com");
    }

    #[tokio::test]
    async fn delete_invalidates_cached_lookup() {
        let (_inner, cached) = cached();
        let link = cached.insert("cache2", "https://example.com").await.unwrap();
        assert!(cached.find_by_code("cache2").await.unwrap().is_some());

        assert!(cached.delete(link.id).await.unwrap());
        assert!(cached.find_by_code("cache2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn misses_are_not_cached() {
        let (inner, cached) = cached();
        assert!(cached.find_by_code("late").await.unwrap().is_none());

        inner.insert("late", "https://example.com/late").await.unwrap();
        let found = cached.find_by_code("late").await.unwrap();
        assert_eq!(found.unwrap().original_url, "https://example.com/late");
    }

    #[tokio::test]
    async fn exists_is_not_cached() {
        let (inner, cached) = cached();
        let link = cached.insert("fresh", "https://example.com").await.unwrap();
        inner.delete(link.id).await.unwrap();

        assert!(!cached.exists("fresh").await.unwrap());
    }
}
