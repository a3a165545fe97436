use crate::models::Link;
use crate::storage::{Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// In-memory storage backed by DashMap.
///
/// Links are keyed by short code; the shard lock held by the entry API makes
/// insert-if-absent and the click increment atomic per code. A second map
/// indexes codes by id for deletion.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    links: DashMap<String, Link>,
    codes_by_id: DashMap<i64, String>,
    next_id: AtomicI64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn exists(&self, short_code: &str) -> StorageResult<bool> {
        Ok(self.links.contains_key(short_code))
    }

    async fn insert(&self, short_code: &str, original_url: &str) -> StorageResult<Link> {
        let link = match self.links.entry(short_code.to_string()) {
            Entry::Occupied(_) => return Err(StorageError::Conflict),
            Entry::Vacant(slot) => {
                let link = Link {
                    id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
                    short_code: short_code.to_string(),
                    original_url: original_url.to_string(),
                    click_count: 0,
                    created_at: chrono::Utc::now().timestamp(),
                    last_clicked_at: None,
                };
                slot.insert(link.clone());
                link
            }
        };

        self.codes_by_id.insert(link.id, link.short_code.clone());
        Ok(link)
    }

    async fn find_by_code(&self, short_code: &str) -> StorageResult<Option<Link>> {
        Ok(self.links.get(short_code).map(|entry| entry.value().clone()))
    }

    async fn increment_and_touch(&self, short_code: &str, now: i64) -> StorageResult<()> {
        let mut link = self
            .links
            .get_mut(short_code)
            .ok_or(StorageError::NotFound)?;
        link.click_count += 1;
        link.last_clicked_at = Some(now);
        Ok(())
    }

    async fn delete(&self, id: i64) -> StorageResult<bool> {
        let Some((_, short_code)) = self.codes_by_id.remove(&id) else {
            return Ok(false);
        };
        Ok(self.links.remove(&short_code).is_some())
    }

    async fn list(&self, limit: i64, offset: i64) -> StorageResult<Vec<Link>> {
        let mut links: Vec<Link> = self
            .links
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        links.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(links
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count(&self) -> StorageResult<i64> {
        Ok(self.links.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn insert_rejects_duplicate_code() {
        let storage = MemoryStorage::new();

        storage.insert("abc123", "https://example.com/1").await.unwrap();
        let err = storage
            .insert("abc123", "https://example.com/2")
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Conflict));
        let link = storage.find_by_code("abc123").await.unwrap().unwrap();
        assert_eq!(link.original_url, "https://example.com/1");
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let storage = Arc::new(MemoryStorage::new());
        storage.insert("hot", "https://example.com").await.unwrap();

        let mut handles = vec![];
        for i in 0..100 {
            let storage = Arc::clone(&storage);
            handles.push(tokio::spawn(async move {
                storage.increment_and_touch("hot", i).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let link = storage.find_by_code("hot").await.unwrap().unwrap();
        assert_eq!(link.click_count, 100);
        assert!(link.last_clicked_at.is_some());
    }

    #[tokio::test]
    async fn increment_missing_code_is_not_found() {
        let storage = MemoryStorage::new();
        let err = storage.increment_and_touch("missing", 1).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn delete_by_id_removes_code() {
        let storage = MemoryStorage::new();
        let link = storage.insert("gone", "https://example.com").await.unwrap();

        assert!(storage.delete(link.id).await.unwrap());
        assert!(!storage.exists("gone").await.unwrap());
        assert!(!storage.delete(link.id).await.unwrap());
    }

    #[tokio::test]
    async fn list_is_newest_first_with_paging() {
        let storage = MemoryStorage::new();
        for i in 0..5 {
            storage
                .insert(&format!("code{i}"), "https://example.com")
                .await
                .unwrap();
        }

        let page = storage.list(2, 1).await.unwrap();
        let codes: Vec<_> = page.iter().map(|l| l.short_code.as_str()).collect();
        assert_eq!(codes, vec!["code3", "code2"]);
        assert_eq!(storage.count().await.unwrap(), 5);
    }
}
