use std::sync::Arc;
use tracing::info;

use super::allocator::CodeAllocator;
use super::clicks::{ClickRecorder, ClickRecorderConfig};
use super::error::ShortenerError;
use super::resolver::{RedirectResolver, Resolution};
use super::validation::UrlValidator;
use crate::models::Link;
use crate::storage::Storage;

const MAX_LIST_LIMIT: i64 = 500;

/// Link operations consumed by the HTTP layer and the admin CLI.
pub struct LinkService {
    storage: Arc<dyn Storage>,
    validator: UrlValidator,
    allocator: CodeAllocator,
    resolver: RedirectResolver,
    clicks: Arc<ClickRecorder>,
}

impl LinkService {
    /// Build the service and start its click recorder on the current runtime
    pub fn new(
        storage: Arc<dyn Storage>,
        validator: UrlValidator,
        click_config: ClickRecorderConfig,
    ) -> Self {
        let clicks = Arc::new(ClickRecorder::new(Arc::clone(&storage), click_config));
        Self::with_recorder(storage, validator, clicks)
    }

    pub fn with_recorder(
        storage: Arc<dyn Storage>,
        validator: UrlValidator,
        clicks: Arc<ClickRecorder>,
    ) -> Self {
        Self {
            allocator: CodeAllocator::new(Arc::clone(&storage)),
            resolver: RedirectResolver::new(Arc::clone(&storage), Arc::clone(&clicks)),
            storage,
            validator,
            clicks,
        }
    }

    /// Validate, allocate a code and persist the link.
    ///
    /// `ShortenerError::Conflict` means a concurrent creation claimed the same
    /// code between the allocator's check and the insert; callers may retry.
    pub async fn create_link(&self, raw_url: &str) -> Result<Link, ShortenerError> {
        let original_url = self.validator.normalize_and_validate(raw_url)?;
        let short_code = self.allocator.allocate().await?;
        let link = self.storage.insert(&short_code, &original_url).await?;

        info!(short_code = %link.short_code, id = link.id, "created link");
        Ok(link)
    }

    pub async fn resolve(&self, code: &str) -> Result<Resolution, ShortenerError> {
        self.resolver.resolve(code).await
    }

    pub async fn delete_link(&self, id: i64) -> Result<(), ShortenerError> {
        if self.storage.delete(id).await? {
            info!(id, "deleted link");
            Ok(())
        } else {
            Err(ShortenerError::NotFound)
        }
    }

    /// Newest first; `limit` is clamped to 1..=500
    pub async fn list_links(&self, limit: i64, offset: i64) -> Result<Vec<Link>, ShortenerError> {
        let limit = limit.clamp(1, MAX_LIST_LIMIT);
        Ok(self.storage.list(limit, offset.max(0)).await?)
    }

    pub async fn link_count(&self) -> Result<i64, ShortenerError> {
        Ok(self.storage.count().await?)
    }

    /// Flush pending click updates
    pub async fn shutdown(&self) {
        self.clicks.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn service() -> LinkService {
        LinkService::new(
            Arc::new(MemoryStorage::new()),
            UrlValidator::default(),
            ClickRecorderConfig::default(),
        )
    }

    #[tokio::test]
    async fn create_then_resolve() {
        let service = service();

        let link = service.create_link("example.com/path").await.unwrap();
        assert_eq!(link.original_url, "https://example.com/path");
        assert_eq!(link.short_code.len(), 6);

        let resolved = service.resolve(&link.short_code).await.unwrap();
        assert_eq!(resolved.original_url, "https://example.com/path");
        let again = service.resolve(&link.short_code).await.unwrap();
        assert_eq!(resolved, again);
    }

    #[tokio::test]
    async fn resolve_unknown_code_is_not_found() {
        let service = service();
        let err = service.resolve("doesnotexist").await.unwrap_err();
        assert!(matches!(err, ShortenerError::NotFound));
    }

    #[tokio::test]
    async fn invalid_url_is_rejected_before_allocation() {
        let service = service();
        let err = service.create_link("ftp://example.com").await.unwrap_err();
        assert_eq!(err.kind(), "invalid_url");
        assert_eq!(service.link_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_link_then_resolution_fails() {
        let service = service();
        let link = service.create_link("https://example.com").await.unwrap();

        service.delete_link(link.id).await.unwrap();

        assert!(matches!(
            service.resolve(&link.short_code).await,
            Err(ShortenerError::NotFound)
        ));
        assert!(matches!(
            service.delete_link(link.id).await,
            Err(ShortenerError::NotFound)
        ));
    }

    #[tokio::test]
    async fn every_successful_resolve_is_counted() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let service = LinkService::new(
            Arc::clone(&storage),
            UrlValidator::default(),
            ClickRecorderConfig { max_in_flight: 1 },
        );
        let link = service.create_link("https://example.com/hot").await.unwrap();

        for _ in 0..200 {
            service.resolve(&link.short_code).await.unwrap();
        }
        service.shutdown().await;

        let stored = storage.find_by_code(&link.short_code).await.unwrap().unwrap();
        assert_eq!(stored.click_count, 200);
    }

    #[tokio::test]
    async fn list_clamps_limit() {
        let service = service();
        for i in 0..3 {
            service
                .create_link(&format!("https://example.com/{i}"))
                .await
                .unwrap();
        }

        assert_eq!(service.list_links(0, 0).await.unwrap().len(), 1);
        assert_eq!(service.list_links(10_000, 0).await.unwrap().len(), 3);
    }
}
