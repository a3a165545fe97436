pub mod cached;
pub mod memory;
pub mod postgres;
pub mod sqlite;
pub mod trait_def;

pub use cached::CachedStorage;
pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;
pub use sqlite::SqliteStorage;
pub use trait_def::{Storage, StorageError, StorageResult};

use crate::config::{CacheConfig, DatabaseBackend, DatabaseConfig};
use std::sync::Arc;
use tracing::info;

/// Connect the configured backend, wrap it in the read cache when enabled
/// and initialize the schema.
pub async fn connect(
    database: &DatabaseConfig,
    cache: Option<&CacheConfig>,
) -> anyhow::Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match database.backend {
        DatabaseBackend::Sqlite => {
            info!("Using SQLite storage: {}", database.url);
            Arc::new(SqliteStorage::new(&database.url, database.max_connections).await?)
        }
        DatabaseBackend::Postgres => {
            info!("Using PostgreSQL storage");
            Arc::new(PostgresStorage::new(&database.url, database.max_connections).await?)
        }
        DatabaseBackend::Memory => {
            info!("Using in-memory storage, links are lost on restart");
            Arc::new(MemoryStorage::new())
        }
    };

    storage.init().await?;

    let storage = match cache {
        Some(cache) if cache.max_entries > 0 => {
            info!(
                max_entries = cache.max_entries,
                ttl_secs = cache.ttl_secs,
                "Read cache enabled"
            );
            Arc::new(CachedStorage::new(storage, cache.max_entries, cache.ttl_secs))
                as Arc<dyn Storage>
        }
        _ => storage,
    };

    Ok(storage)
}
