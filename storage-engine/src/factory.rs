use crate::moka_cache::MokaStore;
use shared::config::CacheBackend;
use std::sync::Arc;
use tagcache::{CacheConfig, EntryStore, MemoryStore, StorageFactory};

/// Builds the entry store named by `CacheConfig::backend`.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnifiedStorageFactory;

impl StorageFactory for UnifiedStorageFactory {
    fn create_from_config(&self, config: &CacheConfig) -> Arc<dyn EntryStore> {
        match config.backend {
            CacheBackend::Memory => {
                if config.max_entries.is_some() {
                    tracing::warn!(
                        "Cache '{}': max_entries is ignored by the memory backend",
                        config.name
                    );
                }
                tracing::info!("Cache '{}' using memory backend (ttl: {:?})", config.name, config.ttl);
                Arc::new(MemoryStore::with_ttl(config.ttl))
            }
            CacheBackend::Moka => {
                tracing::info!(
                    "Cache '{}' using moka backend (max_entries: {:?}, ttl: {:?})",
                    config.name,
                    config.max_entries,
                    config.ttl
                );
                Arc::new(MokaStore::new(&config.name, config.max_entries, config.ttl))
            }
        }
    }
}
