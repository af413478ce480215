#![deny(clippy::all)]

use crate::domain::{CacheConfig, CacheEntry, CacheKey};
use crate::index::TagIndex;
use async_trait::async_trait;
use bytes::Bytes;
use shared::Result;
use std::sync::Arc;

// Ports are the pluggable extension points for entry storage backends

/// Port for creating an entry store from configuration
pub trait StorageFactory: Send + Sync + 'static {
    fn create_from_config(&self, config: &CacheConfig) -> Arc<dyn EntryStore>;
}

/// Port for the cache entry store.
///
/// Implementations own a [`TagIndex`] and keep it consistent with the stored
/// entries: `put` and `delete` attach and detach tags under the same per-key
/// critical section that mutates the entry.
#[async_trait]
pub trait EntryStore: Send + Sync + 'static {
    /// Missing or expired keys yield `Ok(None)`.
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>>;

    /// Stores `entry`, replacing any entry under the same key. Returns the
    /// replaced entry.
    async fn put(&self, entry: CacheEntry) -> Result<Option<CacheEntry>>;

    /// Removes the entry and all of its tag attachments. Returns the removed
    /// entry, `None` when the key was absent.
    async fn delete(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    /// Drops entries whose time-to-live has elapsed. Returns how many went.
    async fn purge_expired(&self) -> Result<usize>;

    fn entry_count(&self) -> u64;

    fn tag_index(&self) -> &TagIndex;
}
