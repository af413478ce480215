use async_trait::async_trait;
use bytes::Bytes;
use moka::future::Cache;
use moka::notification::RemovalCause;
use moka::ops::compute::Op;
use shared::{Result, TtlMs};
use std::fmt::Debug;
use std::future::ready;
use std::sync::Arc;
use tagcache::{CacheEntry, CacheKey, EntryStore, TagIndex};

/// Moka-based entry store with optional capacity bound and TTL.
///
/// Writes go through `and_compute_with`, which serializes them per key, and
/// adjust the tag index inside that closure. Entries moka drops on its own
/// (expiry, capacity) are detached by the eviction listener; the detach is
/// stamped so a late notification cannot remove a newer entry's attachment.
pub struct MokaStore {
    cache: Cache<CacheKey, CacheEntry>,
    index: Arc<TagIndex>,
}

impl MokaStore {
    pub fn new(name: &str, max_entries: Option<u64>, ttl: Option<TtlMs>) -> Self {
        let index = Arc::new(TagIndex::new());
        let listener_index = index.clone();

        let mut builder = Cache::builder().name(name).eviction_listener(
            move |key: Arc<CacheKey>, entry: CacheEntry, cause: RemovalCause| {
                if cause.was_evicted() {
                    for tag in &entry.tags {
                        listener_index.detach_stamped(tag, &key, entry.stamp);
                    }
                    tracing::trace!("Evicted '{}' ({:?})", key, cause);
                }
            },
        );

        if let Some(capacity) = max_entries {
            builder = builder.max_capacity(capacity);
        }

        if let Some(ttl) = ttl {
            builder = builder.time_to_live(ttl.as_duration());
        }

        Self {
            cache: builder.build(),
            index,
        }
    }

    /// Unbounded store without expiry.
    pub fn new_unbounded(name: &str) -> Self {
        Self::new(name, None, None)
    }
}

#[async_trait]
impl EntryStore for MokaStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>> {
        Ok(self.cache.get(key).await.map(|entry| entry.payload))
    }

    async fn put(&self, entry: CacheEntry) -> Result<Option<CacheEntry>> {
        let index = &self.index;
        let mut previous = None;

        self.cache
            .entry(entry.key.clone())
            .and_compute_with(|current| {
                for tag in &entry.tags {
                    index.attach(tag, &entry.key, entry.stamp);
                }
                if let Some(current) = current {
                    let old = current.into_value();
                    for tag in old.tags.difference(&entry.tags) {
                        index.detach_stamped(tag, &old.key, old.stamp);
                    }
                    previous = Some(old);
                }
                ready(Op::Put(entry))
            })
            .await;

        Ok(previous)
    }

    async fn delete(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let index = &self.index;
        let mut removed = None;

        self.cache
            .entry(key.clone())
            .and_compute_with(|current| match current {
                Some(current) => {
                    let old = current.into_value();
                    for tag in &old.tags {
                        index.detach_stamped(tag, &old.key, old.stamp);
                    }
                    removed = Some(old);
                    ready(Op::Remove)
                }
                None => ready(Op::Nop),
            })
            .await;

        if removed.is_none() {
            // Expired entries look absent to `and_compute_with`; run maintenance
            // so the listener detaches them before we report the key gone.
            self.cache.run_pending_tasks().await;
        }

        Ok(removed)
    }

    async fn purge_expired(&self) -> Result<usize> {
        let before = self.cache.entry_count();
        self.cache.run_pending_tasks().await;
        Ok(before.saturating_sub(self.cache.entry_count()) as usize)
    }

    fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    fn tag_index(&self) -> &TagIndex {
        &self.index
    }
}

impl Debug for MokaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaStore")
            .field("entry_count", &self.cache.entry_count())
            .field("tags", &self.index.tag_count())
            .finish()
    }
}
