use crate::domain::{CacheEntry, CacheKey};
use crate::index::TagIndex;
use crate::ports::EntryStore;
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use shared::{Result, TtlMs};
use std::fmt::Debug;
use std::time::{Duration, Instant};

struct Slot {
    entry: CacheEntry,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// DashMap-backed entry store with an optional time-to-live.
///
/// Every mutation runs inside the key's shard lock and updates the tag index
/// before releasing it. The lock order is always entries, then index.
pub struct MemoryStore {
    entries: DashMap<CacheKey, Slot>,
    index: TagIndex,
    ttl: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_ttl(None)
    }

    pub fn with_ttl(ttl: Option<TtlMs>) -> Self {
        Self {
            entries: DashMap::new(),
            index: TagIndex::new(),
            ttl: ttl.map(|t| t.as_duration()),
        }
    }

    fn detach_all(&self, entry: &CacheEntry) {
        for tag in &entry.tags {
            self.index.detach(tag, &entry.key);
        }
    }

    /// Removes the key if `should_remove` approves the current slot.
    fn remove_if(&self, key: &CacheKey, should_remove: impl Fn(&Slot) -> bool) -> Option<CacheEntry> {
        match self.entries.entry(key.clone()) {
            Entry::Occupied(occupied) if should_remove(occupied.get()) => {
                self.detach_all(&occupied.get().entry);
                Some(occupied.remove().entry)
            }
            _ => None,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(slot) if !slot.is_expired(now) => return Ok(Some(slot.entry.payload.clone())),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.remove_if(key, |slot| slot.is_expired(now));
        }
        Ok(None)
    }

    async fn put(&self, entry: CacheEntry) -> Result<Option<CacheEntry>> {
        let expires_at = self.ttl.map(|ttl| Instant::now() + ttl);
        let attach = |entry: &CacheEntry| {
            for tag in &entry.tags {
                self.index.attach(tag, &entry.key, entry.stamp);
            }
        };

        match self.entries.entry(entry.key.clone()) {
            Entry::Occupied(mut occupied) => {
                attach(&entry);
                let previous = occupied.insert(Slot { entry, expires_at }).entry;
                let current = &occupied.get().entry;
                for tag in previous.tags.difference(&current.tags) {
                    self.index.detach(tag, &previous.key);
                }
                Ok(Some(previous))
            }
            Entry::Vacant(vacant) => {
                attach(&entry);
                vacant.insert(Slot { entry, expires_at });
                Ok(None)
            }
        }
    }

    async fn delete(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        Ok(self.remove_if(key, |_| true))
    }

    async fn purge_expired(&self) -> Result<usize> {
        let now = Instant::now();
        let expired: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|slot| slot.is_expired(now))
            .map(|slot| slot.key().clone())
            .collect();

        let removed = expired
            .iter()
            .filter_map(|key| self.remove_if(key, |slot| slot.is_expired(now)))
            .count();
        Ok(removed)
    }

    fn entry_count(&self) -> u64 {
        self.entries.len() as u64
    }

    fn tag_index(&self) -> &TagIndex {
        &self.index
    }
}

impl Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.entries.len())
            .field("tags", &self.index.tag_count())
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Tag;
    use std::sync::Arc;
    use tokio::time::{Duration, sleep};

    fn entry(key: &str, payload: &'static str, tags: &[&str]) -> CacheEntry {
        CacheEntry::new(
            key.into(),
            Bytes::from_static(payload.as_bytes()),
            tags.iter().map(|t| Tag::from(*t)),
        )
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryStore::new();
        store.put(entry("k1", "v1", &["A"])).await.unwrap();

        let payload = store.get(&"k1".into()).await.unwrap();
        assert_eq!(payload, Some(Bytes::from_static(b"v1")));
        assert!(store.tag_index().contains(&"A".into(), &"k1".into()));
    }

    #[tokio::test]
    async fn test_get_and_delete_missing_key_are_not_errors() {
        let store = MemoryStore::new();
        assert_eq!(store.get(&"missing".into()).await.unwrap(), None);
        assert!(store.delete(&"missing".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_tags() {
        let store = MemoryStore::new();
        store.put(entry("k1", "v1", &["A", "B"])).await.unwrap();
        let previous = store.put(entry("k1", "v2", &["B", "C"])).await.unwrap();

        assert_eq!(previous.map(|e| e.payload), Some(Bytes::from_static(b"v1")));
        assert_eq!(
            store.get(&"k1".into()).await.unwrap(),
            Some(Bytes::from_static(b"v2"))
        );
        let index = store.tag_index();
        assert!(!index.contains(&"A".into(), &"k1".into()));
        assert!(index.contains(&"B".into(), &"k1".into()));
        assert!(index.contains(&"C".into(), &"k1".into()));
        assert_eq!(index.tag_count(), 2);
    }

    #[tokio::test]
    async fn test_delete_detaches_every_tag() {
        let store = MemoryStore::new();
        store.put(entry("k1", "v1", &["A", "B"])).await.unwrap();
        store.put(entry("k2", "v2", &["B"])).await.unwrap();

        let removed = store.delete(&"k1".into()).await.unwrap();
        assert!(removed.is_some());

        let index = store.tag_index();
        assert!(index.keys_for(&"A".into()).is_empty());
        assert_eq!(index.keys_for(&"B".into()).len(), 1);
        assert_eq!(store.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_expired_entries_are_misses_and_purged() {
        let store = MemoryStore::with_ttl(Some(TtlMs(50)));
        store.put(entry("k1", "v1", &["A"])).await.unwrap();
        store.put(entry("k2", "v2", &["A"])).await.unwrap();
        assert!(store.get(&"k1".into()).await.unwrap().is_some());

        sleep(Duration::from_millis(80)).await;

        assert_eq!(store.get(&"k1".into()).await.unwrap(), None);
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.entry_count(), 0);
        assert_eq!(store.tag_index().tag_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_put_and_delete_keep_index_consistent() {
        let store = Arc::new(MemoryStore::new());
        let key = CacheKey::from("contended");

        let writers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    for _ in 0..200 {
                        store.put(entry("contended", "v", &["A", "B"])).await.unwrap();
                    }
                })
            })
            .collect();
        let deleters: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                let key = key.clone();
                tokio::spawn(async move {
                    for _ in 0..200 {
                        store.delete(&key).await.unwrap();
                    }
                })
            })
            .collect();
        for handle in writers.into_iter().chain(deleters) {
            handle.await.unwrap();
        }

        let present = store.get(&key).await.unwrap().is_some();
        let index = store.tag_index();
        assert_eq!(index.contains(&"A".into(), &key), present);
        assert_eq!(index.contains(&"B".into(), &key), present);
    }
}
