use crate::domain::{CacheEntry, CacheKey, Tag};
use crate::events::{CacheEvent, EntryStoredEvent, now_timestamp};
use crate::manager::{CacheManager, Counters, FlightLocks};
use bytes::Bytes;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A caller's share of a key's flight lock. The table entry is removed when
/// the last share is dropped, including when the caller's future is cancelled.
struct FlightSlot<'a> {
    flights: &'a FlightLocks,
    key: &'a CacheKey,
    lock: Arc<Mutex<()>>,
}

impl<'a> FlightSlot<'a> {
    fn join(flights: &'a FlightLocks, key: &'a CacheKey) -> Self {
        let lock = flights.entry(key.clone()).or_default().clone();
        Self { flights, key, lock }
    }
}

impl Drop for FlightSlot<'_> {
    fn drop(&mut self) {
        // One reference in the table plus ours means nobody else is waiting.
        self.flights.remove_if(self.key, |_, lock| {
            Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) == 2
        });
    }
}

impl CacheManager {
    /// Returns the payload stored under `key`, or runs `compute`, stores its
    /// result under every tag in `tags` and returns it.
    ///
    /// A hit returns the stored bytes untouched and never calls `compute`. If
    /// `compute` fails nothing is stored and its error is returned as is, so
    /// the next call for the key computes again.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &CacheKey,
        tags: &[Tag],
        compute: F,
    ) -> Result<Bytes, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes, E>>,
        E: From<shared::Error>,
    {
        if let Some(payload) = self.lookup(key).await? {
            return Ok(payload);
        }

        let Some(flights) = self.flights.clone() else {
            return self.compute_and_store(key, tags, compute).await;
        };

        let slot = FlightSlot::join(&flights, key);
        let _guard = slot.lock.lock().await;
        // Another caller may have filled the key while we waited.
        match self.store.get(key).await {
            Ok(Some(payload)) => {
                tracing::debug!("Single-flight follower served '{}' from cache", key);
                Ok(payload)
            }
            Ok(None) => self.compute_and_store(key, tags, compute).await,
            Err(err) => Err(E::from(err)),
        }
    }

    /// Plain lookup that records a hit or a miss.
    pub async fn lookup(&self, key: &CacheKey) -> shared::Result<Option<Bytes>> {
        let found = self.store.get(key).await?;
        if found.is_some() {
            Counters::bump(&self.counters.hits, 1);
            tracing::debug!("Cache hit for '{}' in cache '{}'", key, self.name);
        } else {
            Counters::bump(&self.counters.misses, 1);
            tracing::debug!("Cache miss for '{}' in cache '{}'", key, self.name);
        }
        Ok(found)
    }

    async fn compute_and_store<F, Fut, E>(
        &self,
        key: &CacheKey,
        tags: &[Tag],
        compute: F,
    ) -> Result<Bytes, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes, E>>,
        E: From<shared::Error>,
    {
        let payload = match compute().await {
            Ok(payload) => payload,
            Err(err) => {
                Counters::bump(&self.counters.compute_failures, 1);
                tracing::warn!("Compute for '{}' failed, nothing cached", key);
                return Err(err);
            }
        };

        let entry = CacheEntry::new(key.clone(), payload.clone(), tags.iter().cloned());
        let tags: Vec<Tag> = entry.tags.iter().cloned().collect();
        let replaced = self.store.put(entry).await?.is_some();
        Counters::bump(&self.counters.stores, 1);

        tracing::debug!(
            "Stored '{}' ({} bytes) under tags {:?} in cache '{}'",
            key,
            payload.len(),
            tags,
            self.name
        );

        self.publish(CacheEvent::Stored(EntryStoredEvent {
            key: key.clone(),
            tags,
            payload_size: payload.len(),
            replaced,
            timestamp: now_timestamp(),
        }));

        Ok(payload)
    }
}
