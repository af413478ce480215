use crate::domain::Tag;
use crate::events::{CacheEvent, ExpiredPurgedEvent, TagInvalidatedEvent, now_timestamp};
use crate::manager::{CacheManager, Counters};
use shared::Result;

impl CacheManager {
    /// Removes every entry stored under `tag`.
    ///
    /// Entries go as a whole, so they also leave every other tag they carried.
    /// An unknown tag is a no-op. Returns the number of entries removed.
    pub async fn invalidate(&self, tag: &Tag) -> Result<usize> {
        let keys = self.store.tag_index().keys_for(tag);

        let mut removed = 0;
        for key in &keys {
            if self.store.delete(key).await?.is_some() {
                removed += 1;
            }
        }

        Counters::bump(&self.counters.invalidations, 1);
        Counters::bump(&self.counters.keys_invalidated, removed as u64);
        tracing::info!(
            "Invalidated tag '{}' in cache '{}': {} entr{} removed",
            tag,
            self.name,
            removed,
            if removed == 1 { "y" } else { "ies" }
        );

        self.publish(CacheEvent::Invalidated(TagInvalidatedEvent {
            tag: tag.clone(),
            keys_removed: removed,
            timestamp: now_timestamp(),
        }));

        Ok(removed)
    }

    pub async fn invalidate_tags(&self, tags: &[Tag]) -> Result<usize> {
        let mut removed = 0;
        for tag in tags {
            removed += self.invalidate(tag).await?;
        }
        Ok(removed)
    }

    /// Drops expired entries from the backing store.
    pub async fn purge_expired(&self) -> Result<usize> {
        let removed = self.store.purge_expired().await?;
        if removed > 0 {
            tracing::debug!("Purged {} expired entries from cache '{}'", removed, self.name);
            self.publish(CacheEvent::Purged(ExpiredPurgedEvent {
                entries_removed: removed,
                timestamp: now_timestamp(),
            }));
        }
        Ok(removed)
    }
}
