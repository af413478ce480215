use crate::domain::{CacheKey, Tag};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheEvent {
    Stored(EntryStoredEvent),
    Invalidated(TagInvalidatedEvent),
    Purged(ExpiredPurgedEvent),
}

impl CacheEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            CacheEvent::Stored(_) => "stored",
            CacheEvent::Invalidated(_) => "invalidated",
            CacheEvent::Purged(_) => "purged",
        }
    }

    /// Whether the event concerns `tag`. Purges are not tag-scoped and always match.
    pub fn touches_tag(&self, tag: &str) -> bool {
        match self {
            CacheEvent::Stored(e) => e.tags.iter().any(|t| t.as_str() == tag),
            CacheEvent::Invalidated(e) => e.tag.as_str() == tag,
            CacheEvent::Purged(_) => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryStoredEvent {
    pub key: CacheKey,
    pub tags: Vec<Tag>,
    pub payload_size: usize,
    pub replaced: bool,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagInvalidatedEvent {
    pub tag: Tag,
    pub keys_removed: usize,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiredPurgedEvent {
    pub entries_removed: usize,
    pub timestamp: u64,
}

/// Seconds since UNIX epoch
pub fn now_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}
