use bytes::Bytes;
use serde::{Deserialize, Serialize};
use shared::TtlMs;
use shared::config::{CacheBackend, CacheSettings};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_STAMP: AtomicU64 = AtomicU64::new(1);

/// Identifies one cached response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Key for one page of a collection listing.
    ///
    /// Layout: `{collection}[-s{scope}]-p{page}-l{limit}[-g{projection}]`, so
    /// `("products", 1, 3, None, None)` yields `products-p1-l3`.
    pub fn for_page(
        collection: &str,
        page: u32,
        limit: u32,
        scope: Option<u64>,
        projection: Option<&str>,
    ) -> Self {
        let mut raw = String::from(collection);
        if let Some(scope) = scope {
            raw.push_str(&format!("-s{}", scope));
        }
        raw.push_str(&format!("-p{}-l{}", page, limit));
        if let Some(projection) = projection {
            raw.push_str(&format!("-g{}", projection));
        }
        Self(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Label grouping entries for bulk invalidation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Tag {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// An immutable stored response.
///
/// `stamp` is unique per entry instance; it lets late eviction notifications
/// recognise that the key has since been re-stored.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub payload: Bytes,
    pub tags: BTreeSet<Tag>,
    pub stamp: u64,
}

impl CacheEntry {
    pub fn new(key: CacheKey, payload: Bytes, tags: impl IntoIterator<Item = Tag>) -> Self {
        Self {
            key,
            payload,
            tags: tags.into_iter().collect(),
            stamp: NEXT_STAMP.fetch_add(1, Ordering::Relaxed),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub name: String,
    pub backend: CacheBackend,
    pub ttl: Option<TtlMs>,
    pub max_entries: Option<u64>,
    pub single_flight: bool,
}

impl CacheConfig {
    pub fn new(name: impl Into<String>, backend: CacheBackend) -> Self {
        Self {
            name: name.into(),
            backend,
            ttl: None,
            max_entries: None,
            single_flight: false,
        }
    }

    pub fn from_settings(name: impl Into<String>, settings: &CacheSettings) -> Self {
        Self {
            name: name.into(),
            backend: settings.backend,
            ttl: settings.ttl,
            max_entries: settings.max_entries,
            single_flight: settings.single_flight,
        }
    }
}
