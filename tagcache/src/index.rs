use crate::domain::{CacheKey, Tag};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Reverse mapping from tag to the keys currently stored under it.
///
/// Each attached key remembers the stamp of the entry that attached it, so a
/// stamped detach only removes the attachment made by that exact entry.
#[derive(Debug, Default)]
pub struct TagIndex {
    tags: DashMap<Tag, HashMap<CacheKey, u64>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, tag: &Tag, key: &CacheKey, stamp: u64) {
        self.tags
            .entry(tag.clone())
            .or_default()
            .insert(key.clone(), stamp);
    }

    /// Removes `key` from `tag`, dropping the tag once nothing references it.
    /// Returns whether the key was attached.
    pub fn detach(&self, tag: &Tag, key: &CacheKey) -> bool {
        self.detach_where(tag, key, |_| true)
    }

    /// Like [`detach`](Self::detach), but only if the attachment was made by
    /// the entry carrying `stamp`.
    pub fn detach_stamped(&self, tag: &Tag, key: &CacheKey, stamp: u64) -> bool {
        self.detach_where(tag, key, |attached| attached == stamp)
    }

    fn detach_where(&self, tag: &Tag, key: &CacheKey, matches: impl Fn(u64) -> bool) -> bool {
        match self.tags.entry(tag.clone()) {
            Entry::Occupied(mut occupied) => {
                let keys = occupied.get_mut();
                let removed =
                    keys.get(key).is_some_and(|stamp| matches(*stamp)) && keys.remove(key).is_some();
                if keys.is_empty() {
                    occupied.remove();
                }
                removed
            }
            Entry::Vacant(_) => false,
        }
    }

    pub fn keys_for(&self, tag: &Tag) -> HashSet<CacheKey> {
        self.tags
            .get(tag)
            .map(|keys| keys.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, tag: &Tag, key: &CacheKey) -> bool {
        self.tags
            .get(tag)
            .is_some_and(|keys| keys.contains_key(key))
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    /// Tag name to number of keys, ordered by tag.
    pub fn snapshot(&self) -> BTreeMap<Tag, usize> {
        self.tags
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().len()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_attach_and_keys_for() {
        let index = TagIndex::new();
        let tag = Tag::from("productsCache");
        index.attach(&tag, &"products-p1-l3".into(), 1);
        index.attach(&tag, &"products-p2-l3".into(), 2);

        let keys = index.keys_for(&tag);
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&CacheKey::from("products-p1-l3")));
        assert!(index.keys_for(&Tag::from("usersCache")).is_empty());
    }

    #[test]
    fn test_detach_drops_empty_tag() {
        let index = TagIndex::new();
        let tag = Tag::from("A");
        let key = CacheKey::from("k1");
        index.attach(&tag, &key, 1);
        assert_eq!(index.tag_count(), 1);

        assert!(index.detach(&tag, &key));
        assert_eq!(index.tag_count(), 0);
        assert!(!index.contains(&tag, &key));
    }

    #[test]
    fn test_detach_is_idempotent() {
        let index = TagIndex::new();
        let tag = Tag::from("A");
        let key = CacheKey::from("k1");

        assert!(!index.detach(&tag, &key));
        index.attach(&tag, &key, 1);
        assert!(index.detach(&tag, &key));
        assert!(!index.detach(&tag, &key));
    }

    #[test]
    fn test_stamped_detach_ignores_newer_attachment() {
        let index = TagIndex::new();
        let tag = Tag::from("A");
        let key = CacheKey::from("k1");
        index.attach(&tag, &key, 1);
        index.attach(&tag, &key, 2);

        assert!(!index.detach_stamped(&tag, &key, 1));
        assert!(index.contains(&tag, &key));
        assert!(index.detach_stamped(&tag, &key, 2));
        assert_eq!(index.tag_count(), 0);
    }

    #[test]
    fn test_concurrent_attach_does_not_lose_updates() {
        let index = Arc::new(TagIndex::new());
        let tag = Tag::from("shared");

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let index = index.clone();
                let tag = tag.clone();
                std::thread::spawn(move || {
                    for i in 0..250u64 {
                        let key = CacheKey::new(format!("w{}-{}", worker, i));
                        index.attach(&tag, &key, i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(index.keys_for(&tag).len(), 2000);
        assert_eq!(index.snapshot().get(&tag), Some(&2000));
    }
}
