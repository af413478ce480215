use crate::domain::{CacheConfig, CacheKey};
use crate::events::CacheEvent;
use crate::ports::{EntryStore, StorageFactory};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, broadcast};

pub(crate) type FlightLocks = DashMap<CacheKey, Arc<Mutex<()>>>;

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub stores: AtomicU64,
    pub compute_failures: AtomicU64,
    pub invalidations: AtomicU64,
    pub keys_invalidated: AtomicU64,
}

impl Counters {
    pub fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub name: String,
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub compute_failures: u64,
    pub invalidations: u64,
    pub keys_invalidated: u64,
    pub entries: u64,
    pub tags: BTreeMap<String, usize>,
}

/// Read-through cache with tag-scoped invalidation.
///
/// Built once per process and shared by cloning; all clones see the same
/// entry store, counters and event channel. The data plane (`get_or_compute`)
/// lives in `planes::data`, invalidation in `planes::control`.
#[derive(Clone)]
pub struct CacheManager {
    pub(crate) name: String,
    pub(crate) store: Arc<dyn EntryStore>,
    pub(crate) flights: Option<Arc<FlightLocks>>,
    pub(crate) counters: Arc<Counters>,
    pub(crate) event_broadcaster: Option<broadcast::Sender<CacheEvent>>,
}

impl CacheManager {
    pub fn new(name: impl Into<String>, store: Arc<dyn EntryStore>) -> Self {
        Self {
            name: name.into(),
            store,
            flights: None,
            counters: Arc::new(Counters::default()),
            event_broadcaster: None,
        }
    }

    pub fn from_config(config: &CacheConfig, factory: &dyn StorageFactory) -> Self {
        let manager = Self::new(config.name.clone(), factory.create_from_config(config));
        if config.single_flight {
            manager.with_single_flight()
        } else {
            manager
        }
    }

    /// Serialize concurrent misses on the same key so only one computes.
    pub fn with_single_flight(mut self) -> Self {
        self.flights = Some(Arc::new(DashMap::new()));
        self
    }

    pub fn with_event_broadcaster(mut self, broadcaster: broadcast::Sender<CacheEvent>) -> Self {
        self.event_broadcaster = Some(broadcaster);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &Arc<dyn EntryStore> {
        &self.store
    }

    pub fn stats(&self) -> CacheStats {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        CacheStats {
            name: self.name.clone(),
            hits: load(&self.counters.hits),
            misses: load(&self.counters.misses),
            stores: load(&self.counters.stores),
            compute_failures: load(&self.counters.compute_failures),
            invalidations: load(&self.counters.invalidations),
            keys_invalidated: load(&self.counters.keys_invalidated),
            entries: self.store.entry_count(),
            tags: self
                .store
                .tag_index()
                .snapshot()
                .into_iter()
                .map(|(tag, count)| (tag.to_string(), count))
                .collect(),
        }
    }

    pub(crate) fn publish(&self, event: CacheEvent) {
        if let Some(ref broadcaster) = self.event_broadcaster {
            let kind = event.kind();
            match broadcaster.send(event) {
                Ok(subscriber_count) => {
                    tracing::debug!(
                        "Broadcasted {} event from cache '{}' to {} subscriber(s)",
                        kind,
                        self.name,
                        subscriber_count
                    );
                }
                Err(_) => {
                    tracing::trace!("No subscribers for {} event on cache '{}'", kind, self.name);
                }
            }
        }
    }
}

impl Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("name", &self.name)
            .field("single_flight", &self.flights.is_some())
            .field("entries", &self.store.entry_count())
            .finish()
    }
}
