use catalog::{Client, Product, Repository, SledCatalog, User};
use std::sync::Arc;
use tagcache::{CacheEvent, CacheManager};
use tokio::sync::broadcast;

/// Server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub cache: CacheManager,
    pub products: Arc<dyn Repository<Product>>,
    pub clients: Arc<dyn Repository<Client>>,
    pub users: Arc<dyn Repository<User>>,
    pub event_channel: broadcast::Sender<CacheEvent>,
    pub default_page_limit: u32,
}

impl AppState {
    const EVENT_CAPACITY: usize = 1000;

    /// Wires the catalog repositories and hooks the cache into the SSE channel.
    pub fn new(catalog: &SledCatalog, cache: CacheManager, default_page_limit: u32) -> Self {
        let (event_tx, _event_rx) = broadcast::channel(Self::EVENT_CAPACITY);
        let cache = cache.with_event_broadcaster(event_tx.clone());

        Self {
            cache,
            products: Arc::new(catalog.products()),
            clients: Arc::new(catalog.clients()),
            users: Arc::new(catalog.users()),
            event_channel: event_tx,
            default_page_limit,
        }
    }
}
