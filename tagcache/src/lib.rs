#![deny(clippy::all)]

pub mod domain;
pub mod events;
pub mod index;
pub mod manager;
pub mod planes;
pub mod ports;
pub mod store;

pub use domain::{CacheConfig, CacheEntry, CacheKey, Tag};
pub use events::CacheEvent;
pub use index::TagIndex;
pub use manager::{CacheManager, CacheStats};
pub use ports::{EntryStore, StorageFactory};
pub use store::MemoryStore;
