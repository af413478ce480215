pub mod factory;
pub mod moka_cache;

pub use factory::UnifiedStorageFactory;
pub use moka_cache::MokaStore;
