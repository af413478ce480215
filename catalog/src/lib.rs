// Public API
pub mod error;
pub mod models;
pub mod pagination;
pub mod projection;
pub mod repository;
pub mod sled_repository;

// Re-export commonly used types
pub use error::CatalogError;
pub use models::{Client, Product, Record, User};
pub use pagination::PageRequest;
pub use projection::{ClientSummary, Projection, UserView, encode_payload, user_views};
pub use repository::Repository;
pub use sled_repository::{SledCatalog, SledRepository};
