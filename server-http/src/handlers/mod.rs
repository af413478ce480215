pub mod cache;
pub mod clients;
pub mod products;
pub mod users;

pub use cache::*;
pub use clients::*;
pub use products::*;
pub use users::*;
