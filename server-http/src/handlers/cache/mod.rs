pub mod admin;
pub mod events;
pub mod health;

pub use admin::*;
pub use events::*;
pub use health::*;
