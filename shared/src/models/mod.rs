//! Data models
//!
//! Shared between the server and frontend (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are UUID v4 strings (TEXT PRIMARY KEY).

pub mod category;
pub mod order;
pub mod product;
pub mod user;

// Re-exports
pub use category::*;
pub use order::*;
pub use product::*;
pub use user::*;
