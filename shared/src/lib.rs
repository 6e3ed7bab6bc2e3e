//! Shared types for the Lưu Sắc storefront
//!
//! Common types used by the server and any future client crates:
//! DTOs, domain enums, the unified error system and response envelopes.
//! DB row types derive `sqlx::FromRow` behind the `db` feature.

pub mod error;
pub mod models;
pub mod request;
pub mod response;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
pub use request::PaginationQuery;
pub use response::{PageMeta, Paginated};
