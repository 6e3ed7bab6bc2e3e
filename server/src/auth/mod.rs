//! Authentication: JWT issuing/validation and axum middleware

pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, CurrentUser, create_token, decode_token};
pub use middleware::{require_admin, require_auth};
