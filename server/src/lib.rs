//! lusac-server — Lưu Sắc handcrafted ceramics storefront backend
//!
//! Long-running HTTP service that:
//! - Serves the public catalog (products, categories)
//! - Authenticates customers and admins (argon2 + JWT)
//! - Places orders atomically against product stock
//! - Creates PayOS payment links and reconciles payment webhooks
//!
//! # Module structure
//!
//! ```text
//! server/src/
//! ├── config.rs   # env-driven configuration
//! ├── state.rs    # AppState (SQLite pool + gateway client)
//! ├── auth/       # JWT issuing/validation, auth middleware
//! ├── db/         # repositories (plain async fns over the pool)
//! ├── payos/      # payment gateway REST client + webhook verification
//! └── api/        # axum routers and handlers
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod payos;
pub mod state;
pub mod util;

// Re-export public types
pub use auth::CurrentUser;
pub use config::Config;
pub use state::AppState;
