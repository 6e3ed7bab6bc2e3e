//! API routes
//!
//! Three route groups composed into a single router:
//! - public: auth, public catalog, payment webhook
//! - user: requires a valid JWT
//! - admin: requires a valid JWT with the ADMIN role

pub mod auth;
pub mod categories;
pub mod health;
pub mod orders;
pub mod payment_webhook;
pub mod products;

use axum::routing::{get, patch, post, put};
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use shared::error::AppError;

use crate::auth::{require_admin, require_auth};
use crate::state::AppState;

pub type ApiResult<T> = Result<axum::Json<T>, AppError>;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth)
    let public = Router::new()
        .route("/health", get(health::health_check))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route("/api/categories", get(categories::list))
        .route("/api/categories/{id}", get(categories::get_by_id))
        .route("/api/products/public", get(products::list_public))
        .route("/api/products/public/{id}", get(products::get_public))
        // Called by the gateway server; protected by signature verification only
        .route(
            "/api/orders/payment/webhook",
            post(payment_webhook::handle_webhook),
        );

    // User routes (JWT required)
    let user = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/orders", post(orders::create_order))
        .route("/api/orders/my", get(orders::my_orders))
        .route("/api/orders/{id}", get(orders::get_by_id))
        .route("/api/orders/{id}/payment", post(orders::create_payment_link))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Admin routes (JWT + ADMIN role)
    let admin = Router::new()
        .route("/api/orders", get(orders::list_all))
        .route("/api/orders/{id}/status", patch(orders::update_status))
        .route(
            "/api/products",
            get(products::list).post(products::create),
        )
        .route(
            "/api/products/{id}",
            get(products::get_by_id)
                .put(products::update)
                .delete(products::delete),
        )
        .route("/api/categories", post(categories::create))
        .route(
            "/api/categories/{id}",
            put(categories::update).delete(categories::delete),
        )
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public)
        .merge(user)
        .merge(admin)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
