//! Authentication middleware
//!
//! Axum middleware layers for JWT authentication and admin authorization.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use shared::error::{AppError, ErrorCode};

use crate::auth::{CurrentUser, decode_token};
use crate::state::AppState;

/// Middleware that extracts and verifies the JWT from the Authorization
/// header, then injects a [`CurrentUser`] into the request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(AppError::unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?;

    let claims = decode_token(token, &state.jwt_secret).map_err(|e| {
        tracing::debug!(error = %e, "JWT validation failed");
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::token_expired(),
            _ => AppError::invalid_token("Invalid token"),
        }
    })?;

    req.extensions_mut().insert(CurrentUser::from(claims));
    Ok(next.run(req).await)
}

/// Middleware that requires an admin role. Must run after [`require_auth`].
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(AppError::unauthorized)?;

    if !user.is_admin() {
        tracing::warn!(
            user_id = %user.id,
            email = %user.email,
            "Admin access denied"
        );
        return Err(AppError::new(ErrorCode::AdminRequired));
    }

    Ok(next.run(req).await)
}
