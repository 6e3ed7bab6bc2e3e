//! Authentication endpoints: register, login, me, password reset

use axum::{Extension, Json, extract::State};
use sha2::{Digest, Sha256};

use shared::error::{AppError, ErrorCode};
use shared::models::{
    AuthResponse, ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
    UserInfo, UserRole,
};
use shared::util::now_millis;

use super::ApiResult;
use crate::auth::{CurrentUser, create_token};
use crate::db;
use crate::state::AppState;
use crate::util::{generate_reset_token, hash_password, verify_password};

/// Reset tokens are valid for one hour
const RESET_TOKEN_TTL_MS: i64 = 60 * 60 * 1000;

/// Reset tokens are stored hashed; a leaked users table must not yield
/// usable tokens
fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<AuthResponse> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::validation("Invalid email address"));
    }
    if req.password.len() < 8 {
        return Err(AppError::validation(
            "Password must be at least 8 characters",
        ));
    }

    if db::users::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(AppError::new(ErrorCode::EmailAlreadyRegistered));
    }

    let hashed = hash_password(&req.password)
        .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;

    let user = db::users::create(
        &state.pool,
        &email,
        &hashed,
        &req.name,
        req.avatar.as_deref(),
        UserRole::User,
    )
    .await?;

    let token = create_token(&user.id, &user.email, user.role, &state.jwt_secret)
        .map_err(|e| AppError::internal(format!("Token creation failed: {e}")))?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok(Json(AuthResponse {
        token,
        user: UserInfo::from(user),
    }))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<AuthResponse> {
    let email = req.email.trim().to_lowercase();

    // Unified error for unknown email / wrong password to prevent enumeration
    let user = db::users::find_by_email(&state.pool, &email)
        .await?
        .ok_or_else(AppError::invalid_credentials)?;

    let Some(ref stored_hash) = user.password else {
        return Err(AppError::invalid_credentials());
    };
    if !verify_password(&req.password, stored_hash) {
        tracing::warn!(email = %email, "Login failed - invalid credentials");
        return Err(AppError::invalid_credentials());
    }

    let token = create_token(&user.id, &user.email, user.role, &state.jwt_secret)
        .map_err(|e| AppError::internal(format!("Token creation failed: {e}")))?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse {
        token,
        user: UserInfo::from(user),
    }))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<UserInfo> {
    let user = db::users::find_by_id(&state.pool, &current.id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;
    Ok(Json(UserInfo::from(user)))
}

/// POST /api/auth/forgot-password
///
/// Always responds with the same opaque message so the endpoint cannot be
/// used to probe which emails are registered.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<serde_json::Value> {
    let opaque = serde_json::json!({
        "message": "If the email exists, a reset link has been sent"
    });

    let email = req.email.trim().to_lowercase();
    let user = match db::users::find_by_email(&state.pool, &email).await {
        Ok(Some(u)) => u,
        _ => return Ok(Json(opaque)),
    };

    let token = generate_reset_token();
    let expires_at = now_millis() + RESET_TOKEN_TTL_MS;
    db::users::set_reset_token(&state.pool, &user.id, &hash_reset_token(&token), expires_at)
        .await?;

    // No mail sender is wired up; operators read the token from the log
    tracing::info!(user_id = %user.id, reset_token = %token, "Password reset token issued");

    Ok(Json(opaque))
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<serde_json::Value> {
    if req.new_password.len() < 8 {
        return Err(AppError::validation(
            "Password must be at least 8 characters",
        ));
    }

    let user = db::users::find_by_reset_token(&state.pool, &hash_reset_token(&req.token))
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ResetTokenInvalid))?;

    let hashed = hash_password(&req.new_password)
        .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;
    db::users::update_password(&state.pool, &user.id, &hashed).await?;

    tracing::info!(user_id = %user.id, "Password reset");

    Ok(Json(serde_json::json!({ "message": "Password reset successful" })))
}
