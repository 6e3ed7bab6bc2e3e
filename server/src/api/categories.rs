//! Category endpoints

use axum::{
    Json,
    extract::{Path, State},
};

use shared::error::{AppError, ErrorCode};
use shared::models::{Category, CategoryCreate, CategoryDetail, CategoryUpdate, CategoryWithCount};

use super::ApiResult;
use crate::db;
use crate::state::AppState;

/// GET /api/categories — all categories with product counts, by name
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<CategoryWithCount>> {
    let categories = db::categories::find_all_with_counts(&state.pool).await?;
    Ok(Json(categories))
}

/// GET /api/categories/{id} — category detail with its products
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<CategoryDetail> {
    let category = db::categories::find_by_id(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::CategoryNotFound))?;
    let products = db::products::find_by_category(&state.pool, &id).await?;
    Ok(Json(CategoryDetail { category, products }))
}

/// POST /api/categories — admin
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CategoryCreate>,
) -> ApiResult<Category> {
    if payload.name.trim().is_empty() {
        return Err(AppError::validation("Category name must not be empty"));
    }
    let category = db::categories::create(&state.pool, payload).await?;
    Ok(Json(category))
}

/// PUT /api/categories/{id} — admin
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<CategoryUpdate>,
) -> ApiResult<Category> {
    let category = db::categories::update(&state.pool, &id, payload).await?;
    Ok(Json(category))
}

/// DELETE /api/categories/{id} — admin; rejected while products reference it
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    db::categories::delete(&state.pool, &id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
