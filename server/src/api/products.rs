//! Product endpoints
//!
//! Admin CRUD plus the public storefront listing/detail. List endpoints run
//! the page read and the count read concurrently — the two are independent.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use shared::Paginated;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    Product, ProductCreate, ProductQuery, ProductUpdate, PublicProductDetail, PublicProductQuery,
};

use super::ApiResult;
use crate::db;
use crate::state::AppState;

/// Related products shown on the public detail page
const RELATED_PRODUCTS_LIMIT: i64 = 6;

// =============================================================================
// Admin
// =============================================================================

/// GET /api/products — admin listing with filters
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> ApiResult<Paginated<Product>> {
    let (data, total) = tokio::join!(
        db::products::find_page(&state.pool, &query),
        db::products::count_page(&state.pool, &query),
    );
    Ok(Json(Paginated::new(
        data?,
        query.page,
        query.pagination().limit(),
        total?,
    )))
}

/// GET /api/products/{id} — admin
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Product> {
    let product = db::products::find_by_id(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
    Ok(Json(product))
}

/// POST /api/products — admin
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<ProductCreate>,
) -> ApiResult<Product> {
    if payload.name.trim().is_empty() {
        return Err(AppError::validation("Product name must not be empty"));
    }
    let product = db::products::create(&state.pool, payload).await?;
    Ok(Json(product))
}

/// PUT /api/products/{id} — admin, partial update
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ProductUpdate>,
) -> ApiResult<Product> {
    let product = db::products::update(&state.pool, &id, payload).await?;
    Ok(Json(product))
}

/// DELETE /api/products/{id} — admin, soft delete
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    db::products::soft_delete(&state.pool, &id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

// =============================================================================
// Public storefront
// =============================================================================

/// GET /api/products/public — ACTIVE products with search/price filters
pub async fn list_public(
    State(state): State<AppState>,
    Query(query): Query<PublicProductQuery>,
) -> ApiResult<Paginated<Product>> {
    let (data, total) = tokio::join!(
        db::products::find_public_page(&state.pool, &query),
        db::products::count_public_page(&state.pool, &query),
    );
    Ok(Json(Paginated::new(
        data?,
        query.page,
        query.pagination().limit(),
        total?,
    )))
}

/// GET /api/products/public/{id} — ACTIVE product with related products
pub async fn get_public(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<PublicProductDetail> {
    let product = db::products::find_active_by_id(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;

    let related_products = db::products::find_related(
        &state.pool,
        &product.category_id,
        &product.id,
        RELATED_PRODUCTS_LIMIT,
    )
    .await?;

    Ok(Json(PublicProductDetail {
        product,
        related_products,
    }))
}
