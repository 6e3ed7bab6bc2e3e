//! Product Repository
//!
//! Stock (`quantity`) is mutated only by order placement
//! (`orders::create_order`), inside its transaction.

use sqlx::SqlitePool;
use uuid::Uuid;

use shared::error::ErrorCode;
use shared::models::{
    Product, ProductCreate, ProductQuery, ProductStatus, ProductUpdate, PublicProductQuery,
};
use shared::util::now_millis;

use super::{RepoError, RepoResult};

/// Base select: product columns plus the joined category name
const PRODUCT_SELECT: &str = "SELECT p.*, c.name AS category_name
     FROM products p JOIN categories c ON c.id = p.category_id";

/// Sort columns accepted from query strings
fn sort_column(sort_by: Option<&str>) -> &'static str {
    match sort_by {
        Some("price") => "p.price",
        Some("updated_at") => "p.updated_at",
        _ => "p.created_at",
    }
}

fn sort_direction(sort_order: Option<&str>) -> &'static str {
    match sort_order {
        Some("asc") => "ASC",
        _ => "DESC",
    }
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> RepoResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!("{PRODUCT_SELECT} WHERE p.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(product)
}

/// Public detail: ACTIVE products only
pub async fn find_active_by_id(pool: &SqlitePool, id: &str) -> RepoResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "{PRODUCT_SELECT} WHERE p.id = ? AND p.status = 'ACTIVE'"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(product)
}

/// Up to `limit` other ACTIVE products from the same category
pub async fn find_related(
    pool: &SqlitePool,
    category_id: &str,
    exclude_id: &str,
    limit: i64,
) -> RepoResult<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(&format!(
        "{PRODUCT_SELECT}
         WHERE p.category_id = ? AND p.status = 'ACTIVE' AND p.id != ?
         ORDER BY p.created_at DESC LIMIT ?"
    ))
    .bind(category_id)
    .bind(exclude_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(products)
}

pub async fn find_by_category(pool: &SqlitePool, category_id: &str) -> RepoResult<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(&format!(
        "{PRODUCT_SELECT} WHERE p.category_id = ? ORDER BY p.created_at DESC"
    ))
    .bind(category_id)
    .fetch_all(pool)
    .await?;
    Ok(products)
}

pub async fn create(pool: &SqlitePool, data: ProductCreate) -> RepoResult<Product> {
    // Referenced category must exist (FK would also catch this, but report
    // it as a domain error rather than a database error)
    let category_exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE id = ?")
        .bind(&data.category_id)
        .fetch_one(pool)
        .await?;
    if category_exists == 0 {
        return Err(RepoError::Business(
            ErrorCode::CategoryNotFound,
            format!("Category {} not found", data.category_id),
        ));
    }

    if data.price < 0.0 {
        return Err(RepoError::Business(
            ErrorCode::ValidationFailed,
            "price must be non-negative".into(),
        ));
    }
    if data.quantity < 0 {
        return Err(RepoError::Business(
            ErrorCode::ValidationFailed,
            "quantity must be non-negative".into(),
        ));
    }

    let id = Uuid::new_v4().to_string();
    let now = now_millis();
    let gallery_json =
        serde_json::to_string(&data.gallery_images).unwrap_or_else(|_| "[]".to_string());
    let status = data.status.unwrap_or(ProductStatus::Active);

    sqlx::query(
        "INSERT INTO products (id, name, description, price, quantity, image_url,
         thumbnail_image, gallery_images, glb_url, status, category_id, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&data.name)
    .bind(&data.description)
    .bind(data.price)
    .bind(data.quantity)
    .bind(&data.image_url)
    .bind(&data.thumbnail_image)
    .bind(&gallery_json)
    .bind(&data.glb_url)
    .bind(status.as_str())
    .bind(&data.category_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, &id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create product".into()))
}

pub async fn update(pool: &SqlitePool, id: &str, data: ProductUpdate) -> RepoResult<Product> {
    if data.price.is_some_and(|p| p < 0.0) {
        return Err(RepoError::Business(
            ErrorCode::ValidationFailed,
            "price must be non-negative".into(),
        ));
    }
    if data.quantity.is_some_and(|q| q < 0) {
        return Err(RepoError::Business(
            ErrorCode::ValidationFailed,
            "quantity must be non-negative".into(),
        ));
    }

    let gallery_json = data
        .gallery_images
        .as_ref()
        .map(|g| serde_json::to_string(g).unwrap_or_else(|_| "[]".to_string()));

    let rows = sqlx::query(
        "UPDATE products SET
         name = COALESCE(?1, name),
         description = COALESCE(?2, description),
         price = COALESCE(?3, price),
         quantity = COALESCE(?4, quantity),
         image_url = COALESCE(?5, image_url),
         thumbnail_image = COALESCE(?6, thumbnail_image),
         gallery_images = COALESCE(?7, gallery_images),
         glb_url = COALESCE(?8, glb_url),
         status = COALESCE(?9, status),
         category_id = COALESCE(?10, category_id),
         updated_at = ?11
         WHERE id = ?12",
    )
    .bind(data.name)
    .bind(data.description)
    .bind(data.price)
    .bind(data.quantity)
    .bind(data.image_url)
    .bind(data.thumbnail_image)
    .bind(gallery_json)
    .bind(data.glb_url)
    .bind(data.status.map(|s| s.as_str()))
    .bind(data.category_id)
    .bind(now_millis())
    .bind(id)
    .execute(pool)
    .await?;

    if rows.rows_affected() == 0 {
        return Err(RepoError::Business(
            ErrorCode::ProductNotFound,
            format!("Product {id} not found"),
        ));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Business(ErrorCode::ProductNotFound, format!("Product {id} not found")))
}

/// Soft delete: products referenced by orders are never hard-deleted
pub async fn soft_delete(pool: &SqlitePool, id: &str) -> RepoResult<()> {
    let rows = sqlx::query("UPDATE products SET status = 'DELETED', updated_at = ? WHERE id = ?")
        .bind(now_millis())
        .bind(id)
        .execute(pool)
        .await?;

    if rows.rows_affected() == 0 {
        return Err(RepoError::Business(
            ErrorCode::ProductNotFound,
            format!("Product {id} not found"),
        ));
    }
    Ok(())
}

// =============================================================================
// Paged listings (admin and public storefront)
// =============================================================================

/// Admin listing: optional status/category/name-search filters
pub async fn find_page(pool: &SqlitePool, query: &ProductQuery) -> RepoResult<Vec<Product>> {
    let mut sql = format!("{PRODUCT_SELECT} WHERE 1 = 1");
    if query.status.is_some() {
        sql.push_str(" AND p.status = ?");
    }
    if query.category_id.is_some() {
        sql.push_str(" AND p.category_id = ?");
    }
    if query.search.is_some() {
        sql.push_str(" AND p.name LIKE ?");
    }
    sql.push_str(&format!(
        " ORDER BY {} {} LIMIT ? OFFSET ?",
        sort_column(query.sort_by.as_deref()),
        sort_direction(query.sort_order.as_deref())
    ));

    let mut q = sqlx::query_as::<_, Product>(&sql);
    if let Some(status) = query.status {
        q = q.bind(status.as_str());
    }
    if let Some(ref category_id) = query.category_id {
        q = q.bind(category_id.clone());
    }
    if let Some(ref search) = query.search {
        q = q.bind(format!("%{search}%"));
    }
    q = q
        .bind(query.pagination().limit() as i64)
        .bind(query.pagination().offset() as i64);

    Ok(q.fetch_all(pool).await?)
}

pub async fn count_page(pool: &SqlitePool, query: &ProductQuery) -> RepoResult<u64> {
    let mut sql = "SELECT COUNT(*) FROM products p WHERE 1 = 1".to_string();
    if query.status.is_some() {
        sql.push_str(" AND p.status = ?");
    }
    if query.category_id.is_some() {
        sql.push_str(" AND p.category_id = ?");
    }
    if query.search.is_some() {
        sql.push_str(" AND p.name LIKE ?");
    }

    let mut q = sqlx::query_scalar::<_, i64>(&sql);
    if let Some(status) = query.status {
        q = q.bind(status.as_str());
    }
    if let Some(ref category_id) = query.category_id {
        q = q.bind(category_id.clone());
    }
    if let Some(ref search) = query.search {
        q = q.bind(format!("%{search}%"));
    }

    Ok(q.fetch_one(pool).await? as u64)
}

/// Public listing: ACTIVE only, name/description search, price range
pub async fn find_public_page(
    pool: &SqlitePool,
    query: &PublicProductQuery,
) -> RepoResult<Vec<Product>> {
    let mut sql = format!("{PRODUCT_SELECT} WHERE p.status = 'ACTIVE'");
    if query.category_id.is_some() {
        sql.push_str(" AND p.category_id = ?");
    }
    if query.search.is_some() {
        sql.push_str(" AND (p.name LIKE ? OR p.description LIKE ?)");
    }
    if query.min_price.is_some() {
        sql.push_str(" AND p.price >= ?");
    }
    if query.max_price.is_some() {
        sql.push_str(" AND p.price <= ?");
    }
    sql.push_str(&format!(
        " ORDER BY {} {} LIMIT ? OFFSET ?",
        sort_column(query.sort_by.as_deref()),
        sort_direction(query.sort_order.as_deref())
    ));

    let mut q = sqlx::query_as::<_, Product>(&sql);
    if let Some(ref category_id) = query.category_id {
        q = q.bind(category_id.clone());
    }
    if let Some(ref search) = query.search {
        let pattern = format!("%{search}%");
        q = q.bind(pattern.clone()).bind(pattern);
    }
    if let Some(min_price) = query.min_price {
        q = q.bind(min_price);
    }
    if let Some(max_price) = query.max_price {
        q = q.bind(max_price);
    }
    q = q
        .bind(query.pagination().limit() as i64)
        .bind(query.pagination().offset() as i64);

    Ok(q.fetch_all(pool).await?)
}

pub async fn count_public_page(pool: &SqlitePool, query: &PublicProductQuery) -> RepoResult<u64> {
    let mut sql = "SELECT COUNT(*) FROM products p WHERE p.status = 'ACTIVE'".to_string();
    if query.category_id.is_some() {
        sql.push_str(" AND p.category_id = ?");
    }
    if query.search.is_some() {
        sql.push_str(" AND (p.name LIKE ? OR p.description LIKE ?)");
    }
    if query.min_price.is_some() {
        sql.push_str(" AND p.price >= ?");
    }
    if query.max_price.is_some() {
        sql.push_str(" AND p.price <= ?");
    }

    let mut q = sqlx::query_scalar::<_, i64>(&sql);
    if let Some(ref category_id) = query.category_id {
        q = q.bind(category_id.clone());
    }
    if let Some(ref search) = query.search {
        let pattern = format!("%{search}%");
        q = q.bind(pattern.clone()).bind(pattern);
    }
    if let Some(min_price) = query.min_price {
        q = q.bind(min_price);
    }
    if let Some(max_price) = query.max_price {
        q = q.bind(max_price);
    }

    Ok(q.fetch_one(pool).await? as u64)
}
