//! Category Repository

use sqlx::SqlitePool;
use uuid::Uuid;

use shared::error::ErrorCode;
use shared::models::{Category, CategoryCreate, CategoryUpdate, CategoryWithCount};
use shared::util::now_millis;

use super::{RepoError, RepoResult};

pub async fn find_all_with_counts(pool: &SqlitePool) -> RepoResult<Vec<CategoryWithCount>> {
    let categories = sqlx::query_as::<_, CategoryWithCount>(
        "SELECT c.*, COUNT(p.id) AS product_count
         FROM categories c
         LEFT JOIN products p ON p.category_id = c.id
         GROUP BY c.id
         ORDER BY c.name",
    )
    .fetch_all(pool)
    .await?;
    Ok(categories)
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> RepoResult<Option<Category>> {
    let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(category)
}

pub async fn create(pool: &SqlitePool, data: CategoryCreate) -> RepoResult<Category> {
    let id = Uuid::new_v4().to_string();
    let now = now_millis();

    sqlx::query(
        "INSERT INTO categories (id, name, description, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&data.name)
    .bind(&data.description)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, &id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create category".into()))
}

pub async fn update(pool: &SqlitePool, id: &str, data: CategoryUpdate) -> RepoResult<Category> {
    let rows = sqlx::query(
        "UPDATE categories SET name = COALESCE(?1, name),
         description = COALESCE(?2, description), updated_at = ?3
         WHERE id = ?4",
    )
    .bind(data.name)
    .bind(data.description)
    .bind(now_millis())
    .bind(id)
    .execute(pool)
    .await?;

    if rows.rows_affected() == 0 {
        return Err(RepoError::Business(
            ErrorCode::CategoryNotFound,
            format!("Category {id} not found"),
        ));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Business(ErrorCode::CategoryNotFound, format!("Category {id} not found")))
}

/// Delete a category. Rejected while products still reference it.
pub async fn delete(pool: &SqlitePool, id: &str) -> RepoResult<()> {
    let product_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = ?")
            .bind(id)
            .fetch_one(pool)
            .await?;

    if product_count > 0 {
        return Err(RepoError::Business(
            ErrorCode::CategoryHasProducts,
            format!("Category has {product_count} associated products"),
        ));
    }

    let rows = sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if rows.rows_affected() == 0 {
        return Err(RepoError::Business(
            ErrorCode::CategoryNotFound,
            format!("Category {id} not found"),
        ));
    }
    Ok(())
}
