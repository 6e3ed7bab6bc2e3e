//! Shared test fixtures: in-memory database and seed helpers

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use lusac_server::db;
use lusac_server::state::MIGRATOR;
use shared::models::{Category, CategoryCreate, Product, ProductCreate, User, UserRole};

/// Fresh in-memory database with migrations applied. A single connection
/// keeps every query on the same memory database.
pub async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .pragma("foreign_keys", "ON");
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("failed to open in-memory database");
    MIGRATOR.run(&pool).await.expect("migrations failed");
    pool
}

pub async fn seed_user(pool: &SqlitePool, email: &str, role: UserRole) -> User {
    let hashed = lusac_server::util::hash_password("password123").unwrap();
    db::users::create(pool, email, &hashed, "Test User", None, role)
        .await
        .expect("failed to seed user")
}

pub async fn seed_category(pool: &SqlitePool, name: &str) -> Category {
    db::categories::create(
        pool,
        CategoryCreate {
            name: name.to_string(),
            description: String::new(),
        },
    )
    .await
    .expect("failed to seed category")
}

pub async fn seed_product(
    pool: &SqlitePool,
    category_id: &str,
    name: &str,
    price: f64,
    quantity: i64,
) -> Product {
    db::products::create(
        pool,
        ProductCreate {
            name: name.to_string(),
            description: format!("{name} description"),
            price,
            quantity,
            image_url: format!("https://cdn.example.com/{name}.jpg"),
            thumbnail_image: None,
            gallery_images: vec![],
            glb_url: None,
            status: None,
            category_id: category_id.to_string(),
        },
    )
    .await
    .expect("failed to seed product")
}

pub async fn stock_of(pool: &SqlitePool, product_id: &str) -> i64 {
    db::products::find_by_id(pool, product_id)
        .await
        .unwrap()
        .expect("product must exist")
        .quantity
}
