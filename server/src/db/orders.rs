//! Order Repository
//!
//! Owns the order-placement transaction. The invariant guarded here: a
//! committed order with its items corresponds 1:1 with already-decremented
//! stock — the two never diverge. Stock is decremented with a conditional
//! `UPDATE ... WHERE quantity >= ?` checked via `rows_affected()`, so
//! correctness does not depend on the connection's isolation level.

use std::collections::HashMap;

use sqlx::SqlitePool;
use uuid::Uuid;

use shared::error::ErrorCode;
use shared::models::{
    CreateOrderItem, Order, OrderItemResponse, OrderResponse, OrderStatus,
};
use shared::util::now_millis;

use super::{RepoError, RepoResult};

/// Placeholder shown for items whose product row was deleted
const DELETED_PRODUCT_NAME: &str = "Deleted Product";

/// Product fields needed for cart validation and price snapshotting
#[derive(sqlx::FromRow)]
struct StockRow {
    id: String,
    name: String,
    price: f64,
    quantity: i64,
}

/// Order row joined with the owning user's display data
#[derive(sqlx::FromRow)]
struct OrderUserRow {
    id: String,
    user_id: String,
    total_amount: f64,
    status: OrderStatus,
    payment_link_id: Option<String>,
    payment_reference: Option<String>,
    created_at: i64,
    updated_at: i64,
    user_name: String,
    user_email: String,
}

/// Item row joined with current product display data
#[derive(sqlx::FromRow)]
struct ItemRow {
    id: String,
    order_id: String,
    product_id: Option<String>,
    price: f64,
    quantity: i64,
    product_name: Option<String>,
    product_image: Option<String>,
}

impl ItemRow {
    fn into_response(self) -> OrderItemResponse {
        OrderItemResponse {
            id: self.id,
            product_id: self.product_id,
            product_name: self
                .product_name
                .unwrap_or_else(|| DELETED_PRODUCT_NAME.to_string()),
            product_image: self.product_image.unwrap_or_default(),
            price: self.price,
            quantity: self.quantity,
        }
    }
}

fn build_response(row: OrderUserRow, items: Vec<OrderItemResponse>) -> OrderResponse {
    OrderResponse {
        id: row.id,
        user_id: row.user_id,
        user_name: row.user_name,
        user_email: row.user_email,
        total_amount: row.total_amount,
        status: row.status,
        payment_link_id: row.payment_link_id,
        items,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

// =============================================================================
// Order placement
// =============================================================================

/// Validate a cart against current stock and price, then atomically decrement
/// stock and create the order with snapshotted line items.
///
/// Fails before any write when a product is missing/inactive or stock is
/// insufficient. Any failure inside the transaction rolls back the whole
/// placement — no partial stock decrement, no orphan order.
pub async fn create_order(
    pool: &SqlitePool,
    user_id: &str,
    items: &[CreateOrderItem],
) -> RepoResult<OrderResponse> {
    if items.is_empty() {
        return Err(RepoError::Business(
            ErrorCode::OrderEmpty,
            "Order must contain at least one item".into(),
        ));
    }
    if items.iter().any(|i| i.quantity <= 0) {
        return Err(RepoError::Business(
            ErrorCode::ValidationFailed,
            "Item quantity must be positive".into(),
        ));
    }

    // 1. Fetch all referenced ACTIVE products in one read
    let mut ids: Vec<&str> = items.iter().map(|i| i.product_id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "SELECT id, name, price, quantity FROM products
         WHERE id IN ({placeholders}) AND status = 'ACTIVE'"
    );
    let mut q = sqlx::query_as::<_, StockRow>(&sql);
    for id in &ids {
        q = q.bind(*id);
    }
    let rows = q.fetch_all(pool).await?;

    if rows.len() != ids.len() {
        return Err(RepoError::Business(
            ErrorCode::ProductNotFound,
            "Product not found".into(),
        ));
    }
    let products: HashMap<&str, &StockRow> =
        rows.iter().map(|r| (r.id.as_str(), r)).collect();

    // 2. Validate stock per line, fail-fast in cart order
    for item in items {
        let product = products.get(item.product_id.as_str()).ok_or_else(|| {
            RepoError::Business(ErrorCode::ProductNotFound, "Product not found".into())
        })?;
        if product.quantity < item.quantity {
            return Err(RepoError::Business(
                ErrorCode::InsufficientStock,
                format!("Insufficient stock: {}", product.name),
            ));
        }
    }

    // 3. Total from prices at read time
    let total_amount: f64 = items
        .iter()
        .map(|i| products[i.product_id.as_str()].price * i.quantity as f64)
        .sum();

    // 4. Atomic placement
    let order_id = Uuid::new_v4().to_string();
    let now = now_millis();
    let mut tx = pool.begin().await?;

    for item in items {
        // Conditional decrement: re-validates stock inside the transaction
        // so two concurrent placements can never oversell.
        let rows = sqlx::query(
            "UPDATE products SET quantity = quantity - ?1, updated_at = ?2
             WHERE id = ?3 AND status = 'ACTIVE' AND quantity >= ?1",
        )
        .bind(item.quantity)
        .bind(now)
        .bind(&item.product_id)
        .execute(&mut *tx)
        .await?;

        if rows.rows_affected() == 0 {
            tx.rollback().await?;
            let name = products[item.product_id.as_str()].name.clone();
            return Err(RepoError::Business(
                ErrorCode::InsufficientStock,
                format!("Insufficient stock: {name}"),
            ));
        }
    }

    sqlx::query(
        "INSERT INTO orders (id, user_id, total_amount, status, created_at, updated_at)
         VALUES (?, ?, ?, 'PENDING', ?, ?)",
    )
    .bind(&order_id)
    .bind(user_id)
    .bind(total_amount)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    for item in items {
        let product = products[item.product_id.as_str()];
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, price, quantity)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&order_id)
        .bind(&item.product_id)
        .bind(product.price)
        .bind(item.quantity)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    find_response(pool, &order_id)
        .await?
        .ok_or_else(|| RepoError::Database("Order vanished after commit".into()))
}

// =============================================================================
// Queries
// =============================================================================

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> RepoResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(order)
}

/// Full order joined with user and item/product display data
pub async fn find_response(pool: &SqlitePool, id: &str) -> RepoResult<Option<OrderResponse>> {
    let row = sqlx::query_as::<_, OrderUserRow>(
        "SELECT o.*, u.name AS user_name, u.email AS user_email
         FROM orders o JOIN users u ON u.id = o.user_id
         WHERE o.id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let items = sqlx::query_as::<_, ItemRow>(
        "SELECT oi.id, oi.order_id, oi.product_id, oi.price, oi.quantity,
                p.name AS product_name, p.image_url AS product_image
         FROM order_items oi LEFT JOIN products p ON p.id = oi.product_id
         WHERE oi.order_id = ?",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    let items = items.into_iter().map(ItemRow::into_response).collect();
    Ok(Some(build_response(row, items)))
}

/// Paged order listing, newest first. `user_id = None` lists all orders
/// (admin); otherwise only the given user's orders.
pub async fn list_page(
    pool: &SqlitePool,
    user_id: Option<&str>,
    status: Option<OrderStatus>,
    limit: u32,
    offset: u64,
) -> RepoResult<Vec<OrderResponse>> {
    let mut sql = "SELECT o.*, u.name AS user_name, u.email AS user_email
         FROM orders o JOIN users u ON u.id = o.user_id
         WHERE 1 = 1"
        .to_string();
    if user_id.is_some() {
        sql.push_str(" AND o.user_id = ?");
    }
    if status.is_some() {
        sql.push_str(" AND o.status = ?");
    }
    sql.push_str(" ORDER BY o.created_at DESC LIMIT ? OFFSET ?");

    let mut q = sqlx::query_as::<_, OrderUserRow>(&sql);
    if let Some(user_id) = user_id {
        q = q.bind(user_id.to_string());
    }
    if let Some(status) = status {
        q = q.bind(status.as_str());
    }
    let rows = q.bind(limit as i64).bind(offset as i64).fetch_all(pool).await?;

    if rows.is_empty() {
        return Ok(Vec::new());
    }

    // One items query for the whole page instead of one per order
    let order_ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
    let placeholders = vec!["?"; order_ids.len()].join(", ");
    let items_sql = format!(
        "SELECT oi.id, oi.order_id, oi.product_id, oi.price, oi.quantity,
                p.name AS product_name, p.image_url AS product_image
         FROM order_items oi LEFT JOIN products p ON p.id = oi.product_id
         WHERE oi.order_id IN ({placeholders})"
    );
    let mut items_q = sqlx::query_as::<_, ItemRow>(&items_sql);
    for id in &order_ids {
        items_q = items_q.bind(*id);
    }
    let item_rows = items_q.fetch_all(pool).await?;

    let mut items_by_order: HashMap<String, Vec<OrderItemResponse>> = HashMap::new();
    for item in item_rows {
        items_by_order
            .entry(item.order_id.clone())
            .or_default()
            .push(item.into_response());
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let items = items_by_order.remove(&row.id).unwrap_or_default();
            build_response(row, items)
        })
        .collect())
}

pub async fn count(
    pool: &SqlitePool,
    user_id: Option<&str>,
    status: Option<OrderStatus>,
) -> RepoResult<u64> {
    let mut sql = "SELECT COUNT(*) FROM orders WHERE 1 = 1".to_string();
    if user_id.is_some() {
        sql.push_str(" AND user_id = ?");
    }
    if status.is_some() {
        sql.push_str(" AND status = ?");
    }

    let mut q = sqlx::query_scalar::<_, i64>(&sql);
    if let Some(user_id) = user_id {
        q = q.bind(user_id.to_string());
    }
    if let Some(status) = status {
        q = q.bind(status.as_str());
    }
    Ok(q.fetch_one(pool).await? as u64)
}

// =============================================================================
// Status transitions
// =============================================================================

/// Administrative status update with transition-graph enforcement.
///
/// The `AND status = ?` guard makes the update conditional on the status the
/// transition was validated against, so a concurrent webhook or admin update
/// cannot be silently overwritten.
pub async fn update_status(
    pool: &SqlitePool,
    id: &str,
    new_status: OrderStatus,
) -> RepoResult<()> {
    let order = find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Business(ErrorCode::OrderNotFound, format!("Order {id} not found")))?;

    if !order.status.can_transition_to(new_status) {
        return Err(RepoError::Business(
            ErrorCode::OrderInvalidTransition,
            format!(
                "Cannot transition order from {} to {}",
                order.status.as_str(),
                new_status.as_str()
            ),
        ));
    }

    let rows = sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
        .bind(new_status.as_str())
        .bind(now_millis())
        .bind(id)
        .bind(order.status.as_str())
        .execute(pool)
        .await?;

    if rows.rows_affected() == 0 {
        return Err(RepoError::Business(
            ErrorCode::OrderInvalidTransition,
            "Order status changed concurrently".into(),
        ));
    }
    Ok(())
}

/// Persist the gateway payment link and order code. Must complete before the
/// payment link is returned to the caller — the webhook reconciler looks the
/// order up by this reference.
pub async fn set_payment_info(
    pool: &SqlitePool,
    id: &str,
    payment_link_id: &str,
    payment_reference: &str,
) -> RepoResult<()> {
    let rows = sqlx::query(
        "UPDATE orders SET payment_link_id = ?, payment_reference = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(payment_link_id)
    .bind(payment_reference)
    .bind(now_millis())
    .bind(id)
    .execute(pool)
    .await?;

    if rows.rows_affected() == 0 {
        return Err(RepoError::Business(
            ErrorCode::OrderNotFound,
            format!("Order {id} not found"),
        ));
    }
    Ok(())
}

/// Webhook-driven PENDING → PAID transition.
///
/// Conditional on the current status, so repeated delivery of the same event
/// is a no-op and a late webhook never overwrites CANCELLED. Returns the
/// number of rows updated (0 or 1).
pub async fn mark_paid_by_reference(pool: &SqlitePool, reference: &str) -> RepoResult<u64> {
    let rows = sqlx::query(
        "UPDATE orders SET status = 'PAID', updated_at = ?
         WHERE payment_reference = ? AND status = 'PENDING'",
    )
    .bind(now_millis())
    .bind(reference)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected())
}
