//! Order endpoints
//!
//! Order placement, listing, status administration and payment-link
//! creation. Webhook reconciliation lives in [`super::payment_webhook`].

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};

use shared::Paginated;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    CreateOrderRequest, OrderQuery, OrderResponse, PaymentLinkResponse, UpdateOrderStatusRequest,
};
use shared::util::now_millis;

use super::ApiResult;
use crate::auth::CurrentUser;
use crate::db;
use crate::payos::{self, PaymentItem};
use crate::state::AppState;

/// Gateway description shown on the checkout page
const PAYMENT_DESCRIPTION: &str = "Đơn hàng Lưu Sắc";

/// Order listings cap the page size lower than catalog listings
const MAX_ORDER_PAGE: u32 = 50;

/// POST /api/orders — place an order from cart items
pub async fn create_order(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateOrderRequest>,
) -> ApiResult<OrderResponse> {
    let order = db::orders::create_order(&state.pool, &user.id, &req.items).await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %user.id,
        total_amount = order.total_amount,
        "Order placed"
    );

    Ok(Json(order))
}

/// GET /api/orders/my — current user's orders
pub async fn my_orders(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<OrderQuery>,
) -> ApiResult<Paginated<OrderResponse>> {
    let limit = query.pagination().limit().min(MAX_ORDER_PAGE);
    let offset = (query.page.max(1) - 1) as u64 * limit as u64;

    let (orders, total) = tokio::join!(
        db::orders::list_page(&state.pool, Some(&user.id), query.status, limit, offset),
        db::orders::count(&state.pool, Some(&user.id), query.status),
    );

    Ok(Json(Paginated::new(
        orders?,
        query.page,
        limit,
        total?,
    )))
}

/// GET /api/orders — admin: all orders
pub async fn list_all(
    State(state): State<AppState>,
    Query(query): Query<OrderQuery>,
) -> ApiResult<Paginated<OrderResponse>> {
    let limit = query.pagination().limit().min(MAX_ORDER_PAGE);
    let offset = (query.page.max(1) - 1) as u64 * limit as u64;

    let (orders, total) = tokio::join!(
        db::orders::list_page(&state.pool, None, query.status, limit, offset),
        db::orders::count(&state.pool, None, query.status),
    );

    Ok(Json(Paginated::new(
        orders?,
        query.page,
        limit,
        total?,
    )))
}

/// GET /api/orders/{id} — order detail
///
/// Admins can view any order; users only their own.
pub async fn get_by_id(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<OrderResponse> {
    let order = db::orders::find_response(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;

    if !user.is_admin() && order.user_id != user.id {
        return Err(AppError::new(ErrorCode::OrderNotOwned));
    }

    Ok(Json(order))
}

/// PATCH /api/orders/{id}/status — admin status update
///
/// Transitions are validated against the order state machine; invalid
/// transitions are rejected rather than applied.
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateOrderStatusRequest>,
) -> ApiResult<OrderResponse> {
    db::orders::update_status(&state.pool, &id, req.status).await?;

    tracing::info!(order_id = %id, status = req.status.as_str(), "Order status updated");

    let order = db::orders::find_response(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    Ok(Json(order))
}

/// POST /api/orders/{id}/payment — create a gateway payment link
///
/// The payment reference is persisted before the link is returned; the
/// webhook reconciler depends on it to find the order later.
pub async fn create_payment_link(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<PaymentLinkResponse> {
    let order = db::orders::find_response(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;

    if !user.is_admin() && order.user_id != user.id {
        return Err(AppError::new(ErrorCode::OrderNotOwned));
    }

    let order_code = payos::generate_order_code(now_millis());
    let items: Vec<PaymentItem> = order
        .items
        .iter()
        .map(|i| PaymentItem::new(&i.product_name, i.quantity, i.price.round() as i64))
        .collect();

    let link = state
        .payos
        .create_payment_link(
            order_code,
            order.total_amount.round() as i64,
            PAYMENT_DESCRIPTION,
            &items,
            &format!("{}/checkout/success", state.web_url),
            &format!("{}/checkout/cancel", state.web_url),
        )
        .await
        .map_err(|e| {
            tracing::error!(order_id = %id, error = %e, "Payment link creation failed");
            AppError::new(ErrorCode::PaymentLinkFailed)
        })?;

    // Must be stored before returning: the webhook looks the order up by
    // this reference
    db::orders::set_payment_info(&state.pool, &id, &link.payment_link_id, &order_code.to_string())
        .await?;

    tracing::info!(order_id = %id, order_code, "Payment link created");

    Ok(Json(PaymentLinkResponse {
        checkout_url: link.checkout_url,
        payment_link_id: link.payment_link_id,
    }))
}
