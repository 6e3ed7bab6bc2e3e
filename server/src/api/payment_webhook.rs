//! Payment webhook handler
//!
//! POST /api/orders/payment/webhook — called by the gateway server.
//! Must receive the raw body (not parsed JSON) for signature verification,
//! and must answer quickly: the gateway retries non-2xx responses.
//!
//! Status-code contract:
//! - 400: payload genuinely invalid (bad signature/shape) — do not retry
//! - 500: transient internal failure — gateway should retry
//! - 200: acknowledged, including soft no-ops (unknown or already-settled
//!   order)

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;

use crate::db;
use crate::payos::PayOsError;
use crate::state::AppState;

pub async fn handle_webhook(State(state): State<AppState>, body: Bytes) -> StatusCode {
    // 1. Verify signature and extract the event
    let event = match state.payos.verify_webhook(&body) {
        Ok(event) => event,
        Err(e @ (PayOsError::InvalidSignature | PayOsError::InvalidPayload(_))) => {
            // Logged but not echoed back in detail, to avoid oracle probing
            tracing::warn!(error = %e, "Webhook rejected");
            return StatusCode::BAD_REQUEST;
        }
        Err(e) => {
            tracing::error!(error = %e, "Webhook verification error");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };

    // 2. Non-success result: log and acknowledge, no status change
    if !event.is_success() {
        tracing::warn!(
            order_code = event.order_code,
            code = %event.code,
            "Payment webhook with non-success code"
        );
        return StatusCode::OK;
    }

    // 3. Conditional PENDING -> PAID keyed on the stored payment reference.
    //    Zero rows means unknown reference or already settled/cancelled —
    //    a soft no-op either way, acknowledged so the gateway stops
    //    retrying an event that will never resolve.
    match db::orders::mark_paid_by_reference(&state.pool, &event.order_code.to_string()).await {
        Ok(1) => {
            tracing::info!(order_code = event.order_code, "Order marked PAID");
            StatusCode::OK
        }
        Ok(_) => {
            tracing::info!(
                order_code = event.order_code,
                "Webhook for unknown or already-settled order, ignoring"
            );
            StatusCode::OK
        }
        Err(e) => {
            tracing::error!(error = %e, "DB error applying payment webhook");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
