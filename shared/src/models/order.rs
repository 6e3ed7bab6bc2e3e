//! Order Model
//!
//! Order lifecycle:
//!
//! ```text
//! PENDING --(payment webhook)--> PAID --> PROCESSING --> SHIPPING --> COMPLETED
//! any non-terminal ------------> CANCELLED
//! ```
//!
//! COMPLETED and CANCELLED are terminal. No backward transitions.

use serde::{Deserialize, Serialize};

use crate::request::PaginationQuery;

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Paid,
    Processing,
    Shipping,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Processing => "PROCESSING",
            Self::Shipping => "SHIPPING",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether `next` is a legal transition from this status.
    ///
    /// Forward-only along the fulfillment sequence; CANCELLED is reachable
    /// from every non-terminal state.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if next == Self::Cancelled {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Self::Pending, Self::Paid)
                | (Self::Paid, Self::Processing)
                | (Self::Processing, Self::Shipping)
                | (Self::Shipping, Self::Completed)
        )
    }
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    pub user_id: String,
    /// Σ(item price × quantity), snapshotted at creation time
    pub total_amount: f64,
    pub status: OrderStatus,
    /// External payment-link identifier returned by the gateway
    pub payment_link_id: Option<String>,
    /// Locally generated numeric order code, the webhook lookup key
    pub payment_reference: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// POST /api/orders payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<CreateOrderItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderItem {
    pub product_id: String,
    pub quantity: i64,
}

/// Order listing query
#[derive(Debug, Clone, Deserialize)]
pub struct OrderQuery {
    #[serde(default = "crate::request::default_page")]
    pub page: u32,
    #[serde(default = "crate::request::default_limit")]
    pub limit: u32,
    pub status: Option<OrderStatus>,
}

impl OrderQuery {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}

/// PATCH /api/orders/{id}/status payload (admin)
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

/// Order line item joined with current product display data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemResponse {
    pub id: String,
    pub product_id: Option<String>,
    /// Falls back to a placeholder when the product was deleted
    pub product_name: String,
    pub product_image: String,
    pub price: f64,
    pub quantity: i64,
}

/// Order joined with user and item display data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub payment_link_id: Option<String>,
    pub items: Vec<OrderItemResponse>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// POST /api/orders/{id}/payment response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentLinkResponse {
    pub checkout_url: String,
    pub payment_link_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Paid));
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Shipping));
        assert!(OrderStatus::Shipping.can_transition_to(OrderStatus::Completed));
    }

    #[test]
    fn test_no_backward_or_skipped_transitions() {
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Processing));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Completed));
        assert!(!OrderStatus::Shipping.can_transition_to(OrderStatus::Paid));
    }

    #[test]
    fn test_cancel_from_non_terminal() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Shipping.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_terminal_states_frozen() {
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Paid));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_status_serde_uppercase() {
        let json = serde_json::to_string(&OrderStatus::Pending).unwrap();
        assert_eq!(json, "\"PENDING\"");
        let parsed: OrderStatus = serde_json::from_str("\"SHIPPING\"").unwrap();
        assert_eq!(parsed, OrderStatus::Shipping);
    }
}
