use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderItem, Payment};

/// Emitted after an order has been committed to the ledger with its inventory reserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderCreatedEvent {
    pub fn new(order: Order, items: Vec<OrderItem>) -> Self {
        Self { order, items }
    }
}

/// Emitted after an order was cancelled and its reservation released.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCancelledEvent {
    pub order: Order,
}

impl OrderCancelledEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Emitted after a payment completed and its order moved to `Processing`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentCompletedEvent {
    pub payment: Payment,
    pub order: Order,
}

impl PaymentCompletedEvent {
    pub fn new(payment: Payment, order: Order) -> Self {
        Self { payment, order }
    }
}

/// Emitted after a payment failed. Carries the retry context: the order stays open for payment and the reason is
/// forwarded so the customer can be told why the attempt was declined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentFailedEvent {
    pub payment: Payment,
    pub order: Order,
    pub reason: Option<String>,
}

impl PaymentFailedEvent {
    pub fn new(payment: Payment, order: Order, reason: Option<String>) -> Self {
        Self { payment, order, reason }
    }
}

/// Emitted after a completed payment was refunded along with its order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRefundedEvent {
    pub payment: Payment,
    pub order: Order,
}

impl PaymentRefundedEvent {
    pub fn new(payment: Payment, order: Order) -> Self {
        Self { payment, order }
    }
}
