use thiserror::Error;

use crate::{
    db_types::{NewOrder, NewPart, NewPayment, Order, OrderStatus, Part, Payment, PaymentOutcome, PaymentStatus},
    traits::{OrderDetail, Pagination, PaymentUpdate},
};

/// This trait defines the highest level of behaviour for backends supporting the Partshub marketplace engine.
///
/// This behaviour includes:
/// * Storing catalog parts and their live inventory counts.
/// * Creating orders as a single atomic unit of {stock reservation, order row, item rows}.
/// * Cancelling orders as a single atomic unit of {status change, stock release}.
/// * Driving payments through their state machine with idempotent terminal transitions.
///
/// Every operation that mutates more than one entity must execute as one isolated transaction: a failure anywhere in
/// the operation leaves the store exactly as it was before the call.
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a new catalog part with its opening stock level.
    async fn insert_part(&self, part: NewPart) -> Result<Part, MarketplaceError>;

    /// Fetches a part by id, or `None` if it does not exist.
    async fn fetch_part(&self, part_id: i64) -> Result<Option<Part>, MarketplaceError>;

    /// Creates a new order, atomically reserving inventory for every line.
    ///
    /// * Every referenced part must exist, otherwise `PartNotFound` is returned and nothing is mutated.
    /// * Quantities for duplicate part ids are summed before the stock check. If any summed quantity exceeds the
    ///   part's available stock, `InsufficientStock` is returned and no part's stock is touched.
    /// * On success the order is `Pending`, its total is the sum of line totals using each part's current price as
    ///   the immutable snapshot, and one item row exists per requested line.
    async fn create_order(&self, order: NewOrder) -> Result<OrderDetail, MarketplaceError>;

    /// Cancels a `Pending` order, atomically releasing exactly the quantities its own line items reserved.
    ///
    /// Fails with `OrderNotFound` if the order does not exist, `Forbidden` if `user_id` is not the owner, and
    /// `InvalidOrderState` if the order is not `Pending`.
    async fn cancel_order(&self, order_id: i64, user_id: i64) -> Result<Order, MarketplaceError>;

    /// Moves a `Pending` order into `PendingPayment`. Payment creation is only legal after this transition.
    async fn begin_checkout(&self, order_id: i64, user_id: i64) -> Result<Order, MarketplaceError>;

    /// Fetches an order by id without any ownership check. Callers enforce ownership where required.
    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, MarketplaceError>;

    /// Fetches an order with its nested line items and denormalized part titles.
    async fn fetch_order_detail(&self, order_id: i64) -> Result<Option<OrderDetail>, MarketplaceError>;

    /// Fetches a page of the user's orders, newest first.
    async fn search_orders(&self, user_id: i64, pagination: Pagination) -> Result<Vec<Order>, MarketplaceError>;

    /// Creates a `Pending` payment against an order.
    ///
    /// * `OrderNotFound` if the order does not exist.
    /// * `InvalidRequest` if the requesting user is not the order's owner. This is deliberately a generic
    ///   bad-request rather than `Forbidden`.
    /// * `InvalidOrderState` if the order is not `PendingPayment`.
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, MarketplaceError>;

    /// Fetches a payment by id, or `None` if it does not exist.
    async fn fetch_payment(&self, payment_id: i64) -> Result<Option<Payment>, MarketplaceError>;

    /// Applies a terminal outcome reported by the payment gateway to a pending payment.
    ///
    /// Idempotent under at-least-twice delivery: if the payment already carries the requested terminal status the
    /// current `{payment, order}` state is returned with `already_applied = true` and nothing is written. Applying an
    /// outcome to a payment in any other terminal status fails with `InvalidPaymentState`.
    ///
    /// * `Completed`: atomically sets the payment to `Completed` (storing the transaction reference) and the order to
    ///   `Processing`.
    /// * `Failed`: sets the payment to `Failed` (storing the reason in metadata); the order stays `PendingPayment` so
    ///   the user can retry with a new payment.
    async fn update_payment_status(
        &self,
        payment_id: i64,
        outcome: PaymentOutcome,
    ) -> Result<PaymentUpdate, MarketplaceError>;

    /// Refunds a `Completed` payment, atomically moving both the payment and its order to `Refunded`.
    async fn refund_payment(&self, payment_id: i64, reason: Option<String>) -> Result<PaymentUpdate, MarketplaceError>;

    /// Marks a `Processing` order as `Delivered`. This is the fulfilment hand-off step.
    async fn mark_order_delivered(&self, order_id: i64) -> Result<Order, MarketplaceError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), MarketplaceError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum MarketplaceError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("Part {0} does not exist")]
    PartNotFound(i64),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Payment {0} does not exist")]
    PaymentNotFound(i64),
    #[error("User {user_id} does not own order {order_id}")]
    Forbidden { user_id: i64, order_id: i64 },
    #[error("Order {order_id} is {status}; the requested operation is not legal in this state")]
    InvalidOrderState { order_id: i64, status: OrderStatus },
    #[error("Payment {payment_id} is {status}; the requested transition is not legal in this state")]
    InvalidPaymentState { payment_id: i64, status: PaymentStatus },
    #[error("Part {part_id} has {available} in stock, but {requested} were requested")]
    InsufficientStock { part_id: i64, requested: i64, available: i64 },
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<sqlx::Error> for MarketplaceError {
    fn from(e: sqlx::Error) -> Self {
        MarketplaceError::DatabaseError(e.to_string())
    }
}

/// The client-facing error taxonomy. Transport layers map kinds onto their own status families without inspecting
/// individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidState,
    InsufficientStock,
    InvalidRequest,
    Internal,
}

impl MarketplaceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MarketplaceError::PartNotFound(_)
            | MarketplaceError::OrderNotFound(_)
            | MarketplaceError::PaymentNotFound(_) => ErrorKind::NotFound,
            MarketplaceError::Forbidden { .. } => ErrorKind::Forbidden,
            MarketplaceError::InvalidOrderState { .. } | MarketplaceError::InvalidPaymentState { .. } => {
                ErrorKind::InvalidState
            },
            MarketplaceError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            MarketplaceError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            MarketplaceError::DatabaseError(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn error_kinds_follow_the_taxonomy() {
        assert_eq!(MarketplaceError::PartNotFound(1).kind(), ErrorKind::NotFound);
        assert_eq!(MarketplaceError::OrderNotFound(1).kind(), ErrorKind::NotFound);
        assert_eq!(MarketplaceError::PaymentNotFound(1).kind(), ErrorKind::NotFound);
        assert_eq!(MarketplaceError::Forbidden { user_id: 1, order_id: 2 }.kind(), ErrorKind::Forbidden);
        assert_eq!(
            MarketplaceError::InvalidOrderState { order_id: 1, status: OrderStatus::Cancelled }.kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(
            MarketplaceError::InsufficientStock { part_id: 1, requested: 15, available: 10 }.kind(),
            ErrorKind::InsufficientStock
        );
        assert_eq!(MarketplaceError::InvalidRequest("empty".into()).kind(), ErrorKind::InvalidRequest);
        assert_eq!(MarketplaceError::DatabaseError("down".into()).kind(), ErrorKind::Internal);
    }
}
