use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewOrder, Order, OrderItem},
    events::{EventProducers, OrderCancelledEvent, OrderCreatedEvent},
    traits::{MarketplaceDatabase, MarketplaceError, OrderDetail, Pagination},
};

/// `OrderFlowApi` is the primary API for creating, cancelling and reading orders.
///
/// Order creation and cancellation are forwarded to the backend, which executes them as single atomic units against
/// the inventory store and the order ledger. Once the backend has committed, the corresponding notification event is
/// published on a best-effort basis; a slow or broken notifier never fails, and never unwinds, the workflow call.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: MarketplaceDatabase
{
    /// Creates a new order for the user, reserving inventory for every line.
    ///
    /// The item list must be non-empty and every quantity must be positive; anything else is a validation failure,
    /// not a silent no-op. Duplicate part ids are legal and their quantities are summed for the stock check. On
    /// success the order is `Pending` and an order-confirmation event has been queued for the notifier.
    pub async fn create_order(&self, order: NewOrder) -> Result<OrderDetail, MarketplaceError> {
        if order.items.is_empty() {
            return Err(MarketplaceError::InvalidRequest("an order must contain at least one item".to_string()));
        }
        if let Some(item) = order.items.iter().find(|item| item.quantity <= 0) {
            return Err(MarketplaceError::InvalidRequest(format!(
                "quantity for part {} must be positive, got {}",
                item.part_id, item.quantity
            )));
        }
        let detail = self.db.create_order(order).await?;
        debug!("🔄️🧾️ Order #{} created. Total: {}", detail.order.id, detail.order.total_price);
        let items: Vec<OrderItem> = detail.items.iter().map(|line| line.item.clone()).collect();
        self.call_order_created_hook(detail.order.clone(), items).await;
        Ok(detail)
    }

    /// Cancels a `Pending` order owned by `user_id`, restoring exactly the reserved quantities.
    pub async fn cancel_order(&self, order_id: i64, user_id: i64) -> Result<Order, MarketplaceError> {
        let order = self.db.cancel_order(order_id, user_id).await?;
        debug!("🔄️🧾️ Order #{order_id} cancelled");
        self.call_order_cancelled_hook(order.clone()).await;
        Ok(order)
    }

    /// Moves a `Pending` order into `PendingPayment` so that a payment can be created against it.
    pub async fn begin_checkout(&self, order_id: i64, user_id: i64) -> Result<Order, MarketplaceError> {
        self.db.begin_checkout(order_id, user_id).await
    }

    /// Fetches the order with its nested line items. Fails with `Forbidden` if `user_id` is not the owner, and
    /// `OrderNotFound` if the order does not exist.
    pub async fn get_order(&self, order_id: i64, user_id: i64) -> Result<OrderDetail, MarketplaceError> {
        let detail =
            self.db.fetch_order_detail(order_id).await?.ok_or(MarketplaceError::OrderNotFound(order_id))?;
        if detail.order.user_id != user_id {
            return Err(MarketplaceError::Forbidden { user_id, order_id });
        }
        Ok(detail)
    }

    /// Lists the user's own orders, newest first.
    pub async fn list_orders(&self, user_id: i64, pagination: Pagination) -> Result<Vec<Order>, MarketplaceError> {
        self.db.search_orders(user_id, pagination).await
    }

    /// Fulfilment hand-off: marks a `Processing` order as `Delivered`.
    pub async fn mark_delivered(&self, order_id: i64) -> Result<Order, MarketplaceError> {
        self.db.mark_order_delivered(order_id).await
    }

    async fn call_order_created_hook(&self, order: Order, items: Vec<OrderItem>) {
        for producer in &self.producers.order_created_producer {
            trace!("🔄️🧾️ Notifying order created hook subscribers");
            producer.publish_event(OrderCreatedEvent::new(order.clone(), items.clone())).await;
        }
    }

    async fn call_order_cancelled_hook(&self, order: Order) {
        for producer in &self.producers.order_cancelled_producer {
            trace!("🔄️🧾️ Notifying order cancelled hook subscribers");
            producer.publish_event(OrderCancelledEvent::new(order.clone())).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
