//! `SqliteDatabase` is a concrete implementation of a Partshub marketplace engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements the [`MarketplaceDatabase`] trait. Every workflow
//! operation that touches more than one entity runs inside a single sqlx transaction; any error (including the
//! conditional stock decrement finding too little stock) rolls the whole operation back, so the ledger never shows a
//! partial result.
use std::{
    collections::{BTreeMap, HashMap},
    fmt::Debug,
};

use log::*;
use partshub_common::Cents;
use sqlx::SqlitePool;

use super::db::{db_url, new_pool, orders, parts, payments};
use crate::{
    db_types::{
        NewOrder,
        NewPart,
        NewPayment,
        Order,
        OrderStatus,
        Part,
        Payment,
        PaymentOutcome,
        PaymentStatus,
    },
    traits::{MarketplaceDatabase, MarketplaceError, OrderDetail, Pagination, PaymentUpdate},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database instance using the `PARTSHUB_DATABASE_URL` environment variable, or the default URL.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_part(&self, part: NewPart) -> Result<Part, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let part = parts::insert_part(part, &mut conn).await?;
        debug!("🗃️📦️ Part #{} ({}) listed with {} in stock", part.id, part.title, part.available_stock);
        Ok(part)
    }

    async fn fetch_part(&self, part_id: i64) -> Result<Option<Part>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let part = parts::fetch_part(part_id, &mut conn).await?;
        Ok(part)
    }

    async fn create_order(&self, order: NewOrder) -> Result<OrderDetail, MarketplaceError> {
        // Duplicate part ids across lines are legal and additive; the stock check runs against the summed quantity.
        let mut required = BTreeMap::new();
        for item in &order.items {
            *required.entry(item.part_id).or_insert(0_i64) += item.quantity;
        }
        let part_ids: Vec<i64> = required.keys().copied().collect();

        let mut tx = self.pool.begin().await?;
        let fetched = parts::fetch_parts(&part_ids, &mut tx).await?;
        let parts_by_id: HashMap<i64, Part> = fetched.into_iter().map(|p| (p.id, p)).collect();
        for part_id in &part_ids {
            if !parts_by_id.contains_key(part_id) {
                return Err(MarketplaceError::PartNotFound(*part_id));
            }
        }
        for (part_id, quantity) in &required {
            let part = &parts_by_id[part_id];
            if part.available_stock < *quantity {
                return Err(MarketplaceError::InsufficientStock {
                    part_id: *part_id,
                    requested: *quantity,
                    available: part.available_stock,
                });
            }
        }
        for (part_id, quantity) in &required {
            let part = &parts_by_id[part_id];
            // The conditional decrement re-checks stock at write time, so a concurrent reservation that landed after
            // our read cannot drive the count negative. Rolling back undoes any decrements already applied.
            if !parts::reserve_stock(*part_id, *quantity, &mut tx).await? {
                return Err(MarketplaceError::InsufficientStock {
                    part_id: *part_id,
                    requested: *quantity,
                    available: part.available_stock,
                });
            }
        }

        // Totals use each part's current price as the immutable line snapshot.
        let total_price: Cents =
            order.items.iter().map(|item| parts_by_id[&item.part_id].unit_price * item.quantity).sum();
        let order_row = orders::insert_order(order.user_id, total_price, &mut tx).await?;
        for item in &order.items {
            let unit_price = parts_by_id[&item.part_id].unit_price;
            orders::insert_order_item(order_row.id, item.part_id, item.quantity, unit_price, &mut tx).await?;
        }
        let items = orders::fetch_line_items(order_row.id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️🧾️ Order #{} created with {} lines, total {total_price}", order_row.id, items.len());
        Ok(OrderDetail { order: order_row, items })
    }

    async fn cancel_order(&self, order_id: i64, user_id: i64) -> Result<Order, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let order =
            orders::fetch_order(order_id, &mut tx).await?.ok_or(MarketplaceError::OrderNotFound(order_id))?;
        if order.user_id != user_id {
            return Err(MarketplaceError::Forbidden { user_id, order_id });
        }
        if order.status != OrderStatus::Pending {
            return Err(MarketplaceError::InvalidOrderState { order_id, status: order.status });
        }
        // Release exactly what this order's own lines reserved, whatever has happened to the parts since.
        let items = orders::fetch_order_items(order_id, &mut tx).await?;
        for item in &items {
            parts::release_stock(item.part_id, item.quantity, &mut tx).await?;
        }
        let order = orders::update_order_status(order_id, OrderStatus::Cancelled, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️🧾️ Order #{order_id} cancelled; {} reservations released", items.len());
        Ok(order)
    }

    async fn begin_checkout(&self, order_id: i64, user_id: i64) -> Result<Order, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let order =
            orders::fetch_order(order_id, &mut tx).await?.ok_or(MarketplaceError::OrderNotFound(order_id))?;
        if order.user_id != user_id {
            return Err(MarketplaceError::Forbidden { user_id, order_id });
        }
        if order.status != OrderStatus::Pending {
            return Err(MarketplaceError::InvalidOrderState { order_id, status: order.status });
        }
        let order = orders::update_order_status(order_id, OrderStatus::PendingPayment, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️🧾️ Order #{order_id} is awaiting payment");
        Ok(order)
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_detail(&self, order_id: i64) -> Result<Option<OrderDetail>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let Some(order) = orders::fetch_order(order_id, &mut conn).await? else {
            return Ok(None);
        };
        let items = orders::fetch_line_items(order_id, &mut conn).await?;
        Ok(Some(OrderDetail { order, items }))
    }

    async fn search_orders(&self, user_id: i64, pagination: Pagination) -> Result<Vec<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::search_orders(user_id, pagination, &mut conn).await?;
        Ok(orders)
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order(payment.order_id, &mut tx)
            .await?
            .ok_or(MarketplaceError::OrderNotFound(payment.order_id))?;
        if order.user_id != payment.user_id {
            // Deliberately a generic bad-request rather than Forbidden; the originating contract keeps payment
            // ownership violations indistinct from other malformed payment requests.
            return Err(MarketplaceError::InvalidRequest(format!(
                "user {} cannot create a payment for order {}",
                payment.user_id, payment.order_id
            )));
        }
        if order.status != OrderStatus::PendingPayment {
            return Err(MarketplaceError::InvalidOrderState { order_id: order.id, status: order.status });
        }
        let payment = payments::insert_payment(payment, &mut tx).await?;
        tx.commit().await?;
        Ok(payment)
    }

    async fn fetch_payment(&self, payment_id: i64) -> Result<Option<Payment>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment(payment_id, &mut conn).await?;
        Ok(payment)
    }

    async fn update_payment_status(
        &self,
        payment_id: i64,
        outcome: PaymentOutcome,
    ) -> Result<PaymentUpdate, MarketplaceError> {
        let requested = outcome.status();
        let mut tx = self.pool.begin().await?;
        let payment = payments::fetch_payment(payment_id, &mut tx)
            .await?
            .ok_or(MarketplaceError::PaymentNotFound(payment_id))?;
        let order = orders::fetch_order(payment.order_id, &mut tx)
            .await?
            .ok_or(MarketplaceError::OrderNotFound(payment.order_id))?;
        if payment.status == requested {
            // At-least-twice delivery from the gateway: the transition was already applied, so return the current
            // state without re-mutating either ledger.
            debug!("🗃️💳️ Payment #{payment_id} is already {requested}. No action to take");
            return Ok(PaymentUpdate { payment, order, already_applied: true });
        }
        if payment.status != PaymentStatus::Pending {
            return Err(MarketplaceError::InvalidPaymentState { payment_id, status: payment.status });
        }
        let update = match outcome {
            PaymentOutcome::Completed { tx_ref } => {
                if order.status != OrderStatus::PendingPayment {
                    return Err(MarketplaceError::InvalidOrderState { order_id: order.id, status: order.status });
                }
                let payment =
                    payments::update_status(payment_id, PaymentStatus::Completed, tx_ref, None, &mut tx).await?;
                let order = orders::update_order_status(order.id, OrderStatus::Processing, &mut tx).await?;
                debug!("🗃️💳️ Payment #{payment_id} completed; order #{} is now processing", order.id);
                PaymentUpdate { payment, order, already_applied: false }
            },
            PaymentOutcome::Failed { reason } => {
                let metadata = reason.map(|r| serde_json::json!({ "error": r }).to_string());
                let payment =
                    payments::update_status(payment_id, PaymentStatus::Failed, None, metadata, &mut tx).await?;
                // The order stays open for payment; the customer retries with a brand-new payment.
                debug!("🗃️💳️ Payment #{payment_id} failed; order #{} remains awaiting payment", order.id);
                PaymentUpdate { payment, order, already_applied: false }
            },
        };
        tx.commit().await?;
        Ok(update)
    }

    async fn refund_payment(&self, payment_id: i64, reason: Option<String>) -> Result<PaymentUpdate, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::fetch_payment(payment_id, &mut tx)
            .await?
            .ok_or(MarketplaceError::PaymentNotFound(payment_id))?;
        if payment.status != PaymentStatus::Completed {
            return Err(MarketplaceError::InvalidPaymentState { payment_id, status: payment.status });
        }
        let metadata = reason.map(|r| serde_json::json!({ "refund_reason": r }).to_string());
        let payment = payments::update_status(payment_id, PaymentStatus::Refunded, None, metadata, &mut tx).await?;
        let order = orders::update_order_status(payment.order_id, OrderStatus::Refunded, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️💳️ Payment #{payment_id} refunded along with order #{}", order.id);
        Ok(PaymentUpdate { payment, order, already_applied: false })
    }

    async fn mark_order_delivered(&self, order_id: i64) -> Result<Order, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let order =
            orders::fetch_order(order_id, &mut tx).await?.ok_or(MarketplaceError::OrderNotFound(order_id))?;
        if order.status != OrderStatus::Processing {
            return Err(MarketplaceError::InvalidOrderState { order_id, status: order.status });
        }
        let order = orders::update_order_status(order_id, OrderStatus::Delivered, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️🧾️ Order #{order_id} delivered");
        Ok(order)
    }

    async fn close(&mut self) -> Result<(), MarketplaceError> {
        self.pool.close().await;
        Ok(())
    }
}
