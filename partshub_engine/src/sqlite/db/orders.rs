use log::debug;
use partshub_common::Cents;
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db_types::{Order, OrderItem, OrderStatus},
    traits::{MarketplaceError, OrderLineItem, Pagination},
};

pub async fn insert_order(
    user_id: i64,
    total_price: Cents,
    conn: &mut SqliteConnection,
) -> Result<Order, MarketplaceError> {
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (user_id, total_price) VALUES ($1, $2)
            RETURNING *;
        "#,
    )
    .bind(user_id)
    .bind(total_price)
    .fetch_one(conn)
    .await?;
    debug!("🗃️🧾️ Order #{} inserted for user {user_id} with total {total_price}", order.id);
    Ok(order)
}

pub async fn insert_order_item(
    order_id: i64,
    part_id: i64,
    quantity: i64,
    unit_price: Cents,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, MarketplaceError> {
    let item = sqlx::query_as(
        r#"
            INSERT INTO order_items (order_id, part_id, quantity, unit_price)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(part_id)
    .bind(quantity)
    .bind(unit_price)
    .fetch_one(conn)
    .await?;
    Ok(item)
}

pub async fn fetch_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

#[derive(Debug, FromRow)]
struct LineItemRow {
    id: i64,
    order_id: i64,
    part_id: i64,
    quantity: i64,
    unit_price: Cents,
    part_title: String,
}

/// Fetches an order's line items joined with the denormalized part titles for display.
pub async fn fetch_line_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderLineItem>, sqlx::Error> {
    let rows: Vec<LineItemRow> = sqlx::query_as(
        r#"
            SELECT
                order_items.id as id,
                order_id,
                part_id,
                quantity,
                order_items.unit_price as unit_price,
                parts.title as part_title
            FROM order_items JOIN parts ON order_items.part_id = parts.id
            WHERE order_id = $1
            ORDER BY order_items.id ASC
        "#,
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    let items = rows
        .into_iter()
        .map(|row| OrderLineItem {
            item: OrderItem {
                id: row.id,
                order_id: row.order_id,
                part_id: row.part_id,
                quantity: row.quantity,
                unit_price: row.unit_price,
            },
            part_title: row.part_title,
        })
        .collect();
    Ok(items)
}

/// Fetches a page of the user's orders, newest first.
pub async fn search_orders(
    user_id: i64,
    pagination: Pagination,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
    )
    .bind(user_id)
    .bind(pagination.limit)
    .bind(pagination.offset)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

pub async fn update_order_status(
    order_id: i64,
    status: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Order, MarketplaceError> {
    let status = status.to_string();
    let result: Option<Order> =
        sqlx::query_as("UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(status)
            .bind(order_id)
            .fetch_optional(conn)
            .await?;
    result.ok_or(MarketplaceError::OrderNotFound(order_id))
}
