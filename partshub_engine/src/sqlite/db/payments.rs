use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPayment, Payment, PaymentStatus},
    traits::MarketplaceError,
};

pub async fn insert_payment(payment: NewPayment, conn: &mut SqliteConnection) -> Result<Payment, MarketplaceError> {
    let payment: Payment = sqlx::query_as(
        r#"
            INSERT INTO payments (order_id, amount, currency, method)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(payment.order_id)
    .bind(payment.amount)
    .bind(payment.currency)
    .bind(payment.method.to_string())
    .fetch_one(conn)
    .await?;
    debug!("🗃️💳️ Payment #{} created against order #{} for {}", payment.id, payment.order_id, payment.amount);
    Ok(payment)
}

pub async fn fetch_payment(payment_id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE id = $1").bind(payment_id).fetch_optional(conn).await?;
    Ok(payment)
}

/// Writes the payment's new status. `tx_ref` and `metadata` are only overwritten when a new value is supplied, so a
/// refund keeps the transaction reference recorded at completion time.
pub async fn update_status(
    payment_id: i64,
    status: PaymentStatus,
    tx_ref: Option<String>,
    metadata: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<Payment, MarketplaceError> {
    let status = status.to_string();
    let payment: Option<Payment> = sqlx::query_as(
        r#"
            UPDATE payments SET
                status = $1,
                tx_ref = COALESCE($2, tx_ref),
                metadata = COALESCE($3, metadata),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $4
            RETURNING *
        "#,
    )
    .bind(status)
    .bind(tx_ref)
    .bind(metadata)
    .bind(payment_id)
    .fetch_optional(conn)
    .await?;
    payment.ok_or(MarketplaceError::PaymentNotFound(payment_id))
}
