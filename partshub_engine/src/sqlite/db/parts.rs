use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewPart, Part},
    traits::MarketplaceError,
};

pub async fn insert_part(part: NewPart, conn: &mut SqliteConnection) -> Result<Part, MarketplaceError> {
    let part = sqlx::query_as(
        r#"
            INSERT INTO parts (title, unit_price, available_stock, vendor_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(part.title)
    .bind(part.unit_price)
    .bind(part.available_stock)
    .bind(part.vendor_id)
    .fetch_one(conn)
    .await?;
    Ok(part)
}

pub async fn fetch_part(part_id: i64, conn: &mut SqliteConnection) -> Result<Option<Part>, sqlx::Error> {
    let part = sqlx::query_as("SELECT * FROM parts WHERE id = $1").bind(part_id).fetch_optional(conn).await?;
    Ok(part)
}

/// Fetches all parts matching the given ids in one read. Parts that do not exist are simply absent from the result;
/// the caller decides whether that is an error.
pub async fn fetch_parts(part_ids: &[i64], conn: &mut SqliteConnection) -> Result<Vec<Part>, sqlx::Error> {
    if part_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new("SELECT * FROM parts WHERE id IN (");
    let mut in_list = builder.separated(", ");
    for id in part_ids {
        in_list.push_bind(*id);
    }
    builder.push(")");
    let parts = builder.build_query_as::<Part>().fetch_all(conn).await?;
    Ok(parts)
}

/// Conditionally decrements a part's stock by `quantity`. The decrement only applies if the remaining stock would be
/// non-negative; the return value says whether a row was updated. A `false` return inside a transaction leaves the
/// caller free to roll the whole operation back.
pub async fn reserve_stock(part_id: i64, quantity: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE parts SET available_stock = available_stock - $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND available_stock >= $3
        "#,
    )
    .bind(quantity)
    .bind(part_id)
    .bind(quantity)
    .execute(conn)
    .await?;
    let reserved = result.rows_affected() == 1;
    trace!("🗃️📦️ Reserve {quantity} of part #{part_id}: {}", if reserved { "ok" } else { "insufficient stock" });
    Ok(reserved)
}

/// Returns previously reserved stock to a part. Used by order cancellation.
pub async fn release_stock(part_id: i64, quantity: i64, conn: &mut SqliteConnection) -> Result<(), MarketplaceError> {
    let result = sqlx::query(
        "UPDATE parts SET available_stock = available_stock + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2",
    )
    .bind(quantity)
    .bind(part_id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(MarketplaceError::PartNotFound(part_id));
    }
    trace!("🗃️📦️ Released {quantity} of part #{part_id}");
    Ok(())
}
