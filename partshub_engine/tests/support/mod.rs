pub mod prepare_env;

use partshub_common::Cents;
use partshub_engine::{
    db_types::{NewPart, Part},
    MarketplaceDatabase,
    SqliteDatabase,
};

/// Lists a part with the given price (in minor units) and opening stock, owned by vendor 1.
pub async fn seed_part(db: &SqliteDatabase, title: &str, unit_price: i64, stock: i64) -> Part {
    db.insert_part(NewPart::new(title, Cents::from(unit_price), stock, 1))
        .await
        .expect("Error seeding part")
}

pub async fn stock_of(db: &SqliteDatabase, part_id: i64) -> i64 {
    db.fetch_part(part_id).await.expect("Error fetching part").expect("Part does not exist").available_stock
}

pub async fn count_payments_for_order(db: &SqliteDatabase, order_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE order_id = $1")
        .bind(order_id)
        .fetch_one(db.pool())
        .await
        .expect("Error counting payments")
}
