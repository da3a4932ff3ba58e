//! End-to-end tests of the order workflow against a real (throwaway) SQLite ledger.
use log::*;
use partshub_common::Cents;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use partshub_engine::{
    db_types::{NewOrder, OrderStatus},
    events::EventProducers,
    ErrorKind,
    MarketplaceDatabase,
    MarketplaceError,
    OrderFlowApi,
    Pagination,
    SqliteDatabase,
};
use support::{prepare_env::{prepare_test_env, random_db_path}, seed_part, stock_of};

mod support;

async fn setup() -> OrderFlowApi<SqliteDatabase> {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    OrderFlowApi::new(db, EventProducers::default())
}

async fn tear_down(mut api: OrderFlowApi<SqliteDatabase>) {
    let url = api.db().url().to_string();
    if let Err(e) = api.db_mut().close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    Sqlite::drop_database(&url).await.unwrap();
}

#[tokio::test]
async fn create_order_reserves_stock_and_snapshots_prices() {
    let api = setup().await;
    let brake_pads = seed_part(api.db(), "Brake pads", 2500, 10).await;
    let oil_filter = seed_part(api.db(), "Oil filter", 1550, 5).await;

    let order = NewOrder::new(100).with_item(brake_pads.id, 2).with_item(oil_filter.id, 1);
    let detail = api.create_order(order).await.expect("Error creating order");

    assert_eq!(detail.order.status, OrderStatus::Pending);
    assert_eq!(detail.order.total_price, Cents::from(6550));
    assert_eq!(detail.items.len(), 2);
    assert_eq!(detail.items[0].part_title, "Brake pads");
    assert_eq!(detail.items[0].item.unit_price, Cents::from(2500));
    assert_eq!(detail.items[0].line_total(), Cents::from(5000));
    assert_eq!(stock_of(api.db(), brake_pads.id).await, 8);
    assert_eq!(stock_of(api.db(), oil_filter.id).await, 4);
    tear_down(api).await;
}

#[tokio::test]
async fn create_order_with_unknown_part_mutates_nothing() {
    let api = setup().await;
    let part = seed_part(api.db(), "Alternator", 12000, 3).await;

    let order = NewOrder::new(100).with_item(part.id, 1).with_item(99_999, 1);
    let err = api.create_order(order).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::PartNotFound(99_999)));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(stock_of(api.db(), part.id).await, 3);
    assert!(api.list_orders(100, Pagination::default()).await.unwrap().is_empty());
    tear_down(api).await;
}

#[tokio::test]
async fn insufficient_stock_rejects_in_full() {
    let api = setup().await;
    let part = seed_part(api.db(), "Spark plug", 450, 10).await;

    // 15 > 10: rejected outright, stock untouched.
    let err = api.create_order(NewOrder::new(100).with_item(part.id, 15)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientStock);
    assert_eq!(stock_of(api.db(), part.id).await, 10);

    // 8 fits; the follow-up 5 against the remaining 2 does not.
    api.create_order(NewOrder::new(100).with_item(part.id, 8)).await.expect("Error creating order");
    assert_eq!(stock_of(api.db(), part.id).await, 2);
    let err = api.create_order(NewOrder::new(101).with_item(part.id, 5)).await.unwrap_err();
    match err {
        MarketplaceError::InsufficientStock { part_id, requested, available } => {
            assert_eq!(part_id, part.id);
            assert_eq!(requested, 5);
            assert_eq!(available, 2);
        },
        other => panic!("Expected InsufficientStock, got {other:?}"),
    }
    assert_eq!(stock_of(api.db(), part.id).await, 2);
    tear_down(api).await;
}

#[tokio::test]
async fn duplicate_lines_are_summed_before_the_stock_check() {
    let api = setup().await;
    let part = seed_part(api.db(), "Wiper blade", 900, 10).await;

    // 8 + 5 = 13 > 10: the whole request fails without the 8 being decremented first.
    let order = NewOrder::new(100).with_item(part.id, 8).with_item(part.id, 5);
    let err = api.create_order(order).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientStock);
    assert_eq!(stock_of(api.db(), part.id).await, 10);
    assert!(api.list_orders(100, Pagination::default()).await.unwrap().is_empty());

    // 2 + 3 = 5 fits, and both lines are preserved.
    let order = NewOrder::new(100).with_item(part.id, 2).with_item(part.id, 3);
    let detail = api.create_order(order).await.expect("Error creating order");
    assert_eq!(detail.items.len(), 2);
    assert_eq!(detail.order.total_price, Cents::from(4500));
    assert_eq!(stock_of(api.db(), part.id).await, 5);
    tear_down(api).await;
}

#[tokio::test]
async fn invalid_item_lists_are_validation_failures() {
    let api = setup().await;
    let part = seed_part(api.db(), "Radiator", 8000, 4).await;

    let err = api.create_order(NewOrder::new(100)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);

    let err = api.create_order(NewOrder::new(100).with_item(part.id, 0)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    let err = api.create_order(NewOrder::new(100).with_item(part.id, -2)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    assert_eq!(stock_of(api.db(), part.id).await, 4);
    tear_down(api).await;
}

#[tokio::test]
async fn cancel_restores_exactly_the_reserved_quantities() {
    let api = setup().await;
    let pads = seed_part(api.db(), "Brake pads", 2500, 10).await;
    let filter = seed_part(api.db(), "Oil filter", 1550, 10).await;

    let order = NewOrder::new(100).with_item(pads.id, 2).with_item(filter.id, 1);
    let detail = api.create_order(order).await.expect("Error creating order");
    assert_eq!(detail.order.total_price, Cents::from(6550));

    // An unrelated order against the same parts must not skew the release.
    api.create_order(NewOrder::new(200).with_item(pads.id, 3).with_item(filter.id, 4))
        .await
        .expect("Error creating order");
    assert_eq!(stock_of(api.db(), pads.id).await, 5);
    assert_eq!(stock_of(api.db(), filter.id).await, 5);

    let cancelled = api.cancel_order(detail.order.id, 100).await.expect("Error cancelling order");
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(stock_of(api.db(), pads.id).await, 7);
    assert_eq!(stock_of(api.db(), filter.id).await, 6);
    tear_down(api).await;
}

#[tokio::test]
async fn cancel_guards() {
    let api = setup().await;
    let part = seed_part(api.db(), "Timing belt", 3200, 6).await;
    let detail = api.create_order(NewOrder::new(100).with_item(part.id, 2)).await.expect("Error creating order");

    let err = api.cancel_order(999, 100).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = api.cancel_order(detail.order.id, 200).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(stock_of(api.db(), part.id).await, 4);

    // Once checkout has begun the order is no longer Pending and cannot be cancelled.
    api.begin_checkout(detail.order.id, 100).await.expect("Error beginning checkout");
    let err = api.cancel_order(detail.order.id, 100).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(stock_of(api.db(), part.id).await, 4);
    tear_down(api).await;
}

#[tokio::test]
async fn get_order_enforces_ownership() {
    let api = setup().await;
    let part = seed_part(api.db(), "Shock absorber", 6700, 8).await;
    let detail = api.create_order(NewOrder::new(100).with_item(part.id, 1)).await.expect("Error creating order");

    let fetched = api.get_order(detail.order.id, 100).await.expect("Error fetching order");
    assert_eq!(fetched.order.id, detail.order.id);
    assert_eq!(fetched.items[0].part_title, "Shock absorber");

    let err = api.get_order(detail.order.id, 200).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    let err = api.get_order(999, 100).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    tear_down(api).await;
}

#[tokio::test]
async fn list_orders_pages_newest_first() {
    let api = setup().await;
    let part = seed_part(api.db(), "Fuel pump", 5400, 20).await;
    let mut ids = Vec::new();
    for _ in 0..3 {
        let detail = api.create_order(NewOrder::new(100).with_item(part.id, 1)).await.expect("Error creating order");
        ids.push(detail.order.id);
    }
    // A different user's order must not appear in the listing.
    api.create_order(NewOrder::new(200).with_item(part.id, 1)).await.expect("Error creating order");

    let page = api.list_orders(100, Pagination::default().with_limit(2)).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].id, ids[2]);
    assert_eq!(page[1].id, ids[1]);

    let page = api.list_orders(100, Pagination::new(2, 2)).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, ids[0]);
    tear_down(api).await;
}

#[tokio::test]
async fn begin_checkout_is_a_one_way_transition() {
    let api = setup().await;
    let part = seed_part(api.db(), "Head gasket", 2100, 5).await;
    let detail = api.create_order(NewOrder::new(100).with_item(part.id, 1)).await.expect("Error creating order");

    let order = api.begin_checkout(detail.order.id, 100).await.expect("Error beginning checkout");
    assert_eq!(order.status, OrderStatus::PendingPayment);

    let err = api.begin_checkout(detail.order.id, 100).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    // Delivery is only legal from Processing.
    let err = api.mark_delivered(detail.order.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    tear_down(api).await;
}
