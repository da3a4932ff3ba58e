//! Tests that workflow transitions fire the notification hooks, and that hook failures never reach the workflow.
use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use partshub_engine::{
    db_types::{NewOrder, NewPayment, PaymentMethod, PaymentOutcome},
    events::{EventHandlers, EventHooks},
    MarketplaceDatabase,
    MemoryCache,
    OrderFlowApi,
    PaymentFlowApi,
    SqliteDatabase,
};
use support::{prepare_env::{prepare_test_env, random_db_path}, seed_part};

mod support;

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
}

impl HookCalled {
    pub fn called(&self) {
        let _ = self.called.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> i32 {
        self.called.load(Ordering::Relaxed)
    }
}

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

async fn drop_db(mut db: SqliteDatabase) {
    let url = db.url().to_string();
    if let Err(e) = db.close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    Sqlite::drop_database(&url).await.unwrap();
}

#[tokio::test]
async fn order_hooks_fire_once_per_transition() {
    let db = new_db().await;
    let created = HookCalled::default();
    let created_copy = created.clone();
    let cancelled = HookCalled::default();
    let cancelled_copy = cancelled.clone();

    let mut hooks = EventHooks::default();
    hooks.on_order_created(move |event| {
        info!("🪝️ {event:?}");
        created_copy.called();
        Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks.on_order_cancelled(move |event| {
        info!("🪝️ {event:?}");
        cancelled_copy.called();
        Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(10, hooks);
    let api = OrderFlowApi::new(db.clone(), handlers.producers());
    handlers.start_handlers().await;

    let part = seed_part(api.db(), "Brake pads", 2500, 10).await;
    let first = api.create_order(NewOrder::new(100).with_item(part.id, 1)).await.expect("Error creating order");
    api.create_order(NewOrder::new(100).with_item(part.id, 2)).await.expect("Error creating order");
    api.cancel_order(first.order.id, 100).await.expect("Error cancelling order");
    // A rejected request must not notify anyone.
    let _ = api.create_order(NewOrder::new(100).with_item(part.id, 100)).await.unwrap_err();

    drop(api);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(created.count(), 2);
    assert_eq!(cancelled.count(), 1);
    drop_db(db).await;
}

#[tokio::test]
async fn payment_hooks_carry_retry_and_refund_context() {
    let db = new_db().await;
    let completed = HookCalled::default();
    let completed_copy = completed.clone();
    let refunded = HookCalled::default();
    let refunded_copy = refunded.clone();
    let failure_reasons = Arc::new(Mutex::new(Vec::new()));
    let reasons_copy = failure_reasons.clone();

    let mut hooks = EventHooks::default();
    hooks.on_payment_completed(move |event| {
        info!("🪝️ {event:?}");
        completed_copy.called();
        Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks.on_payment_failed(move |event| {
        reasons_copy.lock().unwrap().push(event.reason.clone());
        Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks.on_payment_refunded(move |event| {
        info!("🪝️ {event:?}");
        refunded_copy.called();
        Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(10, hooks);
    let orders = OrderFlowApi::new(db.clone(), Default::default());
    let payments = PaymentFlowApi::new(db.clone(), MemoryCache::new(), handlers.producers());
    handlers.start_handlers().await;

    let part = seed_part(orders.db(), "Oil filter", 1550, 10).await;
    let detail = orders.create_order(NewOrder::new(100).with_item(part.id, 1)).await.expect("Error creating order");
    orders.begin_checkout(detail.order.id, 100).await.expect("Error beginning checkout");

    let first = payments
        .create_payment(NewPayment::new(detail.order.id, 100, detail.order.total_price, PaymentMethod::Card))
        .await
        .unwrap();
    payments
        .update_payment_status(first.payment_id, PaymentOutcome::Failed { reason: Some("card declined".into()) })
        .await
        .unwrap();

    let retry = payments
        .create_payment(NewPayment::new(detail.order.id, 100, detail.order.total_price, PaymentMethod::Card))
        .await
        .unwrap();
    let outcome = PaymentOutcome::Completed { tx_ref: Some("tx-1".into()) };
    payments.update_payment_status(retry.payment_id, outcome.clone()).await.unwrap();
    // The duplicate callback short-circuits and must not notify a second time.
    payments.update_payment_status(retry.payment_id, outcome).await.unwrap();
    payments.refund_payment(retry.payment_id, 100, Some("wrong part".into())).await.unwrap();

    drop(orders);
    drop(payments);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(completed.count(), 1);
    assert_eq!(refunded.count(), 1);
    assert_eq!(failure_reasons.lock().unwrap().as_slice(), &[Some("card declined".to_string())]);
    drop_db(db).await;
}
