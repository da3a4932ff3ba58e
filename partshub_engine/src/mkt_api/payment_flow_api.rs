use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewPayment, PaymentOutcome},
    events::{EventProducers, PaymentCompletedEvent, PaymentFailedEvent, PaymentRefundedEvent},
    mkt_api::payment_objects::{
        payment_cache_key,
        CachedPaymentState,
        PaymentReceipt,
        PaymentStatusUpdate,
        PAYMENT_CACHE_TTL_SECS,
    },
    traits::{IdempotencyCache, MarketplaceDatabase, MarketplaceError, PaymentUpdate},
};

/// `PaymentFlowApi` is the primary API for creating payments, applying gateway verification callbacks, and issuing
/// refunds.
///
/// The payment ledger is the single source of truth. The injected [`IdempotencyCache`] only short-circuits
/// callbacks whose transition has verifiably been applied already; a missing or broken cache degrades to the full
/// ledger path, which is itself idempotent.
pub struct PaymentFlowApi<B, C> {
    db: B,
    cache: C,
    producers: EventProducers,
}

impl<B, C> Debug for PaymentFlowApi<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi")
    }
}

impl<B, C> PaymentFlowApi<B, C> {
    pub fn new(db: B, cache: C, producers: EventProducers) -> Self {
        Self { db, cache, producers }
    }
}

impl<B, C> PaymentFlowApi<B, C>
where
    B: MarketplaceDatabase,
    C: IdempotencyCache,
{
    /// Creates a `Pending` payment against an order in `PendingPayment`.
    ///
    /// The order must exist and belong to the requesting user (an ownership mismatch surfaces as a generic
    /// bad-request). After the ledger row is committed, a short-lived cache entry keyed by the payment id is written
    /// so that gateway callbacks can resolve quickly; the write is best-effort.
    pub async fn create_payment(&self, payment: NewPayment) -> Result<PaymentReceipt, MarketplaceError> {
        if payment.amount.value() <= 0 {
            return Err(MarketplaceError::InvalidRequest(format!(
                "payment amount must be positive, got {}",
                payment.amount
            )));
        }
        if payment.currency.is_empty() {
            return Err(MarketplaceError::InvalidRequest("payment currency must not be empty".to_string()));
        }
        let payment = self.db.insert_payment(payment).await?;
        debug!("🔄️💳️ Payment #{} created against order #{}", payment.id, payment.order_id);
        let state = CachedPaymentState {
            payment_id: payment.id,
            order_id: payment.order_id,
            payment_status: payment.status,
            order_status: crate::db_types::OrderStatus::PendingPayment,
        };
        self.cache_state(&state).await;
        Ok(PaymentReceipt::from(&payment))
    }

    /// Applies a terminal gateway outcome to a payment.
    ///
    /// Safe under at-least-twice delivery: a repeated callback returns the same `{payment_status, order_status}` pair
    /// as the first one without re-mutating the ledger. `Completed` drives the order to `Processing`; `Failed` leaves
    /// the order in `PendingPayment` and queues a payment-failed notification carrying the retry context.
    pub async fn update_payment_status(
        &self,
        payment_id: i64,
        outcome: PaymentOutcome,
    ) -> Result<PaymentStatusUpdate, MarketplaceError> {
        let requested = outcome.status();
        if let Some(state) = self.cached_state(payment_id).await {
            if state.payment_status == requested {
                debug!("🔄️💳️ Payment #{payment_id} already {requested} per cache. Short-circuiting");
                return Ok(state.as_update());
            }
        }
        let failure_reason = match &outcome {
            PaymentOutcome::Failed { reason } => reason.clone(),
            PaymentOutcome::Completed { .. } => None,
        };
        let update = self.db.update_payment_status(payment_id, outcome).await?;
        let state = CachedPaymentState {
            payment_id,
            order_id: update.order.id,
            payment_status: update.payment.status,
            order_status: update.order.status,
        };
        self.cache_state(&state).await;
        if !update.already_applied {
            match requested {
                crate::db_types::PaymentStatus::Completed => self.call_payment_completed_hook(&update).await,
                _ => self.call_payment_failed_hook(&update, failure_reason).await,
            }
        }
        Ok(state.as_update())
    }

    /// Refunds a `Completed` payment, moving both the payment and its order to `Refunded`.
    pub async fn refund_payment(
        &self,
        payment_id: i64,
        requesting_user_id: i64,
        reason: Option<String>,
    ) -> Result<PaymentStatusUpdate, MarketplaceError> {
        info!("🔄️💳️ User {requesting_user_id} requested a refund of payment #{payment_id}");
        let update = self.db.refund_payment(payment_id, reason).await?;
        // The cached completed state is stale now and must not short-circuit a late gateway callback.
        if let Err(e) = self.cache.del(&payment_cache_key(payment_id)).await {
            warn!("🔄️💳️ Failed to drop cache entry for payment #{payment_id}: {e}");
        }
        self.call_payment_refunded_hook(&update).await;
        Ok(PaymentStatusUpdate { payment_status: update.payment.status, order_status: update.order.status })
    }

    async fn cached_state(&self, payment_id: i64) -> Option<CachedPaymentState> {
        match self.cache.get(&payment_cache_key(payment_id)).await {
            Ok(Some(value)) => match serde_json::from_str(&value) {
                Ok(state) => Some(state),
                Err(e) => {
                    warn!("🔄️💳️ Discarding unreadable cache entry for payment #{payment_id}: {e}");
                    None
                },
            },
            Ok(None) => None,
            Err(e) => {
                // Cache absence or failure is never authoritative; fall through to the ledger.
                warn!("🔄️💳️ Cache lookup for payment #{payment_id} failed: {e}");
                None
            },
        }
    }

    async fn cache_state(&self, state: &CachedPaymentState) {
        let key = payment_cache_key(state.payment_id);
        match serde_json::to_string(state) {
            Ok(value) => {
                if let Err(e) = self.cache.set(&key, &value, PAYMENT_CACHE_TTL_SECS).await {
                    warn!("🔄️💳️ Failed to cache state for payment #{}: {e}", state.payment_id);
                }
            },
            Err(e) => warn!("🔄️💳️ Failed to serialize cache state for payment #{}: {e}", state.payment_id),
        }
    }

    async fn call_payment_completed_hook(&self, update: &PaymentUpdate) {
        for producer in &self.producers.payment_completed_producer {
            trace!("🔄️💳️ Notifying payment completed hook subscribers");
            producer.publish_event(PaymentCompletedEvent::new(update.payment.clone(), update.order.clone())).await;
        }
    }

    async fn call_payment_failed_hook(&self, update: &PaymentUpdate, reason: Option<String>) {
        for producer in &self.producers.payment_failed_producer {
            trace!("🔄️💳️ Notifying payment failed hook subscribers");
            producer
                .publish_event(PaymentFailedEvent::new(update.payment.clone(), update.order.clone(), reason.clone()))
                .await;
        }
    }

    async fn call_payment_refunded_hook(&self, update: &PaymentUpdate) {
        for producer in &self.producers.payment_refunded_producer {
            trace!("🔄️💳️ Notifying payment refunded hook subscribers");
            producer.publish_event(PaymentRefundedEvent::new(update.payment.clone(), update.order.clone())).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
