use partshub_common::Cents;
use serde::{Deserialize, Serialize};

use crate::db_types::{OrderStatus, Payment, PaymentStatus};

/// Idempotency-cache entries live for a day; gateway callbacks rarely straggle longer than that, and the ledger
/// remains authoritative for the ones that do.
pub const PAYMENT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

pub fn payment_cache_key(payment_id: i64) -> String {
    format!("payment:{payment_id}")
}

//--------------------------------------   PaymentReceipt    ---------------------------------------------------------
/// What the caller gets back from `create_payment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub payment_id: i64,
    pub status: PaymentStatus,
    pub amount: Cents,
    pub currency: String,
}

impl From<&Payment> for PaymentReceipt {
    fn from(payment: &Payment) -> Self {
        Self {
            payment_id: payment.id,
            status: payment.status,
            amount: payment.amount,
            currency: payment.currency.clone(),
        }
    }
}

//------------------------------------- PaymentStatusUpdate  ---------------------------------------------------------
/// The post-transition pair returned by `update_payment_status` and `refund_payment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusUpdate {
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
}

//-------------------------------------- CachedPaymentState  ---------------------------------------------------------
/// The JSON value stored in the idempotency cache, keyed by [`payment_cache_key`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedPaymentState {
    pub payment_id: i64,
    pub order_id: i64,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
}

impl CachedPaymentState {
    pub fn as_update(&self) -> PaymentStatusUpdate {
        PaymentStatusUpdate { payment_status: self.payment_status, order_status: self.order_status }
    }
}
