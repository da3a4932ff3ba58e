use partshub_common::Cents;
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderItem, Payment};

pub const DEFAULT_PAGE_SIZE: i64 = 50;

//--------------------------------------      Pagination     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { limit: DEFAULT_PAGE_SIZE, offset: 0 }
    }
}

impl Pagination {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

//--------------------------------------    OrderLineItem    ---------------------------------------------------------
/// An order line joined with the denormalized part title for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub item: OrderItem,
    pub part_title: String,
}

impl OrderLineItem {
    pub fn line_total(&self) -> Cents {
        self.item.line_total()
    }
}

//--------------------------------------      OrderDetail    ---------------------------------------------------------
/// An order together with its nested line items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderLineItem>,
}

//--------------------------------------     PaymentUpdate   ---------------------------------------------------------
/// The post-transition state of a payment status change, together with the order it drives.
///
/// `already_applied` is true when the requested transition had been applied before and this call short-circuited
/// without touching the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentUpdate {
    pub payment: Payment,
    pub order: Order,
    pub already_applied: bool,
}
