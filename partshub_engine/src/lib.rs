//! Partshub Marketplace Engine
//!
//! The engine contains the core order, inventory and payment lifecycle of the Partshub auto-parts marketplace. It is
//! transport-agnostic: any HTTP layer (or test harness) can wrap the workflow APIs directly.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@sqlite`]). SQLite is the supported backend. You should never need to
//!    access the database directly. Instead, use the public API provided by the engine. The exception is the data
//!    types used in the database. These are defined in the `db_types` module and are public.
//! 2. The engine public API ([`mod@mkt_api`]). This provides the order workflow ([`OrderFlowApi`]) and the payment
//!    workflow ([`PaymentFlowApi`]). Specific backends need to implement the [`MarketplaceDatabase`] trait in order
//!    to drive these workflows.
//!
//! The engine also provides a set of events that can be subscribed to. These events are emitted after a workflow
//! transition commits; for example, when a new order is created, an `OrderCreatedEvent` is emitted. A simple actor
//! framework lets you hook into these events and perform custom actions (sending confirmation mails, say) without
//! ever holding the ledger transaction open or failing the workflow.
pub mod db_types;
pub mod events;
mod mkt_api;
#[cfg(feature = "sqlite")]
mod sqlite;
mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use mkt_api::{
    order_flow_api::OrderFlowApi,
    payment_flow_api::PaymentFlowApi,
    payment_objects::{
        payment_cache_key,
        CachedPaymentState,
        PaymentReceipt,
        PaymentStatusUpdate,
        PAYMENT_CACHE_TTL_SECS,
    },
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    CacheError,
    ErrorKind,
    IdempotencyCache,
    MarketplaceDatabase,
    MarketplaceError,
    MemoryCache,
    NoCache,
    OrderDetail,
    OrderLineItem,
    Pagination,
    PaymentUpdate,
};
