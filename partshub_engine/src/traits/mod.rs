//! Defines the behaviour required from backends and collaborators of the marketplace engine.
//!
//! [`MarketplaceDatabase`] is the storage contract: a backend that can execute the order and payment workflows as
//! atomic units. [`IdempotencyCache`] is the injected, best-effort external cache used by the payment workflow for
//! fast idempotent lookups. Neither trait leaks storage-engine specific error types; everything is translated into
//! [`MarketplaceError`].
mod cache;
mod data_objects;
mod marketplace_database;

pub use cache::{CacheError, IdempotencyCache, MemoryCache, NoCache};
pub use data_objects::{OrderDetail, OrderLineItem, Pagination, PaymentUpdate};
pub use marketplace_database::{ErrorKind, MarketplaceDatabase, MarketplaceError};
