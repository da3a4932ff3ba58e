//! The public workflow APIs of the marketplace engine.
//!
//! [`order_flow_api::OrderFlowApi`] orchestrates order creation, cancellation and reads. `payment_flow_api`'s
//! [`payment_flow_api::PaymentFlowApi`] orchestrates payment creation, gateway status verification and refunds.
//! Both validate inputs, delegate the atomic ledger work to a [`crate::traits::MarketplaceDatabase`] backend, and
//! publish notification events once the transaction has committed.
pub mod order_flow_api;
pub mod payment_flow_api;
pub mod payment_objects;
