use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use partshub_common::{Cents, DEFAULT_CURRENCY_CODE};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(String);

//--------------------------------------        Part        ----------------------------------------------------------
/// A catalog part together with its live inventory count.
///
/// `available_stock` is only ever mutated through the order workflow's reserve (order creation) and release (order
/// cancellation) operations, and can never go negative.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Part {
    pub id: i64,
    pub title: String,
    pub unit_price: Cents,
    pub available_stock: i64,
    pub vendor_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPart {
    pub title: String,
    pub unit_price: Cents,
    pub available_stock: i64,
    pub vendor_id: i64,
}

impl NewPart {
    pub fn new<S: Into<String>>(title: S, unit_price: Cents, available_stock: i64, vendor_id: i64) -> Self {
        Self { title: title.into(), unit_price, available_stock, vendor_id }
    }
}

//--------------------------------------     OrderStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Newly created. Inventory is reserved, no payment flow has started yet.
    Pending,
    /// Checkout has begun. A payment may be created against the order.
    PendingPayment,
    /// A payment completed successfully and the order is being prepared for delivery.
    Processing,
    /// The order has been handed to the customer. Terminal.
    Delivered,
    /// The order was cancelled and its inventory reservation released. Terminal.
    Cancelled,
    /// The payment for the order was refunded. Terminal.
    Refunded,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "Pending"),
            OrderStatus::PendingPayment => write!(f, "PendingPayment"),
            OrderStatus::Processing => write!(f, "Processing"),
            OrderStatus::Delivered => write!(f, "Delivered"),
            OrderStatus::Cancelled => write!(f, "Cancelled"),
            OrderStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "PendingPayment" => Ok(Self::PendingPayment),
            "Processing" => Ok(Self::Processing),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            "Refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatus::Pending
        })
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub status: OrderStatus,
    pub total_price: Cents,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      OrderItem      ---------------------------------------------------------
/// A single line of an order. `unit_price` is the part's price captured at order time and never tracks later price
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub part_id: i64,
    pub quantity: i64,
    pub unit_price: Cents,
}

impl OrderItem {
    pub fn line_total(&self) -> Cents {
        self.unit_price * self.quantity
    }
}

//--------------------------------------      NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: i64,
    pub items: Vec<NewOrderItem>,
}

/// A requested order line. Duplicate part ids across lines in one request are legal; their quantities are summed
/// before the stock check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub part_id: i64,
    pub quantity: i64,
}

impl NewOrder {
    pub fn new(user_id: i64) -> Self {
        Self { user_id, items: Vec::new() }
    }

    pub fn with_item(mut self, part_id: i64, quantity: i64) -> Self {
        self.items.push(NewOrderItem { part_id, quantity });
        self
    }
}

//--------------------------------------    PaymentMethod    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentMethod {
    Card,
    MobileMoney,
    BankTransfer,
    CashOnPickup,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Card => write!(f, "Card"),
            PaymentMethod::MobileMoney => write!(f, "MobileMoney"),
            PaymentMethod::BankTransfer => write!(f, "BankTransfer"),
            PaymentMethod::CashOnPickup => write!(f, "CashOnPickup"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Card" => Ok(Self::Card),
            "MobileMoney" => Ok(Self::MobileMoney),
            "BankTransfer" => Ok(Self::BankTransfer),
            "CashOnPickup" => Ok(Self::CashOnPickup),
            s => Err(ConversionError(format!("Invalid payment method: {s}"))),
        }
    }
}

//--------------------------------------    PaymentStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Completed,
    /// Terminal for this payment instance. A retry creates a brand-new payment; the failed one is never reused.
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Completed => write!(f, "Completed"),
            PaymentStatus::Failed => write!(f, "Failed"),
            PaymentStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            "Refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------       Payment       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    pub amount: Cents,
    pub currency: String,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    /// The gateway transaction reference, set when the payment completes.
    pub tx_ref: Option<String>,
    /// Structured context as a JSON blob, e.g. the failure reason for failed payments.
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      NewPayment     ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub order_id: i64,
    /// The user requesting the payment. Must be the order's owner.
    pub user_id: i64,
    pub amount: Cents,
    pub currency: String,
    pub method: PaymentMethod,
}

impl NewPayment {
    pub fn new(order_id: i64, user_id: i64, amount: Cents, method: PaymentMethod) -> Self {
        Self { order_id, user_id, amount, currency: DEFAULT_CURRENCY_CODE.to_string(), method }
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }
}

//--------------------------------------    PaymentOutcome   ---------------------------------------------------------
/// The terminal outcome reported by an external payment gateway for a pending payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PaymentOutcome {
    Completed { tx_ref: Option<String> },
    Failed { reason: Option<String> },
}

impl PaymentOutcome {
    pub fn status(&self) -> PaymentStatus {
        match self {
            PaymentOutcome::Completed { .. } => PaymentStatus::Completed,
            PaymentOutcome::Failed { .. } => PaymentStatus::Failed,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn order_status_round_trip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::PendingPayment,
            OrderStatus::Processing,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
        ] {
            let s = status.to_string();
            assert_eq!(s.parse::<OrderStatus>().unwrap(), status);
        }
        assert!("Shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Refunded.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::PendingPayment.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
        assert!(!PaymentStatus::Pending.is_terminal());
    }

    #[test]
    fn payment_method_round_trip() {
        for method in
            [PaymentMethod::Card, PaymentMethod::MobileMoney, PaymentMethod::BankTransfer, PaymentMethod::CashOnPickup]
        {
            assert_eq!(method.to_string().parse::<PaymentMethod>().unwrap(), method);
        }
    }

    #[test]
    fn line_total_is_price_times_quantity() {
        let item = OrderItem {
            id: 1,
            order_id: 1,
            part_id: 7,
            quantity: 3,
            unit_price: Cents::new(12, 50),
        };
        assert_eq!(item.line_total(), Cents::from(3750));
    }
}
